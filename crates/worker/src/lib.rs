//! The worker: consumes pending requests from the store, runs them under a
//! wall-clock timeout, and writes back their outcome.

mod logic;
mod path;
mod process;

pub use logic::process_once;
pub use path::resolve_bin_path;
pub use process::{run_with_timeout, Outcome};

use std::time::Duration;

use taskwheel_config::WorkerConfig;
use taskwheel_store::RedisGateway;
use tokio_util::sync::CancellationToken;

/// Bring up the worker: connect and health-check the store, then consume
/// requests until `shutdown` fires.
///
/// Each iteration checks `shutdown` before taking the next request, never
/// mid-execution — a running task is always allowed to finish and write
/// its result.
pub async fn run(config: WorkerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    use anyhow::Context;

    let gateway = RedisGateway::connect(&config.redis_url())
        .await
        .context("failed to connect to store")?;
    gateway.ping().await.context("store health check failed")?;
    tracing::info!("store connection established");

    let task_run_time = Duration::from_secs(config.task_run_time);

    loop {
        if shutdown.is_cancelled() {
            tracing::info!("worker shut down");
            return Ok(());
        }

        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("worker shut down");
                return Ok(());
            }
            result = process_once(&gateway, &config.bin_path, task_run_time, config.result_keep_time) => result,
        };

        match result {
            // No work: the contract's fixed one-second back-off, independent of `period`.
            Ok(false) => {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("worker shut down");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
            // A task was processed (success or failure alike): the configured
            // per-iteration throttle, independent of the no-work back-off.
            Ok(true) => {
                if config.period > 0 {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            tracing::info!("worker shut down");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(Duration::from_secs(config.period)) => {}
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "store error while processing a request");
            }
        }
    }
}
