//! The broker: accepts client connections, dispatches submit/poll-result
//! frames, and runs the background retry loop that re-queues failed tasks
//! per their back-off schedule.

mod connection;
mod logic;
mod server;

pub use logic::{handle_poll, handle_submit, now_unix, retry_once};
pub use server::{accept_loop, retry_loop};

use std::sync::Arc;
use std::time::Duration;

use taskwheel_config::BrokerConfig;
use taskwheel_store::RedisGateway;
use taskwheel_timer::Wheel;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// The wheel's tick granularity. 10ms matches the contract's default.
const TICK: Duration = Duration::from_millis(10);

/// Bring up the broker: bind the listener, connect and health-check the
/// store, start the wheel and retry loop, then accept connections until
/// `shutdown` fires. Returns once the accept loop has drained.
pub async fn run(config: BrokerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(addr = %config.addr, "broker listening");

    let gateway = Arc::new(
        RedisGateway::connect(&config.redis_url())
            .await
            .context("failed to connect to store")?,
    );
    gateway.ping().await.context("store health check failed")?;
    tracing::info!("store connection established");

    let wheel = Wheel::new(TICK);
    wheel.start();

    let retry_handle = tokio::spawn(retry_loop(
        Arc::clone(&gateway),
        wheel.clone(),
        shutdown.clone(),
    ));

    accept_loop(listener, gateway, wheel.clone(), shutdown).await;

    let _ = retry_handle.await;
    wheel.stop();
    tracing::info!("broker shut down");
    Ok(())
}
