//! Startup and the accept/retry loop tasks.

use std::sync::Arc;
use std::time::Duration;

use taskwheel_store::StoreGateway;
use taskwheel_timer::Wheel;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::connection::handle_connection;
use crate::logic::retry_once;

/// Accept connections until `shutdown` fires, handing each off to its own
/// task. A panic inside a connection task is caught at the `JoinHandle`
/// boundary and logged — the socket is already gone by then, so there is
/// nothing left to clean up, and no other connection is affected.
pub async fn accept_loop<G: StoreGateway + 'static>(
    listener: TcpListener,
    gateway: Arc<G>,
    wheel: Wheel,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed, continuing");
                continue;
            }
        };

        let gateway = Arc::clone(&gateway);
        let wheel = wheel.clone();
        tokio::spawn(async move {
            if let Err(panic) = tokio::spawn(handle_connection(stream, gateway, wheel)).await {
                tracing::error!(peer = %peer, panic = %panic, "connection handler panicked");
            }
        });
    }
    tracing::info!("accept loop shutting down");
}

/// The background retry loop: repeatedly drains the fail set, rescheduling
/// or dropping each entry per its retry policy.
pub async fn retry_loop<G: StoreGateway + 'static>(
    gateway: Arc<G>,
    wheel: Wheel,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        match retry_once(&gateway, &wheel).await {
            Ok(true) => continue,
            Ok(false) => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "store error in retry loop, continuing");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }
    tracing::info!("retry loop shutting down");
}
