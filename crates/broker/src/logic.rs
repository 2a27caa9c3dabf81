//! The broker's decision logic, independent of the TCP framing around it.
//!
//! Kept separate from `connection.rs` and `retry.rs` so it can be driven
//! directly in tests against a [`FakeGateway`](taskwheel_store::fake::FakeGateway),
//! with no socket in the loop.

use std::sync::Arc;
use std::time::Duration;

use taskwheel_proto::{parse_schedule, PollKey, Reply, StatusResult, TaskRequest};
use taskwheel_store::StoreGateway;
use taskwheel_timer::Wheel;

/// Current wall-clock time as Unix seconds.
pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs() as i64
}

/// Handle one `submit` frame: either write the request immediately or park
/// it on the wheel for later, per `start_time`.
///
/// A submit always replies OK once *accepted* — acceptance is not
/// execution. The only rejection path is a store error on the immediate
/// (non-deferred) write.
pub async fn handle_submit<G: StoreGateway + 'static>(
    gateway: &Arc<G>,
    wheel: &Wheel,
    mut req: TaskRequest,
) -> StatusResult {
    let now = now_unix();
    if req.start_time == 0 {
        req.start_time = now;
    }

    if req.start_time <= now {
        match gateway.put_request(&req).await {
            Ok(()) => StatusResult::ok(),
            Err(err) => {
                tracing::warn!(uuid = %req.uuid, error = %err, "failed to store submitted request");
                StatusResult::error(err.to_string())
            }
        }
    } else {
        let delay = Duration::from_secs((req.start_time - now) as u64);
        let gateway = Arc::clone(gateway);
        let uuid = req.uuid.clone();
        wheel.schedule(delay, move || async move {
            if let Err(err) = gateway.put_request(&req).await {
                tracing::warn!(uuid = %req.uuid, error = %err, "failed to store deferred request");
            }
            Ok(())
        });
        tracing::debug!(uuid = %uuid, delay_secs = delay.as_secs(), "submit deferred to wheel");
        StatusResult::ok()
    }
}

/// Handle one `poll-result` frame.
pub async fn handle_poll<G: StoreGateway>(gateway: &G, key: &PollKey) -> Reply {
    let Some(uuid) = key.uuid() else {
        tracing::debug!(key = %key.key, "poll-result key does not look like a result key");
        return Reply::not_present();
    };
    match gateway.get_result_for_client(uuid).await {
        Ok(Some((is_success, result))) => Reply::found(is_success, result),
        Ok(None) => Reply::not_present(),
        Err(err) => {
            tracing::warn!(uuid = %uuid, error = %err, "failed to read result for client poll");
            Reply::not_present()
        }
    }
}

/// Drain one entry from the fail set and either reschedule it per its
/// retry policy or drop it. Returns whether there was work to do, so the
/// caller knows whether to back off before the next call.
pub async fn retry_once<G: StoreGateway + 'static>(
    gateway: &Arc<G>,
    wheel: &Wheel,
) -> Result<bool, taskwheel_store::StoreError> {
    let Some(mut req) = gateway.take_fail().await? else {
        return Ok(false);
    };

    if req.time_interval.trim().is_empty() {
        tracing::debug!(uuid = %req.uuid, "failed task has no retry schedule, dropping");
        return Ok(true);
    }

    let schedule = match parse_schedule(&req.time_interval) {
        Ok(schedule) => schedule,
        Err(err) => {
            tracing::warn!(uuid = %req.uuid, error = %err, "unparseable retry schedule, dropping");
            return Ok(true);
        }
    };

    let next_index = req.index + 1;
    match schedule.get(next_index as usize) {
        Some(delay_secs) => {
            req.index = next_index;
            let delay = Duration::from_secs(*delay_secs);
            let gateway = Arc::clone(gateway);
            let uuid = req.uuid.clone();
            wheel.schedule(delay, move || async move {
                if let Err(err) = gateway.put_request(&req).await {
                    tracing::warn!(uuid = %req.uuid, error = %err, "failed to store retried request");
                }
                Ok(())
            });
            tracing::debug!(uuid = %uuid, delay_secs = delay.as_secs(), index = next_index, "retry scheduled");
        }
        None => {
            tracing::warn!(uuid = %req.uuid, "max retries reached, dropping task");
        }
    }

    Ok(true)
}
