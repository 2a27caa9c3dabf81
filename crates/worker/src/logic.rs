//! The worker's decision logic for a single consumed request, independent
//! of the loop and the process supervisor around it.

use std::path::Path;
use std::time::Duration;

use taskwheel_proto::{TaskRequest, TaskResult};
use taskwheel_store::StoreGateway;

use crate::path::resolve_bin_path;
use crate::process::run_with_timeout;

/// Take one request off the pending set and execute it, if any.
///
/// Returns `Ok(true)` when a request was taken (whether or not it
/// ultimately succeeded) and `Ok(false)` when the set was empty, matching
/// the broker's `retry_once` convention so the caller can decide whether
/// to back off before its next iteration.
pub async fn process_once<G: StoreGateway>(
    gateway: &G,
    bin_root: &Path,
    task_run_time: Duration,
    result_keep_time: u64,
) -> Result<bool, taskwheel_store::StoreError> {
    let Some(req) = gateway.take_request().await? else {
        return Ok(false);
    };

    let result = run_request(&req, bin_root, task_run_time).await;
    if let Err(err) = gateway.put_result(&result, result_keep_time).await {
        tracing::warn!(uuid = %req.uuid, error = %err, "failed to store task result");
        return Err(err);
    }

    Ok(true)
}

/// Resolve the request's binary and run it, producing the outcome to
/// store. Never fails — a missing binary or a spawn/timeout error is
/// itself recorded as a failed result, not propagated.
async fn run_request(req: &TaskRequest, bin_root: &Path, task_run_time: Duration) -> TaskResult {
    let Some(bin_path) = resolve_bin_path(bin_root, &req.bin_name) else {
        tracing::warn!(uuid = %req.uuid, bin_name = %req.bin_name, "refusing to resolve bin_name outside bin_path");
        return TaskResult {
            request: req.clone(),
            is_success: 0,
            result: "file not exist".into(),
        };
    };

    if !bin_path.exists() {
        tracing::warn!(uuid = %req.uuid, bin_path = %bin_path.display(), "task binary does not exist");
        return TaskResult {
            request: req.clone(),
            is_success: 0,
            result: "file not exist".into(),
        };
    }

    let outcome = run_with_timeout(&bin_path, &req.args, task_run_time).await;
    tracing::debug!(uuid = %req.uuid, is_success = outcome.is_success, "task executed");

    TaskResult {
        request: req.clone(),
        is_success: outcome.is_success,
        result: outcome.result,
    }
}
