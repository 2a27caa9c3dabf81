//! Typed encode/decode between [`TaskRequest`]/[`TaskResult`] and the flat
//! field sets the store holds them as.
//!
//! The store itself only knows `HMGET`-style positional lists of
//! nullable strings — this module is the boundary that turns those into
//! (or rejects them as not being) real records, per the contract that no
//! untyped list should escape the gateway.

use taskwheel_proto::{TaskRequest, TaskResult};

use crate::StoreError;

/// Field order used for `HMSET`/`HMGET` against a `t_<uuid>` hash.
pub const REQUEST_FIELDS: [&str; 6] = ["uuid", "bin_name", "args", "start_time", "time_interval", "index"];

/// Field order used for `HMSET`/`HMGET` against a `r_<uuid>` hash: the
/// request fields plus the outcome.
pub const RESULT_FIELDS: [&str; 8] = [
    "uuid",
    "bin_name",
    "args",
    "start_time",
    "time_interval",
    "index",
    "is_success",
    "result",
];

pub fn request_to_fields(req: &TaskRequest) -> Vec<(&'static str, String)> {
    vec![
        ("uuid", req.uuid.clone()),
        ("bin_name", req.bin_name.clone()),
        ("args", req.args.clone()),
        ("start_time", req.start_time.to_string()),
        ("time_interval", req.time_interval.clone()),
        ("index", req.index.to_string()),
    ]
}

pub fn result_to_fields(result: &TaskResult) -> Vec<(&'static str, String)> {
    let mut fields = request_to_fields(&result.request);
    fields.push(("is_success", result.is_success.to_string()));
    fields.push(("result", result.result.clone()));
    fields
}

/// Decode a positional `HMGET` reply for [`REQUEST_FIELDS`] into a
/// [`TaskRequest`]. `None` entries anywhere mean the hash did not exist (or
/// expired between the set-pop and the read) — callers treat that as "no
/// record", not as a decode failure.
pub fn decode_request(values: &[Option<String>]) -> Result<Option<TaskRequest>, StoreError> {
    if values.len() != REQUEST_FIELDS.len() {
        return Err(StoreError::InvalidRecord(format!(
            "expected {} fields, got {}",
            REQUEST_FIELDS.len(),
            values.len()
        )));
    }
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    let get = |i: usize| -> Result<&str, StoreError> {
        values[i]
            .as_deref()
            .ok_or_else(|| StoreError::InvalidRecord(format!("missing field {}", REQUEST_FIELDS[i])))
    };
    let start_time: i64 = get(3)?
        .parse()
        .map_err(|_| StoreError::InvalidRecord("start_time is not an integer".into()))?;
    let index: u32 = get(5)?
        .parse()
        .map_err(|_| StoreError::InvalidRecord("index is not an integer".into()))?;
    Ok(Some(TaskRequest {
        uuid: get(0)?.to_string(),
        bin_name: get(1)?.to_string(),
        args: get(2)?.to_string(),
        start_time,
        time_interval: get(4)?.to_string(),
        index,
    }))
}

/// Decode a positional `HMGET` reply for [`RESULT_FIELDS`] into a
/// `(TaskRequest, is_success, result)` triple.
pub fn decode_result(
    values: &[Option<String>],
) -> Result<Option<(TaskRequest, u8, String)>, StoreError> {
    if values.len() != RESULT_FIELDS.len() {
        return Err(StoreError::InvalidRecord(format!(
            "expected {} fields, got {}",
            RESULT_FIELDS.len(),
            values.len()
        )));
    }
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    let request = match decode_request(&values[0..6])? {
        Some(r) => r,
        None => return Ok(None),
    };
    let is_success: u8 = values[6]
        .as_deref()
        .ok_or_else(|| StoreError::InvalidRecord("missing field is_success".into()))?
        .parse()
        .map_err(|_| StoreError::InvalidRecord("is_success is not an integer".into()))?;
    let result = values[7]
        .as_deref()
        .ok_or_else(|| StoreError::InvalidRecord("missing field result".into()))?
        .to_string();
    Ok(Some((request, is_success, result)))
}
