//! Parsing for the per-task retry back-off schedule carried in
//! `TaskRequest::time_interval`.

/// Errors parsing a `time_interval` string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("non-integer token {0:?} in retry schedule")]
    NotAnInteger(String),
}

/// Parse a space-separated list of non-negative integer seconds. An empty
/// or all-whitespace string parses to an empty schedule (no retry).
pub fn parse_schedule(time_interval: &str) -> Result<Vec<u64>, ScheduleError> {
    time_interval
        .split_whitespace()
        .map(|tok| {
            tok.parse::<u64>()
                .map_err(|_| ScheduleError::NotAnInteger(tok.to_string()))
        })
        .collect()
}

/// The delay, in seconds, for the retry at `index`, or `None` if the
/// schedule is exhausted.
pub fn delay_for(time_interval: &str, index: u32) -> Result<Option<u64>, ScheduleError> {
    let schedule = parse_schedule(time_interval)?;
    Ok(schedule.get(index as usize).copied())
}
