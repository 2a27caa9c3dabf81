//! Wire types and framing for the task queue's client/broker protocol.
//!
//! This crate has no I/O of its own — it only knows how to parse and
//! build the bytes that cross the wire. The broker and client crates own
//! the actual socket reads/writes.

mod frame;
mod schedule;
mod types;

pub use frame::{Frame, FrameError, FrameType, MAX_POLL_BYTES, MAX_SUBMIT_BYTES};
pub use schedule::{delay_for, parse_schedule, ScheduleError};
pub use types::{PollKey, Reply, StatusResult, TaskRequest, TaskResult};
