//! Wire and store data model: the records that flow between client, broker,
//! worker and the store gateway.

use serde::{Deserialize, Serialize};

/// A submission record: "run `bin_name args` at `start_time`, and if it
/// fails, retry per `time_interval`".
///
/// `uuid` is generated by the client and stays stable across retries — it
/// is the key under which every store record for this task is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub uuid: String,
    pub bin_name: String,
    #[serde(default)]
    pub args: String,
    /// Absolute Unix seconds. `0` means "now".
    pub start_time: i64,
    /// Space-separated non-negative integers, the retry back-off schedule
    /// in seconds. Empty means no retry.
    #[serde(default)]
    pub time_interval: String,
    /// 0-based position in `time_interval` already consumed by prior
    /// retries.
    #[serde(default)]
    pub index: u32,
}

/// The execution outcome, embedding the originating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(flatten)]
    pub request: TaskRequest,
    /// `1` if the process exited zero with empty stderr, `0` otherwise.
    pub is_success: u8,
    /// On success, trimmed stdout. On failure, trimmed stderr, or a
    /// timeout/spawn-error message.
    pub result: String,
}

/// The client-visible view of a poll-result request.
///
/// The wire field is named `message`, not `result` — a historical name
/// from the upstream protocol kept here only at the serialization
/// boundary; see the module docs on `taskwheel-proto::frame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub is_result_exist: u8,
    pub is_success: u8,
    #[serde(rename = "message")]
    pub result: String,
}

impl Reply {
    /// The reply for a uuid with no stored result yet.
    pub fn not_present() -> Self {
        Self {
            is_result_exist: 0,
            is_success: 0,
            result: String::new(),
        }
    }

    pub fn found(is_success: u8, result: String) -> Self {
        Self {
            is_result_exist: 1,
            is_success,
            result,
        }
    }
}

/// The client-visible acknowledgement to a submit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: u8,
    pub message: String,
}

impl StatusResult {
    pub fn ok() -> Self {
        Self {
            status: 0,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: 1,
            message: message.into(),
        }
    }
}

/// The payload of a poll-result (type 2) request: `{"key": "r_<uuid>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollKey {
    pub key: String,
}

impl PollKey {
    /// Extract the bare uuid from a `r_<uuid>` key, if it has that shape.
    pub fn uuid(&self) -> Option<&str> {
        self.key.strip_prefix("r_")
    }
}
