//! The wire framing between client and broker.
//!
//! ## Wire format
//!
//! ```text
//! byte 0:      frame type
//! byte 1..N:   a single JSON document (the rest of one logical read)
//! ```
//!
//! There is no length prefix: the client writes exactly one logical message
//! per write, and the server reads the type byte followed by whatever
//! follows up to a per-type maximum (enforced by the reader, not this
//! module — see `MAX_SUBMIT_BYTES` / `MAX_POLL_BYTES`).
//!
//! The wire name for [`crate::Reply`]'s result field is `message`, not
//! `result` — preserved for compatibility with the protocol this was ported
//! from, where the field was named inconsistently with what it carries.

use crate::types::{PollKey, TaskRequest};

/// Maximum submit-frame body size the broker will read, in bytes.
pub const MAX_SUBMIT_BYTES: usize = 1024;
/// Maximum poll-result-frame body size the broker will read, in bytes.
pub const MAX_POLL_BYTES: usize = 128;

/// The leading tag byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Submit = 1,
    PollResult = 2,
    Close = 3,
}

impl FrameType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameType::Submit),
            2 => Ok(FrameType::PollResult),
            3 => Ok(FrameType::Close),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Submit(TaskRequest),
    PollResult(PollKey),
    Close,
}

/// Errors during frame decode.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("unknown frame type byte {0:#04x}")]
    UnknownType(u8),
    #[error("frame body exceeds the maximum of {max} bytes ({actual} given)")]
    BodyTooLarge { max: usize, actual: usize },
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl Frame {
    /// Decode a frame from its tag byte and body. The body is already
    /// bounded by the caller per [`MAX_SUBMIT_BYTES`]/[`MAX_POLL_BYTES`];
    /// this function only parses what it is handed.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Frame, FrameError> {
        match FrameType::try_from(tag)? {
            FrameType::Submit => {
                let req: TaskRequest = serde_json::from_slice(body)?;
                Ok(Frame::Submit(req))
            }
            FrameType::PollResult => {
                let key: PollKey = serde_json::from_slice(body)?;
                Ok(Frame::PollResult(key))
            }
            FrameType::Close => Ok(Frame::Close),
        }
    }

    /// The tag byte this frame would be written with on the wire.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Submit(_) => FrameType::Submit,
            Frame::PollResult(_) => FrameType::PollResult,
            Frame::Close => FrameType::Close,
        }
    }

    /// Encode this frame as `(tag, body)`, as a client would write it.
    pub fn encode(&self) -> Result<(u8, Vec<u8>), FrameError> {
        let body = match self {
            Frame::Submit(req) => serde_json::to_vec(req)?,
            Frame::PollResult(key) => serde_json::to_vec(key)?,
            Frame::Close => Vec::new(),
        };
        Ok((self.frame_type().to_u8(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> TaskRequest {
        TaskRequest {
            uuid: "abc-123".into(),
            bin_name: "echo.sh".into(),
            args: "hi".into(),
            start_time: 0,
            time_interval: String::new(),
            index: 0,
        }
    }

    #[test]
    fn frame_type_roundtrip() {
        assert_eq!(FrameType::try_from(1).unwrap(), FrameType::Submit);
        assert_eq!(FrameType::try_from(2).unwrap(), FrameType::PollResult);
        assert_eq!(FrameType::try_from(3).unwrap(), FrameType::Close);
        assert!(FrameType::try_from(4).is_err());
        assert!(FrameType::try_from(0).is_err());
    }

    #[test]
    fn submit_roundtrip() {
        let frame = Frame::Submit(sample_request());
        let (tag, body) = frame.encode().unwrap();
        assert_eq!(tag, 1);
        let decoded = Frame::decode(tag, &body).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn poll_result_roundtrip() {
        let frame = Frame::PollResult(PollKey {
            key: "r_abc-123".into(),
        });
        let (tag, body) = frame.encode().unwrap();
        assert_eq!(tag, 2);
        let decoded = Frame::decode(tag, &body).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn close_roundtrip() {
        let frame = Frame::Close;
        let (tag, body) = frame.encode().unwrap();
        assert_eq!(tag, 3);
        assert!(body.is_empty());
        let decoded = Frame::decode(tag, &body).unwrap();
        assert_eq!(decoded, Frame::Close);
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(
            Frame::decode(9, b"{}"),
            Err(FrameError::UnknownType(9))
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(Frame::decode(1, b"not json"), Err(FrameError::Json(_))));
    }

    #[test]
    fn poll_key_extracts_uuid() {
        let key = PollKey {
            key: "r_abc-123".into(),
        };
        assert_eq!(key.uuid(), Some("abc-123"));

        let bad = PollKey {
            key: "not-a-result-key".into(),
        };
        assert_eq!(bad.uuid(), None);
    }
}
