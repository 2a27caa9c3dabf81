//! A thin client for the broker's TCP wire protocol.
//!
//! One connection, one request in flight at a time — matching the
//! protocol's assumption that each logical message is a single write
//! followed by a single read on both ends. Concurrent submitters should
//! open one connection each, or serialize access to a shared one.

mod error;

pub use error::ClientError;

use taskwheel_proto::{Frame, PollKey, Reply, StatusResult, TaskRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Read buffer for a single broker reply. Both `StatusResult` and `Reply`
/// JSON documents comfortably fit well inside this.
const MAX_REPLY_BYTES: usize = 4096;

pub struct BrokerClient {
    stream: TcpStream,
}

impl BrokerClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    /// Submit a task request, returning the broker's acceptance status.
    pub async fn submit(&mut self, req: &TaskRequest) -> Result<StatusResult, ClientError> {
        self.roundtrip(Frame::Submit(req.clone())).await
    }

    /// Poll for a task's result by uuid.
    pub async fn poll(&mut self, uuid: &str) -> Result<Reply, ClientError> {
        self.roundtrip(Frame::PollResult(PollKey {
            key: format!("r_{uuid}"),
        }))
        .await
    }

    /// Send the close frame and consume the connection. The broker will
    /// not reply to this frame — it simply drops the socket.
    pub async fn close(mut self) -> Result<(), ClientError> {
        let (tag, _) = Frame::Close.encode()?;
        self.stream.write_u8(tag).await?;
        Ok(())
    }

    async fn roundtrip<T: serde::de::DeserializeOwned>(&mut self, frame: Frame) -> Result<T, ClientError> {
        let (tag, body) = frame.encode()?;
        self.stream.write_u8(tag).await?;
        self.stream.write_all(&body).await?;

        let mut buf = vec![0u8; MAX_REPLY_BYTES];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(ClientError::UnexpectedEof);
        }
        Ok(serde_json::from_slice(&buf[..n])?)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Frame(taskwheel_proto::FrameError::Json(err))
    }
}
