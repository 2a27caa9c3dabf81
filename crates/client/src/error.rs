#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] taskwheel_proto::FrameError),
    #[error("broker closed the connection before replying")]
    UnexpectedEof,
}
