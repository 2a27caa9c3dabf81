//! Per-connection frame loop: read a tag byte, read its body, dispatch,
//! reply.

use std::sync::Arc;

use taskwheel_proto::{Frame, FrameType, MAX_POLL_BYTES, MAX_SUBMIT_BYTES};
use taskwheel_store::StoreGateway;
use taskwheel_timer::Wheel;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::logic::{handle_poll, handle_submit};

/// Drive one client connection until it sends `close`, disconnects, or
/// sends an unrecognized type byte (which also closes the connection).
///
/// A single connection may carry many submit/poll-result messages; each is
/// handled and replied to in wire order before the next is read.
pub async fn handle_connection<G: StoreGateway + 'static>(
    mut stream: TcpStream,
    gateway: Arc<G>,
    wheel: Wheel,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    loop {
        let tag = match stream.read_u8().await {
            Ok(tag) => tag,
            Err(_) => break, // peer went away
        };

        let frame_type = match FrameType::try_from(tag) {
            Ok(ft) => ft,
            Err(err) => {
                tracing::warn!(peer = %peer, error = %err, "unknown frame type, closing connection");
                break;
            }
        };

        let max_body = match frame_type {
            FrameType::Submit => MAX_SUBMIT_BYTES,
            FrameType::PollResult => MAX_POLL_BYTES,
            FrameType::Close => 0,
        };

        let mut body = vec![0u8; max_body];
        let n = if max_body == 0 {
            0
        } else {
            match stream.read(&mut body).await {
                Ok(0) => break, // peer closed mid-frame
                Ok(n) => n,
                Err(err) => {
                    tracing::warn!(peer = %peer, error = %err, "read error, closing connection");
                    break;
                }
            }
        };

        let frame = match Frame::decode(tag, &body[..n]) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(peer = %peer, error = %err, "malformed frame body");
                let status = taskwheel_proto::StatusResult::error(err.to_string());
                let _ = write_json(&mut stream, &status).await;
                continue;
            }
        };

        match frame {
            Frame::Submit(req) => {
                let status = handle_submit(&gateway, &wheel, req).await;
                if write_json(&mut stream, &status).await.is_err() {
                    break;
                }
            }
            Frame::PollResult(key) => {
                let reply = handle_poll(gateway.as_ref(), &key).await;
                if write_json(&mut stream, &reply).await.is_err() {
                    break;
                }
            }
            Frame::Close => break,
        }
    }
}

async fn write_json<T: serde::Serialize>(stream: &mut TcpStream, value: &T) -> std::io::Result<()> {
    let body = serde_json::to_vec(value)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    stream.write_all(&body).await
}
