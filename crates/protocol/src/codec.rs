//! Newline-delimited framing on top of `tokio_util::codec::LinesCodec`.
//!
//! A line longer than [`MAX_FRAME_BYTES`] is a fatal stream error; a line
//! that is not valid JSON-RPC is reported as [`ProtocolError::Malformed`]
//! and the stream stays usable.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::error::ProtocolError;
use crate::message::Frame;

/// Upper bound for a single frame, newline excluded.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

pub type FrameReader<R> = FramedRead<R, LinesCodec>;
pub type FrameWriter<W> = FramedWrite<W, LinesCodec>;

pub fn reader<R: AsyncRead>(inner: R) -> FrameReader<R> {
    FramedRead::new(inner, LinesCodec::new_with_max_length(MAX_FRAME_BYTES))
}

pub fn writer<W: AsyncWrite>(inner: W) -> FrameWriter<W> {
    FramedWrite::new(inner, LinesCodec::new_with_max_length(MAX_FRAME_BYTES))
}

/// Read the next frame, skipping blank lines. `None` means the peer hung up.
pub async fn next_frame<R>(reader: &mut FrameReader<R>) -> Option<Result<Frame, ProtocolError>>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match reader.next().await? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        if line.trim().is_empty() {
            continue;
        }
        return Some(
            serde_json::from_str::<Frame>(&line).map_err(|e| ProtocolError::Malformed(e.to_string())),
        );
    }
}

/// Serialize one frame and write it followed by a newline.
pub async fn send_frame<W>(writer: &mut FrameWriter<W>, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if line.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLong {
            max: MAX_FRAME_BYTES,
        });
    }
    writer.send(line).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Request, Response, methods};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn frames_cross_a_duplex_pipe() {
        let (a, b) = tokio::io::duplex(4096);
        let mut w = writer(a);
        let mut r = reader(b);

        let req = Frame::Request(Request::new(1, methods::PING, serde_json::json!({})).unwrap());
        send_frame(&mut w, &req).await.unwrap();
        send_frame(&mut w, &Frame::Response(Response::success(1, "pong")))
            .await
            .unwrap();

        assert_eq!(next_frame(&mut r).await.unwrap().unwrap(), req);
        assert!(matches!(
            next_frame(&mut r).await.unwrap().unwrap(),
            Frame::Response(resp) if resp.id == Some(1)
        ));
    }

    #[tokio::test]
    async fn garbage_line_does_not_end_the_stream() {
        let (mut a, b) = tokio::io::duplex(4096);
        let mut r = reader(b);

        a.write_all(b"not json\n\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        drop(a);

        assert!(matches!(
            next_frame(&mut r).await.unwrap(),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            next_frame(&mut r).await.unwrap().unwrap(),
            Frame::Request(req) if req.id == 2
        ));
        assert!(next_frame(&mut r).await.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_on_send() {
        let (a, _b) = tokio::io::duplex(64);
        let mut w = writer(a);
        let huge = "x".repeat(MAX_FRAME_BYTES + 1);
        let frame = Frame::Response(Response::success(1, huge));
        assert!(matches!(
            send_frame(&mut w, &frame).await,
            Err(ProtocolError::FrameTooLong { .. })
        ));
    }
}
