//! Wire codec
//!
//! Frames DAP messages on the adapter's streams: JSON preceded by one or
//! more `Content-Length: N\r\n` headers and a blank `\r\n` line.
//!
//! Reading is a bounded poll: [`FrameReader::poll_frame`] waits up to the
//! given timeout for data to appear, then reads the frame to completion.
//! The timeout only covers the idle wait, so a frame that has started
//! arriving is never torn in half by the deadline.
//!
//! Framing violations (malformed header, truncated body, non-UTF-8, bad
//! JSON) are [`Error::Protocol`] and terminate the session.

use crate::error::{Error, Result};
use crate::protocol::ProtocolMessage;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

/// Write one framed message to the adapter's input.
pub async fn write_frame<W>(writer: &mut W, message: &ProtocolMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)
        .map_err(|e| Error::Protocol(format!("failed to serialize message: {e}")))?;
    write_frame_raw(writer, &json).await
}

/// Write an already-serialized JSON body as one frame.
pub async fn write_frame_raw<W>(writer: &mut W, json: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await?;
    trace!(body = %json, "sent frame");
    Ok(())
}

/// Buffered frame reader over the adapter's output stream.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Poll for one frame.
    ///
    /// Returns `Ok(None)` when no data arrived within `timeout`. Once the
    /// first byte is available the whole frame is read without a deadline.
    /// A stream that closes cleanly between frames yields
    /// [`Error::Communication`]; a stream that closes inside a frame yields
    /// [`Error::Protocol`].
    pub async fn poll_frame(&mut self, timeout: Duration) -> Result<Option<serde_json::Value>> {
        let has_data = match tokio::time::timeout(timeout, self.reader.fill_buf()).await {
            Err(_elapsed) => return Ok(None),
            Ok(Ok(buf)) => !buf.is_empty(),
            Ok(Err(e)) => return Err(e.into()),
        };
        if !has_data {
            return Err(Error::Communication(
                "adapter closed its output stream".to_string(),
            ));
        }
        self.read_frame().await.map(Some)
    }

    /// Read one complete frame. Assumes at least one byte is available.
    async fn read_frame(&mut self) -> Result<serde_json::Value> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Err(Error::Protocol(
                    "stream closed inside frame header".to_string(),
                ));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                // Blank line terminates the header block
                break;
            }

            if let Some(value) = line.strip_prefix("Content-Length:") {
                let value = value.trim();
                content_length = Some(value.parse().map_err(|_| {
                    Error::Protocol(format!("invalid Content-Length: {value:?}"))
                })?);
            } else if !line.contains(':') {
                return Err(Error::Protocol(format!("malformed header line: {line:?}")));
            }
            // Unknown well-formed headers are tolerated and skipped
        }

        let length = content_length
            .ok_or_else(|| Error::Protocol("missing Content-Length header".to_string()))?;

        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Protocol(format!(
                    "frame body truncated: expected {length} bytes"
                ))
            } else {
                Error::Communication(e.to_string())
            }
        })?;

        let text = String::from_utf8(body)?;
        trace!(body = %text, "received frame");

        serde_json::from_str(&text)
            .map_err(|e| Error::Protocol(format!("frame body is not valid JSON: {e}")))
    }
}
