//! Shared test harness: a scripted mock adapter on the far end of an
//! in-memory duplex pair.

use serde_json::Value;
use std::time::Duration;
use stepline_dap::protocol::Request;
use stepline_dap::wire::{write_frame_raw, FrameReader};
use stepline_dap::{Session, SessionConfig};
use tokio::io::{ReadHalf, WriteHalf};

pub const TICK: Duration = Duration::from_millis(20);

/// The adapter half of the conversation, driven explicitly by each test.
pub struct MockAdapter {
    reader: FrameReader<ReadHalf<tokio::io::DuplexStream>>,
    writer: WriteHalf<tokio::io::DuplexStream>,
    next_seq: i64,
}

/// A session connected to a fresh mock adapter.
pub fn connected_session() -> (Session, MockAdapter) {
    // Idempotent; RUST_LOG=trace shows the full wire conversation
    stepline_logging::init(
        stepline_logging::LogConfig::new()
            .default_level("warn")
            .output(stepline_logging::LogOutput::Stderr),
    );

    let (near, far) = tokio::io::duplex(64 * 1024);
    let (near_read, near_write) = tokio::io::split(near);
    let (far_read, far_write) = tokio::io::split(far);

    let mut session = Session::new(SessionConfig::new("mock"));
    session.connect(near_read, near_write).unwrap();

    let adapter = MockAdapter {
        reader: FrameReader::new(far_read),
        writer: far_write,
        next_seq: 1,
    };
    (session, adapter)
}

impl MockAdapter {
    fn alloc_seq(&mut self) -> i64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Read the next request off the wire, failing the test if none
    /// arrives within a second.
    pub async fn expect_request(&mut self) -> Request {
        let value = self
            .reader
            .poll_frame(Duration::from_secs(1))
            .await
            .expect("reading request frame")
            .expect("a request should have been sent");
        assert_eq!(value["type"], "request", "unexpected frame: {value}");
        serde_json::from_value(value).expect("request should deserialize")
    }

    /// True when nothing is waiting on the wire.
    pub async fn no_request(&mut self) -> bool {
        self.reader
            .poll_frame(Duration::from_millis(30))
            .await
            .expect("polling for absence of requests")
            .is_none()
    }

    /// Answer a request with `success: true` and an optional body.
    pub async fn respond(&mut self, request: &Request, body: Option<Value>) {
        let seq = self.alloc_seq();
        let mut message = serde_json::json!({
            "seq": seq,
            "type": "response",
            "request_seq": request.seq,
            "command": request.command,
            "success": true,
        });
        if let Some(body) = body {
            message["body"] = body;
        }
        self.send_raw(&message.to_string()).await;
    }

    /// Answer a request with `success: false`.
    pub async fn respond_error(&mut self, request: &Request, error: &str) {
        let seq = self.alloc_seq();
        let message = serde_json::json!({
            "seq": seq,
            "type": "response",
            "request_seq": request.seq,
            "command": request.command,
            "success": false,
            "message": error,
        });
        self.send_raw(&message.to_string()).await;
    }

    /// Emit an event.
    pub async fn send_event(&mut self, event: &str, body: Option<Value>) {
        let seq = self.alloc_seq();
        let mut message = serde_json::json!({
            "seq": seq,
            "type": "event",
            "event": event,
        });
        if let Some(body) = body {
            message["body"] = body;
        }
        self.send_raw(&message.to_string()).await;
    }

    /// Write raw bytes as a frame body.
    pub async fn send_raw(&mut self, json: &str) {
        write_frame_raw(&mut self.writer, json)
            .await
            .expect("writing to the session");
    }

    /// Write arbitrary bytes without framing, for protocol-violation tests.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;
        self.writer.write_all(bytes).await.expect("writing bytes");
        self.writer.flush().await.expect("flushing bytes");
    }

    /// Close the adapter's output stream.
    pub fn close(self) {
        drop(self.writer);
    }
}
