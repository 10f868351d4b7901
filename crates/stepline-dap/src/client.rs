//! DAP client connection
//!
//! Owns the adapter's stdio pair and every piece of conversation state:
//! the sequence allocator, the lifecycle state machine, the capability
//! registry, the outbound queue, the inboxes, and the callback table.
//!
//! All of it is mutated from the single task driving the session; there is
//! no background reader. One tick drains whatever is sendable and performs
//! at most one bounded poll on the adapter's output.

use crate::callbacks::{CallbackKey, Callbacks};
use crate::capabilities::CapabilityRegistry;
use crate::command::{Command, EventKind};
use crate::error::{Error, Result};
use crate::inbox::{classify, Inbox, InboundFrame};
use crate::outbox::{Dependency, Outbox, PendingRequest, ResponseStatus, RetainedContext};
use crate::process::AdapterProcess;
use crate::protocol::{Event, InitializeRequestArguments};
use crate::state::{ConnectionState, Lifecycle};
use crate::wire::{write_frame_raw, FrameReader};
use std::time::Duration;
use stepline_config::AdapterSpawnConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

/// Monotonic 32-bit sequence counter. Overflow is a fatal protocol error,
/// unreachable in any real session.
#[derive(Debug)]
struct SequenceAllocator {
    next: u32,
}

impl SequenceAllocator {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn alloc(&mut self) -> Result<i64> {
        if self.next == u32::MAX {
            return Err(Error::Protocol("sequence counter overflow".to_string()));
        }
        let seq = i64::from(self.next);
        self.next += 1;
        Ok(seq)
    }
}

/// What `drain` did on one tick.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    /// Seqs written to the wire, in send order
    pub sent: Vec<i64>,
    /// Requests left in the queue, with the gate that deferred each
    pub deferred: Vec<(i64, Error)>,
}

/// A frame ingested by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestedFrame {
    /// A response was appended to the response inbox
    Response { request_seq: i64 },
    /// An event was appended to the event inbox; the copy is for the
    /// event handler, the inbox retains the original for correlation
    Event(Event),
    /// A reverse request was recognized; it is never enqueued
    ReverseRequest { command: String },
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The connection to one debug adapter.
pub struct DapClient {
    seq: SequenceAllocator,
    lifecycle: Lifecycle,
    capabilities: CapabilityRegistry,
    outbox: Outbox,
    inbox: Inbox,
    callbacks: Callbacks,
    reader: Option<FrameReader<BoxedReader>>,
    writer: Option<BoxedWriter>,
    process: Option<AdapterProcess>,
    initialize_enqueued: bool,
}

impl std::fmt::Debug for DapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapClient")
            .field("state", &self.lifecycle.state())
            .field("pending", &self.outbox.pending_len())
            .field("expected", &self.outbox.expected().len())
            .field("handled", &self.outbox.handled().len())
            .finish()
    }
}

impl Default for DapClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DapClient {
    pub fn new() -> Self {
        Self {
            seq: SequenceAllocator::new(),
            lifecycle: Lifecycle::new(),
            capabilities: CapabilityRegistry::default(),
            outbox: Outbox::new(),
            inbox: Inbox::new(),
            callbacks: Callbacks::new(),
            reader: None,
            writer: None,
            process: None,
            initialize_enqueued: false,
        }
    }

    // ------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------

    /// Spawn the adapter child process and take ownership of its stdio.
    pub fn spawn(&mut self, config: &AdapterSpawnConfig) -> Result<()> {
        if self.lifecycle.state() != ConnectionState::NotSpawned {
            return Err(Error::AdapterAlreadySpawned);
        }
        let (process, stdin, stdout) = AdapterProcess::spawn(config)?;
        self.reader = Some(FrameReader::new(Box::new(stdout) as BoxedReader));
        self.writer = Some(Box::new(stdin) as BoxedWriter);
        self.process = Some(process);
        self.lifecycle.spawn()
    }

    /// Attach to an already-connected stream pair instead of spawning a
    /// child (adapters reached over a socket, or tests).
    pub fn connect<R, W>(&mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        if self.lifecycle.state() != ConnectionState::NotSpawned {
            return Err(Error::AdapterAlreadySpawned);
        }
        self.reader = Some(FrameReader::new(Box::new(reader) as BoxedReader));
        self.writer = Some(Box::new(writer) as BoxedWriter);
        self.lifecycle.spawn()
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub(crate) fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    pub(crate) fn capabilities_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.capabilities
    }

    pub(crate) fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub(crate) fn inbox_mut(&mut self) -> &mut Inbox {
        &mut self.inbox
    }

    pub(crate) fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    /// Wait for the adapter process to exit; the connection resets to
    /// `NotSpawned` and all conversation state is dropped.
    pub async fn wait(&mut self) -> Result<i32> {
        let process = self.process.as_mut().ok_or(Error::AdapterNotSpawned)?;
        let code = process.wait().await?;
        self.reset_connection();
        Ok(code)
    }

    /// Kill the adapter process. Last resort for an unresponsive adapter.
    pub async fn kill(&mut self) -> Result<i32> {
        let process = self.process.as_mut().ok_or(Error::AdapterNotSpawned)?;
        process.kill().await?;
        let code = process.wait().await?;
        self.reset_connection();
        Ok(code)
    }

    fn reset_connection(&mut self) {
        self.process = None;
        self.reader = None;
        self.writer = None;
        self.outbox.reset();
        self.inbox.reset();
        self.capabilities = CapabilityRegistry::default();
        self.lifecycle.on_adapter_exit();
        self.initialize_enqueued = false;
        self.seq = SequenceAllocator::new();
    }

    // ------------------------------------------------------------
    // Enqueue
    // ------------------------------------------------------------

    /// Queue a request. Returns its seq for dependency chaining.
    ///
    /// The arguments are serialized here, once; the retained context is
    /// stored on the expected-response record, which outlives the request's
    /// serialized payload.
    pub fn enqueue(
        &mut self,
        command: Command,
        arguments: Option<serde_json::Value>,
        dependency: Dependency,
        context: RetainedContext,
    ) -> Result<i64> {
        if self.lifecycle.state() == ConnectionState::NotSpawned {
            return Err(Error::AdapterNotSpawned);
        }
        if command.is_reverse() {
            return Err(Error::AdapterDoesNotSupportRequest(command));
        }
        if command == Command::Initialize {
            if self.initialize_enqueued {
                return Err(Error::Protocol(
                    "only one initialize request per connection".to_string(),
                ));
            }
            self.initialize_enqueued = true;
        }

        let seq = self.seq.alloc()?;
        let request = PendingRequest::new(seq, command, dependency, arguments)?;
        debug!(seq, %command, ?dependency, "queued request");
        self.outbox.enqueue(request, context);
        Ok(seq)
    }

    /// Queue the initialize request, recording the declared client
    /// capabilities in the registry.
    pub fn enqueue_initialize(&mut self, arguments: &InitializeRequestArguments) -> Result<i64> {
        let value = serde_json::to_value(arguments)
            .map_err(|e| Error::Protocol(format!("failed to serialize initialize: {e}")))?;
        let seq = self.enqueue(
            Command::Initialize,
            Some(value),
            Dependency::None,
            RetainedContext::None,
        )?;
        self.capabilities.set_client(arguments);
        Ok(seq)
    }

    // ------------------------------------------------------------
    // Drain
    // ------------------------------------------------------------

    /// Walk the pending queue in insertion order and send every request
    /// whose dependency, state gate, and capability gate all pass.
    ///
    /// Deferred requests stay in place and are retried next tick. A wire
    /// write failure leaves the request queued and propagates.
    pub async fn drain(&mut self) -> Result<DrainOutcome> {
        let mut outcome = DrainOutcome::default();

        let mut index = 0;
        while index < self.outbox.pending_len() {
            let (seq, command, dependency) = {
                let request = self.outbox.pending_at(index).expect("index in range");
                (request.seq, request.command, request.dependency)
            };

            if !self
                .outbox
                .dependency_satisfied(&dependency, self.inbox.events_seen())
            {
                outcome
                    .deferred
                    .push((seq, Error::DependencyNotSatisfied(seq)));
                index += 1;
                continue;
            }
            if !self.lifecycle.permits(command) {
                outcome.deferred.push((
                    seq,
                    Error::AdapterNotDoneInitializing {
                        command,
                        state: self.lifecycle.state(),
                    },
                ));
                index += 1;
                continue;
            }
            if !self.capabilities.allows(command) {
                outcome
                    .deferred
                    .push((seq, Error::AdapterDoesNotSupportRequest(command)));
                index += 1;
                continue;
            }

            let writer = self.writer.as_mut().ok_or(Error::AdapterNotSpawned)?;
            let request = self.outbox.remove_pending(index).expect("index in range");
            match write_frame_raw(writer, request.payload()).await {
                Ok(()) => {
                    trace!(seq, %command, "sent request");
                    self.lifecycle.on_sent(command);
                    outcome.sent.push(seq);
                    // The next queued request moved into this index
                }
                Err(e) => {
                    warn!(seq, %command, error = %e, "send failed, request stays queued");
                    self.outbox.reinsert_pending(index, request);
                    return Err(e);
                }
            }
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------
    // Poll
    // ------------------------------------------------------------

    /// Perform one bounded poll and ingest the frame, if any.
    ///
    /// Responses and events are appended to their inboxes; reverse
    /// requests are recognized and dropped.
    pub async fn poll(&mut self, timeout: Duration) -> Result<Option<IngestedFrame>> {
        let reader = self.reader.as_mut().ok_or(Error::AdapterNotSpawned)?;
        let Some(value) = reader.poll_frame(timeout).await? else {
            return Ok(None);
        };

        match classify(value)? {
            InboundFrame::Response(response) => {
                let request_seq = response.request_seq;
                trace!(request_seq, command = %response.command, "ingested response");
                self.inbox.push_response(response);
                Ok(Some(IngestedFrame::Response { request_seq }))
            }
            InboundFrame::Event(event) => {
                trace!(event = %event.event, "ingested event");
                self.inbox.push_event(event.clone());
                Ok(Some(IngestedFrame::Event(event)))
            }
            InboundFrame::ReverseRequest(request) => {
                warn!(command = %request.command, "ignoring reverse request from adapter");
                Ok(Some(IngestedFrame::ReverseRequest {
                    command: request.command,
                }))
            }
        }
    }

    // ------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------

    /// Register a one-shot callback for a response to `command` handled
    /// with `status`. The callback receives the raw response.
    pub fn on_response<F>(&mut self, command: Command, status: ResponseStatus, action: F)
    where
        F: FnOnce(&serde_json::Value) + Send + 'static,
    {
        self.callbacks
            .register(CallbackKey::Response { command, status }, action);
    }

    /// Register a one-shot callback for an event of the given kind. The
    /// callback receives the raw event.
    pub fn on_event<F>(&mut self, kind: EventKind, action: F)
    where
        F: FnOnce(&serde_json::Value) + Send + 'static,
    {
        self.callbacks.register(CallbackKey::Event(kind), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ProtocolMessage, Response};
    use crate::wire::write_frame;
    use tokio::io::DuplexStream;

    fn connected_client() -> (DapClient, DuplexStream) {
        let (near, far) = tokio::io::duplex(16 * 1024);
        let (read_half, write_half) = tokio::io::split(near);
        let mut client = DapClient::new();
        client.connect(read_half, write_half).unwrap();
        (client, far)
    }

    async fn respond(far: &mut DuplexStream, seq: i64, request_seq: i64, command: &str) {
        let message = ProtocolMessage::Response(Response::ok(seq, request_seq, command, None));
        write_frame(far, &message).await.unwrap();
    }

    #[test]
    fn seqs_are_strictly_increasing() {
        let mut alloc = SequenceAllocator::new();
        let mut previous = 0;
        for _ in 0..100 {
            let seq = alloc.alloc().unwrap();
            assert!(seq > previous);
            previous = seq;
        }
    }

    #[test]
    fn seq_overflow_is_fatal() {
        let mut alloc = SequenceAllocator {
            next: u32::MAX,
        };
        assert!(matches!(alloc.alloc(), Err(Error::Protocol(_))));
    }

    #[test]
    fn enqueue_requires_spawned_adapter() {
        let mut client = DapClient::new();
        let result = client.enqueue(
            Command::Threads,
            None,
            Dependency::None,
            RetainedContext::None,
        );
        assert_eq!(result, Err(Error::AdapterNotSpawned));
    }

    #[test]
    fn reverse_requests_rejected_up_front() {
        let (mut client, _far) = connected_client();
        let result = client.enqueue(
            Command::RunInTerminal,
            None,
            Dependency::None,
            RetainedContext::None,
        );
        assert_eq!(
            result,
            Err(Error::AdapterDoesNotSupportRequest(Command::RunInTerminal))
        );
    }

    #[test]
    fn second_initialize_rejected() {
        let (mut client, _far) = connected_client();
        let args = InitializeRequestArguments {
            adapter_id: "test".to_string(),
            ..Default::default()
        };
        client.enqueue_initialize(&args).unwrap();
        let result = client.enqueue(
            Command::Initialize,
            None,
            Dependency::None,
            RetainedContext::None,
        );
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn drain_sends_initialize_and_defers_the_rest() {
        let (mut client, _far) = connected_client();
        let args = InitializeRequestArguments {
            adapter_id: "test".to_string(),
            ..Default::default()
        };
        let init_seq = client.enqueue_initialize(&args).unwrap();
        let launch_seq = client
            .enqueue(
                Command::Launch,
                Some(serde_json::json!({"program": "/tmp/a.out"})),
                Dependency::AfterSeq(init_seq),
                RetainedContext::None,
            )
            .unwrap();

        let outcome = client.drain().await.unwrap();
        assert_eq!(outcome.sent, vec![init_seq]);
        assert_eq!(outcome.deferred.len(), 1);
        assert_eq!(outcome.deferred[0].0, launch_seq);
        assert!(matches!(
            outcome.deferred[0].1,
            Error::DependencyNotSatisfied(_)
        ));
        assert_eq!(client.state(), ConnectionState::Initializing);
    }

    #[tokio::test]
    async fn drain_twice_without_new_messages_is_a_no_op() {
        let (mut client, _far) = connected_client();
        let args = InitializeRequestArguments {
            adapter_id: "test".to_string(),
            ..Default::default()
        };
        let init_seq = client.enqueue_initialize(&args).unwrap();
        client
            .enqueue(
                Command::Launch,
                None,
                Dependency::AfterSeq(init_seq),
                RetainedContext::None,
            )
            .unwrap();

        let first = client.drain().await.unwrap();
        assert_eq!(first.sent.len(), 1);
        let pending_after_first = client.outbox().pending_len();

        let second = client.drain().await.unwrap();
        assert!(second.sent.is_empty());
        assert_eq!(client.outbox().pending_len(), pending_after_first);
    }

    #[tokio::test]
    async fn unsatisfiable_dependency_stays_pending_forever() {
        let (mut client, _far) = connected_client();
        let args = InitializeRequestArguments {
            adapter_id: "test".to_string(),
            ..Default::default()
        };
        client.enqueue_initialize(&args).unwrap();
        // Seq 999 will never be handled
        let stuck = client
            .enqueue(
                Command::Threads,
                None,
                Dependency::AfterSeq(999),
                RetainedContext::None,
            )
            .unwrap();

        for _ in 0..3 {
            client.drain().await.unwrap();
        }
        assert_eq!(client.outbox().pending_len(), 1);
        assert_eq!(client.outbox().pending_at(0).unwrap().seq, stuck);
    }

    #[tokio::test]
    async fn exception_breakpoints_deferred_without_a_filter_choice() {
        let (mut client, _far) = connected_client();
        // Walk the lifecycle to a fully initialized session
        client.lifecycle_mut().on_sent(Command::Initialize);
        client.lifecycle_mut().on_response(Command::Initialize);
        client.lifecycle_mut().on_response(Command::Launch);

        let mut capabilities = crate::capabilities::AdapterCapabilities::default();
        capabilities.exception_breakpoint_filters = Some(vec![
            crate::capabilities::ExceptionBreakpointsFilter {
                filter: "raised".to_string(),
                label: "Raised".to_string(),
                description: None,
                default: false,
                supports_condition: None,
                condition_description: None,
            },
        ]);
        client.capabilities_mut().set_adapter(capabilities);

        let seq = client
            .enqueue(
                Command::SetExceptionBreakpoints,
                Some(serde_json::json!({"filters": ["raised"]})),
                Dependency::None,
                RetainedContext::None,
            )
            .unwrap();

        let outcome = client.drain().await.unwrap();
        assert!(outcome.sent.is_empty());
        assert!(outcome.deferred.iter().any(|(s, e)| {
            *s == seq
                && matches!(
                    e,
                    Error::AdapterDoesNotSupportRequest(Command::SetExceptionBreakpoints)
                )
        }));
        assert_eq!(client.outbox().pending_len(), 1);
    }

    #[tokio::test]
    async fn poll_ingests_responses_and_events() {
        let (mut client, mut far) = connected_client();

        respond(&mut far, 100, 1, "initialize").await;
        let frame = client.poll(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(frame, IngestedFrame::Response { request_seq: 1 });
        assert_eq!(client.inbox().response_len(), 1);

        let event = ProtocolMessage::Event(Event::emitted(101, "initialized", None));
        write_frame(&mut far, &event).await.unwrap();

        let frame = client.poll(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(matches!(frame, IngestedFrame::Event(_)));
        assert!(client.inbox().has_seen(EventKind::Initialized));
    }

    #[tokio::test]
    async fn poll_without_traffic_returns_none() {
        let (mut client, _far) = connected_client();
        let frame = client.poll(Duration::from_millis(10)).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn reverse_request_recognized_but_not_stored() {
        let (mut client, mut far) = connected_client();

        let reverse = ProtocolMessage::Request(crate::protocol::Request::outbound(
            1,
            "runInTerminal",
            Some(serde_json::json!({"args": ["/bin/sh"]})),
        ));
        write_frame(&mut far, &reverse).await.unwrap();

        let frame = client.poll(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(
            frame,
            IngestedFrame::ReverseRequest {
                command: "runInTerminal".to_string()
            }
        );
        assert_eq!(client.inbox().response_len(), 0);
        assert_eq!(client.inbox().event_len(), 0);
        assert_eq!(client.outbox().pending_len(), 0);
    }

    #[tokio::test]
    async fn spawn_wait_resets_to_not_spawned() {
        let mut client = DapClient::new();
        let config = AdapterSpawnConfig::new("sh").arg("-c").arg("exit 5");
        client.spawn(&config).unwrap();
        assert_eq!(client.state(), ConnectionState::Spawned);

        assert_eq!(client.spawn(&config), Err(Error::AdapterAlreadySpawned));

        let code = client.wait().await.unwrap();
        assert_eq!(code, 5);
        assert_eq!(client.state(), ConnectionState::NotSpawned);

        // A fresh connection may initialize again
        client.spawn(&config).unwrap();
        assert_eq!(client.state(), ConnectionState::Spawned);
    }
}
