//! Outbound request queue
//!
//! Requests wait here until their dependency, the capability gate, and the
//! connection state all allow them onto the wire. Each request owns its
//! serialized envelope, built once at enqueue time and dropped when the
//! frame is written; the retained context is cloned into the expected-
//! response record, which lives until the matching response is handled.
//!
//! There is no timeout on unsatisfied dependencies: a dependency that can
//! never be satisfied shows up as a request that never leaves the queue.

use crate::command::{Command, EventKind};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolMessage, Request};
use std::collections::{HashSet, VecDeque};

/// What must happen before a pending request may be sent.
///
/// `AfterResponse` matches *any* handled response to the command, not a
/// specific seq. When several requests of the same command are in flight,
/// the first response handled satisfies the dependency; chain on
/// [`Dependency::AfterSeq`] when that is not what you want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Sendable immediately
    None,
    /// Sendable once the response to request seq S has been handled
    AfterSeq(i64),
    /// Sendable once any response to the command has been handled
    AfterResponse(Command),
    /// Sendable once the event has been observed
    AfterEvent(EventKind),
}

/// Follow-up work bound to a request, executed when its response arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RetainedContext {
    /// No follow-up
    #[default]
    None,
    /// Ingest frames into the thread's stack, optionally fan out
    StackTrace {
        thread_id: i64,
        fetch_scopes: bool,
        fetch_variables: bool,
    },
    /// Ingest scopes under their frame, optionally fan out
    Scopes { frame_id: i64, fetch_variables: bool },
    /// Ingest variables under their reference
    Variables { variables_reference: i64 },
    /// File the fetched content under the path or the reference
    Source {
        path: Option<String>,
        source_reference: i64,
    },
    /// After a step: optionally chain a stack-trace fetch, and flag the UI
    /// to follow the active line
    Next {
        thread_id: i64,
        fetch_stack_trace: bool,
        fetch_scopes: bool,
        fetch_variables: bool,
    },
}

/// Outcome of a handled response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// A request waiting to be sent. Owns its serialized envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub seq: i64,
    pub command: Command,
    pub dependency: Dependency,
    payload: String,
}

impl PendingRequest {
    /// Build a request, serializing the envelope once.
    pub fn new(
        seq: i64,
        command: Command,
        dependency: Dependency,
        arguments: Option<serde_json::Value>,
    ) -> Result<Self> {
        let request = Request::outbound(seq, command.as_str(), arguments);
        let payload = serde_json::to_string(&ProtocolMessage::Request(request))
            .map_err(|e| Error::Protocol(format!("failed to serialize request: {e}")))?;
        Ok(Self {
            seq,
            command,
            dependency,
            payload,
        })
    }

    /// The serialized envelope, ready for framing
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// The record kept from enqueue until the matching response is handled.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedResponse {
    pub request_seq: i64,
    pub command: Command,
    pub context: RetainedContext,
}

/// A handled response: the expected record plus how the adapter answered.
#[derive(Debug, Clone, PartialEq)]
pub struct HandledResponse {
    pub expected: ExpectedResponse,
    pub status: ResponseStatus,
}

/// Lifecycle phase of a request, for invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Queued, not yet written to the wire
    Pending,
    /// Written, awaiting its response
    Sent,
    /// Response handled
    Handled,
}

/// The outbound queue plus the expected/handled bookkeeping.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: VecDeque<PendingRequest>,
    expected: Vec<ExpectedResponse>,
    handled: Vec<HandledResponse>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and its expected-response record.
    pub fn enqueue(&mut self, request: PendingRequest, context: RetainedContext) {
        debug_assert!(
            self.phase(request.seq).is_none(),
            "seq {} already tracked",
            request.seq
        );
        self.expected.push(ExpectedResponse {
            request_seq: request.seq,
            command: request.command,
            context,
        });
        self.pending.push_back(request);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_at(&self, index: usize) -> Option<&PendingRequest> {
        self.pending.get(index)
    }

    /// Iterate queued requests in insertion order
    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.iter()
    }

    /// Remove a queued request for sending
    pub fn remove_pending(&mut self, index: usize) -> Option<PendingRequest> {
        self.pending.remove(index)
    }

    /// Put a request back where it was after a failed send
    pub fn reinsert_pending(&mut self, index: usize, request: PendingRequest) {
        self.pending.insert(index, request);
    }

    /// Whether a dependency allows sending, given the handled history and
    /// the events observed so far.
    pub fn dependency_satisfied(
        &self,
        dependency: &Dependency,
        events_seen: &HashSet<EventKind>,
    ) -> bool {
        match dependency {
            Dependency::None => true,
            Dependency::AfterSeq(seq) => self
                .handled
                .iter()
                .any(|h| h.expected.request_seq == *seq),
            Dependency::AfterResponse(command) => self
                .handled
                .iter()
                .any(|h| h.expected.command == *command),
            Dependency::AfterEvent(kind) => events_seen.contains(kind),
        }
    }

    /// Remove and return the expected record for a response
    pub fn take_expected(&mut self, request_seq: i64) -> Option<ExpectedResponse> {
        let index = self
            .expected
            .iter()
            .position(|e| e.request_seq == request_seq)?;
        Some(self.expected.remove(index))
    }

    pub fn expected(&self) -> &[ExpectedResponse] {
        &self.expected
    }

    /// Append to the handled-responses history
    pub fn record_handled(&mut self, handled: HandledResponse) {
        self.handled.push(handled);
    }

    pub fn handled(&self) -> &[HandledResponse] {
        &self.handled
    }

    pub fn handled_for(&self, request_seq: i64) -> Option<&HandledResponse> {
        self.handled
            .iter()
            .find(|h| h.expected.request_seq == request_seq)
    }

    /// Which phase a seq is in, if tracked at all. Every enqueued request
    /// is in exactly one phase at any time.
    pub fn phase(&self, seq: i64) -> Option<RequestPhase> {
        if self.pending.iter().any(|p| p.seq == seq) {
            Some(RequestPhase::Pending)
        } else if self.expected.iter().any(|e| e.request_seq == seq) {
            Some(RequestPhase::Sent)
        } else if self.handled.iter().any(|h| h.expected.request_seq == seq) {
            Some(RequestPhase::Handled)
        } else {
            None
        }
    }

    /// Drop all queue state (adapter exited, connection reset)
    pub fn reset(&mut self) {
        self.pending.clear();
        self.expected.clear();
        self.handled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(seq: i64, command: Command, dependency: Dependency) -> PendingRequest {
        PendingRequest::new(seq, command, dependency, None).unwrap()
    }

    #[test]
    fn payload_round_trips_through_the_wire_shape() {
        let pending = PendingRequest::new(
            7,
            Command::StackTrace,
            Dependency::None,
            Some(serde_json::json!({"threadId": 3, "levels": 20})),
        )
        .unwrap();

        let parsed: ProtocolMessage = serde_json::from_str(pending.payload()).unwrap();
        match parsed {
            ProtocolMessage::Request(req) => {
                assert_eq!(req.seq, 7);
                assert_eq!(req.command, "stackTrace");
                assert_eq!(req.arguments.unwrap()["threadId"], 3);
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn retained_context_deep_copy_preserves_equality() {
        let context = RetainedContext::Source {
            path: Some("/tmp/main.rs".to_string()),
            source_reference: 4,
        };
        let copy = context.clone();
        assert_eq!(copy, context);

        let context = RetainedContext::Next {
            thread_id: 3,
            fetch_stack_trace: true,
            fetch_scopes: false,
            fetch_variables: false,
        };
        assert_eq!(context.clone(), context);
    }

    #[test]
    fn dependency_none_always_satisfied() {
        let outbox = Outbox::new();
        assert!(outbox.dependency_satisfied(&Dependency::None, &HashSet::new()));
    }

    #[test]
    fn dependency_after_seq_needs_handled_response() {
        let mut outbox = Outbox::new();
        let events = HashSet::new();
        let dep = Dependency::AfterSeq(1);
        assert!(!outbox.dependency_satisfied(&dep, &events));

        outbox.enqueue(request(1, Command::Initialize, Dependency::None), RetainedContext::None);
        assert!(!outbox.dependency_satisfied(&dep, &events));

        // Sending alone does not satisfy it
        outbox.remove_pending(0).unwrap();
        assert!(!outbox.dependency_satisfied(&dep, &events));

        let expected = outbox.take_expected(1).unwrap();
        outbox.record_handled(HandledResponse {
            expected,
            status: ResponseStatus::Success,
        });
        assert!(outbox.dependency_satisfied(&dep, &events));
    }

    #[test]
    fn dependency_after_response_matches_any_seq_of_the_command() {
        let mut outbox = Outbox::new();
        outbox.enqueue(request(1, Command::Scopes, Dependency::None), RetainedContext::None);
        outbox.enqueue(request(2, Command::Scopes, Dependency::None), RetainedContext::None);
        outbox.remove_pending(0).unwrap();
        outbox.remove_pending(0).unwrap();

        let dep = Dependency::AfterResponse(Command::Scopes);
        assert!(!outbox.dependency_satisfied(&dep, &HashSet::new()));

        // Handling seq 2 first still satisfies the command-level dependency
        let expected = outbox.take_expected(2).unwrap();
        outbox.record_handled(HandledResponse {
            expected,
            status: ResponseStatus::Success,
        });
        assert!(outbox.dependency_satisfied(&dep, &HashSet::new()));
    }

    #[test]
    fn dependency_after_event_consults_observed_events() {
        let outbox = Outbox::new();
        let dep = Dependency::AfterEvent(EventKind::Initialized);

        let mut events = HashSet::new();
        assert!(!outbox.dependency_satisfied(&dep, &events));

        events.insert(EventKind::Initialized);
        assert!(outbox.dependency_satisfied(&dep, &events));
    }

    #[test]
    fn failed_response_also_satisfies_dependencies() {
        let mut outbox = Outbox::new();
        outbox.enqueue(request(5, Command::Launch, Dependency::None), RetainedContext::None);
        outbox.remove_pending(0).unwrap();
        let expected = outbox.take_expected(5).unwrap();
        outbox.record_handled(HandledResponse {
            expected,
            status: ResponseStatus::Failure,
        });

        assert!(outbox.dependency_satisfied(&Dependency::AfterSeq(5), &HashSet::new()));
    }

    #[test]
    fn phase_is_exactly_one_of_three() {
        let mut outbox = Outbox::new();
        assert_eq!(outbox.phase(9), None);

        outbox.enqueue(request(9, Command::Threads, Dependency::None), RetainedContext::None);
        assert_eq!(outbox.phase(9), Some(RequestPhase::Pending));

        outbox.remove_pending(0).unwrap();
        assert_eq!(outbox.phase(9), Some(RequestPhase::Sent));

        let expected = outbox.take_expected(9).unwrap();
        outbox.record_handled(HandledResponse {
            expected,
            status: ResponseStatus::Success,
        });
        assert_eq!(outbox.phase(9), Some(RequestPhase::Handled));
    }

    #[test]
    fn reinsert_preserves_queue_position() {
        let mut outbox = Outbox::new();
        outbox.enqueue(request(1, Command::Initialize, Dependency::None), RetainedContext::None);
        outbox.enqueue(request(2, Command::Launch, Dependency::AfterSeq(1)), RetainedContext::None);
        outbox.enqueue(request(3, Command::ConfigurationDone, Dependency::None), RetainedContext::None);

        let removed = outbox.remove_pending(1).unwrap();
        assert_eq!(removed.seq, 2);
        outbox.reinsert_pending(1, removed);

        let seqs: Vec<i64> = outbox.pending().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
