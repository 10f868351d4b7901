//! Inbound message classification and correlation
//!
//! Each frame read off the wire must be a JSON object whose `type` field is
//! `response`, `event`, or `request` (a reverse request); anything else is
//! an invalid message. Classified frames land in per-kind inboxes offering
//! correlation lookups by `request_seq` or event name.

use crate::command::EventKind;
use crate::error::{Error, Result};
use crate::protocol::{Event, Request, Response};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Response(Response),
    Event(Event),
    /// A request flowing adapter -> client (`runInTerminal`, `startDebugging`)
    ReverseRequest(Request),
}

/// Classify a raw frame.
pub fn classify(value: serde_json::Value) -> Result<InboundFrame> {
    let kind = value
        .as_object()
        .and_then(|obj| obj.get("type"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            Error::InvalidMessage("frame is not an object with a string `type` field".to_string())
        })?;

    match kind {
        "response" => {
            let response: Response = serde_json::from_value(value)?;
            Ok(InboundFrame::Response(response))
        }
        "event" => {
            let event: Event = serde_json::from_value(value)?;
            Ok(InboundFrame::Event(event))
        }
        "request" => {
            let request: Request = serde_json::from_value(value)?;
            Ok(InboundFrame::ReverseRequest(request))
        }
        other => Err(Error::InvalidMessage(format!(
            "unknown message type {other:?}"
        ))),
    }
}

/// Per-kind inboxes for classified frames.
#[derive(Debug, Default)]
pub struct Inbox {
    responses: VecDeque<Response>,
    events: VecDeque<Event>,
    events_seen: HashSet<EventKind>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response
    pub fn push_response(&mut self, response: Response) {
        self.responses.push_back(response);
    }

    /// Append an event and record its kind as observed.
    ///
    /// Unknown event names are kept in the inbox (they remain addressable
    /// by name or seq) but do not register in the seen-set that feeds
    /// dependency resolution.
    pub fn push_event(&mut self, event: Event) {
        match EventKind::parse(&event.event) {
            Some(kind) => {
                self.events_seen.insert(kind);
            }
            None => debug!(event = %event.event, "unknown event kind"),
        }
        self.events.push_back(event);
    }

    /// Remove and return the oldest queued response
    pub fn pop_response(&mut self) -> Option<Response> {
        self.responses.pop_front()
    }

    pub fn response_len(&self) -> usize {
        self.responses.len()
    }

    pub fn event_len(&self) -> usize {
        self.events.len()
    }

    /// Remove and return the first response correlated to `request_seq`
    pub fn take_response_by_seq(&mut self, request_seq: i64) -> Result<Response> {
        let index = self
            .responses
            .iter()
            .position(|r| r.request_seq == request_seq)
            .ok_or(Error::ResponseDoesNotExist(request_seq))?;
        Ok(self.responses.remove(index).expect("index just found"))
    }

    /// Remove and return the first event of the given kind
    pub fn take_event_by_kind(&mut self, kind: EventKind) -> Result<Event> {
        let index = self
            .events
            .iter()
            .position(|e| e.event == kind.as_str())
            .ok_or_else(|| Error::EventDoesNotExist(kind.as_str().to_string()))?;
        Ok(self.events.remove(index).expect("index just found"))
    }

    /// Remove and return the event with the given seq
    pub fn take_event_by_seq(&mut self, seq: i64) -> Result<Event> {
        let index = self
            .events
            .iter()
            .position(|e| e.seq == seq)
            .ok_or_else(|| Error::EventDoesNotExist(format!("seq {seq}")))?;
        Ok(self.events.remove(index).expect("index just found"))
    }

    /// Whether an event of this kind has ever been observed. Taking an
    /// event out of the inbox does not un-observe it.
    pub fn has_seen(&self, kind: EventKind) -> bool {
        self.events_seen.contains(&kind)
    }

    /// The set of observed event kinds, for dependency resolution
    pub fn events_seen(&self) -> &HashSet<EventKind> {
        &self.events_seen
    }

    /// Drop all inbox state (adapter exited, connection reset)
    pub fn reset(&mut self) {
        self.responses.clear();
        self.events.clear();
        self.events_seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_response() {
        let value = serde_json::json!({
            "seq": 10, "type": "response", "request_seq": 1,
            "command": "initialize", "success": true
        });
        match classify(value).unwrap() {
            InboundFrame::Response(r) => {
                assert_eq!(r.request_seq, 1);
                assert!(r.success);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn classify_event() {
        let value = serde_json::json!({"seq": 2, "type": "event", "event": "initialized"});
        match classify(value).unwrap() {
            InboundFrame::Event(e) => assert_eq!(e.event, "initialized"),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn classify_reverse_request() {
        let value = serde_json::json!({
            "seq": 3, "type": "request", "command": "runInTerminal",
            "arguments": {"args": ["/bin/sh"]}
        });
        match classify(value).unwrap() {
            InboundFrame::ReverseRequest(r) => assert_eq!(r.command, "runInTerminal"),
            other => panic!("expected reverse request, got {other:?}"),
        }
    }

    #[test]
    fn classify_rejects_non_objects_and_unknown_types() {
        assert!(matches!(
            classify(serde_json::json!([1, 2, 3])),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            classify(serde_json::json!({"type": 7})),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            classify(serde_json::json!({"type": "notification"})),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn take_response_by_seq_in_arrival_order() {
        let mut inbox = Inbox::new();
        inbox.push_response(Response::ok(10, 1, "initialize", None));
        inbox.push_response(Response::ok(11, 2, "launch", None));

        let taken = inbox.take_response_by_seq(2).unwrap();
        assert_eq!(taken.command, "launch");
        assert_eq!(inbox.response_len(), 1);

        assert_eq!(
            inbox.take_response_by_seq(2),
            Err(Error::ResponseDoesNotExist(2))
        );
    }

    #[test]
    fn take_event_by_kind_and_seq() {
        let mut inbox = Inbox::new();
        inbox.push_event(Event::emitted(5, "initialized", None));
        inbox.push_event(Event::emitted(6, "stopped", None));

        let initialized = inbox.take_event_by_kind(EventKind::Initialized).unwrap();
        assert_eq!(initialized.seq, 5);

        let stopped = inbox.take_event_by_seq(6).unwrap();
        assert_eq!(stopped.event, "stopped");

        assert!(matches!(
            inbox.take_event_by_kind(EventKind::Stopped),
            Err(Error::EventDoesNotExist(_))
        ));
    }

    #[test]
    fn seen_events_survive_being_taken() {
        let mut inbox = Inbox::new();
        inbox.push_event(Event::emitted(1, "initialized", None));
        assert!(inbox.has_seen(EventKind::Initialized));

        inbox.take_event_by_kind(EventKind::Initialized).unwrap();
        assert!(inbox.has_seen(EventKind::Initialized));
        assert!(!inbox.has_seen(EventKind::Stopped));
    }

    #[test]
    fn unknown_event_names_kept_but_not_seen() {
        let mut inbox = Inbox::new();
        inbox.push_event(Event::emitted(1, "customTelemetry", None));
        assert_eq!(inbox.event_len(), 1);
        assert!(inbox.events_seen().is_empty());
        assert!(inbox.take_event_by_seq(1).is_ok());
    }
}
