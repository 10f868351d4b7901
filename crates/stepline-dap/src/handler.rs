//! Response and event handling
//!
//! Matched responses are validated against their expected record, decoded
//! into the statically expected body, applied to the data store, and moved
//! into the handled-responses history; the retained context then decides
//! what follow-up requests to queue. Events mutate the store and the state
//! machine directly.
//!
//! Response bodies the engine ingests are decoded strictly: a schema
//! violation is an error. Event bodies are advisory and decoded leniently,
//! since adapters vary in what they attach.

use crate::callbacks::CallbackKey;
use crate::command::{Command, EventKind};
use crate::error::{Error, Result};
use crate::inbox::InboundFrame;
use crate::outbox::{Dependency, HandledResponse, ResponseStatus, RetainedContext};
use crate::protocol::{
    BreakpointEventBody, ContinuedEventBody, ContinueResponseBody, Event, ExitedEventBody,
    LoadedSourceEventBody, ModuleEventBody, OutputEventBody, Response, ScopesArguments,
    ScopesResponseBody, SetBreakpointsResponseBody, SourceResponseBody, StackTraceArguments,
    StackTraceResponseBody, StoppedEventBody, ThreadEventBody, ThreadsResponseBody,
    VariablesArguments, VariablesResponseBody,
};
use crate::session::Session;
use crate::store::SourceKey;
use tracing::{debug, info, warn};

impl Session {
    /// Handle every response currently queued in the response inbox.
    pub(crate) fn process_response_inbox(&mut self) -> Result<()> {
        while let Some(response) = self.client_mut().inbox_mut().pop_response() {
            self.handle_response(response)?;
        }
        Ok(())
    }

    /// Dispatch one ingested frame.
    pub(crate) fn dispatch(&mut self, frame: crate::client::IngestedFrame) -> Result<()> {
        match frame {
            crate::client::IngestedFrame::Response { .. } => self.process_response_inbox(),
            crate::client::IngestedFrame::Event(event) => self.handle_event(event),
            // Logged at ingest; nothing to queue
            crate::client::IngestedFrame::ReverseRequest { .. } => Ok(()),
        }
    }

    /// Handle one raw frame that bypassed the inbox (used by tests)
    #[allow(dead_code)]
    pub(crate) fn handle_frame(&mut self, frame: InboundFrame) -> Result<()> {
        match frame {
            InboundFrame::Response(response) => self.handle_response(response),
            InboundFrame::Event(event) => self.handle_event(event),
            InboundFrame::ReverseRequest(_) => Ok(()),
        }
    }

    // ------------------------------------------------------------
    // Responses
    // ------------------------------------------------------------

    /// Validate, decode, apply, and retire one response.
    pub(crate) fn handle_response(&mut self, response: Response) -> Result<()> {
        let expected = self
            .client_mut()
            .outbox_mut()
            .take_expected(response.request_seq)
            .ok_or_else(|| {
                Error::RequestResponseMismatch(format!(
                    "no in-flight request with seq {}",
                    response.request_seq
                ))
            })?;

        if Command::parse(&response.command) != Some(expected.command) {
            return Err(Error::RequestResponseMismatch(format!(
                "response to seq {} names `{}`, request was `{}`",
                response.request_seq, response.command, expected.command
            )));
        }

        let status = if response.success {
            ResponseStatus::Success
        } else {
            ResponseStatus::Failure
        };

        let raw = serde_json::to_value(&response)
            .map_err(|e| Error::Protocol(format!("failed to re-serialize response: {e}")))?;
        self.client_mut().callbacks_mut().fire(
            CallbackKey::Response {
                command: expected.command,
                status,
            },
            &raw,
        );

        if !response.success {
            let failure = Error::RequestFailed {
                command: expected.command,
                request_seq: response.request_seq,
                message: response
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            };
            warn!(%failure, "adapter rejected a request");
            // Surface the failure in the console; the connection stays in
            // its last good state
            self.store_mut()
                .push_output(Some("console".to_string()), format!("{failure}\n"));
            self.client_mut()
                .outbox_mut()
                .record_handled(HandledResponse { expected, status });
            return Ok(());
        }

        match expected.command {
            Command::Initialize => {
                let capabilities = match &response.body {
                    Some(body) => serde_json::from_value(body.clone())?,
                    None => Default::default(),
                };
                self.client_mut().capabilities_mut().set_adapter(capabilities);
                let state = self.client_mut().lifecycle_mut().on_response(Command::Initialize);
                debug!(?state, "initialize response handled");
            }
            Command::Launch | Command::Attach | Command::Disconnect => {
                let state = self.client_mut().lifecycle_mut().on_response(expected.command);
                info!(command = %expected.command, ?state, "session transition");
            }
            _ => {}
        }

        self.apply_response(&expected.command, &expected.context, &response)?;

        self.client_mut()
            .outbox_mut()
            .record_handled(HandledResponse { expected, status });
        Ok(())
    }

    /// Ingest a successful response's body and run the retained context.
    fn apply_response(
        &mut self,
        command: &Command,
        context: &RetainedContext,
        response: &Response,
    ) -> Result<()> {
        match command {
            Command::Threads => {
                let body: ThreadsResponseBody = decode_body(response)?;
                self.store_mut().set_threads(body.threads);
            }
            Command::StackTrace => {
                let body: StackTraceResponseBody = decode_body(response)?;
                let RetainedContext::StackTrace {
                    thread_id,
                    fetch_scopes,
                    fetch_variables,
                } = *context
                else {
                    debug!("stackTrace response without retained thread, body dropped");
                    return Ok(());
                };

                if fetch_scopes {
                    for frame in &body.stack_frames {
                        let arguments = ScopesArguments { frame_id: frame.id };
                        self.client_mut().enqueue(
                            Command::Scopes,
                            Some(serde_json::to_value(arguments)?),
                            Dependency::None,
                            RetainedContext::Scopes {
                                frame_id: frame.id,
                                fetch_variables,
                            },
                        )?;
                    }
                }
                self.store_mut().set_stack(thread_id, body.stack_frames);
            }
            Command::Scopes => {
                let body: ScopesResponseBody = decode_body(response)?;
                let RetainedContext::Scopes {
                    frame_id,
                    fetch_variables,
                } = *context
                else {
                    debug!("scopes response without retained frame, body dropped");
                    return Ok(());
                };

                if fetch_variables {
                    for scope in &body.scopes {
                        let arguments = VariablesArguments {
                            variables_reference: scope.variables_reference,
                            filter: None,
                            start: None,
                            count: None,
                        };
                        self.client_mut().enqueue(
                            Command::Variables,
                            Some(serde_json::to_value(arguments)?),
                            Dependency::None,
                            RetainedContext::Variables {
                                variables_reference: scope.variables_reference,
                            },
                        )?;
                    }
                }
                self.store_mut().set_scopes(frame_id, body.scopes);
            }
            Command::Variables => {
                let body: VariablesResponseBody = decode_body(response)?;
                if let RetainedContext::Variables {
                    variables_reference,
                } = *context
                {
                    self.store_mut()
                        .set_variables(variables_reference, body.variables);
                }
            }
            Command::Source => {
                let body: SourceResponseBody = decode_body(response)?;
                if let RetainedContext::Source {
                    path,
                    source_reference,
                } = context
                {
                    let key = match path {
                        Some(path) => SourceKey::Path(path.clone()),
                        None => SourceKey::Reference(*source_reference),
                    };
                    self.store_mut().set_source_content(key, body.content);
                }
            }
            Command::Next | Command::StepIn | Command::StepOut => {
                if let RetainedContext::Next {
                    thread_id,
                    fetch_stack_trace,
                    fetch_scopes,
                    fetch_variables,
                } = *context
                {
                    if fetch_stack_trace {
                        let arguments = StackTraceArguments {
                            thread_id,
                            start_frame: None,
                            levels: None,
                        };
                        self.client_mut().enqueue(
                            Command::StackTrace,
                            Some(serde_json::to_value(arguments)?),
                            Dependency::None,
                            RetainedContext::StackTrace {
                                thread_id,
                                fetch_scopes,
                                fetch_variables,
                            },
                        )?;
                    }
                    // The active line moved; tell the UI to follow
                    self.store_mut().request_scroll_to_active_line();
                    self.store_mut().request_refresh_active_source();
                }
            }
            Command::Continue => {
                let body: ContinueResponseBody = match &response.body {
                    Some(body) => serde_json::from_value(body.clone())?,
                    None => ContinueResponseBody {
                        all_threads_continued: None,
                    },
                };
                // Absent means "all threads continued" per the DAP schema
                if body.all_threads_continued != Some(false) {
                    self.store_mut().mark_continued(None, true);
                }
                self.store_mut().invalidate_frame_data();
            }
            Command::SetBreakpoints => {
                let body: SetBreakpointsResponseBody = decode_body(response)?;
                self.store_mut().set_breakpoints(body.breakpoints);
            }
            // Everything else is surfaced through callbacks and history
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Events
    // ------------------------------------------------------------

    /// Apply one event to the state machine and the data store.
    pub(crate) fn handle_event(&mut self, event: Event) -> Result<()> {
        let Some(kind) = EventKind::parse(&event.event) else {
            debug!(event = %event.event, "ignoring unknown event kind");
            return Ok(());
        };

        let raw = serde_json::to_value(&event)
            .map_err(|e| Error::Protocol(format!("failed to re-serialize event: {e}")))?;
        self.client_mut()
            .callbacks_mut()
            .fire(CallbackKey::Event(kind), &raw);

        match kind {
            EventKind::Initialized => {
                self.client_mut().lifecycle_mut().on_initialized_event();
                debug!("adapter reported initialized");
            }
            EventKind::Stopped => {
                if let Some(body) = decode_event_body::<StoppedEventBody>(&event) {
                    debug!(reason = %body.reason, thread_id = ?body.thread_id, "debuggee stopped");
                    // Previous frame and variable references are stale now
                    self.store_mut().invalidate_frame_data();
                    self.store_mut().mark_stopped(
                        body.thread_id,
                        body.all_threads_stopped.unwrap_or(false),
                    );
                }
            }
            EventKind::Continued => {
                if let Some(body) = decode_event_body::<ContinuedEventBody>(&event) {
                    self.store_mut().invalidate_frame_data();
                    self.store_mut().mark_continued(
                        Some(body.thread_id),
                        body.all_threads_continued.unwrap_or(false),
                    );
                }
            }
            EventKind::Exited => {
                if let Some(body) = decode_event_body::<ExitedEventBody>(&event) {
                    info!(exit_code = body.exit_code, "debuggee exited");
                    self.store_mut().set_debuggee_exit_code(body.exit_code);
                }
            }
            EventKind::Terminated => {
                info!("debug session terminated");
                self.store_mut().set_terminated();
            }
            EventKind::Thread => {
                if let Some(body) = decode_event_body::<ThreadEventBody>(&event) {
                    match body.reason.as_str() {
                        "started" => self.store_mut().thread_started(body.thread_id),
                        "exited" => self.store_mut().thread_exited(body.thread_id),
                        other => debug!(reason = %other, "unhandled thread event reason"),
                    }
                }
            }
            EventKind::Output => {
                if let Some(body) = decode_event_body::<OutputEventBody>(&event) {
                    self.store_mut().push_output(body.category, body.output);
                }
            }
            EventKind::Breakpoint => {
                if let Some(body) = decode_event_body::<BreakpointEventBody>(&event) {
                    self.store_mut().update_breakpoint(&body.reason, body.breakpoint);
                }
            }
            EventKind::Module => {
                if let Some(body) = decode_event_body::<ModuleEventBody>(&event) {
                    self.store_mut().update_module(&body.reason, body.module);
                }
            }
            EventKind::LoadedSource => {
                if let Some(body) = decode_event_body::<LoadedSourceEventBody>(&event) {
                    if body.reason == "removed" {
                        self.store_mut().remove_source(&body.source);
                    } else {
                        self.store_mut().upsert_source(body.source);
                    }
                }
            }
            EventKind::Process => {
                debug!("adapter announced the debuggee process");
            }
            EventKind::Capabilities => {
                if let Some(body) =
                    decode_event_body::<crate::capabilities::CapabilitiesEventBody>(&event)
                {
                    self.client_mut()
                        .capabilities_mut()
                        .adapter
                        .merge(&body.capabilities);
                    debug!("merged late capability update");
                }
            }
            EventKind::ProgressStart
            | EventKind::ProgressUpdate
            | EventKind::ProgressEnd
            | EventKind::Invalidated
            | EventKind::Memory => {
                debug!(event = %event.event, "event observed, no store column for it");
            }
        }
        Ok(())
    }
}

/// Decode a response body the engine ingests. Missing or malformed bodies
/// for these commands violate the schema.
fn decode_body<T: serde::de::DeserializeOwned>(response: &Response) -> Result<T> {
    let body = response.body.as_ref().ok_or_else(|| {
        Error::InvalidMessage(format!(
            "response to `{}` is missing its body",
            response.command
        ))
    })?;
    Ok(serde_json::from_value(body.clone())?)
}

/// Decode an event body leniently: `None` when absent or malformed.
fn decode_event_body<T: serde::de::DeserializeOwned>(event: &Event) -> Option<T> {
    let body = event.body.as_ref()?;
    match serde_json::from_value(body.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(event = %event.event, error = %e, "event body did not decode, skipping");
            None
        }
    }
}
