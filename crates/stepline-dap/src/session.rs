//! Session orchestrator
//!
//! Composite debugging operations expressed as short chains of queued
//! requests with dependencies and retained contexts. One call to [`tick`]
//! per UI frame drives the whole conversation:
//!
//! 1. drain the outbound queue,
//! 2. perform at most one bounded poll on the adapter's output,
//! 3. dispatch the frame, which may queue follow-up requests,
//! 4. return control to the caller.
//!
//! [`Session::tick`]: Session::tick

use crate::client::{DapClient, IngestedFrame};
use crate::command::{Command, EventKind};
use crate::error::{Error, Result};
use crate::outbox::{Dependency, ResponseStatus, RetainedContext};
use crate::protocol::{
    AttachRequestArguments, ContinueArguments, DisconnectArguments, EvaluateArguments, Event,
    InitializeRequestArguments, LaunchRequestArguments, NextArguments, PauseArguments, Response,
    SetBreakpointsArguments, SetFunctionBreakpointsArguments, Source, SourceArguments,
    SourceBreakpoint, StackTraceArguments, StepInArguments, StepOutArguments,
    SteppingGranularity, TerminateArguments, FunctionBreakpoint,
};
use crate::state::ConnectionState;
use crate::store::SessionStore;
use std::time::Duration;
use stepline_config::{AdapterSpawnConfig, SessionConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// How to end a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSessionMode {
    /// Ask the adapter to terminate the debuggee
    Terminate,
    /// Detach from the debuggee, leaving it to the adapter's default policy
    Disconnect,
}

/// Seqs of the begin-session request chain, for dependency chaining and
/// teardown waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStart {
    pub initialize_seq: i64,
    pub launch_seq: i64,
    pub configuration_done_seq: i64,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Seqs sent this tick, in wire order
    pub sent: Vec<i64>,
    /// Requests still queued, with the gate that deferred each
    pub deferred: Vec<(i64, Error)>,
    /// Whether a frame arrived within the poll timeout
    pub received: bool,
}

/// A debug session: one adapter connection plus the materialized view.
#[derive(Debug)]
pub struct Session {
    client: DapClient,
    store: SessionStore,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            client: DapClient::new(),
            store: SessionStore::new(),
            config,
        }
    }

    /// The connection, for observers (state, capabilities, queue contents)
    pub fn client(&self) -> &DapClient {
        &self.client
    }

    pub(crate) fn client_mut(&mut self) -> &mut DapClient {
        &mut self.client
    }

    /// Read-only view of the session data
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Mutable view, for consuming UI intents and user breakpoint edits
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Attach the session to an already-connected stream pair instead of
    /// spawning a child process.
    pub fn connect<R, W>(&mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.client.connect(reader, writer)
    }

    // ------------------------------------------------------------
    // Composite operations
    // ------------------------------------------------------------

    /// Start a session for `program`: spawn the adapter if needed, then
    /// queue `initialize` -> `launch` (after the initialize response) ->
    /// `configurationDone` (after the `initialized` event).
    pub fn begin_session(
        &mut self,
        adapter: &AdapterSpawnConfig,
        program: impl Into<String>,
    ) -> Result<SessionStart> {
        if self.client.state() == ConnectionState::NotSpawned {
            self.client.spawn(adapter)?;
        }

        let initialize_args = InitializeRequestArguments::from_config(&self.config);
        let initialize_seq = self.client.enqueue_initialize(&initialize_args)?;

        let mut launch_args = LaunchRequestArguments {
            no_debug: None,
            restart: None,
            additional: self.config.launch_extras.clone(),
        };
        launch_args
            .additional
            .insert("program".to_string(), serde_json::Value::String(program.into()));

        let launch_seq = self.client.enqueue(
            Command::Launch,
            Some(serde_json::to_value(launch_args)?),
            Dependency::AfterSeq(initialize_seq),
            RetainedContext::None,
        )?;

        let configuration_done_seq = self.client.enqueue(
            Command::ConfigurationDone,
            None,
            Dependency::AfterEvent(EventKind::Initialized),
            RetainedContext::None,
        )?;

        info!(initialize_seq, launch_seq, "session chain queued");
        Ok(SessionStart {
            initialize_seq,
            launch_seq,
            configuration_done_seq,
        })
    }

    /// Start a session against an already-running debuggee: like
    /// [`begin_session`], but the second link is an `attach` request built
    /// from adapter-specific arguments (pid, connect info, ...).
    ///
    /// [`begin_session`]: Session::begin_session
    pub fn begin_session_attach(
        &mut self,
        adapter: &AdapterSpawnConfig,
        attach_args: serde_json::Map<String, serde_json::Value>,
    ) -> Result<SessionStart> {
        if self.client.state() == ConnectionState::NotSpawned {
            self.client.spawn(adapter)?;
        }

        let initialize_args = InitializeRequestArguments::from_config(&self.config);
        let initialize_seq = self.client.enqueue_initialize(&initialize_args)?;

        let arguments = AttachRequestArguments {
            restart: None,
            additional: attach_args,
        };
        let attach_seq = self.client.enqueue(
            Command::Attach,
            Some(serde_json::to_value(arguments)?),
            Dependency::AfterSeq(initialize_seq),
            RetainedContext::None,
        )?;

        let configuration_done_seq = self.client.enqueue(
            Command::ConfigurationDone,
            None,
            Dependency::AfterEvent(EventKind::Initialized),
            RetainedContext::None,
        )?;

        info!(initialize_seq, attach_seq, "attach chain queued");
        Ok(SessionStart {
            initialize_seq,
            launch_seq: attach_seq,
            configuration_done_seq,
        })
    }

    /// Queue the teardown request. Rejected before launch/attach completed.
    pub fn end_session(&mut self, how: EndSessionMode) -> Result<i64> {
        if !self.client.lifecycle().debuggee_attached() {
            return Err(Error::SessionNotStarted);
        }

        match how {
            EndSessionMode::Terminate => {
                let arguments = TerminateArguments { restart: false };
                self.client.enqueue(
                    Command::Terminate,
                    Some(serde_json::to_value(arguments)?),
                    Dependency::None,
                    RetainedContext::None,
                )
            }
            EndSessionMode::Disconnect => {
                let arguments = DisconnectArguments {
                    restart: false,
                    terminate_debuggee: None,
                    suspend_debuggee: None,
                };
                self.client.enqueue(
                    Command::Disconnect,
                    Some(serde_json::to_value(arguments)?),
                    Dependency::None,
                    RetainedContext::None,
                )
            }
        }
    }

    /// End the session and see it through: drain, wait for the teardown
    /// response, and escalate to killing the adapter if it never answers.
    pub async fn shutdown(&mut self, how: EndSessionMode) -> Result<()> {
        let seq = self.end_session(how)?;
        let outcome = self.client.drain().await?;
        if let Some((_, gate)) = outcome.deferred.into_iter().find(|(s, _)| *s == seq) {
            return Err(gate);
        }

        match tokio::time::timeout(
            self.config.shutdown_timeout(),
            self.wait_for_response(seq),
        )
        .await
        {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_elapsed) => {
                warn!("adapter did not answer the teardown request, killing it");
                self.client.kill().await?;
                Ok(())
            }
        }
    }

    /// Fetch a thread's stack; the response fans out to scopes and their
    /// variables.
    pub fn fetch_thread_state(&mut self, thread_id: i64) -> Result<i64> {
        let arguments = StackTraceArguments {
            thread_id,
            start_frame: None,
            levels: None,
        };
        self.client.enqueue(
            Command::StackTrace,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::StackTrace {
                thread_id,
                fetch_scopes: true,
                fetch_variables: true,
            },
        )
    }

    /// Refresh the thread list.
    pub fn fetch_threads(&mut self) -> Result<i64> {
        self.client.enqueue(
            Command::Threads,
            None,
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Step every unlocked thread over one unit of `granularity`. Each
    /// response chains a stack refetch and flags the UI to follow the
    /// active line.
    pub fn step(&mut self, granularity: SteppingGranularity) -> Result<Vec<i64>> {
        let thread_ids = self.store.unlocked_threads();
        let mut seqs = Vec::with_capacity(thread_ids.len());
        for thread_id in thread_ids {
            let arguments = NextArguments {
                thread_id,
                single_thread: Some(true),
                granularity: Some(granularity),
            };
            seqs.push(self.client.enqueue(
                Command::Next,
                Some(serde_json::to_value(arguments)?),
                Dependency::None,
                RetainedContext::Next {
                    thread_id,
                    fetch_stack_trace: true,
                    fetch_scopes: false,
                    fetch_variables: false,
                },
            )?);
        }
        debug!(count = seqs.len(), "step requests queued");
        Ok(seqs)
    }

    /// Step one thread into calls.
    pub fn step_in(&mut self, thread_id: i64, granularity: SteppingGranularity) -> Result<i64> {
        let arguments = StepInArguments {
            thread_id,
            single_thread: Some(true),
            target_id: None,
            granularity: Some(granularity),
        };
        self.client.enqueue(
            Command::StepIn,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::Next {
                thread_id,
                fetch_stack_trace: true,
                fetch_scopes: false,
                fetch_variables: false,
            },
        )
    }

    /// Step one thread out of the current frame.
    pub fn step_out(&mut self, thread_id: i64, granularity: SteppingGranularity) -> Result<i64> {
        let arguments = StepOutArguments {
            thread_id,
            single_thread: Some(true),
            granularity: Some(granularity),
        };
        self.client.enqueue(
            Command::StepOut,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::Next {
                thread_id,
                fetch_stack_trace: true,
                fetch_scopes: false,
                fetch_variables: false,
            },
        )
    }

    /// Suspend a thread.
    pub fn pause(&mut self, thread_id: i64) -> Result<i64> {
        let arguments = PauseArguments { thread_id };
        self.client.enqueue(
            Command::Pause,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Resume a thread (and, by adapter default, usually all of them).
    pub fn continue_thread(&mut self, thread_id: i64) -> Result<i64> {
        let arguments = ContinueArguments {
            thread_id,
            single_thread: None,
        };
        self.client.enqueue(
            Command::Continue,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Replace the breakpoints of one source file.
    pub fn set_breakpoints(
        &mut self,
        source: Source,
        breakpoints: Vec<SourceBreakpoint>,
    ) -> Result<i64> {
        let arguments = SetBreakpointsArguments {
            source,
            breakpoints: Some(breakpoints),
            source_modified: None,
        };
        self.client.enqueue(
            Command::SetBreakpoints,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Replace the function breakpoint list. Capability-gated.
    pub fn set_function_breakpoints(
        &mut self,
        breakpoints: Vec<FunctionBreakpoint>,
    ) -> Result<i64> {
        self.store.set_function_breakpoints(breakpoints.clone());
        let arguments = SetFunctionBreakpointsArguments { breakpoints };
        self.client.enqueue(
            Command::SetFunctionBreakpoints,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Fetch a source's content; it lands in the store keyed by path when
    /// one is known, otherwise by the adapter reference.
    pub fn fetch_source(&mut self, source: &Source) -> Result<i64> {
        let source_reference = source.source_reference.unwrap_or(0);
        let arguments = SourceArguments {
            source: Some(source.clone()),
            source_reference,
        };
        self.client.enqueue(
            Command::Source,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::Source {
                path: source.path.clone(),
                source_reference,
            },
        )
    }

    /// Evaluate an expression; the result is surfaced through the callback
    /// table.
    pub fn evaluate(&mut self, expression: impl Into<String>, frame_id: Option<i64>) -> Result<i64> {
        let arguments = EvaluateArguments {
            expression: expression.into(),
            frame_id,
            context: Some("repl".to_string()),
        };
        self.client.enqueue(
            Command::Evaluate,
            Some(serde_json::to_value(arguments)?),
            Dependency::None,
            RetainedContext::None,
        )
    }

    /// Exclude or include a thread in broadcast step operations. Returns
    /// false when the thread is unknown.
    pub fn set_thread_locked(&mut self, thread_id: i64, locked: bool) -> bool {
        self.store.set_thread_locked(thread_id, locked)
    }

    // ------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------

    /// One cooperative tick: drain, poll once (bounded by `poll_timeout`),
    /// dispatch. Fatal errors (framing, mismatch) propagate; per-request
    /// gates are reported in the returned [`TickReport`].
    pub async fn tick(&mut self, poll_timeout: Duration) -> Result<TickReport> {
        let drained = self.client.drain().await?;
        let mut report = TickReport {
            sent: drained.sent,
            deferred: drained.deferred,
            received: false,
        };

        if let Some(frame) = self.client.poll(poll_timeout).await? {
            report.received = true;
            self.dispatch(frame)?;
        }
        Ok(report)
    }

    /// One tick with the configured poll timeout.
    pub async fn tick_default(&mut self) -> Result<TickReport> {
        let timeout = self.config.poll_timeout();
        self.tick(timeout).await
    }

    /// Block until the response to `request_seq` has been handled,
    /// polling in one-second intervals. Teardown helper; do not call from
    /// the UI tick.
    pub async fn wait_for_response(&mut self, request_seq: i64) -> Result<Response> {
        // The response may already be queued from an earlier poll
        if let Ok(response) = self.client.inbox_mut().take_response_by_seq(request_seq) {
            let copy = response.clone();
            self.handle_response(response)?;
            return Ok(copy);
        }

        let interval = self.config.wait_poll_interval();
        loop {
            let Some(frame) = self.client.poll(interval).await? else {
                continue;
            };
            if let IngestedFrame::Response { request_seq: seq } = frame {
                if seq == request_seq {
                    let response = self.client.inbox_mut().take_response_by_seq(seq)?;
                    let copy = response.clone();
                    self.handle_response(response)?;
                    self.process_response_inbox()?;
                    return Ok(copy);
                }
            }
            self.dispatch(frame)?;
        }
    }

    /// Block until an event of `kind` has been handled, polling in
    /// one-second intervals. Teardown helper; do not call from the UI tick.
    pub async fn wait_for_event(&mut self, kind: EventKind) -> Result<Event> {
        if self.client.inbox().has_seen(kind) {
            if let Ok(event) = self.client.inbox_mut().take_event_by_kind(kind) {
                return Ok(event);
            }
        }

        let interval = self.config.wait_poll_interval();
        loop {
            let Some(frame) = self.client.poll(interval).await? else {
                continue;
            };
            let matched = match &frame {
                IngestedFrame::Event(event) => {
                    if EventKind::parse(&event.event) == Some(kind) {
                        Some(event.clone())
                    } else {
                        None
                    }
                }
                _ => None,
            };
            self.dispatch(frame)?;
            if let Some(event) = matched {
                return Ok(event);
            }
        }
    }

    /// Wait for the adapter process to exit; yields its exit code and the
    /// connection returns to `NotSpawned`.
    pub async fn wait(&mut self) -> Result<i32> {
        self.client.wait().await
    }

    /// Kill the adapter process. Last resort.
    pub async fn kill(&mut self) -> Result<i32> {
        self.client.kill().await
    }

    // ------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------

    /// One-shot callback for a response to `command` with `status`; fires
    /// with the raw response when it is handled.
    pub fn on_response<F>(&mut self, command: Command, status: ResponseStatus, action: F)
    where
        F: FnOnce(&serde_json::Value) + Send + 'static,
    {
        self.client.on_response(command, status, action);
    }

    /// One-shot callback for an event of `kind`; fires with the raw event
    /// when it is handled.
    pub fn on_event<F>(&mut self, kind: EventKind, action: F)
    where
        F: FnOnce(&serde_json::Value) + Send + 'static,
    {
        self.client.on_event(kind, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_session() -> Session {
        let (near, _far) = tokio::io::duplex(16 * 1024);
        let (read_half, write_half) = tokio::io::split(near);
        let mut session = Session::new(SessionConfig::new("mock"));
        session.connect(read_half, write_half).unwrap();
        session
    }

    #[tokio::test]
    async fn response_with_unknown_seq_is_a_mismatch() {
        let mut session = connected_session();
        session
            .begin_session(&AdapterSpawnConfig::new("unused"), "/tmp/a.out")
            .unwrap();

        let err = session
            .handle_response(Response::ok(1, 99, "threads", None))
            .unwrap_err();
        assert!(matches!(err, Error::RequestResponseMismatch(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn response_with_wrong_command_is_a_mismatch() {
        let mut session = connected_session();
        let start = session
            .begin_session(&AdapterSpawnConfig::new("unused"), "/tmp/a.out")
            .unwrap();

        // The adapter answers seq 1 but claims it was a launch
        let err = session
            .handle_response(Response::ok(1, start.initialize_seq, "launch", None))
            .unwrap_err();
        assert!(matches!(err, Error::RequestResponseMismatch(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn begin_session_chain_has_the_documented_dependencies() {
        let mut session = connected_session();
        let start = session
            .begin_session(&AdapterSpawnConfig::new("unused"), "/tmp/a.out")
            .unwrap();

        let outbox = session.client().outbox();
        assert_eq!(outbox.pending_len(), 3);
        assert_eq!(
            outbox.pending_at(0).unwrap().dependency,
            Dependency::None
        );
        assert_eq!(
            outbox.pending_at(1).unwrap().dependency,
            Dependency::AfterSeq(start.initialize_seq)
        );
        assert_eq!(
            outbox.pending_at(2).unwrap().dependency,
            Dependency::AfterEvent(EventKind::Initialized)
        );
    }

    #[tokio::test]
    async fn step_without_threads_queues_nothing() {
        let mut session = connected_session();
        session
            .begin_session(&AdapterSpawnConfig::new("unused"), "/tmp/a.out")
            .unwrap();

        let seqs = session.step(SteppingGranularity::Line).unwrap();
        assert!(seqs.is_empty());
    }
}
