//! DAP (Debug Adapter Protocol) message types
//!
//! Based on <https://microsoft.github.io/debug-adapter-protocol/specification>
//!
//! Every message is JSON preceded by a `Content-Length` header:
//! ```text
//! Content-Length: 119\r\n
//! \r\n
//! {"seq":1,"type":"request","command":"initialize","arguments":{"adapterID":"lldb"}}
//! ```
//!
//! The envelope types ([`Request`], [`Response`], [`Event`]) keep `command`
//! and `event` as strings, exactly as they appear on the wire; the engine
//! maps them through the closed enums in [`crate::command`].

use serde::{Deserialize, Serialize};

// ============================================================
// MESSAGE ENVELOPE
// ============================================================

/// Any DAP message, discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    /// Client -> adapter, or a reverse request flowing the other way
    Request(Request),
    /// The adapter's answer to one request, correlated by `request_seq`
    Response(Response),
    /// An unsolicited notification from the adapter
    Event(Event),
}

/// Request envelope.
///
/// Outbound requests are assembled with [`Request::outbound`]; inbound
/// ones (reverse requests) only ever come off the deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: i64,
    /// Wire name of the command, mapped through [`crate::command::Command`]
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

impl Request {
    /// Assemble an outbound request in one step. The argument object, when
    /// present, must already be serialized to a JSON value.
    pub fn outbound(
        seq: i64,
        command: impl Into<String>,
        arguments: Option<serde_json::Value>,
    ) -> Self {
        Self {
            seq,
            command: command.into(),
            arguments,
        }
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: i64,
    /// `seq` of the request this answers
    pub request_seq: i64,
    /// Echo of the request's command name
    pub command: String,
    pub success: bool,
    /// Human-readable error when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Response {
    /// A `success: true` reply, with its body if the command returns one.
    pub fn ok(
        seq: i64,
        request_seq: i64,
        command: impl Into<String>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self {
            seq,
            request_seq,
            command: command.into(),
            success: true,
            message: None,
            body,
        }
    }

    /// A `success: false` reply carrying the adapter's error message.
    pub fn rejected(
        seq: i64,
        request_seq: i64,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            request_seq,
            command: command.into(),
            success: false,
            message: Some(message.into()),
            body: None,
        }
    }
}

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: i64,
    /// Wire name of the event, mapped through [`crate::command::EventKind`]
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Event {
    /// Assemble an event envelope, body and all.
    pub fn emitted(seq: i64, event: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            seq,
            event: event.into(),
            body,
        }
    }
}

// ============================================================
// INITIALIZE
// ============================================================

/// Arguments for the initialize request.
///
/// The boolean `supports*` fields declare the client's own capabilities;
/// the capability registry reflects them into its client flag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestArguments {
    /// Unique ID of the client
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Human-readable client name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// ID of the debug adapter ("python", "go", "lldb", ...)
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    /// Locale (ISO 639)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Lines start at 1 (default) or 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    /// Columns start at 1 (default) or 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_start_at1: Option<bool>,
    /// Path format ("path" or "uri")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    /// Client renders the `type` attribute of variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_type: Option<bool>,
    /// Client supports paging of variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_paging: Option<bool>,
    /// Client implements the `runInTerminal` reverse request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_run_in_terminal_request: Option<bool>,
    /// Client understands memory references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_memory_references: Option<bool>,
    /// Client renders progress events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_progress_reporting: Option<bool>,
    /// Client handles the `invalidated` event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_invalidated_event: Option<bool>,
    /// Client handles the `memory` event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_memory_event: Option<bool>,
    /// Client can interpret `args` entries through the shell
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_args_can_be_interpreted_by_shell: Option<bool>,
    /// Client implements the `startDebugging` reverse request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_start_debugging_request: Option<bool>,
    /// Client renders ANSI escape sequences in output
    #[serde(rename = "supportsANSIStyling", skip_serializing_if = "Option::is_none")]
    pub supports_ansi_styling: Option<bool>,
}

impl InitializeRequestArguments {
    /// Build the arguments a stepline session sends, from its config
    pub fn from_config(config: &stepline_config::SessionConfig) -> Self {
        Self {
            client_id: Some(config.client_id.clone()),
            client_name: Some(config.client_name.clone()),
            adapter_id: config.adapter_id.clone(),
            locale: Some(config.locale.clone()),
            lines_start_at1: Some(config.lines_start_at1),
            columns_start_at1: Some(config.columns_start_at1),
            path_format: Some(config.path_format.clone()),
            supports_variable_type: Some(true),
            supports_variable_paging: None,
            supports_run_in_terminal_request: None,
            supports_memory_references: Some(true),
            supports_progress_reporting: None,
            supports_invalidated_event: None,
            supports_memory_event: None,
            supports_args_can_be_interpreted_by_shell: None,
            supports_start_debugging_request: None,
            supports_ansi_styling: None,
        }
    }
}

// ============================================================
// LAUNCH / ATTACH / TEARDOWN
// ============================================================

/// Launch request arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequestArguments {
    /// Launch without debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_debug: Option<bool>,
    /// Restart data from a previous session
    #[serde(rename = "__restart", skip_serializing_if = "Option::is_none")]
    pub restart: Option<serde_json::Value>,
    /// Adapter-specific arguments (program path, stopOnEntry, ...)
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Attach request arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequestArguments {
    /// Restart data from a previous session
    #[serde(rename = "__restart", skip_serializing_if = "Option::is_none")]
    pub restart: Option<serde_json::Value>,
    /// Adapter-specific arguments (pid, host, ...)
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Disconnect request arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    /// The session is being restarted
    pub restart: bool,
    /// Kill the debuggee on disconnect (adapter default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
    /// Leave the debuggee suspended on disconnect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend_debuggee: Option<bool>,
}

/// Terminate request arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateArguments {
    /// The session is being restarted
    pub restart: bool,
}

// ============================================================
// THREADS
// ============================================================

/// A thread reported by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique thread ID
    pub id: i64,
    /// Display name
    pub name: String,
}

/// Response body for the threads request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsResponseBody {
    pub threads: Vec<Thread>,
}

// ============================================================
// STACK TRACE
// ============================================================

/// Arguments for the stackTrace request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    /// Thread to get the stack for
    pub thread_id: i64,
    /// Start frame index (pagination)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i64>,
    /// Maximum number of frames to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<i64>,
}

/// Response body for the stackTrace request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    pub stack_frames: Vec<StackFrame>,
    /// Total frame count when not all frames were returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// A stack frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Unique frame ID, valid while the thread is suspended
    pub id: i64,
    /// Frame name, typically the function
    pub name: String,
    /// Source of the frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line within the source
    pub line: i64,
    /// Column within the line
    #[serde(default)]
    pub column: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
    /// Memory reference of the current instruction pointer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_pointer_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
}

// ============================================================
// SCOPES / VARIABLES
// ============================================================

/// Arguments for the scopes request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    /// Frame to get scopes for
    pub frame_id: i64,
}

/// Response body for the scopes request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesResponseBody {
    pub scopes: Vec<Scope>,
}

/// A scope (locals, arguments, registers, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Scope name, shown in the UI
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
    /// Reference used to retrieve the scope's variables
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    /// Fetching this scope's variables is expensive
    #[serde(default)]
    pub expensive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
}

/// Arguments for the variables request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    /// Reference from a scope or a structured variable
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// Response body for the variables request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesResponseBody {
    pub variables: Vec<Variable>,
}

/// A variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluate_name: Option<String>,
    /// Non-zero when the variable is structured and has children
    #[serde(default)]
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reference: Option<String>,
}

// ============================================================
// SOURCES
// ============================================================

/// A source descriptor: a path, an adapter-side reference, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Short name, for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Path on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Adapter-side reference; content must be fetched with a source request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
    /// Origin of the source, e.g. "internal module"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Source {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_reference(reference: i64) -> Self {
        Self {
            source_reference: Some(reference),
            ..Self::default()
        }
    }
}

/// Arguments for the source request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceArguments {
    /// The source to fetch; `source.sourceReference` must be set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Legacy duplicate of `source.sourceReference`
    pub source_reference: i64,
}

/// Response body for the source request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponseBody {
    /// Content of the source
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

// ============================================================
// EXECUTION CONTROL
// ============================================================

/// Granularity of a step operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteppingGranularity {
    /// One statement (adapter default)
    Statement,
    /// One source line
    Line,
    /// One machine instruction
    Instruction,
}

/// Arguments for the next (step over) request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextArguments {
    /// Thread to step
    pub thread_id: i64,
    /// Step only this thread, keep the others suspended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<SteppingGranularity>,
}

/// Arguments for the stepIn request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInArguments {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
    /// Target from a stepInTargets response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<SteppingGranularity>,
}

/// Arguments for the stepOut request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutArguments {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<SteppingGranularity>,
}

/// Arguments for the continue request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueArguments {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
}

/// Response body for the continue request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

/// Arguments for the pause request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseArguments {
    pub thread_id: i64,
}

// ============================================================
// BREAKPOINTS
// ============================================================

/// A breakpoint requested on a source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    /// Line number (1-based by default)
    pub line: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Break only when this expression is true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Break after N hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    /// Log this message instead of breaking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

impl SourceBreakpoint {
    pub fn at_line(line: i64) -> Self {
        Self {
            line,
            column: None,
            condition: None,
            hit_condition: None,
            log_message: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// Arguments for the setBreakpoints request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    /// Source to set breakpoints in; replaces all previous breakpoints there
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_modified: Option<bool>,
}

/// Response body for setBreakpoints / setFunctionBreakpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsResponseBody {
    pub breakpoints: Vec<Breakpoint>,
}

/// Breakpoint information returned by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The adapter could resolve the breakpoint
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Actual location, may differ from the requested one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
}

/// A breakpoint on a function name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionBreakpoint {
    /// Function name to break on
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
}

/// Arguments for the setFunctionBreakpoints request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFunctionBreakpointsArguments {
    pub breakpoints: Vec<FunctionBreakpoint>,
}

// ============================================================
// EVALUATE
// ============================================================

/// Arguments for the evaluate request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    /// Expression to evaluate
    pub expression: String,
    /// Evaluate in the scope of this frame; global scope when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Context hint: "watch", "repl", "hover", "clipboard", "variables"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Response body for the evaluate request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    /// Result rendered as a string
    pub result: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    /// Non-zero when the result is structured
    #[serde(default)]
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reference: Option<String>,
}

// ============================================================
// MODULES
// ============================================================

/// A module loaded into the debuggee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Unique ID: number or string, adapter's choice
    pub id: serde_json::Value,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_optimized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================
// EVENT BODIES
// ============================================================

/// Body of the stopped event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    /// Why execution stopped: "breakpoint", "step", "pause", "exception", ...
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_breakpoint_ids: Option<Vec<i64>>,
}

/// Body of the continued event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuedEventBody {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

/// Body of the exited event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    /// Exit code of the debuggee
    pub exit_code: i64,
}

/// Body of the terminated event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedEventBody {
    /// Opaque restart data; the front-end may start a new session with it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<serde_json::Value>,
}

/// Body of the thread event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEventBody {
    /// "started" or "exited"
    pub reason: String,
    pub thread_id: i64,
}

/// Body of the output event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    /// "console", "stdout", "stderr", "telemetry", ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
}

/// Body of the breakpoint event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointEventBody {
    /// "changed", "new", or "removed"
    pub reason: String,
    pub breakpoint: Breakpoint,
}

/// Body of the module event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEventBody {
    /// "new", "changed", or "removed"
    pub reason: String,
    pub module: Module,
}

/// Body of the loadedSource event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSourceEventBody {
    /// "new", "changed", or "removed"
    pub reason: String,
    pub source: Source,
}

/// Body of the process event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEventBody {
    /// Logical name of the process
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_process_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_local_process: Option<bool>,
    /// "launch", "attach", or "attachForSuspendedLaunch"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let msg = ProtocolMessage::Request(Request::outbound(
            1,
            "initialize",
            Some(serde_json::json!({"adapterID": "lldb"})),
        ));

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"request""#));
        assert!(json.contains(r#""command":"initialize""#));
        assert!(json.contains(r#""adapterID":"lldb""#));

        let parsed: ProtocolMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn response_round_trip() {
        let msg = ProtocolMessage::Response(Response::ok(
            2,
            1,
            "initialize",
            Some(serde_json::json!({"supportsTerminateRequest": true})),
        ));

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"response""#));
        assert!(json.contains(r#""success":true"#));

        let parsed: ProtocolMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn rejected_response_carries_the_message() {
        let response = Response::rejected(5, 4, "setBreakpoints", "file not found");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("file not found"));
        assert!(response.body.is_none());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""success":false"#));
        assert!(json.contains(r#""message":"file not found""#));
    }

    #[test]
    fn event_round_trip() {
        let msg = ProtocolMessage::Event(Event::emitted(
            3,
            "stopped",
            Some(serde_json::json!({"reason": "breakpoint", "threadId": 7})),
        ));

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"event""#));
        assert!(json.contains(r#""event":"stopped""#));

        let parsed: ProtocolMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn initialize_arguments_use_dap_field_names() {
        let config = stepline_config::SessionConfig::new("lldb");
        let args = InitializeRequestArguments::from_config(&config);

        let json = serde_json::to_string(&args).unwrap();
        // adapterID and clientID are capitalized per the DAP schema, not camelCase
        assert!(json.contains(r#""adapterID":"lldb""#));
        assert!(json.contains(r#""clientID":"stepline""#));
        assert!(json.contains(r#""linesStartAt1":true"#));
    }

    #[test]
    fn launch_arguments_flatten_extras() {
        let mut args = LaunchRequestArguments::default();
        args.additional
            .insert("program".to_string(), serde_json::json!("/tmp/a.out"));
        args.additional
            .insert("stopOnEntry".to_string(), serde_json::json!(true));

        let json = serde_json::to_string(&args).unwrap();
        assert!(json.contains(r#""program":"/tmp/a.out""#));
        assert!(json.contains(r#""stopOnEntry":true"#));
        // Flattened, not nested under "additional"
        assert!(!json.contains("additional"));
    }

    #[test]
    fn stepping_granularity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SteppingGranularity::Line).unwrap(),
            r#""line""#
        );
        assert_eq!(
            serde_json::to_string(&SteppingGranularity::Instruction).unwrap(),
            r#""instruction""#
        );
    }

    #[test]
    fn stack_frame_tolerates_missing_optionals() {
        let frame: StackFrame = serde_json::from_str(
            r#"{"id": 100, "name": "main", "line": 12}"#,
        )
        .unwrap();
        assert_eq!(frame.id, 100);
        assert_eq!(frame.column, 0);
        assert!(frame.source.is_none());
    }

    #[test]
    fn variable_defaults_reference_to_zero() {
        let var: Variable =
            serde_json::from_str(r#"{"name": "x", "value": "42"}"#).unwrap();
        assert_eq!(var.variables_reference, 0);
    }

    #[test]
    fn disconnect_arguments_omit_null_fields() {
        let args = DisconnectArguments {
            restart: false,
            terminate_debuggee: None,
            suspend_debuggee: None,
        };
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"restart":false}"#);
    }

    #[test]
    fn stopped_event_body_round_trip() {
        let body = StoppedEventBody {
            reason: "breakpoint".to_string(),
            description: None,
            thread_id: Some(7),
            all_threads_stopped: Some(true),
            hit_breakpoint_ids: Some(vec![3]),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""threadId":7"#));
        assert!(json.contains(r#""allThreadsStopped":true"#));
        let parsed: StoppedEventBody = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, body);
    }
}
