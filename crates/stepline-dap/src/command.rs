//! Closed enumerations of DAP request and event kinds
//!
//! The protocol identifies messages by strings; the engine works with these
//! enums so gating tables and retained contexts stay exhaustive. Each enum
//! carries a single decode table (`as_str`) and derives parsing from it, so
//! the string mapping cannot drift between directions.

use std::fmt;

/// A DAP request command.
///
/// `RunInTerminal` and `StartDebugging` are reverse requests: they flow from
/// the adapter to the client, are recognized on input, and are never
/// enqueued for sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Initialize,
    Launch,
    Attach,
    Disconnect,
    Terminate,
    ConfigurationDone,
    Threads,
    StackTrace,
    Scopes,
    Variables,
    Source,
    Next,
    StepIn,
    StepOut,
    Continue,
    Pause,
    SetBreakpoints,
    SetFunctionBreakpoints,
    SetInstructionBreakpoints,
    SetExceptionBreakpoints,
    Evaluate,
    ReadMemory,
    WriteMemory,
    Disassemble,
    SetVariable,
    SetExpression,
    Restart,
    RestartFrame,
    Goto,
    GotoTargets,
    StepInTargets,
    Completions,
    Modules,
    LoadedSources,
    BreakpointLocations,
    Locations,
    ExceptionInfo,
    DataBreakpointInfo,
    SetDataBreakpoints,
    TerminateThreads,
    Cancel,
    StepBack,
    ReverseContinue,
    // Reverse requests (adapter -> client)
    RunInTerminal,
    StartDebugging,
}

impl Command {
    /// Every command, in DAP schema order. `parse` walks this table, so it
    /// is the single source of truth for the string mapping.
    pub const ALL: [Command; 45] = [
        Command::Initialize,
        Command::Launch,
        Command::Attach,
        Command::Disconnect,
        Command::Terminate,
        Command::ConfigurationDone,
        Command::Threads,
        Command::StackTrace,
        Command::Scopes,
        Command::Variables,
        Command::Source,
        Command::Next,
        Command::StepIn,
        Command::StepOut,
        Command::Continue,
        Command::Pause,
        Command::SetBreakpoints,
        Command::SetFunctionBreakpoints,
        Command::SetInstructionBreakpoints,
        Command::SetExceptionBreakpoints,
        Command::Evaluate,
        Command::ReadMemory,
        Command::WriteMemory,
        Command::Disassemble,
        Command::SetVariable,
        Command::SetExpression,
        Command::Restart,
        Command::RestartFrame,
        Command::Goto,
        Command::GotoTargets,
        Command::StepInTargets,
        Command::Completions,
        Command::Modules,
        Command::LoadedSources,
        Command::BreakpointLocations,
        Command::Locations,
        Command::ExceptionInfo,
        Command::DataBreakpointInfo,
        Command::SetDataBreakpoints,
        Command::TerminateThreads,
        Command::Cancel,
        Command::StepBack,
        Command::ReverseContinue,
        Command::RunInTerminal,
        Command::StartDebugging,
    ];

    /// The wire string for this command
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Initialize => "initialize",
            Command::Launch => "launch",
            Command::Attach => "attach",
            Command::Disconnect => "disconnect",
            Command::Terminate => "terminate",
            Command::ConfigurationDone => "configurationDone",
            Command::Threads => "threads",
            Command::StackTrace => "stackTrace",
            Command::Scopes => "scopes",
            Command::Variables => "variables",
            Command::Source => "source",
            Command::Next => "next",
            Command::StepIn => "stepIn",
            Command::StepOut => "stepOut",
            Command::Continue => "continue",
            Command::Pause => "pause",
            Command::SetBreakpoints => "setBreakpoints",
            Command::SetFunctionBreakpoints => "setFunctionBreakpoints",
            Command::SetInstructionBreakpoints => "setInstructionBreakpoints",
            Command::SetExceptionBreakpoints => "setExceptionBreakpoints",
            Command::Evaluate => "evaluate",
            Command::ReadMemory => "readMemory",
            Command::WriteMemory => "writeMemory",
            Command::Disassemble => "disassemble",
            Command::SetVariable => "setVariable",
            Command::SetExpression => "setExpression",
            Command::Restart => "restart",
            Command::RestartFrame => "restartFrame",
            Command::Goto => "goto",
            Command::GotoTargets => "gotoTargets",
            Command::StepInTargets => "stepInTargets",
            Command::Completions => "completions",
            Command::Modules => "modules",
            Command::LoadedSources => "loadedSources",
            Command::BreakpointLocations => "breakpointLocations",
            Command::Locations => "locations",
            Command::ExceptionInfo => "exceptionInfo",
            Command::DataBreakpointInfo => "dataBreakpointInfo",
            Command::SetDataBreakpoints => "setDataBreakpoints",
            Command::TerminateThreads => "terminateThreads",
            Command::Cancel => "cancel",
            Command::StepBack => "stepBack",
            Command::ReverseContinue => "reverseContinue",
            Command::RunInTerminal => "runInTerminal",
            Command::StartDebugging => "startDebugging",
        }
    }

    /// Parse a wire string into a command, `None` for unknown strings
    pub fn parse(s: &str) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// True for requests that flow from the adapter to the client
    pub fn is_reverse(self) -> bool {
        matches!(self, Command::RunInTerminal | Command::StartDebugging)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DAP event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Initialized,
    Stopped,
    Continued,
    Exited,
    Terminated,
    Thread,
    Output,
    Breakpoint,
    Module,
    LoadedSource,
    Process,
    Capabilities,
    ProgressStart,
    ProgressUpdate,
    ProgressEnd,
    Invalidated,
    Memory,
}

impl EventKind {
    /// Every event kind, in DAP schema order.
    pub const ALL: [EventKind; 17] = [
        EventKind::Initialized,
        EventKind::Stopped,
        EventKind::Continued,
        EventKind::Exited,
        EventKind::Terminated,
        EventKind::Thread,
        EventKind::Output,
        EventKind::Breakpoint,
        EventKind::Module,
        EventKind::LoadedSource,
        EventKind::Process,
        EventKind::Capabilities,
        EventKind::ProgressStart,
        EventKind::ProgressUpdate,
        EventKind::ProgressEnd,
        EventKind::Invalidated,
        EventKind::Memory,
    ];

    /// The wire string for this event kind
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Initialized => "initialized",
            EventKind::Stopped => "stopped",
            EventKind::Continued => "continued",
            EventKind::Exited => "exited",
            EventKind::Terminated => "terminated",
            EventKind::Thread => "thread",
            EventKind::Output => "output",
            EventKind::Breakpoint => "breakpoint",
            EventKind::Module => "module",
            EventKind::LoadedSource => "loadedSource",
            EventKind::Process => "process",
            EventKind::Capabilities => "capabilities",
            EventKind::ProgressStart => "progressStart",
            EventKind::ProgressUpdate => "progressUpdate",
            EventKind::ProgressEnd => "progressEnd",
            EventKind::Invalidated => "invalidated",
            EventKind::Memory => "memory",
        }
    }

    /// Parse a wire string into an event kind, `None` for unknown strings
    pub fn parse(s: &str) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
