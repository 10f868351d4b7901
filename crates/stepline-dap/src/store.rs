//! Session data store
//!
//! The materialized view of the debuggee that a front-end renders: threads
//! with their stacks, scopes per frame, variables per reference, sources
//! and fetched content, breakpoints, modules, and the console record.
//!
//! Adapter-originated data is written solely by the response and event
//! handlers; the breakpoint lists are also written by explicit user
//! operations. Readers get immutable snapshots between ticks.

use crate::protocol::{
    Breakpoint, FunctionBreakpoint, Module, Scope, Source, StackFrame, Thread, Variable,
};
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

/// Run state of a thread as far as the adapter has told us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadRunState {
    Stopped,
    Continued,
    #[default]
    Unknown,
}

/// A thread and everything the session knows about it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadInfo {
    pub id: i64,
    pub name: String,
    pub run_state: ThreadRunState,
    /// Whether the thread participates in broadcast step operations
    pub unlocked: bool,
    /// Most recently fetched stack, innermost frame first
    pub stack: Vec<StackFrame>,
}

impl ThreadInfo {
    fn new(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            run_state: ThreadRunState::Unknown,
            unlocked: true,
            stack: Vec::new(),
        }
    }
}

/// Key of fetched source content: a path on disk or an adapter reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Path(String),
    Reference(i64),
}

/// Fetched content of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContent {
    pub content: String,
    /// When the content was materialized
    pub mtime: SystemTime,
}

/// One entry of the console record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    /// "console", "stdout", "stderr", ... when the adapter said
    pub category: Option<String>,
    pub output: String,
}

/// The aggregated session view.
#[derive(Debug, Default)]
pub struct SessionStore {
    threads: BTreeMap<i64, ThreadInfo>,
    scopes: HashMap<i64, Vec<Scope>>,
    variables: HashMap<i64, Vec<Variable>>,
    sources: Vec<Source>,
    sources_content: HashMap<SourceKey, SourceContent>,
    breakpoints: Vec<Breakpoint>,
    function_breakpoints: Vec<FunctionBreakpoint>,
    output: Vec<OutputEntry>,
    modules: Vec<Module>,
    debuggee_exit_code: Option<i64>,
    terminated: bool,
    scroll_to_active_line: bool,
    refresh_active_source: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------

    /// Iterate threads ordered by ID
    pub fn threads(&self) -> impl Iterator<Item = &ThreadInfo> {
        self.threads.values()
    }

    pub fn thread(&self, thread_id: i64) -> Option<&ThreadInfo> {
        self.threads.get(&thread_id)
    }

    /// IDs of threads eligible for broadcast stepping
    pub fn unlocked_threads(&self) -> Vec<i64> {
        self.threads
            .values()
            .filter(|t| t.unlocked)
            .map(|t| t.id)
            .collect()
    }

    /// Replace the thread list, preserving known run state, lock flags,
    /// and stacks of surviving threads.
    pub(crate) fn set_threads(&mut self, threads: Vec<Thread>) {
        let mut next = BTreeMap::new();
        for thread in threads {
            let info = match self.threads.remove(&thread.id) {
                Some(mut existing) => {
                    existing.name = thread.name;
                    existing
                }
                None => ThreadInfo::new(thread.id, thread.name),
            };
            next.insert(thread.id, info);
        }
        self.threads = next;
    }

    pub(crate) fn thread_started(&mut self, thread_id: i64) {
        self.threads
            .entry(thread_id)
            .or_insert_with(|| ThreadInfo::new(thread_id, format!("thread {thread_id}")));
    }

    pub(crate) fn thread_exited(&mut self, thread_id: i64) {
        self.threads.remove(&thread_id);
    }

    pub(crate) fn mark_stopped(&mut self, thread_id: Option<i64>, all_threads: bool) {
        if all_threads {
            for thread in self.threads.values_mut() {
                thread.run_state = ThreadRunState::Stopped;
            }
        }
        if let Some(id) = thread_id {
            self.threads
                .entry(id)
                .or_insert_with(|| ThreadInfo::new(id, format!("thread {id}")))
                .run_state = ThreadRunState::Stopped;
        }
    }

    pub(crate) fn mark_continued(&mut self, thread_id: Option<i64>, all_threads: bool) {
        if all_threads {
            for thread in self.threads.values_mut() {
                thread.run_state = ThreadRunState::Continued;
            }
        }
        if let Some(id) = thread_id {
            if let Some(thread) = self.threads.get_mut(&id) {
                thread.run_state = ThreadRunState::Continued;
            }
        }
    }

    pub(crate) fn set_thread_locked(&mut self, thread_id: i64, locked: bool) -> bool {
        match self.threads.get_mut(&thread_id) {
            Some(thread) => {
                thread.unlocked = !locked;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_stack(&mut self, thread_id: i64, frames: Vec<StackFrame>) {
        self.threads
            .entry(thread_id)
            .or_insert_with(|| ThreadInfo::new(thread_id, format!("thread {thread_id}")))
            .stack = frames;
    }

    // ------------------------------------------------------------
    // Scopes and variables
    // ------------------------------------------------------------

    pub fn scopes(&self, frame_id: i64) -> Option<&[Scope]> {
        self.scopes.get(&frame_id).map(Vec::as_slice)
    }

    pub fn variables(&self, variables_reference: i64) -> Option<&[Variable]> {
        self.variables.get(&variables_reference).map(Vec::as_slice)
    }

    pub(crate) fn set_scopes(&mut self, frame_id: i64, scopes: Vec<Scope>) {
        self.scopes.insert(frame_id, scopes);
    }

    pub(crate) fn set_variables(&mut self, variables_reference: i64, variables: Vec<Variable>) {
        self.variables.insert(variables_reference, variables);
    }

    /// Drop stale frame-derived data; frame and variable references are
    /// only valid while the debuggee is suspended.
    pub(crate) fn invalidate_frame_data(&mut self) {
        self.scopes.clear();
        self.variables.clear();
    }

    // ------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source_content(&self, key: &SourceKey) -> Option<&SourceContent> {
        self.sources_content.get(key)
    }

    pub(crate) fn upsert_source(&mut self, source: Source) {
        let exists = self.sources.iter().any(|s| {
            (s.path.is_some() && s.path == source.path)
                || (s.source_reference.is_some()
                    && s.source_reference == source.source_reference)
        });
        if !exists {
            self.sources.push(source);
        }
    }

    pub(crate) fn remove_source(&mut self, source: &Source) {
        self.sources.retain(|s| {
            !((s.path.is_some() && s.path == source.path)
                || (s.source_reference.is_some()
                    && s.source_reference == source.source_reference))
        });
    }

    pub(crate) fn set_source_content(&mut self, key: SourceKey, content: String) {
        self.sources_content.insert(
            key,
            SourceContent {
                content,
                mtime: SystemTime::now(),
            },
        );
    }

    // ------------------------------------------------------------
    // Breakpoints
    // ------------------------------------------------------------

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn function_breakpoints(&self) -> &[FunctionBreakpoint] {
        &self.function_breakpoints
    }

    pub(crate) fn set_breakpoints(&mut self, breakpoints: Vec<Breakpoint>) {
        self.breakpoints = breakpoints;
    }

    pub(crate) fn set_function_breakpoints(&mut self, breakpoints: Vec<FunctionBreakpoint>) {
        self.function_breakpoints = breakpoints;
    }

    pub(crate) fn update_breakpoint(&mut self, reason: &str, breakpoint: Breakpoint) {
        match reason {
            "removed" => {
                if let Some(id) = breakpoint.id {
                    self.breakpoints.retain(|b| b.id != Some(id));
                }
            }
            "changed" => {
                match breakpoint
                    .id
                    .and_then(|id| self.breakpoints.iter_mut().find(|b| b.id == Some(id)))
                {
                    Some(existing) => *existing = breakpoint,
                    None => self.breakpoints.push(breakpoint),
                }
            }
            _ => self.breakpoints.push(breakpoint),
        }
    }

    // ------------------------------------------------------------
    // Output, modules, debuggee end
    // ------------------------------------------------------------

    /// The append-only console record
    pub fn output(&self) -> &[OutputEntry] {
        &self.output
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn debuggee_exit_code(&self) -> Option<i64> {
        self.debuggee_exit_code
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub(crate) fn push_output(&mut self, category: Option<String>, output: String) {
        self.output.push(OutputEntry { category, output });
    }

    pub(crate) fn update_module(&mut self, reason: &str, module: Module) {
        match reason {
            "removed" => self.modules.retain(|m| m.id != module.id),
            "changed" => {
                match self.modules.iter_mut().find(|m| m.id == module.id) {
                    Some(existing) => *existing = module,
                    None => self.modules.push(module),
                }
            }
            _ => self.modules.push(module),
        }
    }

    pub(crate) fn set_debuggee_exit_code(&mut self, code: i64) {
        self.debuggee_exit_code = Some(code);
    }

    pub(crate) fn set_terminated(&mut self) {
        self.terminated = true;
    }

    // ------------------------------------------------------------
    // UI intents
    // ------------------------------------------------------------

    pub(crate) fn request_scroll_to_active_line(&mut self) {
        self.scroll_to_active_line = true;
    }

    pub(crate) fn request_refresh_active_source(&mut self) {
        self.refresh_active_source = true;
    }

    /// Consume the "scroll to the active line" intent
    pub fn take_scroll_to_active_line(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_active_line)
    }

    /// Consume the "the active source changed" intent
    pub fn take_refresh_active_source(&mut self) -> bool {
        std::mem::take(&mut self.refresh_active_source)
    }
}
