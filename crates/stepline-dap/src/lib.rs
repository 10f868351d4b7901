//! Stepline DAP - the protocol-engine half of a DAP debugging session
//!
//! This crate spawns a debug adapter as a child process, negotiates the
//! session over the adapter's stdio, and drives the request/response/event
//! conversation that materializes threads, stacks, scopes, variables,
//! breakpoints, sources, and console output for an interactive front-end.
//!
//! # Architecture
//!
//! - [`Session`] is the entry point: composite operations (`begin_session`,
//!   `step`, `fetch_thread_state`, ...) expand into short chains of queued
//!   requests with typed dependencies and retained contexts.
//! - [`DapClient`] owns the wire: sequence allocation, the lifecycle state
//!   machine, capability gating, the pending queue, and the inboxes.
//! - [`SessionStore`] is the materialized view the front-end renders.
//!
//! Everything runs single-threaded and cooperatively: one
//! [`Session::tick`] per UI frame drains the queue, performs at most one
//! bounded read, and dispatches what arrived. There is no background
//! reader task.

pub mod callbacks;
pub mod capabilities;
pub mod client;
pub mod command;
pub mod error;
mod handler;
pub mod inbox;
pub mod outbox;
pub mod process;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;
pub mod wire;

pub use callbacks::CallbackKey;
pub use capabilities::{AdapterCapabilities, CapabilityRegistry, ClientCapabilities};
pub use client::{DapClient, DrainOutcome, IngestedFrame};
pub use command::{Command, EventKind};
pub use error::{Error, Result};
pub use inbox::{Inbox, InboundFrame};
pub use outbox::{
    Dependency, ExpectedResponse, HandledResponse, Outbox, PendingRequest, RequestPhase,
    ResponseStatus, RetainedContext,
};
pub use process::AdapterProcess;
pub use protocol::*;
pub use session::{EndSessionMode, Session, SessionStart, TickReport};
pub use state::{ConnectionState, Lifecycle, SessionFlavor};
pub use store::{
    OutputEntry, SessionStore, SourceContent, SourceKey, ThreadInfo, ThreadRunState,
};

// Re-export the config types a session is built from
pub use stepline_config::{AdapterSpawnConfig, SessionConfig};
