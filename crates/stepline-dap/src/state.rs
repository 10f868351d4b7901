//! Connection state machine
//!
//! Seven states govern which requests may leave the queue. Transitions are
//! driven by outbound sends (initialize), inbound responses (initialize,
//! launch, attach, disconnect), and the `initialized` event.
//!
//! The `initialized` event is tracked as an orthogonal flag in addition to
//! promoting the state, so the launch/attach flavour of the session is
//! never lost.

use crate::command::Command;
use crate::error::{Error, Result};

/// State of the connection to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No adapter child process exists
    NotSpawned,
    /// Adapter is running, nothing sent yet
    Spawned,
    /// Initialize request sent, awaiting its response
    Initializing,
    /// Initialize response handled; launch/attach may be sent
    PartiallyInitialized,
    /// Launch response handled
    Launched,
    /// Attach response handled
    Attached,
    /// The adapter has emitted `initialized` (or the debuggee detached
    /// again after a disconnect)
    Initialized,
}

/// Whether the session was started with launch or attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlavor {
    Launched,
    Attached,
}

/// Connection lifecycle: the state plus the orthogonal `initialized` flag.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    state: ConnectionState,
    initialized_event_seen: bool,
    flavor: Option<SessionFlavor>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::NotSpawned,
            initialized_event_seen: false,
            flavor: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the `initialized` event has been observed
    pub fn initialized_event_seen(&self) -> bool {
        self.initialized_event_seen
    }

    /// Launch/attach flavour, once known
    pub fn flavor(&self) -> Option<SessionFlavor> {
        self.flavor
    }

    /// The session is ready for the full request catalogue
    pub fn fully_initialized(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Initialized | ConnectionState::Launched | ConnectionState::Attached
        )
    }

    /// The debuggee is running under a launch or attach
    pub fn debuggee_attached(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Launched | ConnectionState::Attached
        ) || (self.state == ConnectionState::Initialized && self.flavor.is_some())
    }

    /// Record that the adapter process was spawned
    pub fn spawn(&mut self) -> Result<()> {
        if self.state != ConnectionState::NotSpawned {
            return Err(Error::AdapterAlreadySpawned);
        }
        self.state = ConnectionState::Spawned;
        Ok(())
    }

    /// Record that a request left the queue
    pub fn on_sent(&mut self, command: Command) {
        if command == Command::Initialize && self.state == ConnectionState::Spawned {
            self.state = ConnectionState::Initializing;
        }
    }

    /// Record a handled successful response, returning the new state
    pub fn on_response(&mut self, command: Command) -> ConnectionState {
        match command {
            Command::Initialize if self.state == ConnectionState::Initializing => {
                self.state = ConnectionState::PartiallyInitialized;
            }
            Command::Launch if self.state == ConnectionState::PartiallyInitialized => {
                self.flavor = Some(SessionFlavor::Launched);
                self.state = if self.initialized_event_seen {
                    ConnectionState::Initialized
                } else {
                    ConnectionState::Launched
                };
            }
            Command::Attach if self.state == ConnectionState::PartiallyInitialized => {
                self.flavor = Some(SessionFlavor::Attached);
                self.state = if self.initialized_event_seen {
                    ConnectionState::Initialized
                } else {
                    ConnectionState::Attached
                };
            }
            // The debuggee is gone but the adapter may still be reachable
            Command::Disconnect => {
                self.state = ConnectionState::Initialized;
            }
            _ => {}
        }
        self.state
    }

    /// Record the `initialized` event
    pub fn on_initialized_event(&mut self) {
        self.initialized_event_seen = true;
        if matches!(
            self.state,
            ConnectionState::Launched | ConnectionState::Attached
        ) {
            self.state = ConnectionState::Initialized;
        }
    }

    /// Record that the adapter process exited; the connection resets
    pub fn on_adapter_exit(&mut self) {
        *self = Self::new();
    }

    /// Whether the current state permits sending `command`.
    ///
    /// Launch and attach are only sendable in `PartiallyInitialized`;
    /// configuration requests become sendable there too, so breakpoints can
    /// land between the `initialized` event and `configurationDone`.
    pub fn permits(&self, command: Command) -> bool {
        use ConnectionState::*;

        match self.state {
            NotSpawned => false,
            Spawned => command == Command::Initialize,
            // The initialize response has not arrived yet
            Initializing => false,
            PartiallyInitialized => matches!(
                command,
                Command::Launch
                    | Command::Attach
                    | Command::SetBreakpoints
                    | Command::SetFunctionBreakpoints
                    | Command::SetInstructionBreakpoints
                    | Command::SetExceptionBreakpoints
                    | Command::SetDataBreakpoints
                    | Command::ConfigurationDone
                    | Command::Disconnect
                    | Command::Terminate
                    | Command::Cancel
            ),
            // Only one initialize per connection lifetime
            Launched | Attached | Initialized => command != Command::Initialize,
        }
    }
}
