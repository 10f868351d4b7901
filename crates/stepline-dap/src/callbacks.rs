//! One-shot message callbacks
//!
//! Collaborators can register an action to run when a response to a given
//! command (with a given status) or an event of a given kind is handled.
//! Each entry fires at most once: the handler consults the ordered list,
//! runs every matching entry with the raw message, and removes them.

use crate::command::{Command, EventKind};
use crate::outbox::ResponseStatus;

/// What a callback is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKey {
    /// A response to `command` handled with `status`
    Response {
        command: Command,
        status: ResponseStatus,
    },
    /// An event of this kind handled
    Event(EventKind),
}

type CallbackFn = Box<dyn FnOnce(&serde_json::Value) + Send>;

/// Ordered table of one-shot callbacks.
#[derive(Default)]
pub struct Callbacks {
    entries: Vec<(CallbackKey, CallbackFn)>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot action for the key
    pub fn register<F>(&mut self, key: CallbackKey, action: F)
    where
        F: FnOnce(&serde_json::Value) + Send + 'static,
    {
        self.entries.push((key, Box::new(action)));
    }

    /// Run and remove every entry matching the key, in registration order.
    /// Returns how many fired.
    pub fn fire(&mut self, key: CallbackKey, raw: &serde_json::Value) -> usize {
        let mut fired = 0;
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].0 == key {
                let (_, action) = self.entries.remove(index);
                action(raw);
                fired += 1;
            } else {
                index += 1;
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
