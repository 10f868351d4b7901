//! Configuration types for stepline debug sessions
//!
//! Two concerns live here:
//! - [`AdapterSpawnConfig`]: how to start a debug adapter child process
//! - [`SessionConfig`]: timeouts, polling cadence, and the client identity
//!   advertised during the initialize handshake
//!
//! Reading launch profiles from disk is the front-end's job; this crate only
//! defines the deserializable shapes and their defaults.

pub mod constants;
mod session;
mod spawn;

pub use session::SessionConfig;
pub use spawn::AdapterSpawnConfig;
