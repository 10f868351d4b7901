//! Default values shared by the configuration types
//!
//! Centralizes the magic numbers so the session and spawn configs stay
//! consistent with each other and with the documentation.

/// Default timeout for a single bounded frame poll, in milliseconds.
///
/// One tick performs at most one poll, so this bounds how long a UI frame
/// can block on the adapter's output stream.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;

/// Poll interval used by the blocking `wait_for_*` helpers, in milliseconds.
///
/// Teardown paths loop one-second polls until the awaited message arrives.
pub const DEFAULT_WAIT_POLL_INTERVAL_MS: u64 = 1_000;

/// How long a graceful shutdown waits for the adapter to answer a
/// `terminate`/`disconnect` request before escalating to `kill`, in
/// milliseconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Client ID reported in the initialize request.
pub const DEFAULT_CLIENT_ID: &str = "stepline";

/// Human-readable client name reported in the initialize request.
pub const DEFAULT_CLIENT_NAME: &str = "Stepline";

/// Locale reported in the initialize request (ISO 639).
pub const DEFAULT_LOCALE: &str = "en-US";

/// Path format reported in the initialize request.
pub const DEFAULT_PATH_FORMAT: &str = "path";
