//! Debug session configuration
//!
//! Timeouts, polling cadence, and the client identity advertised to the
//! adapter during the initialize handshake.

use crate::constants::{
    DEFAULT_CLIENT_ID, DEFAULT_CLIENT_NAME, DEFAULT_LOCALE, DEFAULT_PATH_FORMAT,
    DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_WAIT_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a debug session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// ID of the debug adapter ("python", "go", "lldb", ...), sent as
    /// `adapterID` in the initialize request
    pub adapter_id: String,
    /// Client ID sent in the initialize request
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Human-readable client name sent in the initialize request
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Locale sent in the initialize request (ISO 639)
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Path format sent in the initialize request ("path" or "uri")
    #[serde(default = "default_path_format")]
    pub path_format: String,
    /// Lines start at 1 (DAP default) or 0
    #[serde(default = "default_true")]
    pub lines_start_at1: bool,
    /// Columns start at 1 (DAP default) or 0
    #[serde(default = "default_true")]
    pub columns_start_at1: bool,
    /// Timeout for a single bounded frame poll, in milliseconds
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Poll interval of the blocking `wait_for_*` helpers, in milliseconds
    #[serde(default = "default_wait_poll_interval_ms")]
    pub wait_poll_interval_ms: u64,
    /// Grace period before a shutdown escalates to killing the adapter,
    /// in milliseconds
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Extra key/value pairs merged into the launch request arguments
    /// (adapter-specific knobs like `stopOnEntry`)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub launch_extras: serde_json::Map<String, serde_json::Value>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_path_format() -> String {
    DEFAULT_PATH_FORMAT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT_MS
}

fn default_wait_poll_interval_ms() -> u64 {
    DEFAULT_WAIT_POLL_INTERVAL_MS
}

fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

impl SessionConfig {
    /// Create a session config for the given adapter ID with defaults
    pub fn new(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            client_id: default_client_id(),
            client_name: default_client_name(),
            locale: default_locale(),
            path_format: default_path_format(),
            lines_start_at1: true,
            columns_start_at1: true,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            wait_poll_interval_ms: DEFAULT_WAIT_POLL_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            launch_extras: serde_json::Map::new(),
        }
    }

    /// Add an adapter-specific key to the launch request arguments
    pub fn launch_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.launch_extras.insert(key.into(), value);
        self
    }

    /// Bounded frame poll timeout as a [`Duration`]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// `wait_for_*` poll interval as a [`Duration`]
    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    /// Shutdown grace period as a [`Duration`]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_on_deserialize() {
        let config: SessionConfig = serde_json::from_str(r#"{"adapter_id":"lldb"}"#).unwrap();
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.poll_timeout_ms, DEFAULT_POLL_TIMEOUT_MS);
        assert!(config.lines_start_at1);
        assert!(config.launch_extras.is_empty());
    }

    #[test]
    fn launch_extras_round_trip() {
        let config = SessionConfig::new("python")
            .launch_extra("stopOnEntry", serde_json::json!(true));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.launch_extras["stopOnEntry"], serde_json::json!(true));
    }

    #[test]
    fn durations_reflect_millis() {
        let config = SessionConfig::new("go");
        assert_eq!(config.wait_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    }
}
