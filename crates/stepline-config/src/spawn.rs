//! Adapter spawn configuration
//!
//! Describes how to start a debug adapter as a child process: the argv
//! vector, environment overrides, and working directory. The launch-profile
//! loader that produces these values from user configuration lives with the
//! front-end; this crate only defines the shape.

use serde::{Deserialize, Serialize};

/// How to spawn a debug adapter child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSpawnConfig {
    /// Executable to run (e.g. `codelldb`, `debugpy-adapter`)
    pub command: String,
    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables set for the child process
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Working directory for the child process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl AdapterSpawnConfig {
    /// Create a spawn config for the given executable
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory for the child
    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_args_and_env() {
        let config = AdapterSpawnConfig::new("codelldb")
            .arg("--port")
            .arg("0")
            .env("RUST_LOG", "debug")
            .cwd("/tmp/project");

        assert_eq!(config.command, "codelldb");
        assert_eq!(config.args, vec!["--port", "0"]);
        assert_eq!(config.env, vec![("RUST_LOG".to_string(), "debug".to_string())]);
        assert_eq!(config.cwd, Some("/tmp/project".to_string()));
    }

    #[test]
    fn serde_round_trip() {
        let config = AdapterSpawnConfig::new("debugpy-adapter").arg("--log-stderr");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AdapterSpawnConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_optional_fields_default() {
        let parsed: AdapterSpawnConfig =
            serde_json::from_str(r#"{"command":"dlv"}"#).unwrap();
        assert!(parsed.args.is_empty());
        assert!(parsed.env.is_empty());
        assert!(parsed.cwd.is_none());
    }
}
