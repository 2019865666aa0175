//! Configuration schema definitions.
//!
//! This module defines the configuration file structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::Options;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Options passed to `Pipeline::configure`.
    pub pipeline: Options,

    /// Modules to load at startup, in load order.
    pub modules: Vec<ModuleConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Configuration used when no file is given: request id, echo and
    /// response log modules.
    pub fn with_default_modules() -> Self {
        Self {
            modules: vec![
                ModuleConfig::new("request-id", "request_id"),
                ModuleConfig::new("echo", "echo"),
                ModuleConfig::new("response-log", "response_log"),
            ],
            ..Self::default()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:4242").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (read body + dispatch) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4242".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// One module instance to load.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModuleConfig {
    /// Unique instance name.
    pub name: String,

    /// Module kind, see `modules::KINDS`.
    pub kind: String,

    /// Options passed to `Module::start`.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: HashMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listener.bind_address, "127.0.0.1:4242");
        assert!(config.modules.is_empty());
    }

    #[test]
    fn full_document_parses() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "0.0.0.0:8080"
            max_body_bytes = 2048

            [pipeline]
            "response.reason" = "Nobody home"

            [[modules]]
            name = "hello"
            kind = "echo"
            [modules.options]
            stage = "first"

            [[modules]]
            name = "log"
            kind = "response_log"

            [observability]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.listener.max_body_bytes, 2048);
        assert_eq!(config.listener.request_timeout_secs, 30);
        assert_eq!(config.pipeline.get("response.reason").map(String::as_str), Some("Nobody home"));
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].options.get("stage").map(String::as_str), Some("first"));
        assert!(config.modules[1].options.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_log_format_fails_to_parse() {
        let result: Result<ServerConfig, _> = toml::from_str("[observability]\nlog_format = \"xml\"");
        assert!(result.is_err());
    }

    #[test]
    fn default_modules_cover_a_full_request() {
        let config = ServerConfig::with_default_modules();
        let kinds: Vec<_> = config.modules.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, ["request_id", "echo", "response_log"]);
    }
}
