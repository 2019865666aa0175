//! Options recognized by `Pipeline::configure`.
//!
//! | key                    | effect                                       |
//! |------------------------|----------------------------------------------|
//! | `response.version`     | protocol version of the default response     |
//! | `response.status`      | status code of the default response (100-999)|
//! | `response.reason`      | reason phrase of the default response        |
//! | `response.header.<N>`  | baseline header `<N>`; empty value removes it|
//!
//! Every other key is ignored.

use crate::http::{Headers, Response};
use crate::pipeline::error::PipelineError;
use crate::pipeline::Options;

pub const VERSION_KEY: &str = "response.version";
pub const STATUS_KEY: &str = "response.status";
pub const REASON_KEY: &str = "response.reason";
pub const HEADER_PREFIX: &str = "response.header.";

/// Status of a response no module has handled.
pub const NOT_HANDLED_STATUS: u16 = 501;
pub const NOT_HANDLED_REASON: &str = "Request not handled";

/// Template for the response every dispatch starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let mut headers = Headers::new();
        headers.insert(
            "Server".to_string(),
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        );
        headers.insert("Content-Type".to_string(), "text/html".to_string());
        headers.insert("Connection".to_string(), "keep-alive".to_string());

        Self {
            version: "HTTP/1.1".to_string(),
            status: NOT_HANDLED_STATUS,
            reason: NOT_HANDLED_REASON.to_string(),
            headers,
        }
    }
}

impl PipelineSettings {
    /// Build settings from the defaults plus `options`.
    ///
    /// Fails on the first invalid recognized option; nothing is returned
    /// half-applied.
    pub fn from_options(options: &Options) -> Result<Self, PipelineError> {
        let mut settings = Self::default();

        // Sorted so that error reporting is deterministic.
        let mut entries: Vec<_> = options.iter().collect();
        entries.sort();

        for (key, value) in entries {
            match key.as_str() {
                VERSION_KEY => {
                    if value.trim().is_empty() {
                        return Err(invalid(key, value, "version must not be empty"));
                    }
                    settings.version = value.trim().to_string();
                }
                STATUS_KEY => {
                    settings.status = parse_status(value).ok_or_else(|| {
                        invalid(key, value, "expected an integer between 100 and 999")
                    })?;
                }
                REASON_KEY => settings.reason = value.clone(),
                _ => match key.strip_prefix(HEADER_PREFIX) {
                    Some("") => return Err(invalid(key, value, "header name is missing")),
                    Some(name) if value.is_empty() => {
                        settings.headers.remove(name);
                    }
                    Some(name) => {
                        settings.headers.insert(name.to_string(), value.clone());
                    }
                    None => tracing::debug!(option = %key, "Ignoring unknown pipeline option"),
                },
            }
        }

        Ok(settings)
    }

    /// A fresh "not handled" response.
    pub fn default_response(&self) -> Response {
        Response {
            version: self.version.clone(),
            status: self.status,
            reason: self.reason.clone(),
            headers: self.headers.clone(),
            body: Vec::new(),
        }
    }
}

fn parse_status(value: &str) -> Option<u16> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|status| (100..=999).contains(status))
}

fn invalid(key: &str, value: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
