//! Incoming request record.
//!
//! # Responsibilities
//! - Carry the parsed request line, headers and body into the pipeline
//! - Stay read-only once built, so every module sees the same request
//!
//! # Design Decisions
//! - Fields are private; modules only get `&Request` and getters
//! - Header keys are stored exactly as the collaborator hands them over
//! - Construction uses consuming builders, no `&mut` access afterwards

use std::collections::BTreeMap;

/// Header mapping shared by requests and responses.
pub type Headers = BTreeMap<String, String>;

/// A parsed HTTP request, immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    method: String,
    target: String,
    version: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    /// Create a request from its request line.
    pub fn new(
        method: impl Into<String>,
        target: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            version: version.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Add a header. A later call with the same name replaces the value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the whole header map.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target as received (path plus optional query).
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Look up a header by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Look up a header ignoring ASCII case.
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.target)
    }
}
