//! Outgoing response record.
//!
//! # Responsibilities
//! - Hold the status line, headers and body that modules build up
//! - Offer small helpers for the edits modules make most often
//!
//! # Design Decisions
//! - Fields are public: any module may overwrite any part
//! - A fresh response is built per dispatch and owned by that dispatch only
//! - Headers are kept in a sorted map so serialization order is stable

use std::borrow::Cow;

pub use crate::http::request::Headers;

/// A response under construction by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    /// Set status code and reason phrase together.
    pub fn set_status(&mut self, status: u16, reason: impl Into<String>) {
        self.status = status;
        self.reason = reason.into();
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Append to the existing body.
    pub fn append_body(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Body decoded as UTF-8, lossy.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_helpers() {
        let mut res = Response::default();
        res.set_body("hello");
        res.append_body(" world");
        assert_eq!(res.body_text(), "hello world");
    }

    #[test]
    fn status_and_headers() {
        let mut res = Response::default();
        res.set_status(404, "Not Found");
        res.set_header("Content-Type", "text/plain");

        assert_eq!(res.status, 404);
        assert_eq!(res.reason, "Not Found");
        assert_eq!(res.header("Content-Type"), Some("text/plain"));
        assert!(!res.is_success());

        assert_eq!(res.remove_header("Content-Type").as_deref(), Some("text/plain"));
        assert_eq!(res.header("Content-Type"), None);
    }

    #[test]
    fn status_classes() {
        let mut res = Response::default();
        res.status = 200;
        assert!(res.is_success());
        res.status = 503;
        assert!(res.is_server_error());
    }
}
