//! Request ID module.
//!
//! Copies the client's request id onto the response, or generates a UUID v4
//! when the client sent none, so every response can be correlated in logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use uuid::Uuid;

use crate::http::{Request, Response};
use crate::pipeline::module::stage_option;
use crate::pipeline::{Flow, Module, ModuleError, Options, Registrar, Stage};

pub const KIND: &str = "request_id";

/// Default header name.
pub const X_REQUEST_ID: &str = "X-Request-Id";

/// Options: `stage` (default `really_first`), `header` (default `X-Request-Id`).
#[derive(Debug)]
pub struct RequestIdModule {
    header: ArcSwap<String>,
    running: AtomicBool,
}

impl RequestIdModule {
    pub fn new() -> Self {
        Self {
            header: ArcSwap::from_pointee(X_REQUEST_ID.to_string()),
            running: AtomicBool::new(false),
        }
    }
}

impl Default for RequestIdModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for RequestIdModule {
    fn name(&self) -> &str {
        KIND
    }

    fn start(self: Arc<Self>, registrar: &Registrar<'_>, options: &Options) -> Result<(), ModuleError> {
        let stage = stage_option(KIND, options, Stage::ReallyFirst)?;
        if let Some(header) = options.get("header") {
            if header.trim().is_empty() {
                return Err(ModuleError::invalid_option(KIND, "header", "must not be empty"));
            }
            self.header.store(Arc::new(header.trim().to_string()));
        }
        self.running.store(true, Ordering::SeqCst);
        registrar.hook(self, stage)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ModuleError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ModuleError::NotRunning(KIND.to_string()));
        }
        Ok(())
    }

    fn handle_request(&self, request: &Request, response: &mut Response) -> Flow {
        let header = self.header.load();
        let id = request
            .header_ignore_case(header.as_str())
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        response.set_header(header.as_str(), id);
        Flow::Continue
    }
}
