//! Response log module: reports the finished response as a tracing event.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::http::{Request, Response};
use crate::pipeline::module::{bool_option, stage_option};
use crate::pipeline::{Flow, Module, ModuleError, Options, Registrar, Stage};

pub const KIND: &str = "response_log";

/// Options: `stage` (default `really_last`), `include_body` (default `false`).
#[derive(Debug, Default)]
pub struct ResponseLogModule {
    include_body: AtomicBool,
    logged: AtomicU64,
    running: AtomicBool,
}

impl ResponseLogModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses logged since creation.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl Module for ResponseLogModule {
    fn name(&self) -> &str {
        KIND
    }

    fn start(self: Arc<Self>, registrar: &Registrar<'_>, options: &Options) -> Result<(), ModuleError> {
        let stage = stage_option(KIND, options, Stage::ReallyLast)?;
        let include_body = bool_option(KIND, options, "include_body", false)?;
        self.include_body.store(include_body, Ordering::Relaxed);
        self.running.store(true, Ordering::SeqCst);
        registrar.hook(self, stage)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ModuleError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ModuleError::NotRunning(KIND.to_string()));
        }
        tracing::info!(logged = self.logged(), "Response log stopped");
        Ok(())
    }

    fn handle_request(&self, request: &Request, response: &mut Response) -> Flow {
        self.logged.fetch_add(1, Ordering::Relaxed);
        let headers = response
            .headers
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");

        if self.include_body.load(Ordering::Relaxed) {
            tracing::info!(
                method = %request.method(),
                target = %request.target(),
                version = %response.version,
                status = response.status,
                reason = %response.reason,
                headers = %headers,
                body = %response.body_text(),
                "Response"
            );
        } else {
            tracing::info!(
                method = %request.method(),
                target = %request.target(),
                version = %response.version,
                status = response.status,
                reason = %response.reason,
                headers = %headers,
                body_bytes = response.body.len(),
                "Response"
            );
        }
        Flow::Continue
    }
}
