//! Echo module: answers every request with a page describing it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::http::{Request, Response};
use crate::pipeline::module::stage_option;
use crate::pipeline::{Flow, Module, ModuleError, Options, Registrar, Stage};

pub const KIND: &str = "echo";
const DEFAULT_REASON: &str = "Request received";

/// Sets `200` and an HTML body listing method, version and target.
///
/// Options: `stage` (default `first`), `reason`.
#[derive(Debug)]
pub struct EchoModule {
    reason: ArcSwap<String>,
    running: AtomicBool,
}

impl EchoModule {
    pub fn new() -> Self {
        Self {
            reason: ArcSwap::from_pointee(DEFAULT_REASON.to_string()),
            running: AtomicBool::new(false),
        }
    }
}

impl Default for EchoModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for EchoModule {
    fn name(&self) -> &str {
        KIND
    }

    fn start(self: Arc<Self>, registrar: &Registrar<'_>, options: &Options) -> Result<(), ModuleError> {
        let stage = stage_option(KIND, options, Stage::First)?;
        if let Some(reason) = options.get("reason") {
            self.reason.store(Arc::new(reason.clone()));
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
        response.set_status(200, self.reason.load().as_str());
        response.set_body(format!(
            "<h2>Method: {}</h2>\n<h2>Version: {}</h2>\n<h2>Target: {}</h2>",
            escape_html(request.method()),
            escape_html(request.version()),
            escape_html(request.target()),
        ));
        Flow::Continue
    }
}

/// Minimal HTML escaping for reflected request data.
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
