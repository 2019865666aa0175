//! The module contract.
//!
//! A module is one unit of request-handling or response-shaping logic.
//! It registers itself during `start`, gets called once per hook entry for
//! every dispatch, and releases its resources in `stop`.

use std::sync::Arc;

use crate::http::{Request, Response};
use crate::pipeline::error::ModuleError;
use crate::pipeline::registry::Registrar;
use crate::pipeline::stage::Stage;
use crate::pipeline::Options;

/// What the pipeline should do after a module has handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep calling the remaining modules.
    #[default]
    Continue,
    /// The response is final: skip every remaining module and stage.
    Halt,
}

/// A pluggable unit of request handling.
///
/// Modules are shared between the pipeline and whoever created them, so
/// `handle_request` takes `&self` and may be called from several dispatch
/// threads at once. Internal state belongs behind atomics or locks.
pub trait Module: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Register with the pipeline through `registrar`.
    ///
    /// `options` is the module's flat option map. A failed start must leave
    /// the module unregistered.
    fn start(self: Arc<Self>, registrar: &Registrar<'_>, options: &Options) -> Result<(), ModuleError>;

    /// Release resources. Unhooking is the caller's job.
    fn stop(&self) -> Result<(), ModuleError>;

    /// Read `request` and edit `response` in place.
    ///
    /// Internal failures should be expressed as an error status on the
    /// response rather than by panicking.
    fn handle_request(&self, request: &Request, response: &mut Response) -> Flow;
}

/// Stage requested through the `stage` option, or `default` if absent.
pub fn stage_option(module: &str, options: &Options, default: Stage) -> Result<Stage, ModuleError> {
    match options.get("stage") {
        None => Ok(default),
        Some(raw) => raw
            .parse::<Stage>()
            .map_err(|e| ModuleError::invalid_option(module, "stage", e.to_string())),
    }
}

/// Boolean option accepting `true/false`, `yes/no`, `on/off` and `1/0`.
pub fn bool_option(module: &str, options: &Options, key: &str, default: bool) -> Result<bool, ModuleError> {
    let Some(raw) = options.get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ModuleError::invalid_option(module, key, format!("expected a boolean, got {raw:?}"))),
    }
}
