//! Request pipeline core.
//!
//! # Data Flow
//! ```text
//! Module::start(registrar, options)
//!     → registry.rs (hook into one of five stages)
//!
//! Request (from boundary collaborator)
//!     → registry.rs (fresh default Response from settings.rs)
//!     → REALLY_FIRST → FIRST → MIDDLE → LAST → REALLY_LAST
//!       (modules in hook order within each stage, Flow::Halt stops early)
//!     → Response (back to collaborator)
//! ```
//!
//! # Design Decisions
//! - Stage set is closed: a fixed table, not a priority queue
//! - Invalid stages are rejected at hook time, never at dispatch
//! - Modules get a scoped `Registrar`, not a pointer to the pipeline

use std::collections::HashMap;

pub mod error;
pub mod module;
pub mod registry;
pub mod settings;
pub mod stage;

/// Flat option map passed to `Pipeline::configure` and `Module::start`.
pub type Options = HashMap<String, String>;

pub use error::{ModuleError, PipelineError};
pub use module::{Flow, Module};
pub use registry::{Pipeline, Registrar};
pub use settings::PipelineSettings;
pub use stage::Stage;
