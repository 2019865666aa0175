//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Pipeline::configure → ModuleHost::load (per module)
//!
//! Running (host.rs):
//!     load/unload by instance name, stop before unhook
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger → server stops accepting → stop all modules
//! ```
//!
//! # Design Decisions
//! - Ordered startup: pipeline options first, then modules, then listener
//! - Ordered shutdown: stop accepting, drain, stop modules

pub mod host;
pub mod shutdown;
pub mod startup;

pub use host::{HostError, ModuleHost};
pub use shutdown::Shutdown;
pub use startup::{build_pipeline, build_pipeline_with, StartupError};
