//! Staged request pipeline library.
//!
//! Modules hook into one of five stages and edit a shared response record;
//! the HTTP boundary turns that record back into a wire response.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod modules;
pub mod observability;
pub mod pipeline;

pub use config::ServerConfig;
pub use http::{PipelineServer, Request, Response};
pub use lifecycle::{ModuleHost, Shutdown};
pub use pipeline::{Flow, Module, ModuleError, Options, Pipeline, PipelineError, Registrar, Stage};
