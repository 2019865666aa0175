//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum/hyper parse, body limit, timeout)
//!     → request.rs (Request record, read-only from here on)
//!     → Pipeline::handle_request (blocking task)
//!     → response.rs (Response record edited by modules)
//!     → server.rs (status, reason, headers, body back to hyper)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Headers, Request};
pub use response::Response;
pub use server::PipelineServer;
