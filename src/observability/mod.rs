//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (dispatch counters, latency, registry size)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted strings
//! - Metric macros are no-ops until a recorder is installed, so the
//!   pipeline can be used as a library without any setup

pub mod logging;
pub mod metrics;
