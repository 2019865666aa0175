//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pipeline_dispatch_total` (counter): dispatches by method, status
//! - `pipeline_dispatch_duration_seconds` (histogram): dispatch latency
//! - `pipeline_registered_modules` (gauge): hook entries across all stages

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Metric label for a request method. Extension methods are folded into
/// `OTHER` so clients cannot grow the label set.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Record one finished dispatch.
pub fn record_dispatch(method: &str, status: u16, start: Instant) {
    let method = method_label(method);
    let status = status.to_string();
    counter!(
        "pipeline_dispatch_total",
        "method" => method,
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "pipeline_dispatch_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn set_registered_modules(count: usize) {
    gauge!("pipeline_registered_modules").set(count as f64);
}
