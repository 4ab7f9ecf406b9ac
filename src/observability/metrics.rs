//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by content class and status
//! - `gateway_request_duration_seconds` (histogram): latency by content class
//! - `gateway_upstream_errors_total` (counter): failures by kind
//! - `gateway_rewrite_fallbacks_total` (counter): rewrites that served the original body
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when metrics are disabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::proxy::ProxyError;
use crate::rewrite::ContentClass;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!("gateway_requests_total", "Total proxied requests");
            describe_histogram!(
                "gateway_request_duration_seconds",
                "End-to-end request duration in seconds"
            );
            describe_counter!("gateway_upstream_errors_total", "Failed requests by error kind");
            describe_counter!(
                "gateway_rewrite_fallbacks_total",
                "Rewrites that fell back to the original body"
            );
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(class: ContentClass, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "class" => class.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "class" => class.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that failed before a response body was produced.
///
/// Only origin-side failures count towards `gateway_upstream_errors_total`;
/// rejected browser requests show up in `gateway_requests_total` alone.
pub fn record_error(error: &ProxyError, start: Instant) {
    if error.is_upstream() {
        counter!("gateway_upstream_errors_total", "kind" => error.kind()).increment(1);
    }
    record_request(ContentClass::Other, error.status().as_u16(), start);
}

/// Record a rewriter falling back to the original body.
pub fn record_rewrite_fallback(class: ContentClass) {
    counter!("gateway_rewrite_fallbacks_total", "class" => class.as_str()).increment(1);
}
