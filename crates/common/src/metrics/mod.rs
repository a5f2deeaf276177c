//! Metrics and observability utilities
//!
//! Prometheus metric registration with standardized naming.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all Paperflow metrics
pub const METRICS_PREFIX: &str = "paperflow";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_papers_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of papers created"
    );

    describe_counter!(
        format!("{}_papers_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of papers deleted"
    );

    describe_counter!(
        format!("{}_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of verification transitions, labeled by to-state"
    );

    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );
}
