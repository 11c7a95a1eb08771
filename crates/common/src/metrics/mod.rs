//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Rabbit Hole metrics
pub const METRICS_PREFIX: &str = "rabbithole";

/// Histogram buckets for upstream latency (in seconds)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Upstream metrics
    describe_counter!(
        format!("{}_scholar_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total Semantic Scholar API requests"
    );

    describe_histogram!(
        format!("{}_scholar_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Semantic Scholar API latency in seconds"
    );

    // Graph metrics
    describe_counter!(
        format!("{}_graph_builds_total", METRICS_PREFIX),
        Unit::Count,
        "Total citation graphs built"
    );

    describe_histogram!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes per built graph"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record one upstream call
pub fn record_scholar_request(operation: &str, status: &str, duration_secs: f64) {
    counter!(
        format!("{}_scholar_requests_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_scholar_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a graph build
pub fn record_graph_build(node_count: usize) {
    counter!(format!("{}_graph_builds_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_graph_nodes", METRICS_PREFIX)).record(node_count as f64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in UPSTREAM_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No global recorder installed: every helper is a no-op
        let metrics = RequestMetrics::start("GET", "/");
        metrics.finish(200);
        record_scholar_request("search", "200", 0.12);
        record_graph_build(7);
        record_cache(true, "graph");
    }
}
