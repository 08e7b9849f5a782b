//! Prometheus metrics for wisdom-service.
//!
//! HTTP request metrics come from the `metrics` recorder installed here and
//! fed by `service_core::middleware::metrics`. Upstream and quote metrics live
//! in a dedicated `prometheus` registry. Both are rendered by [`get_metrics`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static UPSTREAM_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static UPSTREAM_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static QUOTE_OUTCOMES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize all metrics. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    INIT.call_once(register_metrics);
}

fn register_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }

    let registry = Registry::new();

    let upstream_latency = HistogramVec::new(
        HistogramOpts::new(
            "wisdom_upstream_latency_seconds",
            "Latency of calls to embedding, index and generation services",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "operation"],
    )
    .expect("Failed to create wisdom_upstream_latency_seconds metric");

    let upstream_errors = IntCounterVec::new(
        Opts::new(
            "wisdom_upstream_errors_total",
            "Failed calls to upstream services",
        ),
        &["provider", "kind"],
    )
    .expect("Failed to create wisdom_upstream_errors_total metric");

    let quote_outcomes = IntCounterVec::new(
        Opts::new("wisdom_quote_outcomes_total", "Quote handler results by outcome"),
        &["outcome"],
    )
    .expect("Failed to create wisdom_quote_outcomes_total metric");

    registry
        .register(Box::new(upstream_latency.clone()))
        .expect("Failed to register wisdom_upstream_latency_seconds");
    registry
        .register(Box::new(upstream_errors.clone()))
        .expect("Failed to register wisdom_upstream_errors_total");
    registry
        .register(Box::new(quote_outcomes.clone()))
        .expect("Failed to register wisdom_quote_outcomes_total");

    let _ = REGISTRY.set(registry);
    let _ = UPSTREAM_LATENCY_SECONDS.set(upstream_latency);
    let _ = UPSTREAM_ERRORS_TOTAL.set(upstream_errors);
    let _ = QUOTE_OUTCOMES_TOTAL.set(quote_outcomes);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            output.push_str("# Metrics registry not initialized\n");
            return output;
        }
    };

    match TextEncoder::new().encode_to_string(&registry.gather()) {
        Ok(custom) => output.push_str(&custom),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            output.push_str(&format!("# Failed to encode metrics: {}\n", e));
        }
    }

    output
}

// Helper functions for recording metrics

/// Record the latency of one upstream call.
pub fn record_upstream_call(provider: &str, operation: &str, duration_secs: f64) {
    if let Some(histogram) = UPSTREAM_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, operation])
            .observe(duration_secs);
    }
}

/// Record a failed upstream call.
pub fn record_upstream_error(provider: &str, kind: &str) {
    if let Some(counter) = UPSTREAM_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, kind]).inc();
    }
}

/// Record how a quote request was satisfied.
pub fn record_quote_outcome(outcome: &str) {
    if let Some(counter) = QUOTE_OUTCOMES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}
