// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the ingress-lb controller.
//!
//! All metrics carry the `ingress_lb_` prefix.
//!
//! # Metrics Categories
//!
//! - **Sync Metrics** - Outcome and duration of reconciliation passes
//! - **Reload Metrics** - How each pass was applied to nghttpx
//! - **Error Metrics** - Why applying a configuration failed
//!
//! # Example
//!
//! ```rust,no_run
//! use ingress_lb::metrics::record_sync_success;
//!
//! record_sync_success(std::time::Duration::from_millis(20));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all controller metrics
const METRICS_NAMESPACE: &str = "ingress_lb";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Sync Metrics
// ============================================================================

/// Total number of reconciliation passes by result
///
/// Labels:
/// - `result`: Outcome (`success`, `error`)
pub static SYNCS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_syncs_total"),
        "Total number of reconciliation passes by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds
pub static SYNC_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sync_duration_seconds"),
        "Duration of reconciliation passes in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Number of upstreams in the last applied configuration
pub static UPSTREAMS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_upstreams"),
        "Number of upstreams in the last derived configuration",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Reload Metrics
// ============================================================================

/// Total number of reload decisions by kind
///
/// Labels:
/// - `kind`: Action taken (`full`, `backend`, `none`)
pub static RELOADS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reloads_total"),
        "Total number of reload decisions by kind",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of failed applies by reason
///
/// Labels:
/// - `reason`: Failure category (`io`, `http`, `rejected`, `signal`, `timeout`)
pub static APPLY_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_apply_errors_total"),
        "Total number of failed configuration applies by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful pass
///
/// # Arguments
/// * `duration` - Duration of the pass
pub fn record_sync_success(duration: Duration) {
    SYNCS_TOTAL.with_label_values(&["success"]).inc();
    SYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a failed pass
///
/// # Arguments
/// * `duration` - Duration of the pass before failure
pub fn record_sync_error(duration: Duration) {
    SYNCS_TOTAL.with_label_values(&["error"]).inc();
    SYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record the reload decision of a pass
///
/// # Arguments
/// * `kind` - `full`, `backend` or `none`
pub fn record_reload(kind: &str) {
    RELOADS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a failed apply
///
/// # Arguments
/// * `reason` - Failure category
pub fn record_apply_error(reason: &str) {
    APPLY_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record the size of the derived topology
#[allow(clippy::cast_precision_loss)]
pub fn record_upstreams(count: usize) {
    UPSTREAMS.set(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
