// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the module operator.
//!
//! All metrics carry the namespace prefix `platform_firestoned_io_`
//! (prometheus-safe version of "platform.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Outcome and duration of every reconcile pass
//! - **Lifecycle Metrics** - Conditions recorded and delegate operations run
//! - **Error Metrics** - Errors by category
//!
//! # Example
//!
//! ```rust,no_run
//! use module_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success(std::time::Duration::from_secs(1));
//! ```

use crate::constants::KIND_MODULE_LIFECYCLE;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "platform_firestoned_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`ModuleLifecycle`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`in_progress`, `not_ready`, `conflict`, `error`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Lifecycle Metrics
// ============================================================================

/// Total number of lifecycle conditions recorded
///
/// Labels:
/// - `condition`: Condition type (e.g. `InstallStarted`)
pub static CONDITIONS_RECORDED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_lifecycle_conditions_total"),
        "Total number of lifecycle conditions recorded by type",
    );
    let counter = CounterVec::new(opts, &["condition"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of delegate operations
///
/// Labels:
/// - `delegate`: Delegate name (e.g. `helm`)
/// - `operation`: Lifecycle operation (e.g. `install`)
/// - `outcome`: `success` or `failure`
pub static DELEGATE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_delegate_operations_total"),
        "Total number of delegate lifecycle operations by outcome",
    );
    let counter = CounterVec::new(opts, &["delegate", "operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category of error (`configuration`, `delegate`, `kube_api`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[KIND_MODULE_LIFECYCLE, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[KIND_MODULE_LIFECYCLE])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `error_type` - Category of error, see [`crate::errors::LifecycleError::kind`]
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(error_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[KIND_MODULE_LIFECYCLE, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[KIND_MODULE_LIFECYCLE])
        .observe(duration.as_secs_f64());
    ERRORS_TOTAL
        .with_label_values(&[KIND_MODULE_LIFECYCLE, error_type])
        .inc();
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `reason` - Reason for requeue (e.g. `not_ready`, `conflict`)
pub fn record_reconciliation_requeue(reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[KIND_MODULE_LIFECYCLE, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[KIND_MODULE_LIFECYCLE, reason])
        .inc();
}

/// Record a lifecycle condition being appended
pub fn record_condition(condition: &str) {
    CONDITIONS_RECORDED_TOTAL
        .with_label_values(&[condition])
        .inc();
}

/// Record the outcome of a delegate operation
pub fn record_delegate_operation(delegate: &str, operation: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    DELEGATE_OPERATIONS_TOTAL
        .with_label_values(&[delegate, operation, outcome])
        .inc();
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
