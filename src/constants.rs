// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the module operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all module operator CRDs
pub const API_GROUP: &str = "platform.firestoned.io";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "platform.firestoned.io/v1alpha1";

/// Kind name for `ModuleLifecycle` resource
pub const KIND_MODULE_LIFECYCLE: &str = "ModuleLifecycle";

/// Finalizer placed on every `ModuleLifecycle` until uninstall completes
pub const MODULE_LIFECYCLE_FINALIZER: &str = "modulelifecycle.platform.firestoned.io/finalizer";

/// Field manager name used for server-side operations
pub const FIELD_MANAGER: &str = "module-operator";

// ============================================================================
// Condition History Constants
// ============================================================================

/// Maximum number of conditions retained in `status.conditions`
pub const DEFAULT_CONDITION_LIMIT: usize = 5;

/// Condition status value written for every lifecycle milestone
pub const CONDITION_STATUS_TRUE: &str = "True";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Lower bound of the randomized requeue delay (in `REQUEUE_UNIT`)
pub const DEFAULT_REQUEUE_MIN: u64 = 2;

/// Upper bound of the randomized requeue delay (in `REQUEUE_UNIT`)
pub const DEFAULT_REQUEUE_MAX: u64 = 5;

/// Requeue duration for controller errors surfaced through the error policy (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Default number of resources reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 10;

// ============================================================================
// Helm Constants
// ============================================================================

/// Default helm executable, resolved through `PATH`
pub const DEFAULT_HELM_BINARY: &str = "helm";

/// Helm release status reported once a release is fully deployed
pub const HELM_STATUS_DEPLOYED: &str = "deployed";

/// Secret key holding the chart repository username
pub const REPOSITORY_USERNAME_KEY: &str = "username";

/// Secret key holding the chart repository password
pub const REPOSITORY_PASSWORD_KEY: &str = "password";

// ============================================================================
// Logging Constants
// ============================================================================

/// Minimum interval between repeated progress messages at info level
pub const PROGRESS_LOG_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
