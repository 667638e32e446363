// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for module lifecycle reconciliation.
//!
//! The taxonomy separates outcomes the controller expects and simply retries
//! (a workload still converging, a write that lost an optimistic-concurrency race)
//! from configuration defects that need an operator, and from genuine failures of
//! a delegate or of the Kubernetes API.

use thiserror::Error;

/// Errors produced while reconciling a `ModuleLifecycle`.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The deployed workload is still converging.
    ///
    /// Expected steady state while a release rolls out. Produces a scheduled retry
    /// without touching the condition history.
    #[error("Module {namespace}/{name} is not ready yet")]
    NotReady {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
    },

    /// The resource changed between read and write (HTTP 409).
    ///
    /// Expected under concurrent writers. Absorbed by the controller and retried.
    #[error("Conflict writing {what} for {namespace}/{name}: resource was modified concurrently")]
    Conflict {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
        /// Which write lost the race (e.g. "status", "finalizers")
        what: &'static str,
    },

    /// The installer descriptor is empty.
    #[error("No installer specified for module {namespace}/{name}")]
    NoInstaller {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
    },

    /// The installer descriptor names a kind no delegate implements.
    #[error("Installer kind '{kind}' for module {namespace}/{name} is not implemented")]
    UnimplementedInstaller {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
        /// Installer kind found in the spec
        kind: String,
    },

    /// The spec is malformed (e.g. an unparsable repository URL).
    #[error("Invalid spec for module {namespace}/{name}: {reason}")]
    InvalidSpec {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
        /// What is wrong with the spec
        reason: String,
    },

    /// A delegate lifecycle operation failed.
    #[error("{operation} failed for module {namespace}/{name}: {source:#}")]
    Delegate {
        /// Namespace of the `ModuleLifecycle`
        namespace: String,
        /// Name of the `ModuleLifecycle`
        name: String,
        /// Lifecycle operation that failed (e.g. "Install")
        operation: &'static str,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// Any other Kubernetes API failure.
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl LifecycleError {
    /// True for the expected "still converging" outcome.
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, LifecycleError::NotReady { .. })
    }

    /// True when a write lost an optimistic-concurrency race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, LifecycleError::Conflict { .. })
            || matches!(self, LifecycleError::Kube(kube::Error::Api(e)) if e.code == 409)
    }

    /// True for spec defects that need operator intervention.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LifecycleError::NoInstaller { .. }
                | LifecycleError::UnimplementedInstaller { .. }
                | LifecycleError::InvalidSpec { .. }
        )
    }

    /// Short label used for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::NotReady { .. } => "not_ready",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::NoInstaller { .. }
            | LifecycleError::UnimplementedInstaller { .. }
            | LifecycleError::InvalidSpec { .. } => "configuration",
            LifecycleError::Delegate { .. } => "delegate",
            LifecycleError::Kube(_) => "kube_api",
        }
    }
}

/// True when a Kubernetes API error is an optimistic-concurrency conflict (HTTP 409).
#[must_use]
pub fn is_conflict_error(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
