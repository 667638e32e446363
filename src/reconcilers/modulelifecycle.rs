// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ModuleLifecycle` reconciliation entry point.
//!
//! [`ModuleLifecycleReconciler::reconcile`] is called by the controller runtime for
//! one resource key at a time. It:
//!
//! 1. Fetches the resource (a missing resource is already deleted).
//! 2. Skips resources that are Ready at their current generation and still carry
//!    the finalizer.
//! 3. Resolves the delegate.
//! 4. Lets the [`PhaseDriver`] advance the lifecycle by one step.
//! 5. Translates the outcome into a [`RequeueDirective`].
//!
//! Not-ready and write-conflict outcomes are expected and become a jittered
//! requeue. Every other error is returned to the caller.

use super::driver::{PassOutcome, PhaseDriver};
use super::finalizers::has_finalizer;
use super::generation_observed;
use super::resolver::DelegateResolver;
use super::retry::{RequeueDirective, RequeuePolicy};
use super::status::StatusManager;
use crate::constants::MODULE_LIFECYCLE_FINALIZER;
use crate::crd::{LifecycleState, ModuleLifecycle};
use crate::errors::LifecycleError;
use crate::logging::LoggerCache;
use crate::metrics;
use crate::store::{LifecycleStore, ResourceKey, StatusWriter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Tunables of the reconciler.
#[derive(Clone, Copy, Debug)]
pub struct ReconcilerSettings {
    /// Maximum number of conditions kept in `status.conditions`
    pub condition_limit: usize,
    /// Bounds of the jittered requeue delay
    pub requeue: RequeuePolicy,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            condition_limit: crate::constants::DEFAULT_CONDITION_LIMIT,
            requeue: RequeuePolicy::default(),
        }
    }
}

/// Reconciles `ModuleLifecycle` resources.
pub struct ModuleLifecycleReconciler {
    store: Arc<dyn LifecycleStore>,
    resolver: DelegateResolver,
    driver: PhaseDriver,
    loggers: LoggerCache,
    requeue: RequeuePolicy,
}

impl ModuleLifecycleReconciler {
    #[must_use]
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        status_writer: Arc<dyn StatusWriter>,
        resolver: DelegateResolver,
        settings: ReconcilerSettings,
    ) -> Self {
        let status = StatusManager::new(status_writer, settings.condition_limit);
        Self {
            driver: PhaseDriver::new(Arc::clone(&store), status),
            store,
            resolver,
            loggers: LoggerCache::default(),
            requeue: settings.requeue,
        }
    }

    /// Redirect status writes, e.g. to a recording writer in tests.
    pub fn set_status_writer(&mut self, writer: Arc<dyn StatusWriter>) {
        self.driver.set_status_writer(writer);
    }

    /// Reconcile one resource.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, delegate failures and Kubernetes API failures.
    /// Not-ready and conflict outcomes are returned as a requeue directive instead.
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<RequeueDirective, LifecycleError> {
        let start = Instant::now();
        let result = self.reconcile_inner(key).await;

        match &result {
            // Requeues are counted by reason where they are decided
            Ok(directive) if directive.should_requeue() => {}
            Ok(_) => metrics::record_reconciliation_success(start.elapsed()),
            Err(e) => metrics::record_reconciliation_error(e.kind(), start.elapsed()),
        }
        result
    }

    async fn reconcile_inner(&self, key: &ResourceKey) -> Result<RequeueDirective, LifecycleError> {
        let Some(mut resource) = self.store.get(key).await? else {
            debug!("ModuleLifecycle {key} not found, already deleted");
            self.loggers.forget(key);
            return Ok(RequeueDirective::done());
        };

        if is_converged(&resource) {
            debug!("ModuleLifecycle {key} is Ready at its current generation, skipping");
            return Ok(RequeueDirective::done());
        }

        if resource.is_being_deleted() && !has_finalizer(&resource, MODULE_LIFECYCLE_FINALIZER) {
            debug!("ModuleLifecycle {key} is being deleted and already uninstalled");
            return Ok(RequeueDirective::done());
        }

        let log = self.loggers.ensure(&resource);
        let delegate = self.resolver.resolve(&resource).inspect_err(|e| {
            log.error(&format!("Cannot resolve delegate: {e}"));
        })?;

        match self.driver.drive(&mut resource, delegate.as_ref(), &log).await {
            Ok(PassOutcome::InProgress) => {
                metrics::record_reconciliation_requeue("in_progress");
                Ok(self.requeue.directive())
            }
            Ok(PassOutcome::Converged | PassOutcome::Held) => Ok(RequeueDirective::done()),
            Ok(PassOutcome::Removed) => {
                self.loggers.forget(key);
                Ok(RequeueDirective::done())
            }
            Err(e) if e.is_not_ready() => {
                log.progress(&format!(
                    "Waiting for {} to become ready",
                    delegate.name()
                ));
                metrics::record_reconciliation_requeue("not_ready");
                Ok(self.requeue.directive())
            }
            Err(e) if e.is_conflict() => {
                debug!("ModuleLifecycle {key}: {e}, requeueing");
                metrics::record_reconciliation_requeue("conflict");
                Ok(self.requeue.directive())
            }
            Err(e) => {
                error!(resource = %key, error = %e, "Reconciliation failed");
                Err(e)
            }
        }
    }
}

/// Ready at the current generation, finalizer in place and not being deleted.
fn is_converged(resource: &ModuleLifecycle) -> bool {
    !resource.is_being_deleted()
        && has_finalizer(resource, MODULE_LIFECYCLE_FINALIZER)
        && resource.state() == Some(LifecycleState::Ready)
        && generation_observed(resource.metadata.generation, resource.observed_generation())
}

#[cfg(test)]
#[path = "modulelifecycle_tests.rs"]
mod modulelifecycle_tests;
