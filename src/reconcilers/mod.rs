// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of `ModuleLifecycle` resources.
//!
//! # Reconciliation Architecture
//!
//! 1. **Watch** - The controller runtime delivers one resource key at a time
//! 2. **Resolve** - [`resolver`] picks the delegate that installs the module
//! 3. **Drive** - [`driver`] advances the lifecycle by one step
//! 4. **Record** - [`status`] appends a condition and derives `status.state`
//! 5. **Requeue** - [`retry`] turns the outcome into a jittered requeue
//!
//! # Example: Reconciling a Resource
//!
//! ```rust,no_run
//! use module_operator::reconcilers::{ModuleLifecycleReconciler, ReconcilerSettings};
//! use module_operator::reconcilers::resolver::{DelegateRegistry, DelegateResolver};
//! use module_operator::helm::{HelmCli, KubeValuesSource};
//! use module_operator::store::{KubeStore, ResourceKey};
//! use std::sync::Arc;
//!
//! async fn reconcile_one(client: kube::Client) -> anyhow::Result<()> {
//!     let store = Arc::new(KubeStore::new(client.clone()));
//!     let resolver = DelegateResolver::new(
//!         DelegateRegistry::new(),
//!         Arc::new(HelmCli::default()),
//!         Arc::new(KubeValuesSource::new(client)),
//!     );
//!     let reconciler = ModuleLifecycleReconciler::new(
//!         store.clone(),
//!         store,
//!         resolver,
//!         ReconcilerSettings::default(),
//!     );
//!
//!     let directive = reconciler
//!         .reconcile(&ResourceKey::new("platform-system", "ingress-nginx"))
//!         .await?;
//!     println!("requeue after {:?}", directive.requeue_after);
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod finalizers;
pub mod modulelifecycle;
pub mod resolver;
pub mod retry;
pub mod status;

pub use modulelifecycle::{ModuleLifecycleReconciler, ReconcilerSettings};

/// Check whether the controller has processed the resource's current spec.
///
/// `metadata.generation` is incremented by the API server on every spec change,
/// while `status.observedGeneration` is set by the controller once a spec has been
/// installed or upgraded.
///
/// # Returns
///
/// * `true` - Both are known and equal
/// * `false` - The spec changed, was never processed, or generation is not tracked
#[must_use]
pub fn generation_observed(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current == observed,
        _ => false,
    }
}
