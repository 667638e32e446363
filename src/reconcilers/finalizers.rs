// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cleanup-marker (finalizer) management for `ModuleLifecycle` resources.
//!
//! The marker is present while the module may still be installed and is removed as
//! the very last step of uninstall, after which the API server garbage-collects the
//! resource.
//!
//! Both operations are idempotent: they only write when the marker list actually
//! needs to change. Write conflicts are returned to the caller, which retries the
//! whole pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use module_operator::reconcilers::finalizers::{ensure_present, ensure_absent};
//!
//! async fn reconcile(store: &dyn LifecycleStore, lifecycle: &mut ModuleLifecycle) -> Result<()> {
//!     if lifecycle.is_being_deleted() {
//!         // ... uninstall ...
//!         ensure_absent(store, lifecycle, MODULE_LIFECYCLE_FINALIZER).await?;
//!         return Ok(());
//!     }
//!     ensure_present(store, lifecycle, MODULE_LIFECYCLE_FINALIZER).await?;
//!     Ok(())
//! }
//! ```

use crate::crd::ModuleLifecycle;
use crate::errors::LifecycleError;
use crate::store::{LifecycleStore, ResourceKey};
use kube::ResourceExt;
use tracing::{debug, info};

/// True when `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer(resource: &ModuleLifecycle, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Add `finalizer` to the resource if it is not already present.
///
/// Does nothing for a resource that is already being deleted: the API server
/// rejects new finalizers at that point.
///
/// On a write, `resource` is replaced with the stored object.
///
/// # Returns
///
/// `Ok(true)` if the marker was written, `Ok(false)` if nothing changed.
///
/// # Errors
///
/// Returns [`LifecycleError::Conflict`] if the resource changed since it was read.
pub async fn ensure_present(
    store: &dyn LifecycleStore,
    resource: &mut ModuleLifecycle,
    finalizer: &str,
) -> Result<bool, LifecycleError> {
    if resource.is_being_deleted() || has_finalizer(resource, finalizer) {
        return Ok(false);
    }

    let key = ResourceKey::of(resource);
    info!("Adding finalizer {finalizer} to ModuleLifecycle {key}");

    let mut updated = resource.clone();
    updated.finalizers_mut().push(finalizer.to_string());

    match store.update(&updated).await {
        Ok(stored) => {
            *resource = stored;
            Ok(true)
        }
        Err(e) => {
            if e.is_conflict() {
                debug!("Conflict adding finalizer to {key}, will retry");
            }
            Err(e)
        }
    }
}

/// Remove `finalizer` from the resource if it is present.
///
/// Once the last finalizer of a deleting resource is removed the API server deletes
/// it, so the stored object returned by the write may already be gone.
///
/// # Returns
///
/// `Ok(true)` if the marker was removed, `Ok(false)` if nothing changed.
///
/// # Errors
///
/// Returns [`LifecycleError::Conflict`] if the resource changed since it was read.
pub async fn ensure_absent(
    store: &dyn LifecycleStore,
    resource: &mut ModuleLifecycle,
    finalizer: &str,
) -> Result<bool, LifecycleError> {
    if !has_finalizer(resource, finalizer) {
        return Ok(false);
    }

    let key = ResourceKey::of(resource);
    info!("Removing finalizer {finalizer} from ModuleLifecycle {key}");

    let mut updated = resource.clone();
    updated.finalizers_mut().retain(|f| f != finalizer);

    match store.update(&updated).await {
        Ok(stored) => {
            *resource = stored;
            Ok(true)
        }
        Err(e) => {
            if e.is_conflict() {
                debug!("Conflict removing finalizer from {key}, will retry");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
