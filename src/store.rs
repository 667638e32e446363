// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store seam for `ModuleLifecycle` resources.
//!
//! The reconciler never talks to `kube::Api` directly. It reads and writes through
//! the [`LifecycleStore`] and [`StatusWriter`] traits so that the status-write path
//! can be redirected (e.g. in tests) and so that every write path has one place
//! where optimistic-concurrency conflicts are recognised.
//!
//! [`KubeStore`] is the production implementation. Every write carries the
//! object's `metadata.resourceVersion`, which makes the API server reject the write
//! with HTTP 409 when someone else changed the object since it was read.

use crate::constants::FIELD_MANAGER;
use crate::crd::ModuleLifecycle;
use crate::errors::{is_conflict_error, LifecycleError};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Namespace + name of a `ModuleLifecycle`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    /// Build a key from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing resource.
    #[must_use]
    pub fn of(resource: &ModuleLifecycle) -> Self {
        Self::new(resource.namespace().unwrap_or_default(), resource.name_any())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read and metadata-write access to `ModuleLifecycle` resources.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Fetch a resource. `Ok(None)` means it no longer exists.
    async fn get(&self, key: &ResourceKey) -> Result<Option<ModuleLifecycle>, LifecycleError>;

    /// Persist the resource's metadata (finalizers). Returns the stored object.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Conflict`] when the resource changed since it was read.
    async fn update(&self, resource: &ModuleLifecycle) -> Result<ModuleLifecycle, LifecycleError>;
}

/// Write access to the status subresource.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Persist `resource.status`. Returns the stored object.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Conflict`] when the resource changed since it was read.
    async fn update_status(
        &self,
        resource: &ModuleLifecycle,
    ) -> Result<ModuleLifecycle, LifecycleError>;
}

/// `kube::Api` backed store.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ModuleLifecycle> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PatchParams::default()
    }
}

fn map_write_error(err: kube::Error, key: &ResourceKey, what: &'static str) -> LifecycleError {
    if is_conflict_error(&err) {
        debug!(resource = %key, what, "Write conflict");
        LifecycleError::Conflict {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            what,
        }
    } else {
        LifecycleError::Kube(err)
    }
}

#[async_trait]
impl LifecycleStore for KubeStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<ModuleLifecycle>, LifecycleError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update(&self, resource: &ModuleLifecycle) -> Result<ModuleLifecycle, LifecycleError> {
        let key = ResourceKey::of(resource);
        let patch = json!({
            "metadata": {
                "resourceVersion": resource.resource_version(),
                "finalizers": resource.finalizers(),
            }
        });

        self.api(&key.namespace)
            .patch(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_write_error(e, &key, "finalizers"))
    }
}

#[async_trait]
impl StatusWriter for KubeStore {
    async fn update_status(
        &self,
        resource: &ModuleLifecycle,
    ) -> Result<ModuleLifecycle, LifecycleError> {
        let key = ResourceKey::of(resource);
        let patch = json!({
            "metadata": {
                "resourceVersion": resource.resource_version(),
            },
            "status": resource.status,
        });

        self.api(&key.namespace)
            .patch_status(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_write_error(e, &key, "status"))
    }
}
