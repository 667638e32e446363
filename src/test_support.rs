// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Test doubles shared by the unit tests.
//!
//! - [`MemoryStore`] mimics the API server: optimistic concurrency on
//!   `resourceVersion`, separate status writes, and garbage collection once a
//!   deleting object has no finalizers left.
//! - [`FakeComponent`] records every lifecycle call and can be scripted to report
//!   readiness or fail a given operation.
//! - [`FakeChartApplier`] and [`FakeValuesSource`] stand in for `helm` and the
//!   `ConfigMap`/`Secret` API.

use crate::component::{Component, ComponentContext};
use crate::constants::MODULE_LIFECYCLE_FINALIZER;
use crate::crd::{
    HelmChart, HelmChartRepository, HelmRelease, ModuleInstaller, ModuleLifecycle,
    ModuleLifecycleSpec,
};
use crate::errors::LifecycleError;
use crate::helm::{ChartApplier, ChartRequest, ReleaseInfo, ValuesSource};
use crate::store::{LifecycleStore, ResourceKey, StatusWriter};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use k8s_openapi::jiff::Timestamp;
use kube::core::Status;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_NAMESPACE: &str = "platform";
pub const TEST_NAME: &str = "ingress";

/// A `ModuleLifecycle` with a Helm installer and no status.
pub fn helm_lifecycle(generation: i64) -> ModuleLifecycle {
    ModuleLifecycle {
        metadata: ObjectMeta {
            name: Some(TEST_NAME.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            uid: Some("3f1c7a52-uid".to_string()),
            generation: Some(generation),
            ..Default::default()
        },
        spec: ModuleLifecycleSpec {
            installer: ModuleInstaller {
                helm_release: Some(HelmRelease {
                    name: "ingress-nginx".to_string(),
                    namespace: "ingress-system".to_string(),
                    chart_info: HelmChart {
                        name: "ingress-nginx".to_string(),
                        path: None,
                        version: Some("4.10.0".to_string()),
                    },
                    repository: HelmChartRepository {
                        uri: "https://kubernetes.github.io/ingress-nginx".to_string(),
                        credentials_secret_ref: None,
                    },
                    overrides: vec![],
                }),
                istio: None,
            },
        },
        status: None,
    }
}

/// Same resource, carrying the lifecycle finalizer.
pub fn with_finalizer(mut resource: ModuleLifecycle) -> ModuleLifecycle {
    resource.metadata.finalizers = Some(vec![MODULE_LIFECYCLE_FINALIZER.to_string()]);
    resource
}

/// Same resource, marked for deletion.
pub fn deleting(mut resource: ModuleLifecycle) -> ModuleLifecycle {
    resource.metadata.deletion_timestamp = Some(Time(Timestamp::now()));
    resource
}

/// In-memory object store with API-server-like semantics.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ResourceKey, ModuleLifecycle>>,
    next_version: AtomicUsize,
    updates: AtomicUsize,
    status_updates: AtomicUsize,
    pending_conflicts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert or overwrite an object, assigning it a fresh resourceVersion.
    pub fn put(&self, mut resource: ModuleLifecycle) -> ModuleLifecycle {
        resource.metadata.resource_version = Some(self.bump().to_string());
        self.objects
            .lock()
            .unwrap()
            .insert(ResourceKey::of(&resource), resource.clone());
        resource
    }

    /// Current stored copy.
    pub fn fetch(&self, key: &ResourceKey) -> Option<ModuleLifecycle> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Delete an object out of band, bypassing finalizers.
    pub fn remove(&self, key: &ResourceKey) -> Option<ModuleLifecycle> {
        self.objects.lock().unwrap().remove(key)
    }

    /// Simulate a concurrent writer: bump the stored resourceVersion.
    pub fn touch(&self, key: &ResourceKey) {
        let version = self.bump().to_string();
        if let Some(obj) = self.objects.lock().unwrap().get_mut(key) {
            obj.metadata.resource_version = Some(version);
        }
    }

    /// Simulate a spec edit: bump generation and resourceVersion.
    pub fn bump_generation(&self, key: &ResourceKey) -> Option<ModuleLifecycle> {
        let version = self.bump().to_string();
        let mut objects = self.objects.lock().unwrap();
        let obj = objects.get_mut(key)?;
        obj.metadata.generation = Some(obj.metadata.generation.unwrap_or_default() + 1);
        obj.metadata.resource_version = Some(version);
        Some(obj.clone())
    }

    /// Fail the next `n` writes with a conflict.
    pub fn fail_next_writes(&self, n: usize) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn status_update_count(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.update_count() + self.status_update_count()
    }

    fn bump(&self) -> usize {
        self.next_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_version(
        &self,
        resource: &ModuleLifecycle,
        what: &'static str,
    ) -> Result<ModuleLifecycle, LifecycleError> {
        let key = ResourceKey::of(resource);
        let conflict = || LifecycleError::Conflict {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            what,
        };

        if self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(conflict());
        }

        let stored = self.fetch(&key).ok_or_else(|| {
            LifecycleError::Kube(kube::Error::Api(
                Status::failure("not found", "NotFound")
                    .with_code(404)
                    .boxed(),
            ))
        })?;

        if stored.resource_version() != resource.resource_version() {
            return Err(conflict());
        }
        Ok(stored)
    }
}

#[async_trait]
impl LifecycleStore for MemoryStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<ModuleLifecycle>, LifecycleError> {
        Ok(self.fetch(key))
    }

    async fn update(&self, resource: &ModuleLifecycle) -> Result<ModuleLifecycle, LifecycleError> {
        let mut stored = self.check_version(resource, "finalizers")?;
        self.updates.fetch_add(1, Ordering::SeqCst);

        stored.metadata.finalizers = resource.metadata.finalizers.clone();
        stored.metadata.resource_version = Some(self.bump().to_string());

        let key = ResourceKey::of(&stored);
        let mut objects = self.objects.lock().unwrap();
        if stored.metadata.deletion_timestamp.is_some() && stored.finalizers().is_empty() {
            objects.remove(&key);
        } else {
            objects.insert(key, stored.clone());
        }
        Ok(stored)
    }
}

#[async_trait]
impl StatusWriter for MemoryStore {
    async fn update_status(
        &self,
        resource: &ModuleLifecycle,
    ) -> Result<ModuleLifecycle, LifecycleError> {
        let mut stored = self.check_version(resource, "status")?;
        self.status_updates.fetch_add(1, Ordering::SeqCst);

        stored.status = resource.status.clone();
        stored.metadata.resource_version = Some(self.bump().to_string());
        self.objects
            .lock()
            .unwrap()
            .insert(ResourceKey::of(&stored), stored.clone());
        Ok(stored)
    }
}

/// Recording [`ChartApplier`] with a scripted release state.
#[derive(Default)]
pub struct FakeChartApplier {
    applied: Mutex<Vec<ChartRequest>>,
    uninstalled: Mutex<Vec<(String, String)>>,
    release: Mutex<Option<ReleaseInfo>>,
    fail_apply: AtomicBool,
}

impl FakeChartApplier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_release(&self, status: &str, chart_version: Option<&str>) {
        *self.release.lock().unwrap() = Some(ReleaseInfo {
            status: status.to_string(),
            chart_version: chart_version.map(ToString::to_string),
        });
    }

    pub fn fail_apply(&self) {
        self.fail_apply.store(true, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<ChartRequest> {
        self.applied.lock().unwrap().clone()
    }

    pub fn uninstalled(&self) -> Vec<(String, String)> {
        self.uninstalled.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChartApplier for FakeChartApplier {
    async fn apply(&self, request: &ChartRequest) -> anyhow::Result<()> {
        self.applied.lock().unwrap().push(request.clone());
        if self.fail_apply.load(Ordering::SeqCst) {
            anyhow::bail!("chart apply failed");
        }
        Ok(())
    }

    async fn release(&self, _name: &str, _namespace: &str) -> anyhow::Result<Option<ReleaseInfo>> {
        Ok(self.release.lock().unwrap().clone())
    }

    async fn uninstall(&self, name: &str, namespace: &str) -> anyhow::Result<()> {
        self.uninstalled
            .lock()
            .unwrap()
            .push((name.to_string(), namespace.to_string()));
        *self.release.lock().unwrap() = None;
        Ok(())
    }
}

/// `ConfigMap`/`Secret` data held in memory, keyed by `namespace/name`.
#[derive(Default)]
pub struct FakeValuesSource {
    config_maps: Mutex<HashMap<String, BTreeMap<String, String>>>,
    secrets: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl FakeValuesSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_config_map(&self, namespace: &str, name: &str, entries: &[(&str, &str)]) {
        self.config_maps
            .lock()
            .unwrap()
            .insert(format!("{namespace}/{name}"), to_map(entries));
    }

    pub fn add_secret(&self, namespace: &str, name: &str, entries: &[(&str, &str)]) {
        self.secrets
            .lock()
            .unwrap()
            .insert(format!("{namespace}/{name}"), to_map(entries));
    }
}

fn to_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[async_trait]
impl ValuesSource for FakeValuesSource {
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<BTreeMap<String, String>>> {
        Ok(self
            .config_maps
            .lock()
            .unwrap()
            .get(&format!("{namespace}/{name}"))
            .cloned())
    }

    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<BTreeMap<String, String>>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&format!("{namespace}/{name}"))
            .cloned())
    }
}

/// Scriptable delegate that records the lifecycle calls it receives.
pub struct FakeComponent {
    name: String,
    calls: Mutex<Vec<&'static str>>,
    ready: AtomicBool,
    fail_on: Mutex<Option<&'static str>>,
}

impl FakeComponent {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            ready: AtomicBool::new(false),
            fail_on: Mutex::new(None),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(operation);
        if *self.fail_on.lock().unwrap() == Some(operation) {
            anyhow::bail!("{operation} exploded");
        }
        Ok(())
    }
}

#[async_trait]
impl Component for FakeComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pre_install(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PreInstall")
    }

    async fn install(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("Install")
    }

    async fn post_install(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PostInstall")
    }

    async fn pre_upgrade(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PreUpgrade")
    }

    async fn upgrade(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("Upgrade")
    }

    async fn post_upgrade(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PostUpgrade")
    }

    async fn pre_uninstall(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PreUninstall")
    }

    async fn uninstall(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("Uninstall")
    }

    async fn post_uninstall(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        self.record("PostUninstall")
    }

    async fn is_ready(&self, _ctx: &ComponentContext) -> bool {
        self.calls.lock().unwrap().push("IsReady");
        self.ready.load(Ordering::SeqCst)
    }
}
