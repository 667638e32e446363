// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Delegate selection for `ModuleLifecycle` resources.
//!
//! Resolution order:
//!
//! 1. A bespoke delegate registered under the value of the
//!    `platform.firestoned.io/module-controller` label.
//! 2. For a Helm release, the plain [`HelmComponent`] when everything it needs is
//!    inline, otherwise the [`HelmDelegate`] that reads `ConfigMap` and `Secret`
//!    references and repository credentials.
//! 3. A configuration error when the installer names another, unimplemented, kind.
//! 4. A configuration error when no installer is specified.
//!
//! The [`DelegateRegistry`] is built once at start-up and is read-only afterwards.

use crate::component::Component;
use crate::crd::{HelmRelease, ModuleLifecycle};
use crate::errors::LifecycleError;
use crate::helm::{validate_release, ChartApplier, HelmComponent, HelmDelegate, ValuesSource};
use crate::labels::MODULE_CONTROLLER_LABEL;
use kube::ResourceExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a delegate for one resource.
pub type DelegateFactory = Arc<dyn Fn(&ModuleLifecycle) -> Arc<dyn Component> + Send + Sync>;

/// Bespoke delegates keyed by module-controller label value.
#[derive(Clone, Default)]
pub struct DelegateRegistry {
    factories: HashMap<String, DelegateFactory>,
}

impl fmt::Debug for DelegateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DelegateRegistry")
            .field("delegates", &names)
            .finish()
    }
}

impl DelegateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delegate factory, replacing any previous one for `name`.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ModuleLifecycle) -> Arc<dyn Component> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DelegateFactory> {
        self.factories.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Picks the delegate that performs lifecycle work for a resource.
#[derive(Clone)]
pub struct DelegateResolver {
    registry: DelegateRegistry,
    applier: Arc<dyn ChartApplier>,
    values: Arc<dyn ValuesSource>,
}

impl DelegateResolver {
    #[must_use]
    pub fn new(
        registry: DelegateRegistry,
        applier: Arc<dyn ChartApplier>,
        values: Arc<dyn ValuesSource>,
    ) -> Self {
        Self {
            registry,
            applier,
            values,
        }
    }

    /// Select the delegate for `resource`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error ([`LifecycleError::is_configuration`]) when no
    /// delegate can be built from the resource.
    pub fn resolve(&self, resource: &ModuleLifecycle) -> Result<Arc<dyn Component>, LifecycleError> {
        let namespace = resource.namespace().unwrap_or_default();
        let name = resource.name_any();

        if let Some(controller) = resource.labels().get(MODULE_CONTROLLER_LABEL) {
            if let Some(factory) = self.registry.get(controller) {
                debug!(resource = %format!("{namespace}/{name}"), delegate = %controller, "Using registered delegate");
                return Ok(factory(resource));
            }
            debug!(
                resource = %format!("{namespace}/{name}"),
                delegate = %controller,
                "No delegate registered for module controller label, falling back to installer"
            );
        }

        let installer = &resource.spec.installer;
        if let Some(release) = &installer.helm_release {
            validate_release(release).map_err(|reason| LifecycleError::InvalidSpec {
                namespace: namespace.clone(),
                name: name.clone(),
                reason,
            })?;
            if !references_cluster_data(release) {
                return Ok(Arc::new(HelmComponent::new(Arc::clone(&self.applier))));
            }
            return Ok(Arc::new(HelmDelegate::new(
                Arc::clone(&self.applier),
                Arc::clone(&self.values),
            )));
        }

        if installer.istio.is_some() {
            return Err(LifecycleError::UnimplementedInstaller {
                namespace,
                name,
                kind: "istio".to_string(),
            });
        }

        Err(LifecycleError::NoInstaller { namespace, name })
    }
}

/// True when installing `release` needs `ConfigMap`, `Secret` or credential lookups.
fn references_cluster_data(release: &HelmRelease) -> bool {
    release
        .repository
        .credentials_secret_ref
        .as_deref()
        .is_some_and(|secret| !secret.is_empty())
        || release
            .overrides
            .iter()
            .any(|o| o.config_map_ref.is_some() || o.secret_ref.is_some())
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
