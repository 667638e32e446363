// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `ModuleLifecycle` controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - Kubernetes client
//! - The reconciler, wired to its store, status writer and delegate resolver
//! - The operator configuration

use crate::config::OperatorConfig;
use crate::helm::{HelmCli, KubeValuesSource};
use crate::reconcilers::resolver::{DelegateRegistry, DelegateResolver};
use crate::reconcilers::ModuleLifecycleReconciler;
use crate::store::KubeStore;
use kube::Client;
use std::sync::Arc;
use tracing::debug;

/// Shared context passed to the controller.
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Reconciler invoked for every resource key
    pub reconciler: ModuleLifecycleReconciler,

    /// Operator configuration
    pub config: OperatorConfig,
}

impl Context {
    /// Wire the production collaborators: the API server as object store and
    /// status writer, the `helm` binary as chart applier and ConfigMaps/Secrets
    /// as override sources.
    ///
    /// `registry` holds the label-selected delegates, looked up before the
    /// spec-declared installer.
    #[must_use]
    pub fn new(client: Client, config: OperatorConfig, registry: DelegateRegistry) -> Self {
        debug!(delegates = ?registry, helm = %config.helm_binary.display(), "Building controller context");

        let store = Arc::new(KubeStore::new(client.clone()));
        let resolver = DelegateResolver::new(
            registry,
            Arc::new(HelmCli::new(config.helm_binary.clone())),
            Arc::new(KubeValuesSource::new(client.clone())),
        );
        let reconciler = ModuleLifecycleReconciler::new(
            store.clone(),
            store,
            resolver,
            config.reconciler_settings(),
        );

        Self {
            client,
            reconciler,
            config,
        }
    }
}
