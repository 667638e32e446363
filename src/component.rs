// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The component capability set implemented by lifecycle delegates.
//!
//! A delegate performs the actual install, upgrade and uninstall work for one
//! `ModuleLifecycle`. The phase driver only decides *which* step runs next; the
//! delegate decides *how*.
//!
//! Every operation may be invoked more than once for the same generation (a crash
//! between "delegate ran" and "condition persisted" replays the step), so
//! implementations must be idempotent.
//!
//! Readiness is a single poll. [`Component::is_ready`] must return promptly; the
//! scheduler calls again later if the workload is still converging.

use crate::crd::ModuleLifecycle;
use crate::logging::ResourceLogger;
use async_trait::async_trait;

/// Everything a delegate needs for one lifecycle step.
#[derive(Debug, Clone)]
pub struct ComponentContext {
    /// The resource as read at the start of the reconcile pass.
    pub resource: ModuleLifecycle,
    /// Logger bound to the resource's current generation.
    pub log: ResourceLogger,
}

impl ComponentContext {
    #[must_use]
    pub fn new(resource: ModuleLifecycle, log: ResourceLogger) -> Self {
        Self { resource, log }
    }
}

/// Lifecycle operations of a deployable component.
///
/// The pre/post hooks default to no-ops. Install, upgrade, uninstall and readiness
/// must be provided.
#[async_trait]
pub trait Component: Send + Sync {
    /// Human-readable delegate name used in logs.
    fn name(&self) -> &str;

    async fn pre_install(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn install(&self, ctx: &ComponentContext) -> anyhow::Result<()>;

    async fn post_install(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn pre_upgrade(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn upgrade(&self, ctx: &ComponentContext) -> anyhow::Result<()>;

    async fn post_upgrade(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn pre_uninstall(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn uninstall(&self, ctx: &ComponentContext) -> anyhow::Result<()>;

    async fn post_uninstall(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Single readiness poll. Failures to determine readiness count as not ready.
    async fn is_ready(&self, ctx: &ComponentContext) -> bool;
}
