// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The Helm lifecycle delegate.
//!
//! [`HelmDelegate`] wraps a [`HelmComponent`] and replaces install and upgrade
//! with versions that resolve the full `overrides` list (including `ConfigMap` and
//! `Secret` references) and the repository credentials before applying the chart.
//! Uninstall and readiness are forwarded to the wrapped component unchanged.

use super::component::{helm_release, HelmComponent};
use super::values::{resolve_credentials, resolve_overrides, ValuesSource};
use super::{ChartApplier, RepositoryCredentials};
use crate::component::{Component, ComponentContext};
use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::Value;
use std::sync::Arc;

/// Helm delegate for `spec.installer.helmRelease`.
#[derive(Clone)]
pub struct HelmDelegate {
    base: HelmComponent,
    values: Arc<dyn ValuesSource>,
}

impl HelmDelegate {
    #[must_use]
    pub fn new(applier: Arc<dyn ChartApplier>, values: Arc<dyn ValuesSource>) -> Self {
        Self {
            base: HelmComponent::new(applier),
            values,
        }
    }

    /// Merged overrides and credentials for the release in `ctx`.
    ///
    /// References are resolved in the `ModuleLifecycle`'s namespace.
    async fn resolve(
        &self,
        ctx: &ComponentContext,
    ) -> Result<(Value, Option<RepositoryCredentials>)> {
        let release = helm_release(ctx)?;
        let namespace = ctx.resource.namespace().unwrap_or_default();

        let values = resolve_overrides(self.values.as_ref(), &namespace, &release.overrides).await?;

        let credentials = match &release.repository.credentials_secret_ref {
            Some(secret) if !secret.is_empty() => {
                Some(resolve_credentials(self.values.as_ref(), &namespace, secret).await?)
            }
            _ => None,
        };

        Ok((values, credentials))
    }
}

#[async_trait]
impl Component for HelmDelegate {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn install(&self, ctx: &ComponentContext) -> Result<()> {
        let (values, credentials) = self.resolve(ctx).await?;
        self.base.apply_with(ctx, values, credentials).await
    }

    async fn upgrade(&self, ctx: &ComponentContext) -> Result<()> {
        let (values, credentials) = self.resolve(ctx).await?;
        self.base.apply_with(ctx, values, credentials).await
    }

    async fn uninstall(&self, ctx: &ComponentContext) -> Result<()> {
        self.base.uninstall(ctx).await
    }

    async fn is_ready(&self, ctx: &ComponentContext) -> bool {
        self.base.is_ready(ctx).await
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod adapter_tests;
