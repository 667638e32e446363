// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic Helm chart component.
//!
//! Installs and upgrades the release described by `spec.installer.helmRelease`
//! using only its inline `values` overrides and no repository credentials. It is
//! selected for self-contained releases; [`HelmDelegate`](super::HelmDelegate)
//! builds on it when override documents or credentials live in the cluster.

use super::values::merge_document;
use super::{ChartApplier, ChartRequest, RepositoryCredentials};
use crate::component::{Component, ComponentContext};
use crate::crd::HelmRelease;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Delegate name reported in logs and metrics.
pub const HELM_COMPONENT_NAME: &str = "helm";

/// Installs a module from a Helm chart.
#[derive(Clone)]
pub struct HelmComponent {
    applier: Arc<dyn ChartApplier>,
}

impl HelmComponent {
    #[must_use]
    pub fn new(applier: Arc<dyn ChartApplier>) -> Self {
        Self { applier }
    }

    /// Install or upgrade the release with an explicit values document.
    ///
    /// # Errors
    ///
    /// Fails when the resource has no Helm release or the chart apply fails.
    pub async fn apply_with(
        &self,
        ctx: &ComponentContext,
        values: Value,
        credentials: Option<RepositoryCredentials>,
    ) -> Result<()> {
        let release = helm_release(ctx)?;
        let request = ChartRequest::for_release(release, values, credentials);

        ctx.log.once(&format!(
            "Applying chart {} {} as release {}/{}",
            request.chart,
            request.version.as_deref().unwrap_or("(latest)"),
            request.namespace,
            request.release
        ));

        self.applier
            .apply(&request)
            .await
            .with_context(|| format!("Failed to apply release {}/{}", release.namespace, release.name))
    }
}

/// The Helm release of the resource in `ctx`.
///
/// # Errors
///
/// Fails when the installer has no Helm release.
pub fn helm_release(ctx: &ComponentContext) -> Result<&HelmRelease> {
    ctx.resource
        .spec
        .installer
        .helm_release
        .as_ref()
        .context("spec.installer.helmRelease is not set")
}

/// Merge the inline `values` of every override entry in list order.
fn inline_values(release: &HelmRelease) -> Result<Value> {
    let mut merged = Value::Object(Map::new());
    for (index, entry) in release.overrides.iter().enumerate() {
        if let Some(values) = &entry.values {
            merge_document(&mut merged, values.clone(), index)?;
        }
    }
    Ok(merged)
}

#[async_trait]
impl Component for HelmComponent {
    fn name(&self) -> &str {
        HELM_COMPONENT_NAME
    }

    async fn install(&self, ctx: &ComponentContext) -> Result<()> {
        let values = inline_values(helm_release(ctx)?)?;
        self.apply_with(ctx, values, None).await
    }

    async fn upgrade(&self, ctx: &ComponentContext) -> Result<()> {
        let values = inline_values(helm_release(ctx)?)?;
        self.apply_with(ctx, values, None).await
    }

    async fn uninstall(&self, ctx: &ComponentContext) -> Result<()> {
        let release = helm_release(ctx)?;
        ctx.log.once(&format!(
            "Uninstalling release {}/{}",
            release.namespace, release.name
        ));
        self.applier
            .uninstall(&release.name, &release.namespace)
            .await
    }

    async fn is_ready(&self, ctx: &ComponentContext) -> bool {
        let Ok(release) = helm_release(ctx) else {
            return false;
        };

        match self.applier.release(&release.name, &release.namespace).await {
            Ok(Some(info)) => {
                let ready = info.is_ready(release.chart_info.version.as_deref());
                if !ready {
                    ctx.log.progress(&format!(
                        "Waiting for release {}/{}: status {}, chart version {}",
                        release.namespace,
                        release.name,
                        info.status,
                        info.chart_version.as_deref().unwrap_or("unknown")
                    ));
                }
                ready
            }
            Ok(None) => {
                ctx.log.progress(&format!(
                    "Waiting for release {}/{} to appear",
                    release.namespace, release.name
                ));
                false
            }
            Err(e) => {
                ctx.log
                    .progress(&format!("Failed to read release status: {e:#}"));
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod component_tests;
