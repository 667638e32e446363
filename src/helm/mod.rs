// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helm-backed lifecycle delegate.
//!
//! The lifecycle driver only knows the [`Component`](crate::component::Component)
//! capability set. This module provides the Helm implementation of it, built from
//! three pieces:
//!
//! - [`ChartApplier`]: the seam to the chart tool. [`cli::HelmCli`] drives the `helm`
//!   binary; tests substitute a recording fake.
//! - [`values`]: resolution of the `overrides` list (inline values, ConfigMap and
//!   Secret references) and of repository credentials.
//! - [`component::HelmComponent`]: the generic chart component, wrapped by
//!   [`adapter::HelmDelegate`] which adds override and credential resolution.

pub mod adapter;
pub mod cli;
pub mod component;
pub mod values;

use crate::crd::HelmRelease;
use async_trait::async_trait;
use std::fmt;

pub use adapter::HelmDelegate;
pub use cli::HelmCli;
pub use component::HelmComponent;
pub use values::{KubeValuesSource, ValuesSource};

/// Username/password for a private chart repository.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RepositoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryCredentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

/// Everything needed to install or upgrade one release.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartRequest {
    /// Release name
    pub release: String,
    /// Target namespace, created if missing
    pub namespace: String,
    /// Chart name (with `repo`) or local chart path (without)
    pub chart: String,
    /// Repository URL the chart is fetched from
    pub repo: Option<String>,
    /// Requested chart version, latest when unset
    pub version: Option<String>,
    /// Merged values document
    pub values: serde_json::Value,
    /// Repository credentials
    pub credentials: Option<RepositoryCredentials>,
}

impl ChartRequest {
    /// Build a request for `release` with the given values and credentials.
    ///
    /// A chart `path` takes precedence over the repository: local charts are
    /// installed without `--repo`.
    #[must_use]
    pub fn for_release(
        release: &HelmRelease,
        values: serde_json::Value,
        credentials: Option<RepositoryCredentials>,
    ) -> Self {
        let (chart, repo) = match release.chart_info.path.as_deref() {
            Some(path) if !path.is_empty() => (path.to_string(), None),
            _ => (
                release.chart_info.name.clone(),
                Some(release.repository.uri.clone()),
            ),
        };

        Self {
            release: release.name.clone(),
            namespace: release.namespace.clone(),
            chart,
            repo,
            version: release.chart_info.version.clone(),
            values,
            credentials,
        }
    }
}

/// Observed state of an installed release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Helm release status (`deployed`, `failed`, `pending-install`, ...)
    pub status: String,
    /// Version of the chart the release was installed from
    pub chart_version: Option<String>,
}

impl ReleaseInfo {
    /// True when the release is deployed at the requested chart version.
    ///
    /// Without a requested version any deployed release is ready.
    #[must_use]
    pub fn is_ready(&self, requested_version: Option<&str>) -> bool {
        if self.status != crate::constants::HELM_STATUS_DEPLOYED {
            return false;
        }
        match requested_version {
            Some(wanted) => self.chart_version.as_deref() == Some(wanted),
            None => true,
        }
    }
}

/// Applies charts to the cluster.
///
/// Implementations must be idempotent: applying the same request twice leaves the
/// release unchanged, and uninstalling a missing release succeeds.
#[async_trait]
pub trait ChartApplier: Send + Sync {
    /// Install the release, or upgrade it if it already exists.
    async fn apply(&self, request: &ChartRequest) -> anyhow::Result<()>;

    /// Current state of a release, `None` if it is not installed.
    async fn release(&self, name: &str, namespace: &str) -> anyhow::Result<Option<ReleaseInfo>>;

    /// Remove a release.
    async fn uninstall(&self, name: &str, namespace: &str) -> anyhow::Result<()>;
}

/// Check a Helm release descriptor for defects that no retry can fix.
///
/// # Errors
///
/// Returns a human-readable reason when the release name or namespace is empty,
/// or when a repository chart has an unparsable or non-HTTP(S) repository URL.
pub fn validate_release(release: &HelmRelease) -> Result<(), String> {
    if release.name.trim().is_empty() {
        return Err("helmRelease.name must not be empty".to_string());
    }
    if release.namespace.trim().is_empty() {
        return Err("helmRelease.namespace must not be empty".to_string());
    }

    let local_chart = release
        .chart_info
        .path
        .as_deref()
        .is_some_and(|p| !p.is_empty());
    if local_chart {
        return Ok(());
    }

    if release.chart_info.name.trim().is_empty() {
        return Err("helmRelease.chartInfo.name must not be empty".to_string());
    }
    let url = url::Url::parse(&release.repository.uri)
        .map_err(|e| format!("invalid repository URI '{}': {e}", release.repository.uri))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "unsupported repository URI scheme '{other}' in '{}'",
            release.repository.uri
        )),
    }
}
