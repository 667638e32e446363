// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ChartApplier`] backed by the `helm` binary.
//!
//! Values are streamed to `helm` on stdin (`--values -`) so that secret override
//! documents never touch the filesystem. Command lines are logged with every
//! password masked.

use super::{ChartApplier, ChartRequest, ReleaseInfo};
use crate::constants::DEFAULT_HELM_BINARY;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

const MASK: &str = "*****";

/// Runs `helm` as a child process.
#[derive(Clone, Debug)]
pub struct HelmCli {
    binary: PathBuf,
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new(DEFAULT_HELM_BINARY)
    }
}

impl HelmCli {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[String], stdin: Option<&[u8]>) -> Result<Output> {
        info!(
            "Running command: {} {}",
            self.binary.display(),
            mask_args(args)
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute {}", self.binary.display()))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)
                .await
                .context("Failed to write values to helm stdin")?;
            pipe.shutdown().await.context("Failed to close helm stdin")?;
        }

        child
            .wait_with_output()
            .await
            .context("Failed to wait for helm")
    }
}

#[async_trait]
impl ChartApplier for HelmCli {
    async fn apply(&self, request: &ChartRequest) -> Result<()> {
        let values = serde_yaml::to_string(&request.values)
            .context("Failed to serialize merged values")?;
        let output = self
            .run(&upgrade_args(request), Some(values.as_bytes()))
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                "helm upgrade for {}/{} failed with stderr: {}",
                request.namespace, request.release, stderr
            );
            anyhow::bail!(
                "helm upgrade --install {} failed: {}",
                request.release,
                stderr.trim()
            );
        }

        debug!(
            "helm upgrade succeeded for {}/{}",
            request.namespace, request.release
        );
        Ok(())
    }

    async fn release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseInfo>> {
        let output = self.run(&status_args(name, namespace), None).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_release_not_found(&stderr) {
                return Ok(None);
            }
            anyhow::bail!("helm status for {namespace}/{name} failed: {}", stderr.trim());
        }

        parse_release_info(&output.stdout).map(Some)
    }

    async fn uninstall(&self, name: &str, namespace: &str) -> Result<()> {
        let output = self.run(&uninstall_args(name, namespace), None).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_release_not_found(&stderr) {
                debug!("Release {namespace}/{name} already uninstalled");
                return Ok(());
            }
            anyhow::bail!(
                "helm uninstall for {namespace}/{name} failed: {}",
                stderr.trim()
            );
        }
        Ok(())
    }
}

/// Arguments for `helm upgrade --install`, reading values from stdin.
#[must_use]
pub fn upgrade_args(request: &ChartRequest) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        request.release.clone(),
        request.chart.clone(),
        "--namespace".to_string(),
        request.namespace.clone(),
        "--create-namespace".to_string(),
    ];

    if let Some(repo) = &request.repo {
        args.push("--repo".to_string());
        args.push(repo.clone());
    }
    if let Some(version) = &request.version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if let Some(creds) = &request.credentials {
        args.push("--username".to_string());
        args.push(creds.username.clone());
        args.push("--password".to_string());
        args.push(creds.password.clone());
    }

    args.push("--values".to_string());
    args.push("-".to_string());
    args
}

#[must_use]
pub fn status_args(name: &str, namespace: &str) -> Vec<String> {
    [
        "status",
        name,
        "--namespace",
        namespace,
        "--output",
        "json",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

#[must_use]
pub fn uninstall_args(name: &str, namespace: &str) -> Vec<String> {
    ["uninstall", name, "--namespace", namespace]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Render an argument list for logging with passwords replaced by a mask.
///
/// Handles both `--password VALUE` and `key=value` pairs whose key mentions a password.
#[must_use]
pub fn mask_args(args: &[String]) -> String {
    let mut masked = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            masked.push(MASK.to_string());
            mask_next = false;
            continue;
        }
        if arg == "--password" {
            mask_next = true;
            masked.push(arg.clone());
            continue;
        }
        masked.push(mask_password_pairs(arg));
    }
    masked.join(" ")
}

fn mask_password_pairs(arg: &str) -> String {
    arg.split(',')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.to_ascii_lowercase().contains("password") => {
                format!("{key}={MASK}")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// True when helm's stderr says the release does not exist.
#[must_use]
pub fn is_release_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("release: not found") || stderr.contains("release not found")
}

#[derive(Deserialize)]
struct HelmStatus {
    info: HelmStatusInfo,
    #[serde(default)]
    chart: Option<HelmStatusChart>,
}

#[derive(Deserialize)]
struct HelmStatusInfo {
    status: String,
}

#[derive(Deserialize)]
struct HelmStatusChart {
    metadata: HelmChartMetadata,
}

#[derive(Deserialize)]
struct HelmChartMetadata {
    #[serde(default)]
    version: Option<String>,
}

/// Parse the JSON document printed by `helm status --output json`.
///
/// # Errors
///
/// Returns an error when the document has no `info.status`.
pub fn parse_release_info(stdout: &[u8]) -> Result<ReleaseInfo> {
    let status: HelmStatus =
        serde_json::from_slice(stdout).context("Failed to parse helm status output")?;

    Ok(ReleaseInfo {
        status: status.info.status.trim().to_string(),
        chart_version: status.chart.and_then(|c| c.metadata.version),
    })
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
