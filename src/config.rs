// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every option can be given as a command-line flag or through its environment
//! variable. Defaults match the values in [`crate::constants`].

use crate::constants::{
    DEFAULT_CONDITION_LIMIT, DEFAULT_HELM_BINARY, DEFAULT_MAX_CONCURRENT_RECONCILES,
    DEFAULT_REQUEUE_MAX, DEFAULT_REQUEUE_MIN, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
};
use crate::reconcilers::retry::RequeuePolicy;
use crate::reconcilers::ReconcilerSettings;
use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Module operator - drives platform modules through install, upgrade and uninstall
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "module-operator", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Number of `ModuleLifecycle` resources reconciled in parallel
    #[arg(long, env = "MODULE_OPERATOR_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENT_RECONCILES)]
    pub concurrency: u16,

    /// Maximum number of conditions kept in `status.conditions`
    #[arg(long, env = "MODULE_OPERATOR_CONDITION_LIMIT", default_value_t = DEFAULT_CONDITION_LIMIT)]
    pub condition_limit: usize,

    /// Lower bound of the randomized requeue delay, in seconds
    #[arg(long, env = "MODULE_OPERATOR_REQUEUE_MIN_SECS", default_value_t = DEFAULT_REQUEUE_MIN)]
    pub requeue_min_secs: u64,

    /// Upper bound of the randomized requeue delay, in seconds
    #[arg(long, env = "MODULE_OPERATOR_REQUEUE_MAX_SECS", default_value_t = DEFAULT_REQUEUE_MAX)]
    pub requeue_max_secs: u64,

    /// Path to the helm executable
    #[arg(long, env = "HELM_BINARY", default_value = DEFAULT_HELM_BINARY)]
    pub helm_binary: PathBuf,

    /// Bind address of the metrics server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Port of the metrics server
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl OperatorConfig {
    /// Reject combinations the reconciler cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error when concurrency, the condition limit or the requeue maximum
    /// is zero, or when the requeue bounds are inverted.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.concurrency > 0, "concurrency must be at least 1");
        ensure!(
            self.condition_limit > 0,
            "condition limit must be at least 1"
        );
        ensure!(
            self.requeue_max_secs > 0,
            "requeue maximum must be at least 1s"
        );
        ensure!(
            self.requeue_min_secs <= self.requeue_max_secs,
            "requeue minimum ({}s) is greater than maximum ({}s)",
            self.requeue_min_secs,
            self.requeue_max_secs
        );
        Ok(())
    }

    #[must_use]
    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            condition_limit: self.condition_limit,
            requeue: RequeuePolicy {
                min: self.requeue_min_secs,
                max: self.requeue_max_secs,
                unit: Duration::from_secs(1),
            },
        }
    }

    /// `address:port` of the metrics server.
    #[must_use]
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.metrics_bind_address, self.metrics_port)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
