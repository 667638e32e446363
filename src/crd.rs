// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for module lifecycle management.
//!
//! This module defines the Kubernetes Custom Resource Definition used by the
//! module operator to install, upgrade and uninstall platform modules declaratively.
//!
//! # Resource Types
//!
//! - [`ModuleLifecycle`] - Desired install state of a single platform module
//!
//! # Example: Describing a Helm-installed module
//!
//! ```rust,no_run
//! use module_operator::crd::{
//!     HelmChart, HelmChartRepository, HelmRelease, ModuleInstaller, ModuleLifecycleSpec,
//! };
//!
//! let spec = ModuleLifecycleSpec {
//!     installer: ModuleInstaller {
//!         helm_release: Some(HelmRelease {
//!             name: "ingress-nginx".to_string(),
//!             namespace: "ingress-system".to_string(),
//!             chart_info: HelmChart {
//!                 name: "ingress-nginx".to_string(),
//!                 path: None,
//!                 version: Some("4.10.0".to_string()),
//!             },
//!             repository: HelmChartRepository {
//!                 uri: "https://kubernetes.github.io/ingress-nginx".to_string(),
//!                 credentials_secret_ref: None,
//!             },
//!             overrides: vec![],
//!         }),
//!         istio: None,
//!     },
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a single key inside a `ConfigMap` or `Secret` in the resource's namespace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyRef {
    /// Name of the referenced object.
    pub name: String,

    /// Key within the object's data.
    pub key: String,

    /// When true, a missing object or key is skipped instead of failing the install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// One source of Helm value overrides.
///
/// Exactly one of the fields is expected to be set. Sources are applied in list order,
/// so later entries take precedence over earlier ones.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    /// Literal values document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub values: Option<serde_json::Value>,

    /// Values document stored under a `ConfigMap` key (YAML or JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<KeyRef>,

    /// Values document stored under a `Secret` key (YAML or JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<KeyRef>,
}

/// Chart coordinates inside a repository.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmChart {
    /// Chart name as published in the repository index.
    pub name: String,

    /// Optional chart path (local directory or OCI reference). Takes precedence over
    /// `name` + repository when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Chart version. When omitted the latest version in the repository is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Location of a Helm chart repository.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartRepository {
    /// Repository URL (e.g. `https://charts.example.com/stable`).
    #[serde(default)]
    pub uri: String,

    /// Name of a `Secret` with `username` and `password` keys for authenticated repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<String>,
}

/// A Helm release that implements a module.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmRelease {
    /// Release name.
    pub name: String,

    /// Namespace the release is installed into.
    pub namespace: String,

    /// Chart to install.
    pub chart_info: HelmChart,

    /// Repository serving the chart.
    #[serde(default)]
    pub repository: HelmChartRepository,

    /// Ordered value override sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Overrides>,
}

/// Istio installer descriptor.
///
/// Recognised so that specs using it validate, but no delegate implements it yet.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IstioRelease {
    /// Istio revision to install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Installer descriptor. One installer kind is expected to be set.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInstaller {
    /// Install the module from a Helm chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_release: Option<HelmRelease>,

    /// Install the module with the Istio installer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub istio: Option<IstioRelease>,
}

/// `ModuleLifecycle` drives a single platform module through install, upgrade and
/// uninstall.
///
/// # Example
///
/// ```yaml
/// apiVersion: platform.firestoned.io/v1alpha1
/// kind: ModuleLifecycle
/// metadata:
///   name: ingress-nginx
///   namespace: platform-system
/// spec:
///   installer:
///     helmRelease:
///       name: ingress-nginx
///       namespace: ingress-system
///       chartInfo:
///         name: ingress-nginx
///         version: 4.10.0
///       repository:
///         uri: https://kubernetes.github.io/ingress-nginx
///       overrides:
///         - values:
///             controller:
///               replicaCount: 2
///         - configMapRef:
///             name: ingress-overrides
///             key: values.yaml
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "platform.firestoned.io",
    version = "v1alpha1",
    kind = "ModuleLifecycle",
    namespaced,
    shortname = "mlc",
    doc = "ModuleLifecycle describes a platform module to install with a pluggable installer. The operator installs, upgrades and uninstalls the module and records each lifecycle milestone as a status condition.",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Observed","type":"integer","jsonPath":".status.observedGeneration"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "ModuleLifecycleStatus")]
#[serde(rename_all = "camelCase")]
pub struct ModuleLifecycleSpec {
    /// How the module is installed.
    pub installer: ModuleInstaller,
}

/// Lifecycle milestone recorded in `status.conditions`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum ConditionType {
    PreInstall,
    InstallStarted,
    InstallComplete,
    PreUpgrade,
    UpgradeStarted,
    UpgradeComplete,
    Uninstall,
    Failed,
}

impl ConditionType {
    /// All condition types, in lifecycle order.
    pub const ALL: [ConditionType; 8] = [
        ConditionType::PreInstall,
        ConditionType::InstallStarted,
        ConditionType::InstallComplete,
        ConditionType::PreUpgrade,
        ConditionType::UpgradeStarted,
        ConditionType::UpgradeComplete,
        ConditionType::Uninstall,
        ConditionType::Failed,
    ];

    /// Lifecycle state implied by this condition.
    ///
    /// The state stored in `status.state` is always derived through this mapping.
    #[must_use]
    pub const fn state(self) -> LifecycleState {
        match self {
            ConditionType::PreInstall => LifecycleState::PreInstalling,
            ConditionType::InstallStarted => LifecycleState::Installing,
            ConditionType::InstallComplete | ConditionType::UpgradeComplete => {
                LifecycleState::Ready
            }
            ConditionType::PreUpgrade => LifecycleState::PreUpgrading,
            ConditionType::UpgradeStarted => LifecycleState::Upgrading,
            ConditionType::Uninstall => LifecycleState::Uninstalling,
            ConditionType::Failed => LifecycleState::Failed,
        }
    }

    /// Wire name of the condition type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConditionType::PreInstall => "PreInstall",
            ConditionType::InstallStarted => "InstallStarted",
            ConditionType::InstallComplete => "InstallComplete",
            ConditionType::PreUpgrade => "PreUpgrade",
            ConditionType::UpgradeStarted => "UpgradeStarted",
            ConditionType::UpgradeComplete => "UpgradeComplete",
            ConditionType::Uninstall => "Uninstall",
            ConditionType::Failed => "Failed",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse lifecycle state reported in `status.state`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum LifecycleState {
    PreInstalling,
    Installing,
    PreUpgrading,
    Upgrading,
    Uninstalling,
    Ready,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::PreInstalling => "PreInstalling",
            LifecycleState::Installing => "Installing",
            LifecycleState::PreUpgrading => "PreUpgrading",
            LifecycleState::Upgrading => "Upgrading",
            LifecycleState::Uninstalling => "Uninstalling",
            LifecycleState::Ready => "Ready",
            LifecycleState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A timestamped record of a lifecycle milestone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleCondition {
    /// Milestone reached.
    pub r#type: ConditionType,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Human-readable message indicating details about the transition.
    #[serde(default)]
    pub message: String,

    /// Time the condition was recorded (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `ModuleLifecycle` status.
///
/// This is the only persisted record of lifecycle progress.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLifecycleStatus {
    /// Current lifecycle state, derived from the most recent condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,

    /// Bounded history of lifecycle conditions, oldest first.
    #[serde(default)]
    pub conditions: Vec<LifecycleCondition>,

    /// Generation for which the last install or upgrade completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Time of the last status write (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_at: Option<String>,
}

impl ModuleLifecycleStatus {
    /// The most recently recorded condition, if any.
    #[must_use]
    pub fn last_condition(&self) -> Option<&LifecycleCondition> {
        self.conditions.last()
    }
}

impl ModuleLifecycle {
    /// True when the resource has a deletion timestamp.
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Current lifecycle state, if the status has been initialized.
    #[must_use]
    pub fn state(&self) -> Option<LifecycleState> {
        self.status.as_ref().and_then(|s| s.state)
    }

    /// `status.observedGeneration`, if recorded.
    #[must_use]
    pub fn observed_generation(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.observed_generation)
    }
}

fn preserve_unknown_fields(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}
