// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Module Operator - Platform Module Lifecycle for Kubernetes
//!
//! The module operator drives platform modules through install, upgrade and
//! uninstall. Each module is declared as a `ModuleLifecycle` custom resource; the
//! operator hands the actual work to a pluggable delegate (Helm out of the box)
//! and records every lifecycle milestone as a status condition.
//!
//! ## Modules
//!
//! - [`crd`] - The `ModuleLifecycle` Custom Resource Definition
//! - [`reconcilers`] - Reconciliation, phase driving and status bookkeeping
//! - [`component`] - The capability set every delegate implements
//! - [`helm`] - Helm delegate, chart applier and value overrides
//! - [`store`] - Object store and status writer seams
//! - [`context`] - Controller wiring
//!
//! ## Example
//!
//! ```rust,no_run
//! use module_operator::crd::{ConditionType, LifecycleState};
//!
//! // The lifecycle state is always derived from the latest condition
//! assert_eq!(ConditionType::InstallComplete.state(), LifecycleState::Ready);
//! assert_eq!(ConditionType::PreUpgrade.state(), LifecycleState::PreUpgrading);
//! ```

pub mod component;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod helm;
pub mod labels;
pub mod logging;
pub mod metrics;
pub mod reconcilers;
pub mod store;

#[cfg(test)]
pub mod test_support;
