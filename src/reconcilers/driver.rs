// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lifecycle phase driver.
//!
//! One call to [`PhaseDriver::drive`] advances a resource by at most one lifecycle
//! step. The step is chosen from the last recorded condition through the
//! transition table in [`next_step`]:
//!
//! | Last condition                     | Step                                       | Next condition    |
//! |------------------------------------|--------------------------------------------|-------------------|
//! | `PreInstall`                       | pre-install hook, install                  | `InstallStarted`  |
//! | `InstallStarted`                   | wait for ready, post-install hook          | `InstallComplete` |
//! | `PreUpgrade`                       | pre-upgrade hook, upgrade                  | `UpgradeStarted`  |
//! | `UpgradeStarted`                   | wait for ready, post-upgrade hook          | `UpgradeComplete` |
//! | `InstallComplete`/`UpgradeComplete`| re-enter upgrade if the generation changed | `PreUpgrade`      |
//! | `Uninstall`/`Failed`               | nothing                                    |                   |
//!
//! A resource marked for deletion skips the table: the uninstall hooks run, the
//! `Uninstall` condition is recorded and the finalizer is removed.
//!
//! All progress lives in the resource's status. A crash between a delegate
//! operation and the status write replays that operation on the next pass, so
//! delegates must be idempotent.

use super::finalizers::{ensure_absent, ensure_present};
use super::status::StatusManager;
use crate::component::{Component, ComponentContext};
use crate::constants::MODULE_LIFECYCLE_FINALIZER;
use crate::crd::{ConditionType, ModuleLifecycle};
use crate::errors::LifecycleError;
use crate::logging::ResourceLogger;
use crate::metrics;
use crate::store::{LifecycleStore, ResourceKey, StatusWriter};
use kube::ResourceExt;
use std::future::Future;
use std::sync::Arc;

/// Lifecycle step selected from the last recorded condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Run the pre-install hook and install.
    Install,
    /// Poll readiness, then run the post-install hook.
    AwaitInstall,
    /// Run the pre-upgrade hook and upgrade.
    Upgrade,
    /// Poll readiness, then run the post-upgrade hook.
    AwaitUpgrade,
    /// Converged: start an upgrade if the spec changed.
    CheckGeneration,
    /// Nothing to do.
    Hold,
}

/// The transition table.
#[must_use]
pub const fn next_step(last: ConditionType) -> Step {
    match last {
        ConditionType::PreInstall => Step::Install,
        ConditionType::InstallStarted => Step::AwaitInstall,
        ConditionType::PreUpgrade => Step::Upgrade,
        ConditionType::UpgradeStarted => Step::AwaitUpgrade,
        ConditionType::InstallComplete | ConditionType::UpgradeComplete => {
            Step::CheckGeneration
        }
        ConditionType::Uninstall | ConditionType::Failed => Step::Hold,
    }
}

/// What a pass achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// A step ran and more work follows.
    InProgress,
    /// The resource is converged at its current generation.
    Converged,
    /// Nothing to do until the resource changes.
    Held,
    /// Uninstall completed and the finalizer is gone.
    Removed,
}

/// Runs lifecycle steps against a delegate and records their outcome.
#[derive(Clone)]
pub struct PhaseDriver {
    store: Arc<dyn LifecycleStore>,
    status: StatusManager,
}

impl PhaseDriver {
    #[must_use]
    pub fn new(store: Arc<dyn LifecycleStore>, status: StatusManager) -> Self {
        Self { store, status }
    }

    /// Redirect status writes.
    pub fn set_status_writer(&mut self, writer: Arc<dyn StatusWriter>) {
        self.status.set_writer(writer);
    }

    /// Advance `resource` by one lifecycle step.
    ///
    /// `resource` is kept in sync with every successful write.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotReady`] while the delegate reports the workload as
    ///   converging. The status is left untouched.
    /// - [`LifecycleError::Conflict`] when a write lost a concurrency race.
    /// - [`LifecycleError::Delegate`] when a delegate operation fails.
    pub async fn drive(
        &self,
        resource: &mut ModuleLifecycle,
        delegate: &dyn Component,
        log: &ResourceLogger,
    ) -> Result<PassOutcome, LifecycleError> {
        if resource.is_being_deleted() {
            return self.uninstall(resource, delegate, log).await;
        }

        ensure_present(self.store.as_ref(), resource, MODULE_LIFECYCLE_FINALIZER).await?;

        if resource.state().is_none() {
            log.once("Initializing lifecycle status");
            self.status
                .append(resource, "Preparing to install module", ConditionType::PreInstall)
                .await?;
        }

        let last = resource
            .status
            .as_ref()
            .and_then(|s| s.last_condition())
            .map_or(ConditionType::PreInstall, |c| c.r#type);

        let ctx = ComponentContext::new(resource.clone(), log.clone());
        let generation = resource.metadata.generation.unwrap_or_default();

        match next_step(last) {
            Step::Install => {
                run(delegate, "PreInstall", resource, delegate.pre_install(&ctx)).await?;
                run(delegate, "Install", resource, delegate.install(&ctx)).await?;
                self.status
                    .append(
                        resource,
                        &format!("Install of generation {generation} started"),
                        ConditionType::InstallStarted,
                    )
                    .await?;
                Ok(PassOutcome::InProgress)
            }
            Step::AwaitInstall => {
                self.await_ready(resource, delegate, &ctx).await?;
                run(delegate, "PostInstall", resource, delegate.post_install(&ctx)).await?;
                self.complete(
                    resource,
                    generation,
                    &format!("Install of generation {generation} complete"),
                    ConditionType::InstallComplete,
                )
                .await?;
                log.info("Module installed");
                Ok(PassOutcome::Converged)
            }
            Step::Upgrade => {
                run(delegate, "PreUpgrade", resource, delegate.pre_upgrade(&ctx)).await?;
                run(delegate, "Upgrade", resource, delegate.upgrade(&ctx)).await?;
                self.status
                    .append(
                        resource,
                        &format!("Upgrade to generation {generation} started"),
                        ConditionType::UpgradeStarted,
                    )
                    .await?;
                Ok(PassOutcome::InProgress)
            }
            Step::AwaitUpgrade => {
                self.await_ready(resource, delegate, &ctx).await?;
                run(delegate, "PostUpgrade", resource, delegate.post_upgrade(&ctx)).await?;
                self.complete(
                    resource,
                    generation,
                    &format!("Upgrade to generation {generation} complete"),
                    ConditionType::UpgradeComplete,
                )
                .await?;
                log.info("Module upgraded");
                Ok(PassOutcome::Converged)
            }
            Step::CheckGeneration => {
                if resource.observed_generation() == Some(generation) {
                    return Ok(PassOutcome::Converged);
                }
                log.once("Spec changed, starting upgrade");
                self.status
                    .append(
                        resource,
                        &format!("Preparing upgrade to generation {generation}"),
                        ConditionType::PreUpgrade,
                    )
                    .await?;
                Ok(PassOutcome::InProgress)
            }
            Step::Hold => {
                log.debug(&format!("Last condition is {last}, nothing to do"));
                Ok(PassOutcome::Held)
            }
        }
    }

    async fn uninstall(
        &self,
        resource: &mut ModuleLifecycle,
        delegate: &dyn Component,
        log: &ResourceLogger,
    ) -> Result<PassOutcome, LifecycleError> {
        log.once("Resource deleted, uninstalling module");
        let ctx = ComponentContext::new(resource.clone(), log.clone());

        run(delegate, "PreUninstall", resource, delegate.pre_uninstall(&ctx)).await?;
        run(delegate, "Uninstall", resource, delegate.uninstall(&ctx)).await?;
        run(delegate, "PostUninstall", resource, delegate.post_uninstall(&ctx)).await?;

        self.status
            .append(resource, "Module uninstalled", ConditionType::Uninstall)
            .await?;
        ensure_absent(self.store.as_ref(), resource, MODULE_LIFECYCLE_FINALIZER).await?;

        log.info("Module uninstalled, finalizer removed");
        Ok(PassOutcome::Removed)
    }

    async fn await_ready(
        &self,
        resource: &ModuleLifecycle,
        delegate: &dyn Component,
        ctx: &ComponentContext,
    ) -> Result<(), LifecycleError> {
        if delegate.is_ready(ctx).await {
            return Ok(());
        }
        let key = ResourceKey::of(resource);
        Err(LifecycleError::NotReady {
            namespace: key.namespace,
            name: key.name,
        })
    }

    /// Record a terminal success condition together with the observed generation.
    ///
    /// `generation` is the value `CheckGeneration` compares against, so a resource
    /// without `metadata.generation` still converges.
    async fn complete(
        &self,
        resource: &mut ModuleLifecycle,
        generation: i64,
        message: &str,
        condition: ConditionType,
    ) -> Result<(), LifecycleError> {
        resource
            .status
            .get_or_insert_with(Default::default)
            .observed_generation = Some(generation);
        self.status.append(resource, message, condition).await?;
        Ok(())
    }
}

/// Await a delegate operation, wrapping a failure with the operation name.
async fn run<F>(
    delegate: &dyn Component,
    operation: &'static str,
    resource: &ModuleLifecycle,
    op: F,
) -> Result<(), LifecycleError>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let result = op.await;
    metrics::record_delegate_operation(delegate.name(), operation, result.is_ok());

    result.map_err(|source| LifecycleError::Delegate {
        namespace: resource.namespace().unwrap_or_default(),
        name: resource.name_any(),
        operation,
        source,
    })
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod driver_tests;
