// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lifecycle condition history for `ModuleLifecycle` resources.
//!
//! Lifecycle progress is recorded as an append-only, bounded list of conditions in
//! `status.conditions`. The coarse `status.state` is never written on its own: it is
//! always derived from the type of the condition being appended.
//!
//! # Condition Format
//!
//! - `type`: The lifecycle milestone reached (e.g. `InstallStarted`)
//! - `status`: Always "True" for a recorded milestone
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the milestone was recorded
//!
//! # Example
//!
//! ```rust,ignore
//! use module_operator::crd::ConditionType;
//! use module_operator::reconcilers::status::StatusManager;
//!
//! async fn record(manager: &StatusManager, lifecycle: &mut ModuleLifecycle) -> Result<()> {
//!     manager
//!         .append(lifecycle, "Install started", ConditionType::InstallStarted)
//!         .await?;
//!     Ok(())
//! }
//! ```

use crate::constants::{CONDITION_STATUS_TRUE, DEFAULT_CONDITION_LIMIT};
use crate::crd::{ConditionType, LifecycleCondition, ModuleLifecycle};
use crate::errors::LifecycleError;
use crate::metrics;
use crate::store::StatusWriter;
use chrono::Utc;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// Create a new lifecycle condition with the current timestamp.
///
/// # Example
///
/// ```rust
/// # use module_operator::reconcilers::status::create_condition;
/// # use module_operator::crd::ConditionType;
/// let condition = create_condition(ConditionType::PreInstall, "Preparing install");
/// assert_eq!(condition.r#type, ConditionType::PreInstall);
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(condition_type: ConditionType, message: &str) -> LifecycleCondition {
    LifecycleCondition {
        r#type: condition_type,
        status: CONDITION_STATUS_TRUE.to_string(),
        message: message.to_string(),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// True if appending `condition_type`/`message` after `last` would record nothing new.
///
/// Only the type and the message are compared; timestamps always differ.
#[must_use]
pub fn is_duplicate_condition(
    last: Option<&LifecycleCondition>,
    condition_type: ConditionType,
    message: &str,
) -> bool {
    last.is_some_and(|c| c.r#type == condition_type && c.message == message)
}

/// Append a condition, evicting the oldest entries so the list never exceeds `limit`.
pub fn push_bounded(
    conditions: &mut Vec<LifecycleCondition>,
    condition: LifecycleCondition,
    limit: usize,
) {
    let limit = limit.max(1);
    if conditions.len() >= limit {
        let excess = conditions.len() + 1 - limit;
        conditions.drain(..excess);
    }
    conditions.push(condition);
}

/// Appends lifecycle conditions and persists them through a [`StatusWriter`].
#[derive(Clone)]
pub struct StatusManager {
    writer: Arc<dyn StatusWriter>,
    limit: usize,
}

impl StatusManager {
    /// Create a manager that keeps at most `limit` conditions.
    #[must_use]
    pub fn new(writer: Arc<dyn StatusWriter>, limit: usize) -> Self {
        Self { writer, limit }
    }

    /// Create a manager with the default history limit.
    #[must_use]
    pub fn with_default_limit(writer: Arc<dyn StatusWriter>) -> Self {
        Self::new(writer, DEFAULT_CONDITION_LIMIT)
    }

    /// Configured history limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Redirect status writes.
    pub fn set_writer(&mut self, writer: Arc<dyn StatusWriter>) {
        self.writer = writer;
    }

    /// Record a lifecycle milestone.
    ///
    /// Derives `status.state` from `condition_type`, appends the condition (evicting the
    /// oldest entry past the limit) and writes the status back. On success the
    /// in-memory resource is replaced with the stored object so later writes in the
    /// same pass carry the new `resourceVersion`.
    ///
    /// Appending the same type and message as the last condition is a no-op.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a condition was written, `Ok(false)` if it was a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Conflict`] if the resource changed since it was read.
    /// Callers treat this as a retry, not a failure.
    pub async fn append(
        &self,
        resource: &mut ModuleLifecycle,
        message: &str,
        condition_type: ConditionType,
    ) -> Result<bool, LifecycleError> {
        let status = resource.status.get_or_insert_with(Default::default);

        if is_duplicate_condition(status.last_condition(), condition_type, message) {
            debug!(
                resource = %format!("{}/{}", resource.namespace().unwrap_or_default(), resource.name_any()),
                condition = %condition_type,
                "Condition unchanged, skipping status update"
            );
            return Ok(false);
        }

        status.state = Some(condition_type.state());
        push_bounded(
            &mut status.conditions,
            create_condition(condition_type, message),
            self.limit,
        );
        status.reconciled_at = Some(Utc::now().to_rfc3339());

        let stored = self.writer.update_status(resource).await?;
        *resource = stored;

        metrics::record_condition(condition_type.as_str());
        Ok(true)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
