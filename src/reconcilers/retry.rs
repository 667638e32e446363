// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Requeue directives with randomized delays.
//!
//! Every non-terminal reconcile outcome (not ready, write conflict, transient error)
//! asks the scheduler to try again later. The delay is drawn uniformly from a bounded
//! range so that many resources failing at once do not all come back at the same
//! instant (thundering herd).

use kube::runtime::controller::Action;
use rand::Rng;
use std::time::Duration;

/// Scheduler instruction returned by a reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequeueDirective {
    /// Explicit retry flag, independent of the delay.
    pub requeue: bool,
    /// Delay before the retry.
    pub requeue_after: Duration,
}

impl RequeueDirective {
    /// No retry: wait for the next change to the resource.
    #[must_use]
    pub const fn done() -> Self {
        Self {
            requeue: false,
            requeue_after: Duration::ZERO,
        }
    }

    /// Retry after exactly `delay`.
    #[must_use]
    pub const fn after(delay: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: delay,
        }
    }

    /// True if either the retry flag is set or the delay is non-zero.
    #[must_use]
    pub fn should_requeue(&self) -> bool {
        self.requeue || !self.requeue_after.is_zero()
    }

    /// Convert into the kube runtime's scheduling action.
    #[must_use]
    pub fn into_action(self) -> Action {
        if self.should_requeue() {
            Action::requeue(self.requeue_after)
        } else {
            Action::await_change()
        }
    }
}

/// Build a directive that retries after a random delay in `[min, max] * unit`.
///
/// Bounds given in the wrong order are swapped.
///
/// # Example
///
/// ```rust
/// use module_operator::reconcilers::retry::new_requeue_with_delay;
/// use std::time::Duration;
///
/// let directive = new_requeue_with_delay(2, 5, Duration::from_secs(1));
/// assert!(directive.should_requeue());
/// assert!(directive.requeue_after >= Duration::from_secs(2));
/// assert!(directive.requeue_after <= Duration::from_secs(5));
/// ```
#[must_use]
pub fn new_requeue_with_delay(min: u64, max: u64, unit: Duration) -> RequeueDirective {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let units = rand::rng().random_range(low..=high);
    let delay = unit.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX));

    RequeueDirective {
        requeue: true,
        requeue_after: delay,
    }
}

/// Requeue bounds used by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequeuePolicy {
    pub min: u64,
    pub max: u64,
    pub unit: Duration,
}

impl RequeuePolicy {
    /// Draw a new jittered directive from this policy.
    #[must_use]
    pub fn directive(&self) -> RequeueDirective {
        new_requeue_with_delay(self.min, self.max, self.unit)
    }
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            min: crate::constants::DEFAULT_REQUEUE_MIN,
            max: crate::constants::DEFAULT_REQUEUE_MAX,
            unit: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
