// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-resource logging with "once" and "progress" semantics.
//!
//! A module that takes minutes to roll out is reconciled many times while it
//! converges. Logging the same "waiting for release" line on every pass drowns the
//! useful output, so reconcilers log through a [`ResourceLogger`]:
//!
//! - [`ResourceLogger::once`] emits a message at info level only the first time it is
//!   seen for the current generation of the resource.
//! - [`ResourceLogger::progress`] emits at info level when the message changes or when
//!   the quiet interval has elapsed, and at debug level otherwise.
//!
//! Loggers are cached by namespace/name in a [`LoggerCache`]. Their history is reset
//! whenever the resource's generation or UID changes. Entries are dropped with
//! [`LoggerCache::forget`] once the resource is gone.

use crate::constants::PROGRESS_LOG_INTERVAL_SECS;
use crate::crd::ModuleLifecycle;
use crate::store::ResourceKey;
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct LoggerState {
    uid: Option<String>,
    generation: i64,
    once_seen: HashSet<String>,
    last_progress: Option<(String, Instant)>,
}

/// Cache of per-resource loggers, keyed by namespace/name.
#[derive(Debug)]
pub struct LoggerCache {
    loggers: Mutex<HashMap<String, Arc<Mutex<LoggerState>>>>,
    progress_interval: Duration,
}

impl Default for LoggerCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(PROGRESS_LOG_INTERVAL_SECS))
    }
}

impl LoggerCache {
    /// Create a cache whose progress messages repeat at most every `progress_interval`.
    #[must_use]
    pub fn new(progress_interval: Duration) -> Self {
        Self {
            loggers: Mutex::new(HashMap::new()),
            progress_interval,
        }
    }

    /// Get the logger for a resource, resetting its history when the generation
    /// changes or the name is reused by a new object.
    #[must_use]
    pub fn ensure(&self, resource: &ModuleLifecycle) -> ResourceLogger {
        let key = ResourceKey::of(resource).to_string();
        let uid = resource.uid();
        let generation = resource.metadata.generation.unwrap_or_default();

        let state = {
            let mut loggers = self.loggers.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(loggers.entry(key.clone()).or_insert_with(|| {
                Arc::new(Mutex::new(LoggerState {
                    uid: uid.clone(),
                    generation,
                    ..LoggerState::default()
                }))
            }))
        };

        {
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.generation != generation || guard.uid != uid {
                *guard = LoggerState {
                    uid,
                    generation,
                    ..LoggerState::default()
                };
            }
        }

        ResourceLogger {
            resource: key,
            generation,
            state,
            progress_interval: self.progress_interval,
        }
    }

    /// Drop the cached logger of a resource that no longer exists.
    pub fn forget(&self, key: &ResourceKey) {
        self.loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.to_string());
    }

    /// Number of cached loggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no logger is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logger bound to one resource generation.
#[derive(Debug, Clone)]
pub struct ResourceLogger {
    resource: String,
    generation: i64,
    state: Arc<Mutex<LoggerState>>,
    progress_interval: Duration,
}

impl ResourceLogger {
    pub fn info(&self, message: &str) {
        info!(resource = %self.resource, generation = self.generation, "{message}");
    }

    pub fn debug(&self, message: &str) {
        debug!(resource = %self.resource, generation = self.generation, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(resource = %self.resource, generation = self.generation, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(resource = %self.resource, generation = self.generation, "{message}");
    }

    /// Log at info level the first time `message` is seen for this generation.
    ///
    /// Returns true if the message was emitted.
    pub fn once(&self, message: &str) -> bool {
        let first = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .once_seen
            .insert(message.to_string());
        if first {
            self.info(message);
        }
        first
    }

    /// Log a repeatable progress message without spamming.
    ///
    /// Returns true if the message was emitted at info level.
    pub fn progress(&self, message: &str) -> bool {
        let now = Instant::now();
        let emit = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let emit = match &state.last_progress {
                Some((last, at)) => {
                    last != message || now.duration_since(*at) >= self.progress_interval
                }
                None => true,
            };
            if emit {
                state.last_progress = Some((message.to_string(), now));
            }
            emit
        };

        if emit {
            self.info(message);
        } else {
            self.debug(message);
        }
        emit
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
