// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used by the module operator.

// ============================================================================
// Module Operator Labels
// ============================================================================

/// Selects a bespoke delegate for a `ModuleLifecycle`.
///
/// When the value matches an entry in the delegate registry, the registered
/// constructor drives the lifecycle instead of the generic Helm delegate.
pub const MODULE_CONTROLLER_LABEL: &str = "platform.firestoned.io/module-controller";
