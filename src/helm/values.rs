// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helm value override and repository credential resolution.
//!
//! A release's `overrides` list is applied in order: each source (inline values,
//! a `ConfigMap` key or a `Secret` key) is parsed as a YAML document and deep-merged
//! over the result of the previous ones. Maps merge recursively; scalars and arrays
//! from later sources replace earlier ones.

use super::RepositoryCredentials;
use crate::constants::{REPOSITORY_PASSWORD_KEY, REPOSITORY_USERNAME_KEY};
use crate::crd::{KeyRef, Overrides};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Reads `ConfigMap` and `Secret` data.
#[async_trait]
pub trait ValuesSource: Send + Sync {
    /// Data of a `ConfigMap`, `None` if it does not exist.
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>>;

    /// Decoded data of a `Secret`, `None` if it does not exist.
    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>>;
}

/// [`ValuesSource`] reading from the Kubernetes API.
#[derive(Clone)]
pub struct KubeValuesSource {
    client: Client,
}

impl KubeValuesSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValuesSource for KubeValuesSource {
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let cm = api
            .get_opt(name)
            .await
            .with_context(|| format!("Failed to read ConfigMap {namespace}/{name}"))?;
        Ok(cm.map(|cm| cm.data.unwrap_or_default()))
    }

    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let Some(secret) = api
            .get_opt(name)
            .await
            .with_context(|| format!("Failed to read Secret {namespace}/{name}"))?
        else {
            return Ok(None);
        };

        let mut data = secret.string_data.unwrap_or_default();
        for (key, bytes) in secret.data.unwrap_or_default() {
            let value = String::from_utf8(bytes.0).with_context(|| {
                format!("Secret {namespace}/{name} key '{key}' is not valid UTF-8")
            })?;
            data.entry(key).or_insert(value);
        }
        Ok(Some(data))
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge key by key, recursively. Any other overlay value replaces the
/// base value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let nested = value.is_object() && base_map.get(&key).is_some_and(Value::is_object);
                if !nested {
                    base_map.insert(key, value);
                } else if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Resolve and merge a release's override sources, in list order.
///
/// # Errors
///
/// Fails when a required `ConfigMap`/`Secret` or key is missing, when a referenced
/// document is not valid YAML, or when a document is not a map.
pub async fn resolve_overrides(
    source: &dyn ValuesSource,
    namespace: &str,
    overrides: &[Overrides],
) -> Result<Value> {
    let mut merged = Value::Object(Map::new());

    for (index, entry) in overrides.iter().enumerate() {
        if let Some(values) = &entry.values {
            merge_document(&mut merged, values.clone(), index)?;
        }
        if let Some(key_ref) = &entry.config_map_ref {
            let data = source.config_map_data(namespace, &key_ref.name).await?;
            if let Some(text) = lookup(data, key_ref, "ConfigMap", namespace)? {
                merge_document(&mut merged, parse_document(&text, key_ref)?, index)?;
            }
        }
        if let Some(key_ref) = &entry.secret_ref {
            let data = source.secret_data(namespace, &key_ref.name).await?;
            if let Some(text) = lookup(data, key_ref, "Secret", namespace)? {
                merge_document(&mut merged, parse_document(&text, key_ref)?, index)?;
            }
        }
    }

    Ok(merged)
}

fn lookup(
    data: Option<BTreeMap<String, String>>,
    key_ref: &KeyRef,
    kind: &str,
    namespace: &str,
) -> Result<Option<String>> {
    let optional = key_ref.optional.unwrap_or(false);

    let Some(mut data) = data else {
        if optional {
            debug!("Optional {kind} {namespace}/{} not found, skipping", key_ref.name);
            return Ok(None);
        }
        bail!("{kind} {namespace}/{} not found", key_ref.name);
    };

    match data.remove(&key_ref.key) {
        Some(text) => Ok(Some(text)),
        None if optional => {
            debug!(
                "Optional key '{}' not found in {kind} {namespace}/{}, skipping",
                key_ref.key, key_ref.name
            );
            Ok(None)
        }
        None => bail!(
            "key '{}' not found in {kind} {namespace}/{}",
            key_ref.key,
            key_ref.name
        ),
    }
}

fn parse_document(text: &str, key_ref: &KeyRef) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(text).with_context(|| {
        format!(
            "Failed to parse values document '{}' from {}",
            key_ref.key, key_ref.name
        )
    })
}

/// Merge one values document into `merged`, rejecting anything but a map or null.
pub(super) fn merge_document(merged: &mut Value, document: Value, index: usize) -> Result<()> {
    match document {
        Value::Null => Ok(()),
        Value::Object(_) => {
            deep_merge(merged, document);
            Ok(())
        }
        _ => bail!("overrides[{index}] must be a map of values"),
    }
}

/// Read repository credentials from a `Secret` with `username` and `password` keys.
///
/// # Errors
///
/// Fails when the secret or either key is missing.
pub async fn resolve_credentials(
    source: &dyn ValuesSource,
    namespace: &str,
    secret_name: &str,
) -> Result<RepositoryCredentials> {
    let mut data = source
        .secret_data(namespace, secret_name)
        .await?
        .with_context(|| format!("Repository credentials Secret {namespace}/{secret_name} not found"))?;

    let mut take = |key: &str| {
        data.remove(key).with_context(|| {
            format!("Repository credentials Secret {namespace}/{secret_name} has no '{key}' key")
        })
    };

    Ok(RepositoryCredentials {
        username: take(REPOSITORY_USERNAME_KEY)?,
        password: take(REPOSITORY_PASSWORD_KEY)?,
    })
}

#[cfg(test)]
#[path = "values_tests.rs"]
mod values_tests;
