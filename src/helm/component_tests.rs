// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `helm/component.rs`

#[cfg(test)]
mod tests {
    use crate::component::{Component, ComponentContext};
    use crate::crd::Overrides;
    use crate::helm::HelmComponent;
    use crate::logging::LoggerCache;
    use crate::test_support::{helm_lifecycle, FakeChartApplier};
    use serde_json::json;

    fn context() -> ComponentContext {
        let mut resource = helm_lifecycle(1);
        let release = resource.spec.installer.helm_release.as_mut().unwrap();
        release.overrides = vec![
            Overrides {
                values: Some(json!({"controller": {"replicaCount": 1}})),
                ..Default::default()
            },
            Overrides {
                values: Some(json!({"controller": {"replicaCount": 2}})),
                ..Default::default()
            },
        ];
        let log = LoggerCache::default().ensure(&resource);
        ComponentContext::new(resource, log)
    }

    #[tokio::test]
    async fn test_install_applies_inline_values() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());

        component.install(&context()).await.unwrap();

        let applied = applier.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].release, "ingress-nginx");
        assert_eq!(applied[0].values, json!({"controller": {"replicaCount": 2}}));
        assert!(applied[0].credentials.is_none());
    }

    #[tokio::test]
    async fn test_non_map_inline_values_are_rejected() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());
        let mut ctx = context();
        let release = ctx.resource.spec.installer.helm_release.as_mut().unwrap();
        release.overrides.push(Overrides {
            values: Some(json!(["not", "a", "map"])),
            ..Default::default()
        });

        let err = component.install(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("overrides[2] must be a map of values"));
        assert!(component.upgrade(&ctx).await.is_err());
        assert!(applier.applied().is_empty());
    }

    #[tokio::test]
    async fn test_null_inline_values_are_skipped() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());
        let mut ctx = context();
        let release = ctx.resource.spec.installer.helm_release.as_mut().unwrap();
        release.overrides.push(Overrides {
            values: Some(serde_json::Value::Null),
            ..Default::default()
        });

        component.install(&ctx).await.unwrap();
        assert_eq!(
            applier.applied()[0].values,
            json!({"controller": {"replicaCount": 2}})
        );
    }

    #[tokio::test]
    async fn test_apply_failure_propagates() {
        let applier = FakeChartApplier::new();
        applier.fail_apply();
        let component = HelmComponent::new(applier.clone());

        let err = component.upgrade(&context()).await.unwrap_err();
        assert!(format!("{err:#}").contains("chart apply failed"));
    }

    #[tokio::test]
    async fn test_is_ready_tracks_release_state() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());
        let ctx = context();

        // Not installed yet
        assert!(!component.is_ready(&ctx).await);

        applier.set_release("pending-install", Some("4.10.0"));
        assert!(!component.is_ready(&ctx).await);

        // Deployed at an older chart version
        applier.set_release("deployed", Some("4.9.0"));
        assert!(!component.is_ready(&ctx).await);

        applier.set_release("deployed", Some("4.10.0"));
        assert!(component.is_ready(&ctx).await);
    }

    #[tokio::test]
    async fn test_uninstall_removes_release() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());

        component.uninstall(&context()).await.unwrap();

        assert_eq!(
            applier.uninstalled(),
            vec![("ingress-nginx".to_string(), "ingress-system".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_helm_release_fails() {
        let applier = FakeChartApplier::new();
        let component = HelmComponent::new(applier.clone());
        let mut ctx = context();
        ctx.resource.spec.installer.helm_release = None;

        assert!(component.install(&ctx).await.is_err());
        assert!(!component.is_ready(&ctx).await);
        assert!(applier.applied().is_empty());
    }
}
