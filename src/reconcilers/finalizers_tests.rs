// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::constants::MODULE_LIFECYCLE_FINALIZER;
    use crate::reconcilers::finalizers::{ensure_absent, ensure_present, has_finalizer};
    use crate::store::ResourceKey;
    use crate::test_support::{deleting, helm_lifecycle, with_finalizer, MemoryStore};
    use kube::ResourceExt;

    #[tokio::test]
    async fn test_ensure_present_adds_once() {
        let store = MemoryStore::new();
        let mut resource = store.put(helm_lifecycle(1));

        assert!(ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
        assert!(has_finalizer(&resource, MODULE_LIFECYCLE_FINALIZER));
        assert_eq!(store.update_count(), 1);

        // Second call is a no-op
        assert!(!ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
        assert_eq!(store.update_count(), 1);

        let stored = store.fetch(&ResourceKey::of(&resource)).unwrap();
        assert_eq!(stored.finalizers(), &[MODULE_LIFECYCLE_FINALIZER.to_string()]);
    }

    #[tokio::test]
    async fn test_ensure_present_keeps_foreign_finalizers() {
        let store = MemoryStore::new();
        let mut seed = helm_lifecycle(1);
        seed.metadata.finalizers = Some(vec!["example.com/other".to_string()]);
        let mut resource = store.put(seed);

        ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap();

        assert_eq!(resource.finalizers().len(), 2);
        assert!(resource.finalizers().contains(&"example.com/other".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_present_skips_deleting_resource() {
        let store = MemoryStore::new();
        let mut resource = store.put(deleting(helm_lifecycle(1)));

        assert!(!ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_absent_removes_and_releases_resource() {
        let store = MemoryStore::new();
        let mut resource = store.put(deleting(with_finalizer(helm_lifecycle(1))));
        let key = ResourceKey::of(&resource);

        assert!(ensure_absent(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
        assert!(!has_finalizer(&resource, MODULE_LIFECYCLE_FINALIZER));
        // No finalizers left on a deleting object: the store drops it
        assert!(store.fetch(&key).is_none());
    }

    #[tokio::test]
    async fn test_ensure_absent_noop_without_marker() {
        let store = MemoryStore::new();
        let mut resource = store.put(helm_lifecycle(1));

        assert!(!ensure_absent(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_conflict_is_reported_and_retry_succeeds() {
        let store = MemoryStore::new();
        let mut resource = store.put(helm_lifecycle(1));
        store.fail_next_writes(1);

        let err = ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(!has_finalizer(&resource, MODULE_LIFECYCLE_FINALIZER));

        assert!(ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_stale_resource_conflicts() {
        let store = MemoryStore::new();
        let mut resource = store.put(helm_lifecycle(1));
        store.touch(&ResourceKey::of(&resource));

        let err = ensure_present(store.as_ref(), &mut resource, MODULE_LIFECYCLE_FINALIZER)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
