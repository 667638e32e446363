// Common test utilities for integration tests

use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use module_operator::constants::{API_GROUP_VERSION, KIND_MODULE_LIFECYCLE};
use module_operator::crd::{LifecycleState, ModuleLifecycle};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {}", e);
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "module-operator-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {}", name);
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {}", name);
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted test namespace: {}", name);
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("Test namespace already deleted: {}", name);
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Create a `ModuleLifecycle` installing a chart from a local path.
///
/// The path does not need to exist for tests that only exercise the API server.
pub async fn create_module_lifecycle(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<ModuleLifecycle, Box<dyn std::error::Error>> {
    let api: Api<ModuleLifecycle> = Api::namespaced(client.clone(), namespace);

    let resource: ModuleLifecycle = serde_json::from_value(json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": KIND_MODULE_LIFECYCLE,
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "spec": {
            "installer": {
                "helmRelease": {
                    "name": name,
                    "namespace": namespace,
                    "chartInfo": {
                        "name": name,
                        "path": "/charts/does-not-exist"
                    },
                    "repository": {}
                }
            }
        }
    }))?;

    let created = api.create(&PostParams::default(), &resource).await?;
    println!("Created ModuleLifecycle: {}/{}", namespace, name);
    Ok(created)
}

/// Poll until the resource reports `state`, or give up after `timeout`.
pub async fn wait_for_state(
    client: &Client,
    namespace: &str,
    name: &str,
    state: LifecycleState,
    timeout: Duration,
) -> bool {
    let api: Api<ModuleLifecycle> = Api::namespaced(client.clone(), namespace);
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(resource)) = api.get_opt(name).await {
            if resource.state() == Some(state) {
                return true;
            }
        }
        sleep(Duration::from_secs(2)).await;
    }
    false
}
