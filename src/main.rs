// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{controller, controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use module_operator::{
    config::OperatorConfig,
    constants::{ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::Context,
    crd::ModuleLifecycle,
    errors::LifecycleError,
    metrics,
    reconcilers::resolver::DelegateRegistry,
    reconcilers::retry::new_requeue_with_delay,
    store::ResourceKey,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    config.validate()?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("module-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json|text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Module Lifecycle Operator");
    debug!(?config, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_addr();
    let ctx = Arc::new(Context::new(client, config, DelegateRegistry::new()));

    // The operator exits when either task ends; the controller only ends on a signal
    tokio::select! {
        result = run_metrics_server(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = run_modulelifecycle_controller(ctx) => {
            result?;
            info!("ModuleLifecycle controller stopped");
            Ok(())
        }
    }
}

/// Run the `ModuleLifecycle` controller until a termination signal arrives.
async fn run_modulelifecycle_controller(ctx: Arc<Context>) -> Result<()> {
    let api = match ctx.config.watch_namespace.as_deref() {
        Some(namespace) => {
            info!("Starting ModuleLifecycle controller in namespace {namespace}");
            Api::<ModuleLifecycle>::namespaced(ctx.client.clone(), namespace)
        }
        None => {
            info!("Starting ModuleLifecycle controller with cluster-wide watch");
            Api::<ModuleLifecycle>::all(ctx.client.clone())
        }
    };

    let concurrency = ctx.config.concurrency;
    debug!(concurrency, "Reconciling resources in parallel");

    Controller::new(api, Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_modulelifecycle_wrapper, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller event: {e}");
            }
            futures::future::ready(())
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `ModuleLifecycle`
async fn reconcile_modulelifecycle_wrapper(
    resource: Arc<ModuleLifecycle>,
    ctx: Arc<Context>,
) -> Result<Action, LifecycleError> {
    debug!(
        name = %resource.name_any(),
        namespace = ?resource.namespace(),
        "Reconcile wrapper called for ModuleLifecycle"
    );

    let key = ResourceKey::of(&resource);
    let directive = ctx.reconciler.reconcile(&key).await?;
    Ok(directive.into_action())
}

/// Error policy for the controller: retry after a jittered delay
fn error_policy(resource: Arc<ModuleLifecycle>, err: &LifecycleError, _ctx: Arc<Context>) -> Action {
    warn!(
        name = %resource.name_any(),
        namespace = ?resource.namespace(),
        kind = err.kind(),
        "Reconciliation error: {err}"
    );
    let directive = new_requeue_with_delay(
        ERROR_REQUEUE_DURATION_SECS / 2,
        ERROR_REQUEUE_DURATION_SECS,
        Duration::from_secs(1),
    );
    directive.into_action()
}

/// Serve Prometheus metrics
async fn run_metrics_server(addr: String) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {addr}{METRICS_SERVER_PATH}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}
