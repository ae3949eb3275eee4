// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use futures::StreamExt;
use ingress_lb::{
    config::ControllerConfig,
    context::Stores,
    controller::{bootstrap_config, tick_channel, trigger, IngressController},
    metrics::gather_metrics,
    nghttpx::{render::render, NghttpxControl},
    status::KubeStatusWriter,
};
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    runtime::{reflector, reflector::Store, watcher, WatchStreamExt},
    Api, Client, Resource,
};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("ingress-lb")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initializes logging.
///
/// Respects `RUST_LOG` (default `info`) for filtering and `RUST_LOG_FORMAT`
/// (`json` or text) for the output format.
fn init_logging() {
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
}

async fn async_main() -> Result<()> {
    init_logging();

    let config = ControllerConfig::parse();
    config.validate()?;

    info!(
        controller = %config.controller_id,
        conf_dir = %config.conf_dir.display(),
        "Starting nghttpx Ingress controller"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let (tx, rx) = tick_channel();
    let namespace = config.watch_namespace.as_deref();

    let stores = Stores {
        ingress_classes: spawn_reflector(Api::<IngressClass>::all(client.clone()), tx.clone()),
        ingresses: spawn_reflector(namespaced_api::<Ingress>(&client, namespace), tx.clone()),
        services: spawn_reflector(namespaced_api::<Service>(&client, namespace), tx.clone()),
        endpoint_slices: spawn_reflector(
            namespaced_api::<EndpointSlice>(&client, namespace),
            tx.clone(),
        ),
        pods: spawn_reflector(namespaced_api::<Pod>(&client, namespace), tx.clone()),
        secrets: spawn_reflector(namespaced_api::<Secret>(&client, namespace), tx.clone()),
    };

    info!("Waiting for caches to sync");
    wait_for_caches(&stores).await?;
    info!("Caches synced");

    tokio::spawn(serve_metrics(config.metrics_port));

    let control = NghttpxControl::new(
        config.conf_dir.clone(),
        config.api_port,
        config.pid_file.clone(),
        config.api_timeout(),
        config.reload_timeout(),
    )?;
    control
        .write_initial_config(&render(&bootstrap_config(&config), &config.conf_dir))
        .await
        .context("failed to write initial nghttpx configuration")?;
    let status = KubeStatusWriter::new(client);

    let controller = IngressController::new(config, stores, Arc::new(control), Arc::new(status));
    controller.run(tx, rx, shutdown_signal()).await?;

    info!("Controller stopped");
    Ok(())
}

/// API over `namespace`, or over all namespaces when none is given.
fn namespaced_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Starts a reflector for `api` that enqueues a sync on every change.
fn spawn_reflector<K>(api: Api<K>, tx: mpsc::Sender<()>) -> Store<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Send + Sync,
{
    let (reader, writer) = reflector::store::<K>();
    let kind = K::kind(&K::DynamicType::default()).to_string();

    let stream = watcher::watcher(api, watcher::Config::default())
        .default_backoff()
        .reflect(writer);

    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(event) = stream.next().await {
            match event {
                Ok(_) => trigger(&tx),
                Err(e) => warn!("{} watch error: {}", kind, e),
            }
        }
        error!("{} watch stream ended", kind);
    });

    reader
}

async fn wait_for_caches(stores: &Stores) -> Result<()> {
    stores
        .ingress_classes
        .wait_until_ready()
        .await
        .context("IngressClass cache")?;
    stores
        .ingresses
        .wait_until_ready()
        .await
        .context("Ingress cache")?;
    stores
        .services
        .wait_until_ready()
        .await
        .context("Service cache")?;
    stores
        .endpoint_slices
        .wait_until_ready()
        .await
        .context("EndpointSlice cache")?;
    stores.pods.wait_until_ready().await.context("Pod cache")?;
    stores
        .secrets
        .wait_until_ready()
        .await
        .context("Secret cache")?;
    Ok(())
}

fn metrics_router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn serve_metrics(port: u16) {
    let addr = format!("0.0.0.0:{port}");
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics server to {}: {}", addr, e);
            return;
        }
    };

    info!(address = %addr, "Metrics server starting");
    if let Err(e) = axum::serve(listener, metrics_router()).await {
        error!("Metrics server failed: {}", e);
    }
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = interrupt => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
