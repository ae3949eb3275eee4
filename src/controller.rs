// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation passes and the single-worker loop driving them.
//!
//! Every pass reads the reflector caches, derives one [`IngressConfig`], hands
//! it to the [`LoadBalancer`] and then brings the status of owned Ingresses in
//! line with the published Service. Passes never overlap: cache events only
//! enqueue a tick on a channel of capacity one, and [`IngressController::run`]
//! drains that channel from a single task.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use k8s_openapi::api::networking::v1::{Ingress, IngressLoadBalancerIngress};
use kube::ResourceExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::constants::RESYNC_INTERVAL_SECS;
use crate::context::{ClusterView, Stores};
use crate::ingress_class::should_process;
use crate::metrics::{
    record_apply_error, record_reload, record_sync_error, record_sync_success, record_upstreams,
};
use crate::nghttpx::control::ControlSurface;
use crate::nghttpx::load_balancer::{LoadBalancer, ReloadOutcome};
use crate::nghttpx::types::IngressConfig;
use crate::retry::pass_backoff;
use crate::status::{
    current_addresses, needs_status_update, published_addresses, remove_address,
    LoadBalancerAddress, StatusWriter,
};
use crate::tls::collect_tls_creds;
use crate::topology::{build_upstreams, fallback_upstream};

/// Creates the coalescing tick channel consumed by [`IngressController::run`].
#[must_use]
pub fn tick_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

/// Requests a pass. A tick already waiting absorbs this one.
pub fn trigger(tx: &mpsc::Sender<()>) {
    match tx.try_send(()) {
        Ok(()) | Err(TrySendError::Full(())) => {}
        Err(TrySendError::Closed(())) => debug!("Sync queue closed, dropping tick"),
    }
}

/// Configuration nghttpx can start with before the first pass: plaintext
/// only, every request answered by the default server.
#[must_use]
pub fn bootstrap_config(config: &ControllerConfig) -> IngressConfig {
    IngressConfig {
        upstreams: vec![fallback_upstream()],
        workers: config.effective_workers(),
        extra_config: config.extra_config.clone(),
        health_port: config.health_port,
        api_port: config.api_port,
        ..Default::default()
    }
}

/// Drives nghttpx from the state of the cluster.
pub struct IngressController {
    config: ControllerConfig,
    stores: Stores,
    load_balancer: LoadBalancer,
    status: Arc<dyn StatusWriter>,
}

impl IngressController {
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        stores: Stores,
        control: Arc<dyn ControlSurface>,
        status: Arc<dyn StatusWriter>,
    ) -> Self {
        let load_balancer = LoadBalancer::new(control, config.conf_dir.clone());
        Self {
            config,
            stores,
            load_balancer,
            status,
        }
    }

    #[must_use]
    pub fn load_balancer(&self) -> &LoadBalancer {
        &self.load_balancer
    }

    /// Ingresses this controller is responsible for, in namespace/name order.
    #[must_use]
    pub fn owned_ingresses(&self) -> Vec<Arc<Ingress>> {
        self.stores
            .ingresses_sorted()
            .into_iter()
            .filter(|ing| {
                should_process(
                    ing,
                    &self.config.controller_id,
                    &self.stores.ingress_classes,
                    self.config.require_ingress_class,
                )
            })
            .collect()
    }

    /// Derives the desired nghttpx configuration for `ingresses`.
    #[must_use]
    pub fn build_config(&self, ingresses: &[&Ingress]) -> IngressConfig {
        let upstreams = build_upstreams(&self.stores, ingresses, self.config.default_backend());
        let creds = collect_tls_creds(
            &self.stores,
            ingresses,
            self.config.default_tls(),
            &self.config.conf_dir,
        );

        IngressConfig {
            upstreams,
            tls: creds.enabled(),
            default_tls_cred: creds.default,
            sub_tls_creds: creds.sub,
            workers: self.config.effective_workers(),
            extra_config: self.config.extra_config.clone(),
            health_port: self.config.health_port,
            api_port: self.config.api_port,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns an error if nghttpx could not be brought to the desired
    /// configuration. Status update failures are only logged.
    pub async fn sync(&self) -> Result<ReloadOutcome> {
        let start = Instant::now();

        let owned = self.owned_ingresses();
        let ingresses: Vec<&Ingress> = owned.iter().map(AsRef::as_ref).collect();
        debug!("Syncing {} Ingress(es)", ingresses.len());

        let ingress_config = self.build_config(&ingresses);
        record_upstreams(ingress_config.upstreams.len());

        let outcome = match self.load_balancer.check_and_reload(&ingress_config).await {
            Ok(outcome) => outcome,
            Err(e) => {
                record_apply_error(e.kind());
                record_sync_error(start.elapsed());
                return Err(e).context("failed to apply nghttpx configuration");
            }
        };
        record_reload(outcome.as_str());
        record_sync_success(start.elapsed());

        if let Err(e) = self.sync_status(&ingresses).await {
            warn!("Ingress status update incomplete: {:#}", e);
        }

        Ok(outcome)
    }

    /// Addresses of the publish Service, or `None` when nothing is published.
    fn published(&self) -> Option<Vec<IngressLoadBalancerIngress>> {
        let (namespace, name) = self.config.publish()?;
        match self.stores.service(namespace, name) {
            Some(service) => Some(published_addresses(&service)),
            None => {
                warn!("Publish Service {}/{} not found", namespace, name);
                None
            }
        }
    }

    async fn sync_status(&self, ingresses: &[&Ingress]) -> Result<()> {
        let Some(desired) = self.published() else {
            return Ok(());
        };

        let mut failed = 0;
        for ingress in ingresses {
            let current = current_addresses(ingress);
            if !needs_status_update(&current, &desired) {
                continue;
            }
            if let Err(e) = self.write_status(ingress, &desired).await {
                error!("{:#}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            bail!("failed to update status of {failed} Ingress(es)");
        }
        Ok(())
    }

    /// Removes the published addresses from every owned Ingress.
    ///
    /// # Errors
    ///
    /// Returns an error if any status could not be written.
    pub async fn remove_status(&self) -> Result<()> {
        let Some(published) = self.published() else {
            return Ok(());
        };

        let mut failed = 0;
        for ingress in self.owned_ingresses() {
            let current = current_addresses(&ingress);
            let remaining = published.iter().fold(current.clone(), |acc, addr| {
                let key = if addr.ip().is_empty() {
                    addr.hostname()
                } else {
                    addr.ip()
                };
                remove_address(acc, key)
            });

            if remaining.len() == current.len() {
                continue;
            }
            if let Err(e) = self.write_status(&ingress, &remaining).await {
                error!("{:#}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            bail!("failed to remove address from {failed} Ingress(es)");
        }
        Ok(())
    }

    async fn write_status(
        &self,
        ingress: &Ingress,
        addresses: &[IngressLoadBalancerIngress],
    ) -> Result<()> {
        let namespace = ingress.namespace().unwrap_or_default();
        let name = ingress.name_any();
        self.status
            .update_ingress_status(&namespace, &name, addresses)
            .await
            .with_context(|| format!("failed to update status of Ingress {namespace}/{name}"))
    }

    /// Processes ticks until `shutdown` completes.
    ///
    /// A pass also runs on start and every resync interval. A failed pass
    /// enqueues a retry tick after a growing delay; the delay resets on the
    /// next success. On shutdown the published addresses are withdrawn from
    /// owned Ingresses.
    ///
    /// # Errors
    ///
    /// Currently infallible; failures of individual passes are retried.
    pub async fn run<F>(
        &self,
        tx: mpsc::Sender<()>,
        mut rx: mpsc::Receiver<()>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut backoff = pass_backoff();
        let mut resync = tokio::time::interval(Duration::from_secs(RESYNC_INTERVAL_SECS));
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting sync loop");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping sync loop");
                    break;
                }
                tick = rx.recv() => {
                    if tick.is_none() {
                        break;
                    }
                }
                _ = resync.tick() => {
                    debug!("Periodic resync");
                }
            }

            match self.sync().await {
                Ok(outcome) => {
                    backoff.reset();
                    debug!("Sync complete (reload: {})", outcome.as_str());
                }
                Err(e) => {
                    let delay = backoff.next_backoff();
                    error!("Sync failed, retrying in {:?}: {:#}", delay, e);
                    let retry_tx = tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        trigger(&retry_tx);
                    });
                }
            }
        }

        if let Err(e) = self.remove_status().await {
            warn!("Could not withdraw Ingress status on shutdown: {:#}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
