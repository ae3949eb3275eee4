// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Load balancer address set operations and Ingress status writeback.
//!
//! The addresses published in `Ingress.status.loadBalancer.ingress` are
//! semantically a set, but they are stored and compared as a sorted,
//! deduplicated sequence so that status updates are deterministic.
//!
//! The set operations are generic over [`LoadBalancerAddress`], which both the
//! Service flavour (`core/v1 LoadBalancerIngress`) and the Ingress flavour
//! (`networking/v1 IngressLoadBalancerIngress`) implement.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, Service};
use k8s_openapi::api::networking::v1::{Ingress, IngressLoadBalancerIngress};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

use crate::constants::CONTROLLER_NAME;

/// An externally observed address: an IP, a hostname, or both.
pub trait LoadBalancerAddress {
    /// The IP, or `""` when unset
    fn ip(&self) -> &str;
    /// The hostname, or `""` when unset
    fn hostname(&self) -> &str;
}

impl LoadBalancerAddress for LoadBalancerIngress {
    fn ip(&self) -> &str {
        self.ip.as_deref().unwrap_or_default()
    }

    fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or_default()
    }
}

impl LoadBalancerAddress for IngressLoadBalancerIngress {
    fn ip(&self) -> &str {
        self.ip.as_deref().unwrap_or_default()
    }

    fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Set operations
// ============================================================================

/// Compares the IP fields of `a` and `b` position by position.
///
/// This is a positional comparison, not a set comparison: callers wanting set
/// semantics must sort both sides with [`sort_addresses`] first.
#[must_use]
pub fn ip_equal<A: LoadBalancerAddress, B: LoadBalancerAddress>(a: &[A], b: &[B]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ip() == y.ip())
}

/// Sorts by IP, then hostname, ascending.
pub fn sort_addresses<T: LoadBalancerAddress>(addresses: &mut [T]) {
    addresses.sort_by(|a, b| {
        a.ip()
            .cmp(b.ip())
            .then_with(|| a.hostname().cmp(b.hostname()))
    });
}

/// Collapses consecutive entries with equal IP and hostname, keeping the first.
///
/// Assumes `addresses` was sorted by [`sort_addresses`].
#[must_use]
pub fn uniq_addresses<T: LoadBalancerAddress>(mut addresses: Vec<T>) -> Vec<T> {
    addresses.dedup_by(|current, kept| {
        current.ip() == kept.ip() && current.hostname() == kept.hostname()
    });
    addresses
}

/// Removes every entry whose IP or hostname equals `addr`.
///
/// The input is returned untouched when nothing matches.
#[must_use]
pub fn remove_address<T: LoadBalancerAddress>(addresses: Vec<T>, addr: &str) -> Vec<T> {
    let matches = |a: &T| a.ip() == addr || a.hostname() == addr;

    if !addresses.iter().any(matches) {
        return addresses;
    }

    addresses.into_iter().filter(|a| !matches(a)).collect()
}

/// Sorts and deduplicates in one step.
#[must_use]
pub fn canonicalize<T: LoadBalancerAddress>(mut addresses: Vec<T>) -> Vec<T> {
    sort_addresses(&mut addresses);
    uniq_addresses(addresses)
}

// ============================================================================
// Status derivation
// ============================================================================

/// Addresses this controller should publish, derived from its fronting Service.
///
/// Uses `status.loadBalancer.ingress` when populated, otherwise
/// `spec.externalIPs`. The result is canonical.
#[must_use]
pub fn published_addresses(service: &Service) -> Vec<IngressLoadBalancerIngress> {
    let from_status: Vec<IngressLoadBalancerIngress> = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .into_iter()
        .flatten()
        .map(|lb| IngressLoadBalancerIngress {
            ip: lb.ip.clone(),
            hostname: lb.hostname.clone(),
            ..Default::default()
        })
        .collect();

    if !from_status.is_empty() {
        return canonicalize(from_status);
    }

    let external_ips: Vec<IngressLoadBalancerIngress> = service
        .spec
        .as_ref()
        .and_then(|s| s.external_ips.as_ref())
        .into_iter()
        .flatten()
        .map(|ip| IngressLoadBalancerIngress {
            ip: Some(ip.clone()),
            ..Default::default()
        })
        .collect();

    canonicalize(external_ips)
}

/// The addresses currently recorded in an Ingress status, in canonical order.
#[must_use]
pub fn current_addresses(ingress: &Ingress) -> Vec<IngressLoadBalancerIngress> {
    let addresses = ingress
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.clone())
        .unwrap_or_default();

    canonicalize(addresses)
}

/// True if `current` and `desired` (both canonical) differ.
#[must_use]
pub fn needs_status_update(
    current: &[IngressLoadBalancerIngress],
    desired: &[IngressLoadBalancerIngress],
) -> bool {
    !ip_equal(current, desired)
        || current
            .iter()
            .zip(desired)
            .any(|(c, d)| c.hostname() != d.hostname())
}

// ============================================================================
// Status surface
// ============================================================================

/// Writes the published address list back to an Ingress.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Replaces `status.loadBalancer.ingress` of `namespace/name` with `addresses`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be written.
    async fn update_ingress_status(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[IngressLoadBalancerIngress],
    ) -> anyhow::Result<()>;
}

/// Patch parameters for status writes, attributed to this controller.
#[must_use]
pub fn status_patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(CONTROLLER_NAME.to_string()),
        ..Default::default()
    }
}

/// [`StatusWriter`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn update_ingress_status(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[IngressLoadBalancerIngress],
    ) -> anyhow::Result<()> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);

        let status_patch = json!({
            "status": {
                "loadBalancer": {
                    "ingress": addresses,
                }
            }
        });

        debug!(
            "Updating status of Ingress {}/{} to {} address(es)",
            namespace,
            name,
            addresses.len()
        );

        api.patch_status(name, &status_patch_params(), &Patch::Merge(&status_patch))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
