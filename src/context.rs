// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared reflector stores and the cluster lookups built on them.
//!
//! Every reconciliation pass reads cluster state exclusively through these
//! in-memory stores, so a pass never issues API reads of its own. The
//! [`ClusterView`] trait is the narrow seam the topology and TLS builders
//! depend on; [`Stores`] is its production implementation.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

use crate::labels::SERVICE_NAME_LABEL;

/// Namespaced lookups needed to turn Ingress rules into backends.
pub trait ClusterView {
    /// Returns the Service `namespace/name`.
    fn service(&self, namespace: &str, name: &str) -> Option<Arc<Service>>;

    /// Returns every `EndpointSlice` owned by the Service `namespace/service`.
    fn endpoint_slices(&self, namespace: &str, service: &str) -> Vec<Arc<EndpointSlice>>;

    /// Returns the Pod `namespace/name`.
    fn pod(&self, namespace: &str, name: &str) -> Option<Arc<Pod>>;

    /// Returns the Secret `namespace/name`.
    fn secret(&self, namespace: &str, name: &str) -> Option<Arc<Secret>>;
}

/// Collection of all reflector stores used by the controller.
///
/// Each store is populated by a dedicated reflector task and provides
/// in-memory access to resources without API calls.
#[derive(Clone)]
pub struct Stores {
    // Cluster-scoped resources
    pub ingress_classes: Store<IngressClass>,

    // Namespace-scoped resources
    pub ingresses: Store<Ingress>,
    pub services: Store<Service>,
    pub endpoint_slices: Store<EndpointSlice>,
    pub pods: Store<Pod>,
    pub secrets: Store<Secret>,
}

impl Stores {
    /// Every cached Ingress, sorted by `namespace/name`.
    #[must_use]
    pub fn ingresses_sorted(&self) -> Vec<Arc<Ingress>> {
        let mut ingresses = self.ingresses.state();
        ingresses.sort_by_key(|ing| (ing.namespace().unwrap_or_default(), ing.name_any()));
        ingresses
    }
}

impl ClusterView for Stores {
    fn service(&self, namespace: &str, name: &str) -> Option<Arc<Service>> {
        self.services.get(&ObjectRef::new(name).within(namespace))
    }

    fn endpoint_slices(&self, namespace: &str, service: &str) -> Vec<Arc<EndpointSlice>> {
        let mut slices: Vec<Arc<EndpointSlice>> = self
            .endpoint_slices
            .state()
            .into_iter()
            .filter(|slice| {
                slice.namespace().as_deref() == Some(namespace)
                    && slice.labels().get(SERVICE_NAME_LABEL).map(String::as_str) == Some(service)
            })
            .collect();
        slices.sort_by_key(|slice| slice.name_any());
        slices
    }

    fn pod(&self, namespace: &str, name: &str) -> Option<Arc<Pod>> {
        self.pods.get(&ObjectRef::new(name).within(namespace))
    }

    fn secret(&self, namespace: &str, name: &str) -> Option<Arc<Secret>> {
        self.secrets.get(&ObjectRef::new(name).within(namespace))
    }
}

/// Splits a `namespace/name` reference.
///
/// Returns `None` unless both halves are non-empty.
#[must_use]
pub fn split_namespaced_name(value: &str) -> Option<(&str, &str)> {
    let (namespace, name) = value.split_once('/')?;
    (!namespace.is_empty() && !name.is_empty() && !name.contains('/')).then_some((namespace, name))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
