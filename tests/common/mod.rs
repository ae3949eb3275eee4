// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common fixtures for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ingress_lb::context::Stores;
use ingress_lb::labels::SERVICE_NAME_LABEL;
use ingress_lb::status::StatusWriter;
use k8s_openapi::api::core::v1::{Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::api::discovery::v1::{Endpoint, EndpointConditions, EndpointSlice};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressLoadBalancerIngress,
    IngressRule, IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::runtime::reflector::store::Writer;
use kube::runtime::reflector::{self, Store};
use kube::runtime::watcher::Event;
use kube::Resource;

pub const NAMESPACE: &str = "shop";

/// A reflector store plus the writer used to feed it.
pub fn store_of<K>(objects: Vec<K>) -> (Store<K>, Writer<K>)
where
    K: Resource + Clone + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, mut writer) = reflector::store::<K>();
    for obj in objects {
        writer.apply_watcher_event(&Event::Apply(obj));
    }
    (reader, writer)
}

/// In-memory cluster with writers for the objects tests mutate.
pub struct Cluster {
    pub stores: Stores,
    pub ingresses: Writer<Ingress>,
    pub endpoint_slices: Writer<EndpointSlice>,
    pub secrets: Writer<Secret>,
}

impl Cluster {
    pub fn new(
        ingresses: Vec<Ingress>,
        services: Vec<Service>,
        slices: Vec<EndpointSlice>,
        secrets: Vec<Secret>,
    ) -> Self {
        let (ingress_classes, _) = store_of(vec![]);
        let (ingress_store, ingress_writer) = store_of(ingresses);
        let (service_store, _) = store_of(services);
        let (slice_store, slice_writer) = store_of(slices);
        let (pods, _) = store_of(vec![]);
        let (secret_store, secret_writer) = store_of(secrets);

        Self {
            stores: Stores {
                ingress_classes,
                ingresses: ingress_store,
                services: service_store,
                endpoint_slices: slice_store,
                pods,
                secrets: secret_store,
            },
            ingresses: ingress_writer,
            endpoint_slices: slice_writer,
            secrets: secret_writer,
        }
    }
}

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..Default::default()
    }
}

/// Ingress routing `host/` to `service:80`, terminating TLS with `tls_secret`.
pub fn ingress(name: &str, host: &str, service: &str, tls_secret: Option<&str>) -> Ingress {
    Ingress {
        metadata: meta(name),
        spec: Some(IngressSpec {
            tls: tls_secret.map(|secret| {
                vec![IngressTLS {
                    hosts: Some(vec![host.to_string()]),
                    secret_name: Some(secret.to_string()),
                }]
            }),
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(80),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service exposing port 80 in front of container port 8080.
pub fn service(name: &str) -> Service {
    Service {
        metadata: meta(name),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: 80,
                target_port: Some(IntOrString::Int(8080)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `EndpointSlice` of `service` with one ready endpoint per address.
pub fn endpoint_slice(service: &str, addresses: &[&str]) -> EndpointSlice {
    let mut metadata = meta(&format!("{service}-1"));
    metadata.labels = Some(BTreeMap::from([(
        SERVICE_NAME_LABEL.to_string(),
        service.to_string(),
    )]));

    EndpointSlice {
        metadata,
        address_type: "IPv4".to_string(),
        endpoints: addresses
            .iter()
            .map(|address| Endpoint {
                addresses: vec![(*address).to_string()],
                conditions: Some(EndpointConditions {
                    ready: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// `kubernetes.io/tls` Secret holding `key` and `cert`.
pub fn tls_secret(name: &str, key: &str, cert: &str) -> Secret {
    Secret {
        metadata: meta(name),
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(BTreeMap::from([
            ("tls.key".to_string(), ByteString(key.as_bytes().to_vec())),
            ("tls.crt".to_string(), ByteString(cert.as_bytes().to_vec())),
        ])),
        ..Default::default()
    }
}

/// Status writer that records every update as `namespace/name` and IPs.
#[derive(Default)]
pub struct RecordingStatus {
    pub updates: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl StatusWriter for RecordingStatus {
    async fn update_ingress_status(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[IngressLoadBalancerIngress],
    ) -> anyhow::Result<()> {
        let ips = addresses
            .iter()
            .map(|a| a.ip.clone().unwrap_or_default())
            .collect();
        self.updates
            .lock()
            .unwrap()
            .push((format!("{namespace}/{name}"), ips));
        Ok(())
    }
}
