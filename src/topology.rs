// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Upstream topology derived from Ingress rules.
//!
//! Every `host` + `path` rule of an owned Ingress becomes one [`Upstream`]
//! whose servers are the ready endpoints of the referenced Service port. The
//! result is canonical:
//!
//! - servers within an upstream are unique by `(address, port)` and sorted;
//! - upstreams with the same name are merged and the list is sorted by name;
//! - an upstream with no ready endpoint holds exactly the default server.
//!
//! Two passes over unchanged cluster state therefore render byte-identical
//! backend configuration.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::api::discovery::v1::Endpoint;
use k8s_openapi::api::networking::v1::{Ingress, IngressServiceBackend, ServiceBackendPort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::annotation::IngressAnnotation;
use crate::constants::DEFAULT_UPSTREAM_NAME;
use crate::context::ClusterView;
use crate::nghttpx::backend_config::BackendConfigMapper;
use crate::nghttpx::path_config::{apply_path_config, PathConfigMapper};
use crate::nghttpx::types::{
    compare_upstream_servers, compare_upstreams, default_server, BackendConfig, Upstream,
    UpstreamServer,
};
use crate::pod::find_port;

/// Service type whose backend is a DNS name rather than endpoints
const EXTERNAL_NAME_SERVICE_TYPE: &str = "ExternalName";

/// A Service port referenced from a routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRef {
    pub namespace: String,
    pub service: String,
    /// Port name, or decimal port number
    pub port: String,
}

impl BackendRef {
    /// Builds a reference from an Ingress service backend.
    ///
    /// Returns `None` if the backend names no port.
    #[must_use]
    pub fn from_ingress_backend(namespace: &str, backend: &IngressServiceBackend) -> Option<Self> {
        let port = backend.port.as_ref().and_then(port_key)?;
        Some(Self {
            namespace: namespace.to_string(),
            service: backend.name.clone(),
            port,
        })
    }

    fn matches(&self, port: &ServicePort) -> bool {
        port.name.as_deref() == Some(self.port.as_str()) || port.port.to_string() == self.port
    }
}

fn port_key(port: &ServiceBackendPort) -> Option<String> {
    match (&port.name, port.number) {
        (Some(name), _) if !name.is_empty() => Some(name.clone()),
        (_, Some(number)) => Some(number.to_string()),
        _ => None,
    }
}

/// Names an upstream after its backend and routing rule, e.g.
/// `default/web,http;example.com/`.
#[must_use]
pub fn upstream_name(backend: &BackendRef, host: &str, path: &str) -> String {
    format!(
        "{}/{},{};{}{}",
        backend.namespace, backend.service, backend.port, host, path
    )
}

/// Ready servers behind one Service port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceBackends {
    /// Unique and sorted, empty if nothing is ready
    pub servers: Vec<UpstreamServer>,
}

impl ServiceBackends {
    /// Resolves the servers behind `backend`, configured by `backend_config`.
    ///
    /// Unknown Services and ports resolve to no servers. Endpoints that are not
    /// ready, are terminating, or whose named target port cannot be resolved
    /// are skipped individually.
    pub fn resolve<V: ClusterView + ?Sized>(
        view: &V,
        backend: &BackendRef,
        backend_config: &BackendConfigMapper,
    ) -> Self {
        let Some(service) = view.service(&backend.namespace, &backend.service) else {
            warn!(
                "Service {}/{} not found",
                backend.namespace, backend.service
            );
            return Self::default();
        };

        let Some(service_port) = service
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .and_then(|ports| ports.iter().find(|p| backend.matches(p)))
        else {
            warn!(
                "Service {}/{} has no port {}",
                backend.namespace, backend.service, backend.port
            );
            return Self::default();
        };

        let config = backend_config.config_for_service_port(&backend.service, service_port);

        let servers = if is_external_name(&service) {
            external_name_servers(&service, service_port, &config)
        } else {
            endpoint_servers(view, backend, service_port, &config)
        };

        Self {
            servers: canonical_servers(servers),
        }
    }
}

fn is_external_name(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        == Some(EXTERNAL_NAME_SERVICE_TYPE)
}

fn external_name_servers(
    service: &Service,
    service_port: &ServicePort,
    config: &BackendConfig,
) -> Vec<UpstreamServer> {
    let Some(external_name) = service
        .spec
        .as_ref()
        .and_then(|s| s.external_name.as_deref())
        .filter(|n| !n.is_empty())
    else {
        return Vec::new();
    };

    let port = match &service_port.target_port {
        Some(IntOrString::Int(port)) => *port,
        _ => service_port.port,
    };

    let mut server = UpstreamServer::with_config(external_name, port, config);
    server.dns = true;
    vec![server]
}

fn endpoint_servers<V: ClusterView + ?Sized>(
    view: &V,
    backend: &BackendRef,
    service_port: &ServicePort,
    config: &BackendConfig,
) -> Vec<UpstreamServer> {
    let mut servers = Vec::new();

    for slice in view.endpoint_slices(&backend.namespace, &backend.service) {
        let slice_port = slice
            .ports
            .as_ref()
            .and_then(|ports| {
                let wanted = service_port.name.as_deref().unwrap_or_default();
                ports
                    .iter()
                    .find(|p| p.name.as_deref().unwrap_or_default() == wanted)
            })
            .and_then(|p| p.port);

        for endpoint in slice.endpoints.iter().filter(|ep| is_ready(ep)) {
            let Some(address) = endpoint.addresses.first() else {
                continue;
            };

            let Some(port) = endpoint_port(view, backend, endpoint, service_port, slice_port)
            else {
                continue;
            };

            servers.push(UpstreamServer::with_config(address.clone(), port, config));
        }
    }

    servers
}

fn is_ready(endpoint: &Endpoint) -> bool {
    let conditions = endpoint.conditions.as_ref();
    let ready = conditions.and_then(|c| c.ready).unwrap_or(true);
    let terminating = conditions.and_then(|c| c.terminating).unwrap_or(false);
    ready && !terminating
}

/// Container port for one endpoint.
///
/// A named target port is resolved against the endpoint's Pod when the Pod
/// is known, and against the slice's port of the same name otherwise.
fn endpoint_port<V: ClusterView + ?Sized>(
    view: &V,
    backend: &BackendRef,
    endpoint: &Endpoint,
    service_port: &ServicePort,
    slice_port: Option<i32>,
) -> Option<i32> {
    match &service_port.target_port {
        Some(IntOrString::String(_)) => {}
        Some(IntOrString::Int(port)) => return Some(*port),
        None => return Some(service_port.port),
    }

    let pod = endpoint
        .target_ref
        .as_ref()
        .filter(|r| r.kind.as_deref() == Some("Pod"))
        .and_then(|r| r.name.as_deref())
        .and_then(|name| view.pod(&backend.namespace, name));

    match pod {
        Some(pod) => match find_port(&pod, service_port) {
            Ok(port) => Some(port),
            Err(e) => {
                warn!(
                    "Skipping endpoint of Service {}/{}: {}",
                    backend.namespace, backend.service, e
                );
                None
            }
        },
        None => slice_port,
    }
}

/// Deduplicates by `(address, port)` and sorts.
#[must_use]
pub fn canonical_servers(mut servers: Vec<UpstreamServer>) -> Vec<UpstreamServer> {
    servers.sort_by(compare_upstream_servers);
    servers.dedup_by(|a, b| a.address == b.address && a.port == b.port);
    servers
}

/// Builds the upstream for one routing rule.
///
/// The default server stands in when the backend has no ready servers.
pub fn build_upstream<V: ClusterView + ?Sized>(
    view: &V,
    backend: &BackendRef,
    host: &str,
    path: &str,
    backend_config: &BackendConfigMapper,
    path_config: &PathConfigMapper,
) -> Upstream {
    let mut servers = ServiceBackends::resolve(view, backend, backend_config).servers;
    if servers.is_empty() {
        debug!(
            "No ready backends for {}/{}:{}, using default server",
            backend.namespace, backend.service, backend.port
        );
        servers.push(default_server());
    }

    let mut upstream = Upstream {
        name: upstream_name(backend, host, path),
        host: host.to_string(),
        path: path.to_string(),
        backends: servers,
        ..Default::default()
    };
    apply_path_config(&mut upstream, &path_config.config_for(host, path));
    upstream
}

/// Builds the upstreams for every rule of `ingress`.
///
/// `spec.defaultBackend` becomes a catch-all rule with an empty host and
/// path `/`.
pub fn ingress_upstreams<V: ClusterView + ?Sized>(view: &V, ingress: &Ingress) -> Vec<Upstream> {
    let namespace = ingress.namespace().unwrap_or_default();
    let annotation = IngressAnnotation::new(ingress.metadata.annotations.as_ref());
    let backend_config = annotation.backend_config_mapper();
    let path_config = annotation.path_config_mapper();

    let Some(spec) = ingress.spec.as_ref() else {
        return Vec::new();
    };

    let mut upstreams = Vec::new();

    if let Some(service) = spec.default_backend.as_ref().and_then(|b| b.service.as_ref()) {
        match BackendRef::from_ingress_backend(&namespace, service) {
            Some(backend) => upstreams.push(build_upstream(
                view,
                &backend,
                "",
                "/",
                &backend_config,
                &path_config,
            )),
            None => warn!(
                "Ingress {}/{} default backend has no port",
                namespace,
                ingress.name_any()
            ),
        }
    }

    for rule in spec.rules.iter().flatten() {
        let host = rule.host.as_deref().unwrap_or_default();
        for http_path in rule.http.iter().flat_map(|h| &h.paths) {
            let Some(service) = http_path.backend.service.as_ref() else {
                debug!(
                    "Ingress {}/{} path without service backend skipped",
                    namespace,
                    ingress.name_any()
                );
                continue;
            };
            let Some(backend) = BackendRef::from_ingress_backend(&namespace, service) else {
                warn!(
                    "Ingress {}/{} backend {} has no port",
                    namespace,
                    ingress.name_any(),
                    service.name
                );
                continue;
            };

            let path = match http_path.path.as_deref() {
                None | Some("") => "/",
                Some(path) => path,
            };

            upstreams.push(build_upstream(
                view,
                &backend,
                host,
                path,
                &backend_config,
                &path_config,
            ));
        }
    }

    upstreams
}

/// Builds the catch-all upstream from the controller's default backend.
///
/// Falls back to the default server when no default backend is configured or
/// it has no ready servers.
pub fn default_upstream<V: ClusterView + ?Sized>(
    view: &V,
    default_backend: Option<(&str, &str)>,
) -> Upstream {
    let mut servers = Vec::new();

    if let Some((namespace, name)) = default_backend {
        let first_port = view
            .service(namespace, name)
            .and_then(|svc| svc.spec.as_ref()?.ports.as_ref()?.first().cloned());

        match first_port {
            Some(port) => {
                let backend = BackendRef {
                    namespace: namespace.to_string(),
                    service: name.to_string(),
                    port: port.port.to_string(),
                };
                servers =
                    ServiceBackends::resolve(view, &backend, &BackendConfigMapper::default())
                        .servers;
            }
            None => warn!("Default backend Service {}/{} has no ports", namespace, name),
        }
    }

    if servers.is_empty() {
        return fallback_upstream();
    }

    Upstream {
        backends: servers,
        ..fallback_upstream()
    }
}

/// The catch-all upstream served by the built-in default server alone.
#[must_use]
pub fn fallback_upstream() -> Upstream {
    Upstream {
        name: DEFAULT_UPSTREAM_NAME.to_string(),
        host: String::new(),
        path: "/".to_string(),
        backends: vec![default_server()],
        ..Default::default()
    }
}

/// Builds the canonical upstream list for all `ingresses`.
///
/// Upstreams sharing a name are merged, keeping the path settings of the
/// first. The controller default upstream is added unless an Ingress already
/// supplies a catch-all rule.
pub fn build_upstreams<V: ClusterView + ?Sized>(
    view: &V,
    ingresses: &[&Ingress],
    default_backend: Option<(&str, &str)>,
) -> Vec<Upstream> {
    let mut merged: BTreeMap<String, Upstream> = BTreeMap::new();

    for upstream in ingresses.iter().flat_map(|ing| ingress_upstreams(view, ing)) {
        match merged.get_mut(&upstream.name) {
            Some(existing) => existing.backends.extend(upstream.backends),
            None => {
                merged.insert(upstream.name.clone(), upstream);
            }
        }
    }

    let has_catch_all = merged
        .values()
        .any(|u| u.host.is_empty() && u.path == "/");
    if !has_catch_all {
        let upstream = default_upstream(view, default_backend);
        merged.insert(upstream.name.clone(), upstream);
    }

    let mut upstreams: Vec<Upstream> = merged
        .into_values()
        .map(|mut u| {
            u.backends = canonical_servers(std::mem::take(&mut u.backends));
            u
        })
        .collect();
    upstreams.sort_by(compare_upstreams);
    upstreams
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
