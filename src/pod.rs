// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of service target ports against pod container ports.

use k8s_openapi::api::core::v1::{Pod, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::constants::DEFAULT_PORT_PROTOCOL;
use crate::errors::PortError;

/// Locates the container port for `service_port` in `pod`.
///
/// A numeric target port is returned as is. A named target port is looked up
/// across all containers in declaration order; port names are unique within a
/// pod, so the first name match decides: it resolves if its protocol matches
/// the service port's protocol and fails otherwise. A service port without a
/// target port targets its own port number.
///
/// # Errors
///
/// Returns [`PortError::ProtocolMismatch`] if the named port uses another
/// protocol, and [`PortError::NotFound`] if no container declares the name.
pub fn find_port(pod: &Pod, service_port: &ServicePort) -> Result<i32, PortError> {
    let name = match &service_port.target_port {
        Some(IntOrString::Int(port)) => return Ok(*port),
        Some(IntOrString::String(name)) => name,
        None => return Ok(service_port.port),
    };

    let expected = protocol_or_default(service_port.protocol.as_deref());

    let containers = pod.spec.as_ref().map(|spec| spec.containers.as_slice());
    let ports = containers
        .unwrap_or_default()
        .iter()
        .flat_map(|container| container.ports.as_deref().unwrap_or_default());

    for port in ports {
        if port.name.as_deref() != Some(name.as_str()) {
            continue;
        }

        let actual = protocol_or_default(port.protocol.as_deref());
        if actual == expected {
            return Ok(port.container_port);
        }

        return Err(PortError::ProtocolMismatch {
            pod: pod_identity(pod),
            port_name: name.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    Err(PortError::NotFound {
        pod: pod_identity(pod),
    })
}

fn protocol_or_default(protocol: Option<&str>) -> &str {
    protocol.unwrap_or(DEFAULT_PORT_PROTOCOL)
}

/// Pod UID, falling back to `namespace/name`.
fn pod_identity(pod: &Pod) -> String {
    pod.uid().unwrap_or_else(|| {
        format!(
            "{}/{}",
            pod.namespace().unwrap_or_default(),
            pod.name_any()
        )
    })
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod pod_tests;
