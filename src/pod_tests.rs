// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pod.rs`

use crate::errors::PortError;
use crate::pod::find_port;
use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, ServicePort};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

fn container_port(name: &str, port: i32, protocol: Option<&str>) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        protocol: protocol.map(str::to_string),
        ..Default::default()
    }
}

fn create_test_pod(containers: Vec<Vec<ContainerPort>>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some("web-0".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("5f1c2d3e-uid".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: containers
                .into_iter()
                .enumerate()
                .map(|(i, ports)| Container {
                    name: format!("c{i}"),
                    ports: Some(ports),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service_port(target: IntOrString, protocol: Option<&str>) -> ServicePort {
    ServicePort {
        name: Some("http".to_string()),
        port: 80,
        target_port: Some(target),
        protocol: protocol.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn test_numeric_target_port_needs_no_pod_lookup() {
    let pod = create_test_pod(vec![]);
    let port = service_port(IntOrString::Int(8080), None);
    assert_eq!(find_port(&pod, &port), Ok(8080));
}

#[test]
fn test_missing_target_port_uses_service_port() {
    let pod = create_test_pod(vec![]);
    let port = ServicePort {
        port: 9000,
        ..Default::default()
    };
    assert_eq!(find_port(&pod, &port), Ok(9000));
}

#[test]
fn test_named_target_port_first_match_wins() {
    let pod = create_test_pod(vec![
        vec![
            container_port("metrics", 9090, Some("TCP")),
            container_port("http", 8080, Some("TCP")),
        ],
        vec![container_port("http", 9999, Some("TCP"))],
    ]);
    let port = service_port(IntOrString::String("http".into()), Some("TCP"));
    assert_eq!(find_port(&pod, &port), Ok(8080));
}

#[test]
fn test_protocol_defaults_to_tcp() {
    let pod = create_test_pod(vec![vec![container_port("http", 8080, None)]]);
    let port = service_port(IntOrString::String("http".into()), None);
    assert_eq!(find_port(&pod, &port), Ok(8080));

    let explicit = service_port(IntOrString::String("http".into()), Some("TCP"));
    assert_eq!(find_port(&pod, &explicit), Ok(8080));
}

#[test]
fn test_protocol_mismatch_stops_scanning() {
    let pod = create_test_pod(vec![
        vec![container_port("dns", 53, Some("TCP"))],
        vec![container_port("dns", 5353, Some("UDP"))],
    ]);
    let port = service_port(IntOrString::String("dns".into()), Some("UDP"));

    let err = find_port(&pod, &port).unwrap_err();
    assert_eq!(
        err,
        PortError::ProtocolMismatch {
            pod: "5f1c2d3e-uid".into(),
            port_name: "dns".into(),
            expected: "UDP".into(),
            actual: "TCP".into(),
        }
    );
}

#[test]
fn test_unknown_name_is_not_found() {
    let pod = create_test_pod(vec![vec![container_port("http", 8080, Some("TCP"))]]);
    let port = service_port(IntOrString::String("grpc".into()), Some("TCP"));
    assert_eq!(
        find_port(&pod, &port),
        Err(PortError::NotFound {
            pod: "5f1c2d3e-uid".into()
        })
    );
}

#[test]
fn test_not_found_without_uid_uses_namespaced_name() {
    let mut pod = create_test_pod(vec![]);
    pod.metadata.uid = None;
    let port = service_port(IntOrString::String("http".into()), None);
    assert_eq!(
        find_port(&pod, &port),
        Err(PortError::NotFound {
            pod: "default/web-0".into()
        })
    );
}
