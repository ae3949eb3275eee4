// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

use std::path::Path;
use std::time::Duration;

use clap::Parser;

use crate::config::ControllerConfig;

fn parse(args: &[&str]) -> ControllerConfig {
    let mut argv = vec!["ingress-lb"];
    argv.extend_from_slice(args);
    ControllerConfig::try_parse_from(argv).unwrap()
}

#[test]
fn test_defaults() {
    let config = parse(&[]);
    assert_eq!(config.controller_id, "zlab.co.jp/nghttpx");
    assert!(!config.require_ingress_class);
    assert_eq!(config.conf_dir, Path::new("/etc/nghttpx"));
    assert_eq!(config.api_port, 3001);
    assert_eq!(config.health_port, 10901);
    assert_eq!(config.reload_timeout(), Duration::from_secs(30));
    assert_eq!(config.api_timeout(), Duration::from_secs(10));
    assert!(config.effective_workers() >= 1);
    assert!(config.validate().is_ok());
}

#[test]
fn test_namespaced_references() {
    let config = parse(&[
        "--default-backend-service",
        "kube-system/default-http-backend",
        "--default-tls-secret",
        "kube-system/wildcard",
        "--publish-service",
        "kube-system/ingress",
    ]);
    assert!(config.validate().is_ok());
    assert_eq!(
        config.default_backend(),
        Some(("kube-system", "default-http-backend"))
    );
    assert_eq!(config.default_tls(), Some(("kube-system", "wildcard")));
    assert_eq!(config.publish(), Some(("kube-system", "ingress")));
}

#[test]
fn test_malformed_reference_rejected() {
    for bad in ["no-slash", "/name", "ns/", "a/b/c"] {
        let config = parse(&["--publish-service", bad]);
        assert!(config.validate().is_err(), "{bad} should be rejected");
    }
}

#[test]
fn test_zero_workers_rejected() {
    let config = parse(&["--workers", "0"]);
    assert!(config.validate().is_err());

    let config = parse(&["--workers", "3"]);
    assert_eq!(config.effective_workers(), 3);
}

#[test]
fn test_flags_override_defaults() {
    let config = parse(&[
        "--controller-id",
        "example.com/lb",
        "--require-ingress-class",
        "--conf-dir",
        "/tmp/nghttpx",
        "--extra-config",
        "backend-read-timeout=1m",
    ]);
    assert_eq!(config.controller_id, "example.com/lb");
    assert!(config.require_ingress_class);
    assert_eq!(config.conf_dir, Path::new("/tmp/nghttpx"));
    assert_eq!(config.extra_config, "backend-read-timeout=1m");
}

#[test]
fn test_unknown_pod_identity_flags_rejected() {
    assert!(ControllerConfig::try_parse_from(["ingress-lb", "--pod-name", "lb-0"]).is_err());
    assert!(
        ControllerConfig::try_parse_from(["ingress-lb", "--pod-namespace", "kube-system"])
            .is_err()
    );
}
