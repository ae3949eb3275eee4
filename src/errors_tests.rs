// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

use crate::errors::{ApplyError, LookupError, PortError};

#[test]
fn test_port_not_found_names_pod() {
    let err = PortError::NotFound {
        pod: "0b8f6c1e-uid".to_string(),
    };
    assert_eq!(err.to_string(), "no suitable port for manifest: 0b8f6c1e-uid");
}

#[test]
fn test_protocol_mismatch_message() {
    let err = PortError::ProtocolMismatch {
        pod: "default/web-0".to_string(),
        port_name: "dns".to_string(),
        expected: "UDP".to_string(),
        actual: "TCP".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("'dns'"));
    assert!(msg.contains("TCP"));
    assert!(msg.contains("UDP"));
}

#[test]
fn test_lookup_not_found_message() {
    let err = LookupError::NotFound {
        name: "nghttpx".to_string(),
    };
    assert_eq!(err.to_string(), "IngressClass 'nghttpx' not found");
}

#[test]
fn test_apply_error_kinds() {
    let cases = [
        (
            ApplyError::Io {
                path: "/etc/nghttpx/nghttpx.conf".into(),
                reason: "permission denied".into(),
            },
            "io",
        ),
        (
            ApplyError::Http {
                endpoint: "http://127.0.0.1:3001".into(),
                reason: "connection refused".into(),
            },
            "http",
        ),
        (
            ApplyError::Rejected {
                endpoint: "http://127.0.0.1:3001".into(),
                status_code: 400,
                body: "{}".into(),
            },
            "rejected",
        ),
        (
            ApplyError::Signal {
                reason: "no such process".into(),
            },
            "signal",
        ),
        (
            ApplyError::Timeout {
                endpoint: "http://127.0.0.1:3001".into(),
                timeout_ms: 30_000,
            },
            "timeout",
        ),
    ];

    for (err, kind) in cases {
        assert_eq!(err.kind(), kind);
    }
}

#[test]
fn test_timeout_message_includes_duration() {
    let err = ApplyError::Timeout {
        endpoint: "http://127.0.0.1:3001/api/v1beta1/configrevision".into(),
        timeout_ms: 1500,
    };
    assert!(err.to_string().contains("1500ms"));
}
