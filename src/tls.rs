// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS credentials gathered from the Secrets referenced by Ingresses.
//!
//! Each `spec.tls[].secretName` maps to a key/certificate pair written under
//! `<conf-dir>/tls/<namespace>_<name>.{key,crt}`. File content is checksummed
//! so a rotated certificate changes the rendered main configuration even
//! though its paths stay the same.

use std::path::Path;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use tracing::warn;

use crate::constants::{TLS_CERT_KEY, TLS_DIR, TLS_KEY_KEY};
use crate::context::ClusterView;
use crate::nghttpx::types::{compare_tls_creds, ChecksumFile, TlsCred};

/// Default credential plus the remaining ones, sorted and unique by key path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsCreds {
    pub default: Option<TlsCred>,
    pub sub: Vec<TlsCred>,
}

impl TlsCreds {
    /// True if at least one credential is available.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.default.is_some()
    }
}

/// Builds the credential for `secret`.
///
/// Returns `None` if either `tls.key` or `tls.crt` is missing or empty.
#[must_use]
pub fn tls_cred_from_secret(secret: &Secret, conf_dir: &Path) -> Option<TlsCred> {
    let namespace = secret.namespace().unwrap_or_default();
    let name = secret.name_any();

    let get = |key: &str| {
        secret
            .data
            .as_ref()
            .and_then(|d| d.get(key))
            .map(|v| v.0.clone())
            .filter(|v| !v.is_empty())
    };

    let (Some(key), Some(cert)) = (get(TLS_KEY_KEY), get(TLS_CERT_KEY)) else {
        warn!(
            "Secret {}/{} lacks {} or {}, skipping",
            namespace, name, TLS_KEY_KEY, TLS_CERT_KEY
        );
        return None;
    };

    let tls_dir = conf_dir.join(TLS_DIR);
    let path = |ext: &str| {
        tls_dir
            .join(format!("{namespace}_{name}.{ext}"))
            .display()
            .to_string()
    };
    Some(TlsCred {
        key: ChecksumFile::new(path("key"), key),
        cert: ChecksumFile::new(path("crt"), cert),
    })
}

fn secret_cred<V: ClusterView + ?Sized>(
    view: &V,
    namespace: &str,
    name: &str,
    conf_dir: &Path,
) -> Option<TlsCred> {
    match view.secret(namespace, name) {
        Some(secret) => tls_cred_from_secret(&secret, conf_dir),
        None => {
            warn!("TLS Secret {}/{} not found, skipping", namespace, name);
            None
        }
    }
}

/// Collects the credentials referenced by `ingresses`.
///
/// The configured `default_secret` becomes the default credential when it
/// resolves; otherwise the first credential in key path order does.
pub fn collect_tls_creds<V: ClusterView + ?Sized>(
    view: &V,
    ingresses: &[&Ingress],
    default_secret: Option<(&str, &str)>,
    conf_dir: &Path,
) -> TlsCreds {
    let mut creds: Vec<TlsCred> = Vec::new();

    for ingress in ingresses {
        let namespace = ingress.namespace().unwrap_or_default();
        let secret_names = ingress
            .spec
            .as_ref()
            .and_then(|s| s.tls.as_ref())
            .into_iter()
            .flatten()
            .filter_map(|t| t.secret_name.as_deref());

        for name in secret_names {
            creds.extend(secret_cred(view, &namespace, name, conf_dir));
        }
    }

    creds.sort_by(compare_tls_creds);
    creds.dedup_by(|a, b| a.key.path == b.key.path);

    let default = default_secret
        .and_then(|(namespace, name)| secret_cred(view, namespace, name, conf_dir));

    match default {
        Some(default) => {
            creds.retain(|c| c.key.path != default.key.path);
            TlsCreds {
                default: Some(default),
                sub: creds,
            }
        }
        None if creds.is_empty() => TlsCreds::default(),
        None => {
            let default = creds.remove(0);
            TlsCreds {
                default: Some(default),
                sub: creds,
            }
        }
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;
