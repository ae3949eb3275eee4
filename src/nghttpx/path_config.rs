// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Path configuration normalization, fixup, inheritance and lookup.
//!
//! Path configuration is keyed by `host` + `path` (e.g., `example.com/api`).
//! A key without any `/` names a host alone and is normalized to `host/`, so
//! it matches the root path of that host.

use tracing::warn;

use super::duration::parse_duration;
use super::types::{Affinity, AffinityCookieSecure, PathConfig, PathConfigMapping, Upstream};

/// Appends `/` to every key that contains no `/`.
///
/// Normalizing an already normalized mapping is a no-op.
#[must_use]
pub fn normalize_path_keys(mapping: PathConfigMapping) -> PathConfigMapping {
    mapping
        .into_iter()
        .map(|(key, config)| (normalize_path_key(key), config))
        .collect()
}

fn normalize_path_key(key: String) -> String {
    if key.contains('/') {
        key
    } else {
        key + "/"
    }
}

/// Replaces or drops present-but-invalid values.
///
/// - unknown affinity → `none`
/// - unknown cookie `Secure` policy → unset
/// - unparseable timeouts → unset
pub fn fixup_path_config(config: &mut PathConfig) {
    if let Some(affinity) = config.affinity.as_deref() {
        if Affinity::parse(affinity).is_none() {
            warn!(
                "Unsupported path affinity '{}', using {}",
                affinity,
                Affinity::None.as_str()
            );
            config.affinity = Some(Affinity::None.as_str().to_string());
        }
    }

    if let Some(secure) = config.affinity_cookie_secure.as_deref() {
        if AffinityCookieSecure::parse(secure).is_none() {
            warn!("Unsupported affinityCookieSecure '{}', ignoring", secure);
            config.affinity_cookie_secure = None;
        }
    }

    for (field, timeout) in [
        ("readTimeout", &mut config.read_timeout),
        ("writeTimeout", &mut config.write_timeout),
    ] {
        if let Some(value) = timeout.as_deref() {
            if let Err(e) = parse_duration(value) {
                warn!("Invalid {} '{}': {}, ignoring", field, value, e);
                *timeout = None;
            }
        }
    }
}

/// Fills every unset field of `config` from `default`.
pub fn apply_default_path_config(config: &mut PathConfig, default: &PathConfig) {
    if config.affinity.is_none() {
        config.affinity.clone_from(&default.affinity);
    }
    if config.affinity_cookie_name.is_none() {
        config
            .affinity_cookie_name
            .clone_from(&default.affinity_cookie_name);
    }
    if config.affinity_cookie_path.is_none() {
        config
            .affinity_cookie_path
            .clone_from(&default.affinity_cookie_path);
    }
    if config.affinity_cookie_secure.is_none() {
        config
            .affinity_cookie_secure
            .clone_from(&default.affinity_cookie_secure);
    }
    if config.read_timeout.is_none() {
        config.read_timeout.clone_from(&default.read_timeout);
    }
    if config.write_timeout.is_none() {
        config.write_timeout.clone_from(&default.write_timeout);
    }
    if config.redirect_if_not_tls.is_none() {
        config.redirect_if_not_tls = default.redirect_if_not_tls;
    }
}

/// Copies the effective path settings onto an upstream.
pub fn apply_path_config(upstream: &mut Upstream, config: &PathConfig) {
    upstream.affinity = config
        .affinity
        .as_deref()
        .and_then(Affinity::parse)
        .unwrap_or_default();
    upstream
        .affinity_cookie_name
        .clone_from(&config.affinity_cookie_name);
    upstream
        .affinity_cookie_path
        .clone_from(&config.affinity_cookie_path);
    upstream.affinity_cookie_secure = config
        .affinity_cookie_secure
        .as_deref()
        .and_then(AffinityCookieSecure::parse);
    upstream.read_timeout.clone_from(&config.read_timeout);
    upstream.write_timeout.clone_from(&config.write_timeout);
    upstream.redirect_if_not_tls = config.redirect_if_not_tls.unwrap_or(false);
}

/// Point lookups over the merged path configuration of one Ingress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathConfigMapper {
    default_config: Option<PathConfig>,
    mapping: PathConfigMapping,
}

impl PathConfigMapper {
    /// Creates a mapper. `mapping` must already be normalized, fixed up and inherited.
    #[must_use]
    pub fn new(default_config: Option<PathConfig>, mapping: PathConfigMapping) -> Self {
        Self {
            default_config,
            mapping,
        }
    }

    #[must_use]
    pub fn default_config(&self) -> Option<&PathConfig> {
        self.default_config.as_ref()
    }

    #[must_use]
    pub fn mapping(&self) -> &PathConfigMapping {
        &self.mapping
    }

    /// Returns the effective configuration for `host` and `path`.
    ///
    /// An empty path is looked up as `/`.
    #[must_use]
    pub fn config_for(&self, host: &str, path: &str) -> PathConfig {
        let path = if path.is_empty() { "/" } else { path };
        let key = format!("{host}{path}");

        self.mapping
            .get(&key)
            .or(self.default_config.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "path_config_tests.rs"]
mod path_config_tests;
