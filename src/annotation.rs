// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress annotation decoding into backend and path configuration mappers.
//!
//! Four annotations feed the configuration of an Ingress:
//!
//! | Annotation | Shape |
//! |---|---|
//! | [`BACKEND_CONFIG_ANNOTATION`] | service → port → backend config |
//! | [`DEFAULT_BACKEND_CONFIG_ANNOTATION`] | backend config |
//! | [`PATH_CONFIG_ANNOTATION`] | `host/path` → path config |
//! | [`DEFAULT_PATH_CONFIG_ANNOTATION`] | path config |
//!
//! Each value is decoded as YAML first and as JSON if YAML fails. Boolean
//! fields also accept YAML 1.1 spellings such as `yes` and `off`, and a `null`
//! default counts as absent. A value that decodes as neither is logged and the
//! whole mapper degrades to an empty one, so a typo in an annotation never
//! blocks reconciliation.
//!
//! # Example
//!
//! ```rust
//! use ingress_lb::annotation::derive_backend_config;
//! use ingress_lb::nghttpx::types::Protocol;
//!
//! let mapper = derive_backend_config(
//!     Some("tls: true"),
//!     Some("web:\n  grpc:\n    proto: h2\n"),
//! );
//! let config = mapper.config_for("web", "grpc");
//! assert_eq!(config.protocol, Protocol::H2);
//! assert!(config.tls);
//! ```

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::labels::{
    BACKEND_CONFIG_ANNOTATION, DEFAULT_BACKEND_CONFIG_ANNOTATION, DEFAULT_PATH_CONFIG_ANNOTATION,
    PATH_CONFIG_ANNOTATION,
};
use crate::nghttpx::backend_config::{
    apply_default_port_backend_config, fixup_port_backend_config, BackendConfigMapper,
};
use crate::nghttpx::path_config::{
    apply_default_path_config, fixup_path_config, normalize_path_keys, PathConfigMapper,
};
use crate::nghttpx::types::{BackendConfigMapping, PathConfig, PathConfigMapping, PortBackendConfig};

/// Read-only view over the annotations of one Ingress.
#[derive(Debug, Clone, Copy)]
pub struct IngressAnnotation<'a> {
    annotations: Option<&'a BTreeMap<String, String>>,
}

impl<'a> IngressAnnotation<'a> {
    #[must_use]
    pub fn new(annotations: Option<&'a BTreeMap<String, String>>) -> Self {
        Self { annotations }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.annotations
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Builds the backend configuration mapper from the backend annotations.
    #[must_use]
    pub fn backend_config_mapper(&self) -> BackendConfigMapper {
        derive_backend_config(
            self.get(DEFAULT_BACKEND_CONFIG_ANNOTATION),
            self.get(BACKEND_CONFIG_ANNOTATION),
        )
    }

    /// Builds the path configuration mapper from the path annotations.
    #[must_use]
    pub fn path_config_mapper(&self) -> PathConfigMapper {
        derive_path_config(
            self.get(DEFAULT_PATH_CONFIG_ANNOTATION),
            self.get(PATH_CONFIG_ANNOTATION),
        )
    }
}

/// Port keys may be written as names or as bare numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(untagged)]
enum PortKey {
    Name(String),
    Number(i64),
}

impl From<PortKey> for String {
    fn from(key: PortKey) -> Self {
        match key {
            PortKey::Name(name) => name,
            PortKey::Number(number) => number.to_string(),
        }
    }
}

type RawBackendConfigMapping = BTreeMap<String, BTreeMap<PortKey, PortBackendConfig>>;

/// Merges the default and per service/port backend annotations.
///
/// The per service/port mapping is decoded and fixed up first. If a default is
/// present it is fixed up too and every per-port entry inherits each field it
/// leaves unset. Either annotation failing to decode yields an empty mapper.
#[must_use]
pub fn derive_backend_config(
    raw_default: Option<&str>,
    raw_specific: Option<&str>,
) -> BackendConfigMapper {
    let mut mapping = BackendConfigMapping::new();

    if let Some(data) = non_empty(raw_specific) {
        match unmarshal::<RawBackendConfigMapping>(data) {
            Ok(raw) => {
                mapping = raw
                    .into_iter()
                    .map(|(service, ports)| {
                        let ports = ports
                            .into_iter()
                            .map(|(port, config)| (String::from(port), config))
                            .collect();
                        (service, ports)
                    })
                    .collect();
            }
            Err(e) => {
                warn!(
                    "unexpected error reading {} annotation: {:#}",
                    BACKEND_CONFIG_ANNOTATION, e
                );
                return BackendConfigMapper::default();
            }
        }
    }

    for config in mapping.values_mut().flat_map(BTreeMap::values_mut) {
        fixup_port_backend_config(config);
    }

    let Some(data) = non_empty(raw_default) else {
        debug!("{} annotation not found", DEFAULT_BACKEND_CONFIG_ANNOTATION);
        return BackendConfigMapper::new(None, mapping);
    };

    let mut default_config = match unmarshal::<Option<PortBackendConfig>>(data) {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!("{} annotation is null", DEFAULT_BACKEND_CONFIG_ANNOTATION);
            return BackendConfigMapper::new(None, mapping);
        }
        Err(e) => {
            warn!(
                "unexpected error reading {} annotation: {:#}",
                DEFAULT_BACKEND_CONFIG_ANNOTATION, e
            );
            return BackendConfigMapper::default();
        }
    };
    fixup_port_backend_config(&mut default_config);

    for config in mapping.values_mut().flat_map(BTreeMap::values_mut) {
        apply_default_port_backend_config(config, &default_config);
    }

    BackendConfigMapper::new(Some(default_config), mapping)
}

/// Merges the default and per-path annotations.
///
/// Identical to [`derive_backend_config`] except that keys are normalized to
/// always contain a `/` before fixup and inheritance.
#[must_use]
pub fn derive_path_config(raw_default: Option<&str>, raw_specific: Option<&str>) -> PathConfigMapper {
    let mut mapping = PathConfigMapping::new();

    if let Some(data) = non_empty(raw_specific) {
        match unmarshal::<PathConfigMapping>(data) {
            Ok(decoded) => mapping = decoded,
            Err(e) => {
                warn!(
                    "unexpected error reading {} annotation: {:#}",
                    PATH_CONFIG_ANNOTATION, e
                );
                return PathConfigMapper::default();
            }
        }
    }

    let mut mapping = normalize_path_keys(mapping);

    for config in mapping.values_mut() {
        fixup_path_config(config);
    }

    let Some(data) = non_empty(raw_default) else {
        debug!("{} annotation not found", DEFAULT_PATH_CONFIG_ANNOTATION);
        return PathConfigMapper::new(None, mapping);
    };

    let mut default_config = match unmarshal::<Option<PathConfig>>(data) {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!("{} annotation is null", DEFAULT_PATH_CONFIG_ANNOTATION);
            return PathConfigMapper::new(None, mapping);
        }
        Err(e) => {
            warn!(
                "unexpected error reading {} annotation: {:#}",
                DEFAULT_PATH_CONFIG_ANNOTATION, e
            );
            return PathConfigMapper::default();
        }
    };
    fixup_path_config(&mut default_config);

    for config in mapping.values_mut() {
        apply_default_path_config(config, &default_config);
    }

    PathConfigMapper::new(Some(default_config), mapping)
}

fn non_empty(data: Option<&str>) -> Option<&str> {
    data.filter(|d| !d.trim().is_empty())
}

/// Deserializes `data`, trying YAML first and JSON second.
fn unmarshal<T: DeserializeOwned>(data: &str) -> Result<T> {
    match serde_yaml::from_str(data) {
        Ok(value) => Ok(value),
        Err(e) => {
            debug!("Could not unmarshal YAML string; fall back to JSON: {}", e);
            serde_json::from_str(data).context("could not unmarshal JSON string")
        }
    }
}

#[cfg(test)]
#[path = "annotation_tests.rs"]
mod annotation_tests;
