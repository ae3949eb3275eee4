// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend configuration fixup, inheritance and lookup.

use k8s_openapi::api::core::v1::ServicePort;
use tracing::warn;

use super::types::{Affinity, BackendConfig, BackendConfigMapping, PortBackendConfig, Protocol};

/// Replaces present-but-invalid enum values with their baseline.
///
/// Unset fields stay unset so that [`apply_default_port_backend_config`] can
/// still fill them from the default configuration.
pub fn fixup_port_backend_config(config: &mut PortBackendConfig) {
    if let Some(proto) = config.proto.as_deref() {
        if Protocol::parse(proto).is_none() {
            warn!(
                "Unrecognized backend protocol '{}', using {}",
                proto,
                Protocol::H1.as_str()
            );
            config.proto = Some(Protocol::H1.as_str().to_string());
        }
    }

    if let Some(affinity) = config.affinity.as_deref() {
        // Cookie affinity is only meaningful per path
        match Affinity::parse(affinity) {
            Some(Affinity::None | Affinity::Ip) => {}
            _ => {
                warn!(
                    "Unsupported backend affinity '{}', using {}",
                    affinity,
                    Affinity::None.as_str()
                );
                config.affinity = Some(Affinity::None.as_str().to_string());
            }
        }
    }
}

/// Fills every unset field of `config` from `default`.
///
/// Fields already set in `config` are never overwritten.
pub fn apply_default_port_backend_config(
    config: &mut PortBackendConfig,
    default: &PortBackendConfig,
) {
    if config.proto.is_none() {
        config.proto.clone_from(&default.proto);
    }
    if config.tls.is_none() {
        config.tls = default.tls;
    }
    if config.sni.is_none() {
        config.sni.clone_from(&default.sni);
    }
    if config.dns.is_none() {
        config.dns = default.dns;
    }
    if config.affinity.is_none() {
        config.affinity.clone_from(&default.affinity);
    }
}

/// Point lookups over the merged backend configuration of one Ingress.
///
/// Lookups fall back from the service/port entry, to the Ingress default, to
/// the hard-coded baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfigMapper {
    default_config: Option<PortBackendConfig>,
    mapping: BackendConfigMapping,
}

impl BackendConfigMapper {
    /// Creates a mapper. `mapping` must already be fixed up and inherited.
    #[must_use]
    pub fn new(default_config: Option<PortBackendConfig>, mapping: BackendConfigMapping) -> Self {
        Self {
            default_config,
            mapping,
        }
    }

    /// The Ingress-wide default, if one was supplied.
    #[must_use]
    pub fn default_config(&self) -> Option<&PortBackendConfig> {
        self.default_config.as_ref()
    }

    /// The per service/port entries.
    #[must_use]
    pub fn mapping(&self) -> &BackendConfigMapping {
        &self.mapping
    }

    /// Returns the effective configuration for `service` and `port`.
    #[must_use]
    pub fn config_for(&self, service: &str, port: &str) -> BackendConfig {
        self.lookup(service, port)
            .or(self.default_config.as_ref())
            .map(PortBackendConfig::resolve)
            .unwrap_or_default()
    }

    /// Returns the effective configuration for a service port, keyed first by
    /// the port name and then by the port number.
    #[must_use]
    pub fn config_for_service_port(&self, service: &str, port: &ServicePort) -> BackendConfig {
        let by_name = port
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| self.lookup(service, name));

        by_name
            .or_else(|| self.lookup(service, &port.port.to_string()))
            .or(self.default_config.as_ref())
            .map(PortBackendConfig::resolve)
            .unwrap_or_default()
    }

    fn lookup(&self, service: &str, port: &str) -> Option<&PortBackendConfig> {
        self.mapping.get(service).and_then(|ports| ports.get(port))
    }
}

#[cfg(test)]
#[path = "backend_config_tests.rs"]
mod backend_config_tests;
