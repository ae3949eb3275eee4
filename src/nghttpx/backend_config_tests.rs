// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `backend_config.rs`

#[cfg(test)]
mod tests {
    use crate::nghttpx::backend_config::*;
    use crate::nghttpx::types::{
        Affinity, BackendConfig, BackendConfigMapping, PortBackendConfig, Protocol,
    };
    use k8s_openapi::api::core::v1::ServicePort;
    use std::collections::BTreeMap;

    fn mapping_of(service: &str, port: &str, config: PortBackendConfig) -> BackendConfigMapping {
        BTreeMap::from([(
            service.to_string(),
            BTreeMap::from([(port.to_string(), config)]),
        )])
    }

    #[test]
    fn test_fixup_replaces_invalid_proto() {
        let mut config = PortBackendConfig {
            proto: Some("h3".into()),
            ..Default::default()
        };
        fixup_port_backend_config(&mut config);
        assert_eq!(config.proto.as_deref(), Some("http/1.1"));
    }

    #[test]
    fn test_fixup_keeps_valid_values() {
        let mut config = PortBackendConfig {
            proto: Some("h2".into()),
            affinity: Some("ip".into()),
            ..Default::default()
        };
        let before = config.clone();
        fixup_port_backend_config(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_fixup_rejects_cookie_affinity_for_backends() {
        let mut config = PortBackendConfig {
            affinity: Some("cookie".into()),
            ..Default::default()
        };
        fixup_port_backend_config(&mut config);
        assert_eq!(config.affinity.as_deref(), Some("none"));
    }

    #[test]
    fn test_fixup_leaves_unset_fields_unset() {
        let mut config = PortBackendConfig::default();
        fixup_port_backend_config(&mut config);
        assert_eq!(config, PortBackendConfig::default());
    }

    #[test]
    fn test_apply_default_fills_only_unset_fields() {
        let mut config = PortBackendConfig {
            proto: Some("http/1.1".into()),
            tls: Some(false),
            ..Default::default()
        };
        let default = PortBackendConfig {
            proto: Some("h2".into()),
            tls: Some(true),
            sni: Some("default.example.com".into()),
            dns: Some(true),
            affinity: Some("ip".into()),
        };

        apply_default_port_backend_config(&mut config, &default);

        // explicit values survive
        assert_eq!(config.proto.as_deref(), Some("http/1.1"));
        assert_eq!(config.tls, Some(false));
        // unset values inherited
        assert_eq!(config.sni.as_deref(), Some("default.example.com"));
        assert_eq!(config.dns, Some(true));
        assert_eq!(config.affinity.as_deref(), Some("ip"));
    }

    #[test]
    fn test_mapper_lookup_precedence() {
        let mapper = BackendConfigMapper::new(
            Some(PortBackendConfig {
                tls: Some(true),
                ..Default::default()
            }),
            mapping_of(
                "web",
                "https",
                PortBackendConfig {
                    proto: Some("h2".into()),
                    ..Default::default()
                },
            ),
        );

        // specific entry
        assert_eq!(mapper.config_for("web", "https").protocol, Protocol::H2);
        // default for unknown entries
        let fallback = mapper.config_for("api", "http");
        assert!(fallback.tls);
        assert_eq!(fallback.protocol, Protocol::H1);
    }

    #[test]
    fn test_empty_mapper_returns_baseline() {
        let mapper = BackendConfigMapper::default();
        assert_eq!(mapper.config_for("web", "http"), BackendConfig::default());
    }

    #[test]
    fn test_service_port_lookup_prefers_name_then_number() {
        let mut mapping = mapping_of(
            "web",
            "8080",
            PortBackendConfig {
                affinity: Some("ip".into()),
                ..Default::default()
            },
        );
        mapping.get_mut("web").unwrap().insert(
            "grpc".into(),
            PortBackendConfig {
                proto: Some("h2".into()),
                ..Default::default()
            },
        );
        let mapper = BackendConfigMapper::new(None, mapping);

        let named = ServicePort {
            name: Some("grpc".into()),
            port: 8080,
            ..Default::default()
        };
        let resolved = mapper.config_for_service_port("web", &named);
        assert_eq!(resolved.protocol, Protocol::H2);
        assert_eq!(resolved.affinity, Affinity::None);

        let numbered = ServicePort {
            name: Some("http".into()),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(
            mapper.config_for_service_port("web", &numbered).affinity,
            Affinity::Ip
        );
    }
}
