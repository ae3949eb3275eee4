// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `types.rs`

#[cfg(test)]
mod tests {
    use crate::nghttpx::types::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("h2"), Some(Protocol::H2));
        assert_eq!(Protocol::parse("http/1.1"), Some(Protocol::H1));
        assert_eq!(Protocol::parse("h3"), None);
        assert_eq!(Protocol::parse(""), None);
        assert_eq!(Protocol::default(), Protocol::H1);
    }

    #[test]
    fn test_affinity_parse() {
        assert_eq!(Affinity::parse("ip"), Some(Affinity::Ip));
        assert_eq!(Affinity::parse("cookie"), Some(Affinity::Cookie));
        assert_eq!(Affinity::parse("IP"), None);
        assert_eq!(Affinity::default(), Affinity::None);
    }

    #[test]
    fn test_resolve_empty_record_uses_baseline() {
        let resolved = PortBackendConfig::default().resolve();
        assert_eq!(resolved, BackendConfig::default());
        assert_eq!(resolved.protocol, Protocol::H1);
        assert_eq!(resolved.affinity, Affinity::None);
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let record = PortBackendConfig {
            proto: Some("h2".into()),
            tls: Some(true),
            sni: Some("api.example.com".into()),
            dns: Some(true),
            affinity: Some("ip".into()),
        };
        let resolved = record.resolve();
        assert_eq!(resolved.protocol, Protocol::H2);
        assert!(resolved.tls);
        assert_eq!(resolved.sni, "api.example.com");
        assert!(resolved.dns);
        assert_eq!(resolved.affinity, Affinity::Ip);
    }

    #[test]
    fn test_default_server() {
        let server = default_server();
        assert_eq!(server.address, "127.0.0.1");
        assert_eq!(server.port, "8181");
        assert_eq!(server.protocol, Protocol::H1);
        assert_eq!(server.affinity, Affinity::None);
        assert!(!server.tls);
    }

    #[test]
    fn test_server_ordering_is_address_then_port_string() {
        let mut servers = vec![
            UpstreamServer {
                address: "10.0.0.2".into(),
                port: "80".into(),
                ..Default::default()
            },
            UpstreamServer {
                address: "10.0.0.1".into(),
                port: "8080".into(),
                ..Default::default()
            },
            UpstreamServer {
                address: "10.0.0.1".into(),
                port: "443".into(),
                ..Default::default()
            },
        ];
        servers.sort_by(compare_upstream_servers);

        let ordered: Vec<_> = servers
            .iter()
            .map(|s| format!("{}:{}", s.address, s.port))
            .collect();
        // "443" < "8080" lexicographically
        assert_eq!(ordered, vec!["10.0.0.1:443", "10.0.0.1:8080", "10.0.0.2:80"]);
    }

    #[test]
    fn test_checksum_file_is_content_addressed() {
        let a = ChecksumFile::new("/a/tls.key", b"secret".to_vec());
        let b = ChecksumFile::new("/b/tls.key", b"secret".to_vec());
        let c = ChecksumFile::new("/a/tls.key", b"other".to_vec());

        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 64);
    }

    #[test]
    fn test_path_config_wire_names() {
        let config: PathConfig = serde_json::from_str(
            r#"{"affinity":"cookie","affinityCookieName":"lb","redirectIfNotTLS":true,"readTimeout":"5s"}"#,
        )
        .unwrap();
        assert_eq!(config.affinity.as_deref(), Some("cookie"));
        assert_eq!(config.affinity_cookie_name.as_deref(), Some("lb"));
        assert_eq!(config.redirect_if_not_tls, Some(true));
        assert_eq!(config.read_timeout.as_deref(), Some("5s"));
    }

    #[test]
    fn test_ingress_config_default_workers() {
        let config = IngressConfig::default();
        assert!(config.workers >= 1);
        assert!(config.upstreams.is_empty());
        assert!(!config.tls);
    }

    #[test]
    fn test_parse_yaml11_bool_spellings() {
        for text in ["y", "Yes", "TRUE", "on", "On"] {
            assert_eq!(parse_yaml11_bool(text), Some(true), "{text}");
        }
        for text in ["n", "No", "false", "OFF", "off"] {
            assert_eq!(parse_yaml11_bool(text), Some(false), "{text}");
        }
        assert_eq!(parse_yaml11_bool("enabled"), None);
        assert_eq!(parse_yaml11_bool(""), None);
    }
}
