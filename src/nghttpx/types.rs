// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Data model for the derived nghttpx configuration.
//!
//! Two families of types live here:
//!
//! - **Annotation records** ([`PortBackendConfig`], [`PathConfig`]) mirror the
//!   user-supplied YAML/JSON. Every field is optional so that "unset" can be
//!   told apart from "explicitly set" during inheritance.
//! - **Effective configuration** ([`BackendConfig`], [`Upstream`],
//!   [`UpstreamServer`], [`IngressConfig`]) is what rendering consumes. Enum
//!   fields always hold a known value.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

use super::checksum::sha256_hex;
use crate::constants::{
    DEFAULT_API_PORT, DEFAULT_HEALTH_PORT, DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT,
};

// ============================================================================
// Enumerations
// ============================================================================

/// Backend application protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    /// HTTP/1.1
    #[default]
    #[serde(rename = "http/1.1")]
    H1,
    /// HTTP/2
    #[serde(rename = "h2")]
    H2,
}

impl Protocol {
    /// Parses the annotation spelling of a protocol.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http/1.1" => Some(Self::H1),
            "h2" => Some(Self::H2),
            _ => None,
        }
    }

    /// Returns the spelling nghttpx expects in `proto=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::H1 => "http/1.1",
            Self::H2 => "h2",
        }
    }
}

/// Session affinity method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// No session affinity
    #[default]
    None,
    /// Client IP based affinity
    Ip,
    /// Cookie based affinity (path configuration only)
    Cookie,
}

impl Affinity {
    /// Parses the annotation spelling of an affinity method.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "ip" => Some(Self::Ip),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// Returns the spelling nghttpx expects in `affinity=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ip => "ip",
            Self::Cookie => "cookie",
        }
    }
}

/// `Secure` attribute policy for affinity cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffinityCookieSecure {
    /// Always set `Secure`
    Yes,
    /// Never set `Secure`
    No,
    /// Set `Secure` when the request arrived over TLS
    Auto,
}

impl AffinityCookieSecure {
    /// Parses the annotation spelling.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    /// Returns the spelling nghttpx expects in `affinity-cookie-secure=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Auto => "auto",
        }
    }
}

// ============================================================================
// Backend configuration
// ============================================================================

/// Parses the YAML 1.1 boolean spellings (`yes`, `off`, `Y`, ...) that
/// annotation authors commonly use.
#[must_use]
pub fn parse_yaml11_bool(value: &str) -> Option<bool> {
    match value {
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => {
            Some(true)
        }
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => {
            Some(false)
        }
        _ => None,
    }
}

/// Accepts a native boolean or a YAML 1.1 boolean spelling.
fn deserialize_yaml11_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Bool(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) => parse_yaml11_bool(&text)
            .map(Some)
            .ok_or_else(|| de::Error::invalid_value(Unexpected::Str(&text), &"a boolean")),
    }
}

/// Backend configuration for one service port, as written in the annotation.
///
/// `proto` and `affinity` are kept as text so that an unknown spelling can be
/// reported and replaced by fixup instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBackendConfig {
    /// Backend application protocol (`h2` or `http/1.1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    /// True if the backend connection requires TLS
    #[serde(
        default,
        deserialize_with = "deserialize_yaml11_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub tls: Option<bool>,
    /// SNI hostname for the backend TLS connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    /// True if the backend hostname is resolved dynamically
    #[serde(
        default,
        deserialize_with = "deserialize_yaml11_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub dns: Option<bool>,
    /// Session affinity method (`none` or `ip`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,
}

impl PortBackendConfig {
    /// Resolves the record into an effective [`BackendConfig`], using baseline
    /// values for every field that is still unset.
    #[must_use]
    pub fn resolve(&self) -> BackendConfig {
        BackendConfig {
            protocol: self
                .proto
                .as_deref()
                .and_then(Protocol::parse)
                .unwrap_or_default(),
            tls: self.tls.unwrap_or(false),
            sni: self.sni.clone().unwrap_or_default(),
            dns: self.dns.unwrap_or(false),
            affinity: self
                .affinity
                .as_deref()
                .and_then(Affinity::parse)
                .unwrap_or_default(),
        }
    }
}

/// Effective backend connection behavior for one service port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub protocol: Protocol,
    pub tls: bool,
    pub sni: String,
    pub dns: bool,
    pub affinity: Affinity,
}

/// Service name → port name → backend configuration.
pub type BackendConfigMapping = BTreeMap<String, BTreeMap<String, PortBackendConfig>>;

// ============================================================================
// Path configuration
// ============================================================================

/// Per-path configuration, as written in the annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathConfig {
    /// Session affinity method (`none`, `ip` or `cookie`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,
    /// Name of the affinity cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_cookie_name: Option<String>,
    /// Path attribute of the affinity cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_cookie_path: Option<String>,
    /// `Secure` policy of the affinity cookie (`yes`, `no` or `auto`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_cookie_secure: Option<String>,
    /// Backend read timeout, e.g. `30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<String>,
    /// Backend write timeout, e.g. `30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<String>,
    /// Redirect plaintext requests to HTTPS
    #[serde(
        default,
        rename = "redirectIfNotTLS",
        deserialize_with = "deserialize_yaml11_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirect_if_not_tls: Option<bool>,
}

/// Normalized path key (`host/path`) → path configuration.
pub type PathConfigMapping = BTreeMap<String, PathConfig>;

// ============================================================================
// Upstreams
// ============================================================================

/// A named group of backend servers for one host/path rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub host: String,
    pub path: String,
    /// Sorted by (address, port), no duplicate pairs, never empty once built
    pub backends: Vec<UpstreamServer>,
    /// Path level affinity; overrides the per-server setting when not `None`
    pub affinity: Affinity,
    pub affinity_cookie_name: Option<String>,
    pub affinity_cookie_path: Option<String>,
    pub affinity_cookie_secure: Option<AffinityCookieSecure>,
    pub read_timeout: Option<String>,
    pub write_timeout: Option<String>,
    pub redirect_if_not_tls: bool,
}

/// One backend server of an upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamServer {
    pub address: String,
    /// Decimal port string; sorting compares it lexicographically
    pub port: String,
    pub protocol: Protocol,
    pub tls: bool,
    pub sni: String,
    pub dns: bool,
    pub affinity: Affinity,
}

impl UpstreamServer {
    /// Builds a server for `address:port` with the given backend configuration.
    #[must_use]
    pub fn with_config(address: impl Into<String>, port: i32, config: &BackendConfig) -> Self {
        Self {
            address: address.into(),
            port: port.to_string(),
            protocol: config.protocol,
            tls: config.tls,
            sni: config.sni.clone(),
            dns: config.dns,
            affinity: config.affinity,
        }
    }
}

/// Returns the built-in server that answers 503.
///
/// Substituted whenever an upstream resolves to no ready backends, so the
/// rendered configuration never contains an empty backend group.
#[must_use]
pub fn default_server() -> UpstreamServer {
    UpstreamServer {
        address: DEFAULT_SERVER_ADDRESS.to_string(),
        port: DEFAULT_SERVER_PORT.to_string(),
        protocol: Protocol::H1,
        affinity: Affinity::None,
        ..UpstreamServer::default()
    }
}

/// Orders servers by address, then by port string.
#[must_use]
pub fn compare_upstream_servers(a: &UpstreamServer, b: &UpstreamServer) -> Ordering {
    a.address
        .cmp(&b.address)
        .then_with(|| a.port.cmp(&b.port))
}

/// Orders upstreams by name.
#[must_use]
pub fn compare_upstreams(a: &Upstream, b: &Upstream) -> Ordering {
    a.name.cmp(&b.name)
}

// ============================================================================
// TLS credentials
// ============================================================================

/// A file with its content and content-addressed checksum.
///
/// Equality between generations is decided by `checksum` alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumFile {
    pub path: String,
    pub content: Vec<u8>,
    pub checksum: String,
}

impl ChecksumFile {
    /// Creates a file record and computes its checksum.
    #[must_use]
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        let checksum = sha256_hex(&content);
        Self {
            path: path.into(),
            content,
            checksum,
        }
    }
}

/// TLS private key and certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsCred {
    pub key: ChecksumFile,
    pub cert: ChecksumFile,
}

/// Orders credentials by key path.
#[must_use]
pub fn compare_tls_creds(a: &TlsCred, b: &TlsCred) -> Ordering {
    a.key.path.cmp(&b.key.path)
}

// ============================================================================
// Ingress configuration
// ============================================================================

/// The complete derived desired state compared between reconciliation passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressConfig {
    /// Sorted by name
    pub upstreams: Vec<Upstream>,
    pub tls: bool,
    pub default_tls_cred: Option<TlsCred>,
    /// Sorted by key path
    pub sub_tls_creds: Vec<TlsCred>,
    pub workers: usize,
    /// Extra configuration appended verbatim to the main file
    pub extra_config: String,
    pub health_port: u16,
    pub api_port: u16,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            upstreams: Vec::new(),
            tls: false,
            default_tls_cred: None,
            sub_tls_creds: Vec::new(),
            workers: default_workers(),
            extra_config: String::new(),
            health_port: DEFAULT_HEALTH_PORT,
            api_port: DEFAULT_API_PORT,
        }
    }
}

/// Number of worker threads when none is configured: the CPU count.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
