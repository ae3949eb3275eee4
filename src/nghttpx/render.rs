// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Serialization of an [`IngressConfig`] into nghttpx configuration text.
//!
//! The proxy configuration is split in two files:
//!
//! - the **main** file holds frontends, workers, TLS credentials and extra
//!   configuration, and `include`s the backend file;
//! - the **backend** file holds one `backend=` line per upstream server.
//!
//! Keeping the backend lines separate lets a topology-only change be pushed
//! through the backend API without reloading the process. Both renderers are
//! pure: the same [`IngressConfig`] always yields byte-identical text.

use std::fmt::Write as _;
use std::path::Path;

use super::checksum::sha256_hex;
use super::types::{Affinity, ChecksumFile, IngressConfig, TlsCred, Upstream, UpstreamServer};
use crate::constants::{BACKEND_CONFIG_FILE, HTTPS_PORT, HTTP_PORT};

/// Rendered configuration ready to be handed to the control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub main: String,
    pub main_checksum: String,
    pub backend: String,
    pub backend_checksum: String,
    /// TLS key and certificate files referenced by `main`
    pub tls_files: Vec<ChecksumFile>,
}

/// Renders both configuration files for `config`.
///
/// `conf_dir` is the directory the backend file is written to; the main file
/// refers to it by absolute path.
#[must_use]
pub fn render(config: &IngressConfig, conf_dir: &Path) -> RenderedConfig {
    let main = render_main_config(config, conf_dir);
    let backend = render_backend_config(&config.upstreams);

    let tls_files = config
        .default_tls_cred
        .iter()
        .chain(&config.sub_tls_creds)
        .flat_map(|cred| [cred.key.clone(), cred.cert.clone()])
        .collect();

    RenderedConfig {
        main_checksum: sha256_hex(main.as_bytes()),
        backend_checksum: sha256_hex(backend.as_bytes()),
        main,
        backend,
        tls_files,
    }
}

/// Renders the main nghttpx configuration file.
#[must_use]
pub fn render_main_config(config: &IngressConfig, conf_dir: &Path) -> String {
    let mut out = String::new();

    out.push_str("# Generated by ingress-lb. Do not edit.\n");
    out.push_str("accesslog-file=/dev/stdout\n");
    out.push_str("errorlog-file=/dev/stderr\n");
    let _ = writeln!(
        out,
        "include={}",
        conf_dir.join(BACKEND_CONFIG_FILE).display()
    );

    let _ = writeln!(out, "frontend=*,{HTTP_PORT};no-tls");
    if config.tls {
        let _ = writeln!(out, "frontend=*,{HTTPS_PORT}");
    }
    let _ = writeln!(out, "frontend=*,{};healthmon;no-tls", config.health_port);
    let _ = writeln!(out, "frontend=127.0.0.1,{};api;no-tls", config.api_port);

    let _ = writeln!(out, "workers={}", config.workers);

    if config.tls {
        if let Some(cred) = &config.default_tls_cred {
            write_checksum_comment(&mut out, cred);
            let _ = writeln!(out, "private-key-file={}", cred.key.path);
            let _ = writeln!(out, "certificate-file={}", cred.cert.path);
        }
        for cred in &config.sub_tls_creds {
            write_checksum_comment(&mut out, cred);
            let _ = writeln!(out, "subcert={}:{}", cred.key.path, cred.cert.path);
        }
    }

    if !config.extra_config.is_empty() {
        out.push_str("# extra configuration\n");
        out.push_str(&config.extra_config);
        if !config.extra_config.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

// Certificate rotation keeps file paths stable, so the content checksums
// are embedded to make the main file change with them.
fn write_checksum_comment(out: &mut String, cred: &TlsCred) {
    let _ = writeln!(
        out,
        "# checksum: {} {}",
        cred.key.checksum, cred.cert.checksum
    );
}

/// Renders the backend configuration file.
///
/// Emits one `backend=` line per server, in upstream order then server order.
#[must_use]
pub fn render_backend_config(upstreams: &[Upstream]) -> String {
    let mut out = String::new();
    for upstream in upstreams {
        let _ = writeln!(out, "# {}", upstream.name);
        for server in &upstream.backends {
            out.push_str(&backend_line(upstream, server));
            out.push('\n');
        }
    }
    out
}

/// Builds the `backend=` line for `server` within `upstream`.
#[must_use]
pub fn backend_line(upstream: &Upstream, server: &UpstreamServer) -> String {
    let mut line = format!(
        "backend={},{};{}{};proto={}",
        server.address,
        server.port,
        upstream.host,
        upstream.path,
        server.protocol.as_str()
    );

    if server.tls {
        line.push_str(";tls");
        if !server.sni.is_empty() {
            let _ = write!(line, ";sni={}", server.sni);
        }
    }
    if server.dns {
        line.push_str(";dns");
    }

    let affinity = if upstream.affinity == Affinity::None {
        server.affinity
    } else {
        upstream.affinity
    };
    match affinity {
        Affinity::None => {}
        Affinity::Ip => line.push_str(";affinity=ip"),
        Affinity::Cookie => {
            line.push_str(";affinity=cookie");
            if let Some(name) = &upstream.affinity_cookie_name {
                let _ = write!(line, ";affinity-cookie-name={name}");
            }
            if let Some(path) = &upstream.affinity_cookie_path {
                let _ = write!(line, ";affinity-cookie-path={path}");
            }
            if let Some(secure) = upstream.affinity_cookie_secure {
                let _ = write!(line, ";affinity-cookie-secure={}", secure.as_str());
            }
        }
    }

    if upstream.redirect_if_not_tls {
        line.push_str(";redirect-if-not-tls");
    }
    if let Some(timeout) = &upstream.read_timeout {
        let _ = write!(line, ";read-timeout={timeout}");
    }
    if let Some(timeout) = &upstream.write_timeout {
        let _ = write!(line, ";write-timeout={timeout}");
    }

    line
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
