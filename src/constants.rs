// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the ingress-lb controller.
//!
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Controller Identity
// ============================================================================

/// Default value matched against `IngressClass.spec.controller`
pub const DEFAULT_CONTROLLER_ID: &str = "zlab.co.jp/nghttpx";

/// Field manager recorded on status patches
pub const CONTROLLER_NAME: &str = "ingress-lb";

// ============================================================================
// Default Server
// ============================================================================

/// Address of the built-in server that answers 503 for routes without endpoints
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";

/// Port of the built-in default server
pub const DEFAULT_SERVER_PORT: &str = "8181";

/// Upstream name used for the catch-all default backend
pub const DEFAULT_UPSTREAM_NAME: &str = "default";

// ============================================================================
// nghttpx Ports and Paths
// ============================================================================

/// Plaintext HTTP frontend port
pub const HTTP_PORT: u16 = 80;

/// TLS frontend port
pub const HTTPS_PORT: u16 = 443;

/// Default nghttpx health monitor port
pub const DEFAULT_HEALTH_PORT: u16 = 10901;

/// Default nghttpx API port
pub const DEFAULT_API_PORT: u16 = 3001;

/// Default controller metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default nghttpx configuration directory
pub const DEFAULT_CONF_DIR: &str = "/etc/nghttpx";

/// Main configuration file name inside the configuration directory
pub const MAIN_CONFIG_FILE: &str = "nghttpx.conf";

/// Backend configuration file name inside the configuration directory
pub const BACKEND_CONFIG_FILE: &str = "nghttpx-backend.conf";

/// Subdirectory holding TLS key and certificate files
pub const TLS_DIR: &str = "tls";

/// Default nghttpx pid file
pub const DEFAULT_PID_FILE: &str = "/var/run/nghttpx.pid";

/// nghttpx API endpoint replacing the backend configuration
pub const BACKENDCONFIG_API_PATH: &str = "/api/v1beta1/backendconfig";

/// nghttpx API endpoint reporting the configuration revision
pub const CONFIGREVISION_API_PATH: &str = "/api/v1beta1/configrevision";

// ============================================================================
// Kubernetes Defaults
// ============================================================================

/// Protocol assumed when a port omits it
pub const DEFAULT_PORT_PROTOCOL: &str = "TCP";

/// Key of the private key inside a TLS Secret
pub const TLS_KEY_KEY: &str = "tls.key";

/// Key of the certificate inside a TLS Secret
pub const TLS_CERT_KEY: &str = "tls.crt";

// ============================================================================
// Timing Constants
// ============================================================================

/// Default time to wait for nghttpx to acknowledge a reload (30 seconds)
pub const DEFAULT_RELOAD_TIMEOUT_SECS: u64 = 30;

/// Default timeout for a single nghttpx API request (10 seconds)
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

/// Interval between configuration revision polls while waiting for a reload
pub const RELOAD_POLL_INTERVAL_MILLIS: u64 = 200;

/// Periodic resync interval even without watch events (5 minutes)
pub const RESYNC_INTERVAL_SECS: u64 = 300;
