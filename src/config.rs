// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! Every flag can also be supplied through the environment variable named in
//! its help text, which is how the controller is usually configured inside a
//! pod.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::constants::{
    DEFAULT_API_PORT, DEFAULT_API_TIMEOUT_SECS, DEFAULT_CONF_DIR, DEFAULT_CONTROLLER_ID,
    DEFAULT_HEALTH_PORT, DEFAULT_METRICS_PORT, DEFAULT_PID_FILE, DEFAULT_RELOAD_TIMEOUT_SECS,
};
use crate::context::split_namespaced_name;
use crate::nghttpx::types::default_workers;

/// Runtime configuration of the controller.
#[derive(Debug, Clone, Parser)]
#[command(name = "ingress-lb", version, about = "nghttpx Ingress controller", long_about = None)]
pub struct ControllerConfig {
    /// Value of `IngressClass.spec.controller` handled by this instance
    #[arg(long, env = "INGRESS_LB_CONTROLLER_ID", default_value = DEFAULT_CONTROLLER_ID)]
    pub controller_id: String,

    /// Ignore Ingresses that do not name an IngressClass
    #[arg(long, env = "INGRESS_LB_REQUIRE_INGRESS_CLASS")]
    pub require_ingress_class: bool,

    /// Restrict namespaced watches to this namespace
    #[arg(long, env = "INGRESS_LB_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Directory nghttpx configuration and TLS files are written to
    #[arg(long, env = "INGRESS_LB_CONF_DIR", default_value = DEFAULT_CONF_DIR)]
    pub conf_dir: PathBuf,

    /// Port of the nghttpx API frontend
    #[arg(long, env = "INGRESS_LB_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port of the nghttpx health monitor frontend
    #[arg(long, env = "INGRESS_LB_HEALTH_PORT", default_value_t = DEFAULT_HEALTH_PORT)]
    pub health_port: u16,

    /// Port serving `/metrics` and `/healthz`
    #[arg(long, env = "INGRESS_LB_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// nghttpx worker threads; defaults to the CPU count
    #[arg(long, env = "INGRESS_LB_WORKERS")]
    pub workers: Option<usize>,

    /// Raw configuration appended to the main nghttpx file
    #[arg(long, env = "INGRESS_LB_EXTRA_CONFIG", default_value = "")]
    pub extra_config: String,

    /// Service (`namespace/name`) answering requests no rule matches
    #[arg(long, env = "INGRESS_LB_DEFAULT_BACKEND_SERVICE")]
    pub default_backend_service: Option<String>,

    /// Secret (`namespace/name`) holding the default TLS certificate
    #[arg(long, env = "INGRESS_LB_DEFAULT_TLS_SECRET")]
    pub default_tls_secret: Option<String>,

    /// Service (`namespace/name`) whose addresses are published in Ingress status
    #[arg(long, env = "INGRESS_LB_PUBLISH_SERVICE")]
    pub publish_service: Option<String>,

    /// File holding the nghttpx master process id
    #[arg(long, env = "INGRESS_LB_PID_FILE", default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// Seconds to wait for nghttpx to acknowledge a reload
    #[arg(long, env = "INGRESS_LB_RELOAD_TIMEOUT_SECS", default_value_t = DEFAULT_RELOAD_TIMEOUT_SECS)]
    pub reload_timeout_secs: u64,

    /// Timeout in seconds of a single nghttpx API request
    #[arg(long, env = "INGRESS_LB_API_TIMEOUT_SECS", default_value_t = DEFAULT_API_TIMEOUT_SECS)]
    pub api_timeout_secs: u64,
}

impl ControllerConfig {
    /// Checks values clap cannot validate on its own.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first malformed `namespace/name` reference
    /// or zero-valued worker count or timeout.
    pub fn validate(&self) -> Result<()> {
        for (flag, value) in [
            ("--default-backend-service", &self.default_backend_service),
            ("--default-tls-secret", &self.default_tls_secret),
            ("--publish-service", &self.publish_service),
        ] {
            if let Some(value) = value {
                if split_namespaced_name(value).is_none() {
                    bail!("{flag} must be of the form namespace/name, got '{value}'");
                }
            }
        }

        if self.workers == Some(0) {
            bail!("--workers must be at least 1");
        }
        if self.reload_timeout_secs == 0 || self.api_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }

        Ok(())
    }

    #[must_use]
    pub fn default_backend(&self) -> Option<(&str, &str)> {
        self.default_backend_service
            .as_deref()
            .and_then(split_namespaced_name)
    }

    #[must_use]
    pub fn default_tls(&self) -> Option<(&str, &str)> {
        self.default_tls_secret
            .as_deref()
            .and_then(split_namespaced_name)
    }

    #[must_use]
    pub fn publish(&self) -> Option<(&str, &str)> {
        self.publish_service.as_deref().and_then(split_namespaced_name)
    }

    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    #[must_use]
    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload_timeout_secs)
    }

    #[must_use]
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
