// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control surface of the running nghttpx process.
//!
//! Two operations are exposed through [`ControlSurface`]:
//!
//! - [`ControlSurface::apply_full_config`] writes every file, signals nghttpx
//!   with `SIGHUP` and waits until the API reports a new config revision.
//! - [`ControlSurface::apply_backend_only`] writes the backend file and pushes
//!   it through the backend API, which swaps backends without a reload.
//!
//! Both are idempotent: repeating a call with the same payload leaves nghttpx
//! in the same state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::render::RenderedConfig;
use crate::constants::{
    BACKENDCONFIG_API_PATH, BACKEND_CONFIG_FILE, CONFIGREVISION_API_PATH, MAIN_CONFIG_FILE,
    RELOAD_POLL_INTERVAL_MILLIS,
};
use crate::errors::ApplyError;

/// Status value nghttpx reports for an accepted API request
const API_STATUS_SUCCESS: &str = "Success";

/// Operations the reload decision drives on the proxy.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Writes the complete configuration and reloads the process.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if a file cannot be written, the process
    /// cannot be signalled, or the reload is not acknowledged in time.
    async fn apply_full_config(&self, config: &RenderedConfig) -> Result<(), ApplyError>;

    /// Replaces the backend configuration without reloading the process.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the file cannot be written or the API
    /// refuses the new backends.
    async fn apply_backend_only(&self, backend: &str) -> Result<(), ApplyError>;
}

/// Envelope of every nghttpx API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiData {
    #[serde(default)]
    config_revision: Option<u64>,
}

/// [`ControlSurface`] for an nghttpx process sharing the pod with the controller.
pub struct NghttpxControl {
    http: HttpClient,
    api_base: String,
    conf_dir: PathBuf,
    pid_file: PathBuf,
    reload_timeout: Duration,
    poll_interval: Duration,
}

impl NghttpxControl {
    /// Creates a control surface talking to the API on `127.0.0.1:<api_port>`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        conf_dir: impl Into<PathBuf>,
        api_port: u16,
        pid_file: impl Into<PathBuf>,
        api_timeout: Duration,
        reload_timeout: Duration,
    ) -> Result<Self, ApplyError> {
        let api_base = format!("http://127.0.0.1:{api_port}");

        // Idle connections would hold a graceful nghttpx shutdown open.
        let http = HttpClient::builder()
            .timeout(api_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ApplyError::Http {
                endpoint: api_base.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_base,
            conf_dir: conf_dir.into(),
            pid_file: pid_file.into(),
            reload_timeout,
            poll_interval: Duration::from_millis(RELOAD_POLL_INTERVAL_MILLIS),
        })
    }

    /// Overrides the API base URL, e.g. `http://127.0.0.1:3001`.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides how often the config revision is polled after a reload.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn main_config_path(&self) -> PathBuf {
        self.conf_dir.join(MAIN_CONFIG_FILE)
    }

    #[must_use]
    pub fn backend_config_path(&self) -> PathBuf {
        self.conf_dir.join(BACKEND_CONFIG_FILE)
    }

    /// Writes the main and backend files without signalling nghttpx, so the
    /// process has a configuration to start from.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Io`] if a file cannot be written.
    pub async fn write_initial_config(&self, config: &RenderedConfig) -> Result<(), ApplyError> {
        write_file_atomic(&self.backend_config_path(), config.backend.as_bytes()).await?;
        write_file_atomic(&self.main_config_path(), config.main.as_bytes()).await?;
        info!(
            path = %self.main_config_path().display(),
            "Wrote initial nghttpx configuration"
        );
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Reads the current configuration revision from the API.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Http`] on transport failure and
    /// [`ApplyError::Rejected`] if the response is not a successful revision.
    pub async fn config_revision(&self) -> Result<u64, ApplyError> {
        let endpoint = self.url(CONFIGREVISION_API_PATH);

        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| ApplyError::Http {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status_code = response.status();
        let body = response.text().await.map_err(|e| ApplyError::Http {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let rejected = |body: String| ApplyError::Rejected {
            endpoint: endpoint.clone(),
            status_code: status_code.as_u16(),
            body,
        };

        if !status_code.is_success() {
            return Err(rejected(body));
        }

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(ApiResponse {
                status,
                data:
                    Some(ApiData {
                        config_revision: Some(revision),
                    }),
            }) if status == API_STATUS_SUCCESS => Ok(revision),
            _ => Err(rejected(body)),
        }
    }

    async fn signal_reload(&self) -> Result<(), ApplyError> {
        let raw = tokio::fs::read_to_string(&self.pid_file)
            .await
            .map_err(|e| ApplyError::Signal {
                reason: format!("cannot read pid file {}: {e}", self.pid_file.display()),
            })?;

        let pid: i32 = raw.trim().parse().map_err(|e| ApplyError::Signal {
            reason: format!("invalid pid '{}' in {}: {e}", raw.trim(), self.pid_file.display()),
        })?;

        kill(Pid::from_raw(pid), Signal::SIGHUP).map_err(|e| ApplyError::Signal {
            reason: format!("SIGHUP to pid {pid} failed: {e}"),
        })?;

        debug!(pid = pid, "Sent SIGHUP to nghttpx");
        Ok(())
    }

    async fn wait_for_revision_change(&self, previous: u64) -> Result<(), ApplyError> {
        let deadline = Instant::now() + self.reload_timeout;

        loop {
            tokio::time::sleep(self.poll_interval).await;

            match self.config_revision().await {
                Ok(revision) if revision != previous => {
                    info!(
                        previous = previous,
                        revision = revision,
                        "nghttpx acknowledged configuration reload"
                    );
                    return Ok(());
                }
                Ok(_) => {}
                // The API is briefly unavailable while workers restart
                Err(e) => debug!(error = %e, "Config revision not available yet"),
            }

            if Instant::now() >= deadline {
                return Err(ApplyError::Timeout {
                    endpoint: self.url(CONFIGREVISION_API_PATH),
                    timeout_ms: u64::try_from(self.reload_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
        }
    }
}

/// Writes `content` to `path` through a temporary sibling and a rename, so
/// nghttpx never reads a partially written file.
///
/// # Errors
///
/// Returns [`ApplyError::Io`] if any step fails.
pub async fn write_file_atomic(path: &Path, content: &[u8]) -> Result<(), ApplyError> {
    let io_err = |e: std::io::Error| ApplyError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, content).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[async_trait]
impl ControlSurface for NghttpxControl {
    async fn apply_full_config(&self, config: &RenderedConfig) -> Result<(), ApplyError> {
        for file in &config.tls_files {
            write_file_atomic(Path::new(&file.path), &file.content).await?;
        }
        write_file_atomic(&self.backend_config_path(), config.backend.as_bytes()).await?;
        write_file_atomic(&self.main_config_path(), config.main.as_bytes()).await?;

        let previous = self.config_revision().await?;

        info!(
            checksum = %config.main_checksum,
            revision = previous,
            "Reloading nghttpx"
        );
        self.signal_reload().await?;
        self.wait_for_revision_change(previous).await
    }

    async fn apply_backend_only(&self, backend: &str) -> Result<(), ApplyError> {
        write_file_atomic(&self.backend_config_path(), backend.as_bytes()).await?;

        let endpoint = self.url(BACKENDCONFIG_API_PATH);
        let response = self
            .http
            .put(&endpoint)
            .body(backend.to_string())
            .send()
            .await
            .map_err(|e| ApplyError::Http {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status_code = response.status();
        let body = response.text().await.map_err(|e| ApplyError::Http {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let accepted = status_code.is_success()
            && serde_json::from_str::<ApiResponse>(&body)
                .is_ok_and(|r| r.status == API_STATUS_SUCCESS);

        if !accepted {
            warn!(
                endpoint = %endpoint,
                status = %status_code,
                body = %body,
                "nghttpx rejected backend configuration"
            );
            return Err(ApplyError::Rejected {
                endpoint,
                status_code: status_code.as_u16(),
                body,
            });
        }

        debug!(endpoint = %endpoint, "Backend configuration accepted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod control_tests;
