// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reload decision: picks the least disruptive way to apply a new configuration.
//!
//! Each pass renders the desired [`IngressConfig`] and compares the two file
//! checksums with what was last applied:
//!
//! | main    | backend | action                                   |
//! |---------|---------|------------------------------------------|
//! | same    | same    | nothing                                  |
//! | same    | changed | push backends through the API            |
//! | changed | any     | write everything and reload the process  |
//!
//! Checksums are only recorded after the control surface reports success, so a
//! failed or interrupted apply is retried in full by the next pass.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::control::ControlSurface;
use super::render::render;
use super::types::IngressConfig;
use crate::errors::ApplyError;

/// Checksums of the configuration nghttpx is known to run with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedState {
    pub main_checksum: Option<String>,
    pub backend_checksum: Option<String>,
}

/// What a pass did to nghttpx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Desired configuration was already applied
    NoChange,
    /// Backends were replaced through the API
    BackendUpdated,
    /// Full configuration was written and the process reloaded
    Reloaded,
}

impl ReloadOutcome {
    /// Label used for the `kind` metric dimension
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoChange => "none",
            Self::BackendUpdated => "backend",
            Self::Reloaded => "full",
        }
    }
}

/// Owns the last-applied state and drives the control surface.
pub struct LoadBalancer {
    control: Arc<dyn ControlSurface>,
    conf_dir: PathBuf,
    state: Mutex<AppliedState>,
}

impl LoadBalancer {
    #[must_use]
    pub fn new(control: Arc<dyn ControlSurface>, conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            control,
            conf_dir: conf_dir.into(),
            state: Mutex::new(AppliedState::default()),
        }
    }

    /// Returns a copy of the last-applied state.
    pub async fn applied_state(&self) -> AppliedState {
        self.state.lock().await.clone()
    }

    /// Applies `config` if it differs from what nghttpx runs.
    ///
    /// Calls are serialized: a second caller waits until the first pass has
    /// finished with the control surface.
    ///
    /// # Errors
    ///
    /// Returns the control surface's [`ApplyError`]. The applied state is left
    /// unchanged in that case.
    pub async fn check_and_reload(
        &self,
        config: &IngressConfig,
    ) -> Result<ReloadOutcome, ApplyError> {
        let rendered = render(config, &self.conf_dir);
        let mut state = self.state.lock().await;

        let main_unchanged =
            state.main_checksum.as_deref() == Some(rendered.main_checksum.as_str());
        let backend_unchanged =
            state.backend_checksum.as_deref() == Some(rendered.backend_checksum.as_str());

        if main_unchanged && backend_unchanged {
            debug!("No nghttpx reload needed");
            return Ok(ReloadOutcome::NoChange);
        }

        if main_unchanged {
            info!(
                checksum = %rendered.backend_checksum,
                "Backend configuration changed, updating backends without reload"
            );
            self.control.apply_backend_only(&rendered.backend).await?;
            state.backend_checksum = Some(rendered.backend_checksum);
            return Ok(ReloadOutcome::BackendUpdated);
        }

        info!(
            checksum = %rendered.main_checksum,
            "Main configuration changed, reloading nghttpx"
        );
        self.control.apply_full_config(&rendered).await?;
        state.main_checksum = Some(rendered.main_checksum);
        state.backend_checksum = Some(rendered.backend_checksum);
        Ok(ReloadOutcome::Reloaded)
    }
}

#[cfg(test)]
#[path = "load_balancer_tests.rs"]
mod load_balancer_tests;
