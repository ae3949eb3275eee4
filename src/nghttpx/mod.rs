// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! nghttpx configuration model, rendering and process control.
//!
//! # Modules
//!
//! - [`types`] - Derived configuration data model
//! - [`backend_config`] - Per service port backend configuration
//! - [`path_config`] - Per host/path configuration
//! - [`duration`] - nghttpx duration strings
//! - [`checksum`] - Content checksums
//! - [`render`] - Configuration file rendering
//! - [`control`] - File writes, reload signal and API calls
//! - [`load_balancer`] - Reload decision over the last-applied state

pub mod backend_config;
pub mod checksum;
pub mod control;
pub mod duration;
pub mod load_balancer;
pub mod path_config;
pub mod render;
pub mod types;

pub use control::{ControlSurface, NghttpxControl};
pub use load_balancer::{AppliedState, LoadBalancer, ReloadOutcome};
pub use render::RenderedConfig;
pub use types::{
    BackendConfig, ChecksumFile, IngressConfig, PathConfig, PortBackendConfig, TlsCred, Upstream,
    UpstreamServer,
};
