// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ingress-lb - nghttpx Ingress controller for Kubernetes
//!
//! ingress-lb watches `Ingress` objects and the Services, `EndpointSlice`s,
//! Pods and Secrets they reference, and keeps an nghttpx reverse proxy
//! configured to route their traffic.
//!
//! ## Overview
//!
//! Each reconciliation pass:
//!
//! - selects the Ingresses owned by this controller through their `IngressClass`
//! - decodes the per-Ingress backend and path annotations
//! - resolves every referenced Service port to ready endpoint addresses
//! - renders the nghttpx main and backend configuration
//! - reloads nghttpx, hot-swaps its backends, or does nothing, depending on
//!   which rendered file changed
//! - publishes the controller's external addresses in the Ingress status
//!
//! ## Modules
//!
//! - [`annotation`] - Backend and path annotation decoding
//! - [`topology`] - Upstream derivation from Ingress rules and endpoints
//! - [`nghttpx`] - Configuration model, rendering and the reload state machine
//! - [`ingress_class`] - Ingress ownership decisions
//! - [`status`] - Load balancer address sets and status writeback
//! - [`controller`] - Reconciliation passes and the sync loop
//! - [`context`] - Reflector stores shared by every pass
//!
//! ## Example
//!
//! ```rust,no_run
//! use ingress_lb::annotation::derive_backend_config;
//!
//! let mapper = derive_backend_config(
//!     Some("{\"proto\": \"h2\"}"),
//!     Some("web:\n  http:\n    tls: true\n"),
//! );
//! ```

pub mod annotation;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod errors;
pub mod ingress_class;
pub mod labels;
pub mod metrics;
pub mod nghttpx;
pub mod pod;
pub mod retry;
pub mod status;
pub mod tls;
pub mod topology;
