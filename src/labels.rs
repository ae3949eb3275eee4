// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation keys read by the controller.
//!
//! Ingress annotations carry the loosely-typed backend and path configuration;
//! the remaining keys are standard Kubernetes labels and annotations the
//! controller consults when resolving classes and endpoints.

// ============================================================================
// Ingress Annotations
// ============================================================================

/// Per service/port backend configuration.
///
/// The first key is the service name, the second key is the port name (or number).
pub const BACKEND_CONFIG_ANNOTATION: &str = "ingress.zlab.co.jp/backend-config";

/// Backend configuration applied to every entry of the Ingress.
pub const DEFAULT_BACKEND_CONFIG_ANNOTATION: &str = "ingress.zlab.co.jp/default-backend-config";

/// Per host/path configuration.
pub const PATH_CONFIG_ANNOTATION: &str = "ingress.zlab.co.jp/path-config";

/// Path configuration applied to every path of the Ingress.
pub const DEFAULT_PATH_CONFIG_ANNOTATION: &str = "ingress.zlab.co.jp/default-path-config";

// ============================================================================
// Kubernetes Standard Keys
// ============================================================================

/// Annotation marking an `IngressClass` as the cluster default
pub const IS_DEFAULT_INGRESS_CLASS_ANNOTATION: &str =
    "ingressclass.kubernetes.io/is-default-class";

/// Label on `EndpointSlice` objects naming the owning service
pub const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";
