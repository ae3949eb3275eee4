// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the ingress-lb controller.
//!
//! This module provides specialized error types for:
//! - Resolving service target ports against pod container ports
//! - Looking up `IngressClass` objects
//! - Applying configuration to the running nghttpx process
//!
//! Malformed annotation text is deliberately absent: it is logged and degrades
//! to an empty configuration instead of failing a reconciliation pass.

use thiserror::Error;

/// Errors returned while resolving a service target port to a container port.
///
/// The enclosing reconciliation pass skips the affected endpoint rather than
/// aborting the whole pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// No container port carries the requested name
    #[error("no suitable port for manifest: {pod}")]
    NotFound {
        /// Pod UID, or `namespace/name` when the UID is unknown
        pod: String,
    },

    /// A container port carries the requested name but a different protocol.
    ///
    /// Port names are unique within a pod, so scanning stops at the first
    /// name match.
    #[error("port '{port_name}' of {pod} uses protocol {actual}, service expects {expected}")]
    ProtocolMismatch {
        /// Pod UID, or `namespace/name` when the UID is unknown
        pod: String,
        /// The named port that matched
        port_name: String,
        /// Protocol declared by the service port
        expected: String,
        /// Protocol declared by the container port
        actual: String,
    },
}

/// Errors returned by `IngressClass` lookups.
///
/// Callers fail closed on any of these: an Ingress whose class cannot be
/// determined is treated as owned by someone else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The named `IngressClass` does not exist
    #[error("IngressClass '{name}' not found")]
    NotFound {
        /// Requested class name
        name: String,
    },

    /// The class cache cannot be read
    #[error("IngressClass lookup unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the lister
        reason: String,
    },
}

/// Errors raised while applying configuration to nghttpx.
///
/// Any of these leaves the last-applied checksums untouched, so the next pass
/// retries from the same desired state.
#[derive(Error, Debug, Clone)]
pub enum ApplyError {
    /// Writing a configuration or credential file failed
    #[error("failed to write {path}: {reason}")]
    Io {
        /// File that could not be written
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// The nghttpx API could not be reached
    #[error("HTTP request to {endpoint} failed: {reason}")]
    Http {
        /// Endpoint URL
        endpoint: String,
        /// Transport error
        reason: String,
    },

    /// The nghttpx API answered but refused the request
    #[error("nghttpx API at {endpoint} rejected request (HTTP {status_code}): {body}")]
    Rejected {
        /// Endpoint URL
        endpoint: String,
        /// HTTP status code
        status_code: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// nghttpx could not be signalled to reload
    #[error("failed to signal nghttpx: {reason}")]
    Signal {
        /// Reason the signal was not delivered
        reason: String,
    },

    /// nghttpx did not acknowledge a reload in time
    #[error("nghttpx at {endpoint} did not acknowledge reload within {timeout_ms}ms")]
    Timeout {
        /// Endpoint polled for acknowledgement
        endpoint: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },
}

impl ApplyError {
    /// Returns the short label used for the `reason` metric dimension
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Http { .. } => "http",
            Self::Rejected { .. } => "rejected",
            Self::Signal { .. } => "signal",
            Self::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
