// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Content checksums.
//!
//! Configuration files and TLS credentials are compared between passes by the
//! SHA-256 of their bytes, never by path or modification time.

use sha2::{Digest, Sha256};

/// Calculate the SHA-256 of `data` as lowercase hex.
///
/// # Example
///
/// ```rust
/// use ingress_lb::nghttpx::checksum::sha256_hex;
///
/// let sum = sha256_hex(b"backend=127.0.0.1,8181;;proto=http/1.1\n");
/// assert_eq!(sum.len(), 64);
/// ```
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod checksum_tests;
