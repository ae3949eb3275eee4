// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for nghttpx timeout strings.
//!
//! nghttpx accepts an integer optionally followed by a unit (e.g., "500ms",
//! "30s", "1m", "2h"). A bare integer means seconds.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Parse an nghttpx duration string into a Rust `Duration`.
///
/// Supported units:
/// - `ms` (milliseconds): "500ms"
/// - `s` (seconds): "30s", or no unit at all: "30"
/// - `m` (minutes): "1m"
/// - `h` (hours): "2h"
///
/// # Examples
///
/// ```
/// use ingress_lb::nghttpx::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
///
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10x").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, the value is not a non-negative
/// integer, the unit is unknown, or the value overflows.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    let split_pos = duration_str
        .chars()
        .position(|c| !c.is_ascii_digit())
        .unwrap_or(duration_str.len());

    let (value_str, unit) = duration_str.split_at(split_pos);

    let value: u64 = value_str
        .parse()
        .context("Duration value must be a non-negative integer")?;

    let millis = match unit {
        "ms" => Some(value),
        "" | "s" => value.checked_mul(MILLIS_PER_SECOND),
        "m" => value.checked_mul(MILLIS_PER_MINUTE),
        "h" => value.checked_mul(MILLIS_PER_HOUR),
        _ => {
            bail!("Unsupported duration unit '{unit}'. Use 'ms', 's', 'm', or 'h'")
        }
    }
    .context("Duration value too large (overflow)")?;

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
