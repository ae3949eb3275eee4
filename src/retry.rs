// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Exponential backoff for failed reconciliation passes.
//!
//! A failed pass is retried on a later tick instead of in a tight loop. The
//! delay grows exponentially with jitter and is reset by the first pass that
//! succeeds.

use std::time::Duration;

/// Delay before the first retry
const FIRST_RETRY_MILLIS: u64 = 500;

/// Retries never wait longer than this
const RETRY_CAP_SECS: u64 = 60;

const GROWTH: f64 = 2.0;

/// Relative jitter applied to every delay
const JITTER: f64 = 0.1;

/// Growing retry delay with jitter.
///
/// There is no elapsed time limit: the sync loop keeps retrying until a
/// pass succeeds.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay handed out by the next call to [`ExponentialBackoff::next_backoff`]
    pub current_interval: Duration,
    /// Interval restored by [`ExponentialBackoff::reset`]
    pub initial_interval: Duration,
    /// Upper bound of `current_interval`
    pub max_interval: Duration,
    /// Growth factor applied after each retry
    pub multiplier: f64,
    /// Jitter as a fraction of the delay
    pub randomization_factor: f64,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            multiplier,
            randomization_factor,
        }
    }

    /// Returns the jittered delay for this retry and grows the next one.
    pub fn next_backoff(&mut self) -> Duration {
        let delay = self.current_interval;
        self.current_interval = delay.mul_f64(self.multiplier).min(self.max_interval);
        self.jitter(delay)
    }

    /// Start over from the initial interval.
    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
    }

    // Uniform in [delay * (1 - f), delay * (1 + f)]
    fn jitter(&self, delay: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return delay;
        }
        let factor = 1.0 + self.randomization_factor * (2.0 * rand::random::<f64>() - 1.0);
        delay.mul_f64(factor.max(0.0))
    }
}

/// Backoff used between failed reconciliation passes.
///
/// Delays run 500ms, 1s, 2s, 4s and so on up to 60s, each within ±10%.
#[must_use]
pub fn pass_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(FIRST_RETRY_MILLIS),
        Duration::from_secs(RETRY_CAP_SECS),
        GROWTH,
        JITTER,
    )
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
