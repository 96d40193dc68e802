// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with exponential backoff

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many times to try, and how long to wait between tries.
///
/// The wait before retry `n` (0-indexed) is `first * factor^n`, capped at
/// `max`. It is derived from the retry number alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub first: Duration,
    pub factor: u32,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            first: Duration::from_millis(100),
            factor: 2,
            max: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that tries once and never waits
    pub fn none() -> Self {
        Self {
            attempts: 1,
            first: Duration::ZERO,
            factor: 1,
            max: Duration::ZERO,
        }
    }

    /// Same attempt count with no waiting, for tests
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            first: Duration::ZERO,
            factor: 1,
            max: Duration::ZERO,
        }
    }

    /// Attempt count, never less than one
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Delay before retry number `retry` (0 = wait after the first failure)
    pub fn delay(&self, retry: u32) -> Duration {
        let multiplier = self.factor.max(1).checked_pow(retry).unwrap_or(u32::MAX);
        self.first
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}
