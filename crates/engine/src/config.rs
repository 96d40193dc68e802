// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs

use crate::catch_up::CatchUpMode;
use oe_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trigger manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Patterns that fire more often than this are rejected
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    /// Longest sleep of the control loop when nothing is due
    #[serde(with = "humantime_serde")]
    pub idle_wait: Duration,
    /// Loop wake interval while a checkpoint write is pending
    #[serde(with = "humantime_serde")]
    pub checkpoint_retry: Duration,
    pub catch_up: CatchUpMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(60),
            idle_wait: Duration::from_secs(60),
            checkpoint_retry: Duration::from_secs(5),
            catch_up: CatchUpMode::FireOnce,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub fn with_checkpoint_retry(mut self, checkpoint_retry: Duration) -> Self {
        self.checkpoint_retry = checkpoint_retry;
        self
    }

    pub fn with_catch_up(mut self, catch_up: CatchUpMode) -> Self {
        self.catch_up = catch_up;
        self
    }
}

/// Dispatch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Bound on concurrent `execute_operation` calls across all triggers
    pub max_concurrent: usize,
    /// Per-attempt submission timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                attempts: 3,
                first: Duration::from_millis(200),
                factor: 2,
                max: Duration::from_secs(5),
            },
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
