// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator alerting adapters

mod log;

pub use self::log::LogNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for raising operator-visible alerts
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Send `message` on `channel`
    async fn send(&self, channel: &str, message: &str) -> Result<(), NotifyError>;
}
