// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alerts written to the daemon log

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// Notify adapter that records alerts as `error` log events
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifyAdapter;

impl LogNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for LogNotifyAdapter {
    async fn send(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        tracing::error!(channel, alert = message, "operator alert");
        Ok(())
    }
}
