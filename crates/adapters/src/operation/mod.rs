// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote operation execution transport

mod http;
mod noop;

pub use http::HttpOperationAdapter;
pub use noop::NoOpOperationAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOperationAdapter, OperationCall};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oe_core::{OperationId, Trigger, TriggerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure to hand a request to a worker.
///
/// Failures of the operation itself, after acceptance, are reported
/// elsewhere and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
}

/// What a worker needs to know about the fire that caused a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    pub trigger_id: TriggerId,
    /// Worker pool selector, the project scope of the trigger
    pub routing_key: String,
    pub fire_at: DateTime<Utc>,
}

impl OperationContext {
    pub fn for_fire(trigger: &Trigger, fire_at: DateTime<Utc>) -> Self {
        Self {
            trigger_id: trigger.id.clone(),
            routing_key: trigger.routing_key().to_string(),
            fire_at,
        }
    }
}

/// Adapter that submits operation execution requests to a worker pool
#[async_trait]
pub trait OperationAdapter: Clone + Send + Sync + 'static {
    /// Submit one execution request; `Ok` means the request was accepted
    async fn execute_operation(
        &self,
        operation: &OperationId,
        context: &OperationContext,
    ) -> Result<(), DispatchError>;
}
