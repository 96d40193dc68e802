// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence adapter consumed by the trigger manager

use async_trait::async_trait;
use oe_core::{Trigger, TriggerId};
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Unavailable(_))
    }
}

/// Durable store of triggers and their checkpoints.
///
/// Writes are awaited to completion before the caller proceeds; the
/// manager never holds its queue lock across these calls.
#[async_trait]
pub trait TriggerStore: Send + Sync + 'static {
    /// Insert or replace the stored record for `trigger.id`
    async fn store_trigger(&self, trigger: &Trigger) -> Result<(), StorageError>;

    /// Every trigger in the active state, used at startup
    async fn load_active_triggers(&self) -> Result<Vec<Trigger>, StorageError>;

    /// Remove a trigger; removing an unknown id is not an error
    async fn delete_trigger(&self, id: &TriggerId) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: TriggerStore + ?Sized> TriggerStore for Arc<S> {
    async fn store_trigger(&self, trigger: &Trigger) -> Result<(), StorageError> {
        (**self).store_trigger(trigger).await
    }

    async fn load_active_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        (**self).load_active_triggers().await
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<(), StorageError> {
        (**self).delete_trigger(id).await
    }
}
