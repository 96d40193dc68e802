// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry around any trigger store

use crate::{StorageError, TriggerStore};
use async_trait::async_trait;
use oe_core::{RetryPolicy, Trigger, TriggerId};
use std::future::Future;

/// Wraps a store and retries transient failures with backoff.
///
/// Only errors for which [`StorageError::is_retryable`] holds are retried.
/// The last error is returned once the policy is exhausted.
#[derive(Clone)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TriggerStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StorageError>> + Send,
        T: Send,
    {
        let attempts = self.policy.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.policy.delay(attempt - 1);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "storage call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(op, attempt, error = %e, "storage call failed");
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<S: TriggerStore> TriggerStore for RetryingStore<S> {
    async fn store_trigger(&self, trigger: &Trigger) -> Result<(), StorageError> {
        self.retry("store_trigger", || self.inner.store_trigger(trigger))
            .await
    }

    async fn load_active_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        self.retry("load_active_triggers", || self.inner.load_active_triggers())
            .await
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<(), StorageError> {
        self.retry("delete_trigger", || self.inner.delete_trigger(id))
            .await
    }
}

#[cfg(test)]
#[path = "retrying_tests.rs"]
mod tests;
