// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a fired trigger into execution requests
//!
//! Each bound operation is submitted independently: retries, timeouts and
//! failures of one operation never hold back its siblings. A semaphore
//! shared by every dispatch bounds how many transport calls are open at
//! once, including calls that already timed out but have not returned.

use crate::config::DispatchConfig;
use chrono::{DateTime, Utc};
use oe_adapters::{DispatchError, NotifyAdapter, OperationAdapter, OperationContext};
use oe_core::{OperationId, Trigger, TriggerId};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

/// Alert channel for operations whose submission was abandoned
pub const DISPATCH_CHANNEL: &str = "dispatch";

/// Outcome of one dispatch, in binding order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub trigger_id: TriggerId,
    pub fire_at: DateTime<Utc>,
    pub accepted: Vec<OperationId>,
    pub failed: Vec<(OperationId, DispatchError)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Submits operations with bounded retry, timeout and concurrency
pub struct Dispatcher<O, N> {
    operations: O,
    notify: N,
    permits: Arc<Semaphore>,
    config: DispatchConfig,
}

impl<O: OperationAdapter, N: NotifyAdapter> Dispatcher<O, N> {
    pub fn new(operations: O, notify: N, config: DispatchConfig) -> Self {
        Self {
            operations,
            notify,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        }
    }

    /// Start submitting every operation bound to `trigger`.
    ///
    /// Returns at once; the handle resolves when all operations were either
    /// accepted or abandoned.
    pub fn dispatch(&self, trigger: &Trigger, fire_at: DateTime<Utc>) -> JoinHandle<DispatchReport> {
        let context = OperationContext::for_fire(trigger, fire_at);
        let operations = trigger.operations.clone();
        let mut tasks = JoinSet::new();

        if operations.is_empty() {
            tracing::debug!(trigger = %trigger.id, "fired with no bound operations");
        }

        for (index, operation) in operations.into_iter().enumerate() {
            let submit = Submission {
                operations: self.operations.clone(),
                notify: self.notify.clone(),
                permits: Arc::clone(&self.permits),
                config: self.config.clone(),
                context: context.clone(),
            };
            tasks.spawn(async move {
                let result = submit.run(&operation).await;
                (index, operation, result)
            });
        }

        tokio::spawn(async move {
            let mut outcomes = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => tracing::error!(
                        trigger = %context.trigger_id,
                        error = %e,
                        "dispatch task failed"
                    ),
                }
            }
            outcomes.sort_by_key(|(index, _, _)| *index);

            let mut report = DispatchReport {
                trigger_id: context.trigger_id,
                fire_at: context.fire_at,
                accepted: Vec::new(),
                failed: Vec::new(),
            };
            for (_, operation, result) in outcomes {
                match result {
                    Ok(()) => report.accepted.push(operation),
                    Err(e) => report.failed.push((operation, e)),
                }
            }
            report
        })
    }
}

/// One operation's submission, owned by its task
struct Submission<O, N> {
    operations: O,
    notify: N,
    permits: Arc<Semaphore>,
    config: DispatchConfig,
    context: OperationContext,
}

impl<O: OperationAdapter, N: NotifyAdapter> Submission<O, N> {
    async fn run(&self, operation: &OperationId) -> Result<(), DispatchError> {
        let attempts = self.config.retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(operation).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    let delay = self.config.retry.delay(attempt - 1);
                    tracing::warn!(
                        trigger = %self.context.trigger_id,
                        operation = %operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "submission failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        trigger = %self.context.trigger_id,
                        operation = %operation,
                        attempts,
                        error = %e,
                        "giving up on operation"
                    );
                    let message = format!(
                        "operation {} for trigger {} (fire at {}) was not submitted after {} attempts: {}",
                        operation, self.context.trigger_id, self.context.fire_at, attempts, e
                    );
                    if let Err(notify_err) = self.notify.send(DISPATCH_CHANNEL, &message).await {
                        tracing::warn!(error = %notify_err, "failed to send dispatch alert");
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, operation: &OperationId) -> Result<(), DispatchError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::Transport("dispatcher is shut down".to_string()))?;

        // The permit goes with the call: an attempt we stop waiting for still
        // counts against the bound until the transport returns
        let operations = self.operations.clone();
        let operation = operation.clone();
        let context = self.context.clone();
        let call = tokio::spawn(async move {
            let result = operations.execute_operation(&operation, &context).await;
            drop(permit);
            result
        });

        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(DispatchError::Transport(format!(
                "submission task failed: {}",
                e
            ))),
            Err(_) => Err(DispatchError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
