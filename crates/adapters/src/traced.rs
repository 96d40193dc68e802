// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::operation::{DispatchError, OperationAdapter, OperationContext};
use async_trait::async_trait;
use oe_core::OperationId;
use tracing::Instrument;

/// Wrapper that adds tracing to any OperationAdapter
#[derive(Clone)]
pub struct TracedOperationAdapter<O> {
    inner: O,
}

impl<O> TracedOperationAdapter<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: OperationAdapter> OperationAdapter for TracedOperationAdapter<O> {
    async fn execute_operation(
        &self,
        operation: &OperationId,
        context: &OperationContext,
    ) -> Result<(), DispatchError> {
        let span = tracing::info_span!(
            "operation.execute",
            operation = %operation,
            trigger = %context.trigger_id,
            routing_key = %context.routing_key
        );

        async {
            tracing::info!(fire_at = %context.fire_at, "submitting");

            let start = std::time::Instant::now();
            let result = self.inner.execute_operation(operation, context).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "accepted"),
                // Callers retry, so a single failure is only a warning
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "submission failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
