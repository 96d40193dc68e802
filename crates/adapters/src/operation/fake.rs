// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake operation adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DispatchError, OperationAdapter, OperationContext};
use async_trait::async_trait;
use oe_core::OperationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCall {
    pub operation: OperationId,
    pub context: OperationContext,
    /// Whether the attempt was accepted
    pub accepted: bool,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<OperationCall>,
    /// Remaining failing attempts per operation
    failures: HashMap<OperationId, u32>,
    delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Fake operation adapter for testing
#[derive(Clone, Default)]
pub struct FakeOperationAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeOperationAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` attempts for `operation` with a transport error
    pub fn fail_operation(&self, operation: impl Into<String>, times: u32) {
        self.lock()
            .failures
            .insert(OperationId::new(operation), times);
    }

    /// Hold every attempt for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Get all recorded attempts
    pub fn calls(&self) -> Vec<OperationCall> {
        self.lock().calls.clone()
    }

    /// Accepted attempts only
    pub fn accepted(&self) -> Vec<OperationCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.accepted)
            .cloned()
            .collect()
    }

    /// Highest number of attempts observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OperationAdapter for FakeOperationAdapter {
    async fn execute_operation(
        &self,
        operation: &OperationId,
        context: &OperationContext,
    ) -> Result<(), DispatchError> {
        let delay = {
            let mut state = self.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.in_flight -= 1;
        let fail = match state.failures.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        state.calls.push(OperationCall {
            operation: operation.clone(),
            context: context.clone(),
            accepted: !fail,
        });

        if fail {
            Err(DispatchError::Transport(format!(
                "injected failure for {}",
                operation
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
