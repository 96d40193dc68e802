// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op operation adapter for deployments without an executor.

use super::{DispatchError, OperationAdapter, OperationContext};
use async_trait::async_trait;
use oe_core::OperationId;

/// Operation adapter that accepts every request and does nothing.
///
/// Fires are still logged, so schedules can be observed without workers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpOperationAdapter;

impl NoOpOperationAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OperationAdapter for NoOpOperationAdapter {
    async fn execute_operation(
        &self,
        _operation: &OperationId,
        _context: &OperationContext,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}
