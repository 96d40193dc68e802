// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the trigger manager

use oe_core::{TimeFormatError, TriggerId};
use oe_storage::StorageError;
use thiserror::Error;

/// Errors returned to callers of the registration API
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("trigger not found: {0}")]
    NotFound(TriggerId),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("trigger {0} has no occurrence within the scheduling horizon")]
    HorizonExceeded(TriggerId),
}

impl From<TimeFormatError> for ManagerError {
    fn from(e: TimeFormatError) -> Self {
        match e {
            TimeFormatError::InvalidInput(msg) => ManagerError::InvalidInput(msg),
            other => ManagerError::InvalidInput(other.to_string()),
        }
    }
}
