// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use oe_core::{Trigger, TriggerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A durable change to the trigger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOperation {
    /// Insert or replace a trigger record
    Store { trigger: Trigger },
    /// Remove a trigger record
    Delete { id: TriggerId },
}

/// Trigger table built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub triggers: HashMap<TriggerId, Trigger>,
}

impl MaterializedState {
    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &StoreOperation) {
        match op {
            StoreOperation::Store { trigger } => {
                self.triggers.insert(trigger.id.clone(), trigger.clone());
            }
            StoreOperation::Delete { id } => {
                self.triggers.remove(id);
            }
        }
    }

    /// Active triggers ordered by id
    pub fn active_triggers(&self) -> Vec<Trigger> {
        let mut active: Vec<Trigger> = self
            .triggers
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        active
    }

    /// Operations that rebuild this state from nothing
    pub fn snapshot(&self) -> Vec<StoreOperation> {
        let mut triggers: Vec<&Trigger> = self.triggers.values().collect();
        triggers.sort_by(|a, b| a.id.cmp(&b.id));
        triggers
            .into_iter()
            .map(|trigger| StoreOperation::Store {
                trigger: trigger.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
