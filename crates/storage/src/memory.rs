// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory trigger store

use crate::{StorageError, TriggerStore};
use async_trait::async_trait;
use oe_core::{Trigger, TriggerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    triggers: HashMap<TriggerId, Trigger>,
    /// Remaining calls that fail with `Unavailable`
    failures: u32,
    writes: u64,
}

/// Trigger store that lives only as long as the process.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct MemoryTriggerStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record for `id`, whatever its state
    pub fn get(&self, id: &TriggerId) -> Option<Trigger> {
        self.lock().triggers.get(id).cloned()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.lock().triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().triggers.is_empty()
    }

    /// Successful store and delete calls so far
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    /// Make the next `count` calls fail with `StorageError::Unavailable`
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_next(&self, count: u32) {
        self.lock().failures = count;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(inner: &mut Inner) -> Result<(), StorageError> {
        if inner.failures > 0 {
            inner.failures -= 1;
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TriggerStore for MemoryTriggerStore {
    async fn store_trigger(&self, trigger: &Trigger) -> Result<(), StorageError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        inner.triggers.insert(trigger.id.clone(), trigger.clone());
        inner.writes += 1;
        Ok(())
    }

    async fn load_active_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        let mut active: Vec<Trigger> = inner
            .triggers
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<(), StorageError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        inner.triggers.remove(id);
        inner.writes += 1;
        Ok(())
    }
}
