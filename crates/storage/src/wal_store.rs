// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger store backed by the write-ahead log

use crate::state::{MaterializedState, StoreOperation};
use crate::{StorageError, TriggerStore, Wal};
use async_trait::async_trait;
use oe_core::{Trigger, TriggerId};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records the log may hold before the ratio check below can compact it
const DEFAULT_COMPACTION_FLOOR: u64 = 1024;

struct Inner {
    path: PathBuf,
    wal: Wal,
    state: MaterializedState,
    compaction_floor: u64,
}

impl Inner {
    fn record(&mut self, op: &StoreOperation) -> Result<(), StorageError> {
        self.wal.append(op)?;
        self.state.apply(op);

        let live = self.state.triggers.len() as u64;
        if self.wal.sequence() > self.compaction_floor && self.wal.sequence() > live * 2 {
            // The record above is already durable; a failed compaction only delays the next one
            if let Err(e) = self.compact() {
                tracing::warn!(path = %self.path.display(), error = %e, "log compaction failed");
            }
        }
        Ok(())
    }

    fn compact(&mut self) -> Result<(), StorageError> {
        let before = self.wal.sequence();
        let snapshot = self.state.snapshot();
        Wal::rewrite(&self.path, &snapshot)?;
        self.wal = Wal::open(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            before,
            after = snapshot.len(),
            "trigger log compacted"
        );
        Ok(())
    }
}

/// Trigger store that appends every change to a WAL and keeps the
/// materialized table in memory.
///
/// Opening replays the log and compacts it to one record per trigger. While
/// running, the log is compacted again once it holds more than twice as many
/// records as there are triggers. Writes run on the blocking pool.
pub struct WalTriggerStore {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

impl WalTriggerStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut state = MaterializedState::default();
        let ops = Wal::replay(path)?;
        let replayed = ops.len();
        for op in &ops {
            state.apply(op);
        }

        let snapshot = state.snapshot();
        if snapshot.len() < replayed {
            Wal::rewrite(path, &snapshot)?;
        }
        let wal = Wal::open(path)?;

        tracing::info!(
            path = %path.display(),
            replayed,
            triggers = state.triggers.len(),
            "trigger store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(Mutex::new(Inner {
                path: path.to_path_buf(),
                wal,
                state,
                compaction_floor: DEFAULT_COMPACTION_FLOOR,
            })),
        })
    }

    /// Smallest log length at which a running store compacts
    pub fn with_compaction_floor(self, floor: u64) -> Self {
        self.lock().compaction_floor = floor;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored trigger, active or not, ordered by id
    pub fn triggers(&self) -> Vec<Trigger> {
        let inner = self.lock();
        let mut triggers: Vec<Trigger> = inner.state.triggers.values().cloned().collect();
        triggers.sort_by(|a, b| a.id.cmp(&b.id));
        triggers
    }

    /// Records currently in the log file
    pub fn log_len(&self) -> u64 {
        self.lock().wal.sequence()
    }

    async fn persist(&self, op: StoreOperation) -> Result<(), StorageError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.record(&op)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("log write task failed: {}", e)))?
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TriggerStore for WalTriggerStore {
    async fn store_trigger(&self, trigger: &Trigger) -> Result<(), StorageError> {
        self.persist(StoreOperation::Store {
            trigger: trigger.clone(),
        })
        .await
    }

    async fn load_active_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        Ok(self.lock().state.active_triggers())
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<(), StorageError> {
        self.persist(StoreOperation::Delete { id: id.clone() })
            .await
    }
}

#[cfg(test)]
#[path = "wal_store_tests.rs"]
mod tests;
