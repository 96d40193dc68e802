// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;
use oe_adapters::{
    DispatchError, HttpOperationAdapter, LogNotifyAdapter, NoOpOperationAdapter, OperationAdapter,
    OperationContext, TracedOperationAdapter,
};
use oe_core::{OperationId, SystemClock, TimeFormatRegistry, UuidIdGen};
use oe_engine::{ManagerDeps, ManagerError, TriggerManager};
use oe_storage::{RetryingStore, StorageError, WalTriggerStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Trigger manager with the daemon's concrete adapters
pub type DaemonManager = TriggerManager<
    RetryingStore<WalTriggerStore>,
    TracedOperationAdapter<Executor>,
    LogNotifyAdapter,
    SystemClock,
    UuidIdGen,
>;

/// Transport chosen by configuration
#[derive(Clone, Debug)]
pub enum Executor {
    Http(HttpOperationAdapter),
    Disabled(NoOpOperationAdapter),
}

impl Executor {
    /// HTTP requests share the dispatch timeout so abandoned calls end with it
    pub fn from_endpoint(endpoint: Option<&str>, timeout: Duration) -> Self {
        match endpoint {
            Some(url) => Executor::Http(HttpOperationAdapter::new(url).with_timeout(timeout)),
            None => Executor::Disabled(NoOpOperationAdapter::new()),
        }
    }
}

#[async_trait]
impl OperationAdapter for Executor {
    async fn execute_operation(
        &self,
        operation: &OperationId,
        context: &OperationContext,
    ) -> Result<(), DispatchError> {
        match self {
            Executor::Http(http) => http.execute_operation(operation, context).await,
            Executor::Disabled(noop) => noop.execute_operation(operation, context).await,
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub manager: Arc<DaemonManager>,
}

impl DaemonState {
    /// Shut down gracefully
    pub fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Lock file is released when self.lock_file is dropped
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove lock file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read config at {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recovery failed: {0}")]
    Recovery(#[from] ManagerError),
}

/// Start the daemon: lock the state directory, open the store, recover
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one WAL
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Open the trigger store (replays and compacts the WAL)
    let store = WalTriggerStore::open(&config.wal_path)?;
    let store = RetryingStore::new(store, config.settings.storage.retry);

    // 4. Build the manager
    let executor = Executor::from_endpoint(
        config.settings.executor.endpoint.as_deref(),
        config.settings.dispatch.timeout,
    );
    match &executor {
        Executor::Http(http) => info!(endpoint = http.endpoint(), "dispatching over HTTP"),
        Executor::Disabled(_) => warn!("no executor endpoint configured, fires are only logged"),
    }
    let manager = TriggerManager::new(
        ManagerDeps {
            store,
            operations: TracedOperationAdapter::new(executor),
            notify: LogNotifyAdapter::new(),
        },
        TimeFormatRegistry::with_defaults(),
        SystemClock,
        UuidIdGen,
        config.settings.engine.clone(),
        config.settings.dispatch.clone(),
    );

    // 5. Put persisted triggers back on the schedule
    let summary = manager.recover().await?;
    info!(
        restored = summary.restored,
        overdue = summary.overdue,
        invalidated = summary.invalidated,
        "Recovered triggers"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        manager: Arc::new(manager),
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
