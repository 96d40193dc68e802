// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML settings resolved into concrete paths

use crate::lifecycle::LifecycleError;
use oe_core::RetryPolicy;
use oe_engine::{DispatchConfig, EngineConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the state directory
pub const CONFIG_FILE: &str = "config.toml";

/// Settings as written in the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub state_dir: Option<PathBuf>,
    pub engine: EngineConfig,
    pub dispatch: DispatchConfig,
    pub storage: StorageSettings,
    pub executor: ExecutorSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backoff for transient store failures
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Worker pool base URL; fires are only logged when unset
    pub endpoint: Option<String>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the trigger WAL
    pub wal_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Load from `path`, or from `<state dir>/config.toml` when it exists
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let default_dir = default_state_dir()?;
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let candidate = default_dir.join(CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
        };

        let settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| LifecycleError::ConfigRead(path.clone(), e))?;
                toml::from_str(&text)?
            }
            None => Settings::default(),
        };
        Ok(Self::from_settings(settings, &default_dir))
    }

    /// Resolve paths, preferring the configured state directory
    pub fn from_settings(settings: Settings, default_dir: &Path) -> Self {
        let state_dir = settings
            .state_dir
            .clone()
            .unwrap_or_else(|| default_dir.to_path_buf());
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("triggers.wal"),
            state_dir,
            settings,
        }
    }
}

/// `$XDG_STATE_HOME/oe`, falling back to `~/.local/state/oe`
fn default_state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("oe"));
    }

    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/oe"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
