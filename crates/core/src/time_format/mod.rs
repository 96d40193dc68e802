// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable schedule dialects
//!
//! A [`TimeFormat`] parses, validates and evaluates the patterns of one
//! schedule grammar. Implementations hold no per-trigger state; the
//! [`TimeFormatRegistry`] maps dialect names to them so new grammars can be
//! added without touching the trigger manager.

mod crontab;



pub use crontab::Crontab;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while validating or evaluating a pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeFormatError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("no occurrence of '{pattern}' found within the search horizon after {from}")]
    HorizonExceeded {
        pattern: String,
        from: DateTime<Utc>,
    },
    #[error("unknown time format: {0}")]
    UnknownFormat(String),
}

impl TimeFormatError {
    /// Error for an empty or absent pattern
    pub fn missing_pattern() -> Self {
        Self::InvalidInput("the trigger pattern is None".to_string())
    }

    /// Error for a pattern that does not parse
    pub fn invalid_pattern(pattern: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidInput(format!(
            "the trigger pattern '{}' is invalid: {}",
            pattern, reason
        ))
    }
}

/// A schedule dialect: validator and next-occurrence calculator
pub trait TimeFormat: Send + Sync {
    /// Check that `pattern` parses and can produce at least one occurrence
    fn validate(&self, pattern: &str) -> Result<(), TimeFormatError>;

    /// Earliest instant strictly after `from` that satisfies `pattern`
    fn compute_next(
        &self,
        pattern: &str,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TimeFormatError>;

    /// Shortest gap in seconds between two consecutive occurrences of
    /// `pattern`.
    ///
    /// Must not depend on the current time, so repeated calls agree.
    fn get_interval(&self, pattern: &str) -> Result<u64, TimeFormatError>;
}

/// Constructor registered for a dialect name
pub type TimeFormatFactory = fn() -> Box<dyn TimeFormat>;

/// Name-keyed set of available dialects
#[derive(Clone)]
pub struct TimeFormatRegistry {
    formats: HashMap<String, Arc<dyn TimeFormat>>,
}

impl TimeFormatRegistry {
    /// Registry with no dialects
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Registry with every built-in dialect
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Crontab::NAME, Crontab::boxed);
        registry
    }

    /// Register (or replace) the dialect known as `name`
    pub fn register(&mut self, name: impl Into<String>, factory: TimeFormatFactory) {
        self.formats.insert(name.into(), Arc::from(factory()));
    }

    /// Look up a dialect by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn TimeFormat>, TimeFormatError> {
        self.formats
            .get(name)
            .cloned()
            .ok_or_else(|| TimeFormatError::UnknownFormat(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered dialect names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TimeFormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TimeFormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeFormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}
