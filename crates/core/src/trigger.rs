// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers: persisted schedules bound to protection operations
//!
//! A Trigger pairs a dialect and pattern with the operations it starts.
//! Every pattern change bumps `version`, which is how stale in-memory
//! schedule entries are recognised and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing key used when a trigger has no project scope
pub const DEFAULT_ROUTING_KEY: &str = "default";

/// Unique identifier for a trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub String);

impl TriggerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TriggerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TriggerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an operation owned by the execution layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a stored trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// Scheduled and firing
    Active,
    /// No future occurrence could be found; kept for operators, never fired
    Invalid,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Active => write!(f, "active"),
            TriggerState::Invalid => write!(f, "invalid"),
        }
    }
}

impl std::str::FromStr for TriggerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TriggerState::Active),
            "invalid" => Ok(TriggerState::Invalid),
            _ => Err(format!("unknown trigger state: {}", s)),
        }
    }
}

/// Configuration for creating a trigger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub dialect: String,
    pub pattern: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub operations: Vec<OperationId>,
}

impl TriggerConfig {
    pub fn new(dialect: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            pattern: pattern.into(),
            project_id: None,
            operations: vec![],
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_operations(mut self, operations: Vec<OperationId>) -> Self {
        self.operations = operations;
        self
    }
}

/// A persisted schedule that produces fire events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub dialect: String,
    pub pattern: String,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every pattern update
    pub version: u64,
    /// Durable checkpoint of the next fire time; `None` once invalid
    pub next_fire_at: Option<DateTime<Utc>>,
    pub state: TriggerState,
    /// Ordered, duplicate-free operation bindings
    pub operations: Vec<OperationId>,
}

impl Trigger {
    /// Create an active trigger at version 0
    pub fn new(
        id: TriggerId,
        config: TriggerConfig,
        created_at: DateTime<Utc>,
        next_fire_at: DateTime<Utc>,
    ) -> Self {
        let mut trigger = Self {
            id,
            dialect: config.dialect,
            pattern: config.pattern,
            project_id: config.project_id,
            created_at,
            version: 0,
            next_fire_at: Some(next_fire_at),
            state: TriggerState::Active,
            operations: Vec::with_capacity(config.operations.len()),
        };
        for operation in config.operations {
            trigger.bind_operation(operation);
        }
        trigger
    }

    /// Key used to route execution requests to a worker pool
    pub fn routing_key(&self) -> &str {
        self.project_id.as_deref().unwrap_or(DEFAULT_ROUTING_KEY)
    }

    pub fn is_active(&self) -> bool {
        self.state == TriggerState::Active
    }

    /// Copy with a new pattern, the next version, and a fresh schedule
    pub fn with_pattern(&self, pattern: impl Into<String>, next_fire_at: DateTime<Utc>) -> Self {
        Self {
            pattern: pattern.into(),
            version: self.version + 1,
            next_fire_at: Some(next_fire_at),
            state: TriggerState::Active,
            ..self.clone()
        }
    }

    /// Copy with an advanced checkpoint, same version
    pub fn with_checkpoint(&self, next_fire_at: DateTime<Utc>) -> Self {
        Self {
            next_fire_at: Some(next_fire_at),
            ..self.clone()
        }
    }

    /// Copy marked invalid and unscheduled
    pub fn invalidated(&self) -> Self {
        Self {
            next_fire_at: None,
            state: TriggerState::Invalid,
            ..self.clone()
        }
    }

    /// Bind an operation; returns false if it was already bound
    pub fn bind_operation(&mut self, operation: OperationId) -> bool {
        if self.operations.contains(&operation) {
            return false;
        }
        self.operations.push(operation);
        true
    }

    /// Unbind an operation; returns false if it was not bound
    pub fn unbind_operation(&mut self, operation: &OperationId) -> bool {
        let before = self.operations.len();
        self.operations.retain(|op| op != operation);
        self.operations.len() != before
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
