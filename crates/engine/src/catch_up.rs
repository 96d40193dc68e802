// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What to do with schedules that elapsed while the engine was down

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an overdue checkpoint re-enters the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Queue the entry at this instant; it fires on the next tick
    FireAt(DateTime<Utc>),
    /// Drop the missed occurrence and compute a fresh one from now
    Reschedule,
}

/// Policy consulted at recovery for each checkpoint at or before now
pub trait CatchUpPolicy: Send + Sync + 'static {
    fn resume(&self, checkpoint: DateTime<Utc>, now: DateTime<Utc>) -> Resume;
}

/// At most one catch-up fire, then normal cadence from now
#[derive(Debug, Clone, Copy, Default)]
pub struct FireOnce;

impl CatchUpPolicy for FireOnce {
    fn resume(&self, checkpoint: DateTime<Utc>, _now: DateTime<Utc>) -> Resume {
        Resume::FireAt(checkpoint)
    }
}

/// No catch-up fire at all
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipMissed;

impl CatchUpPolicy for SkipMissed {
    fn resume(&self, _checkpoint: DateTime<Utc>, _now: DateTime<Utc>) -> Resume {
        Resume::Reschedule
    }
}

/// Configured catch-up policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpMode {
    #[default]
    FireOnce,
    SkipMissed,
}

impl CatchUpMode {
    pub fn policy(self) -> Box<dyn CatchUpPolicy> {
        match self {
            CatchUpMode::FireOnce => Box::new(FireOnce),
            CatchUpMode::SkipMissed => Box::new(SkipMissed),
        }
    }
}
