// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger id allocation

use crate::trigger::TriggerId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Allocates ids for newly created triggers.
///
/// Ids are never reused, including across restarts of the production
/// generator.
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next_id(&self) -> TriggerId;
}

/// Random v4 UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next_id(&self) -> TriggerId {
        TriggerId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// `{prefix}-{n}` counting up from 1; clones share the counter
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: Arc<str>,
    issued: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Arc::from(prefix.into()),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// How many ids have been handed out so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("trigger")
    }
}

impl IdGen for SequentialIdGen {
    fn next_id(&self) -> TriggerId {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        TriggerId::new(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_distinct() {
        let ids = UuidIdGen;
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn sequential_ids_share_counter_between_clones() {
        let ids = SequentialIdGen::default();
        let other = ids.clone();
        assert_eq!(ids.next_id(), TriggerId::new("trigger-1"));
        assert_eq!(other.next_id(), TriggerId::new("trigger-2"));
        assert_eq!(ids.issued(), 2);
    }
}
