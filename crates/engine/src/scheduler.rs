// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-ordered queue of pending trigger fires

use chrono::{DateTime, Utc};
use oe_core::TriggerId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A queued fire.
///
/// Entries are never removed eagerly; one whose version no longer matches
/// the live trigger is dropped when popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEntry {
    pub trigger_id: TriggerId,
    pub fire_at: DateTime<Utc>,
    pub version: u64,
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest first, ties broken by id then version
        Reverse((&self.fire_at, &self.trigger_id, self.version)).cmp(&Reverse((
            &other.fire_at,
            &other.trigger_id,
            other.version,
        )))
    }
}

/// Priority queue of scheduled entries
#[derive(Debug, Default)]
pub struct Scheduler {
    items: BinaryHeap<ScheduledEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, entry: ScheduledEntry) {
        self.items.push(entry);
    }

    /// Pop every entry due at or before `now`, earliest first
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<ScheduledEntry> {
        let mut ready = Vec::new();

        while let Some(item) = self.items.peek() {
            if item.fire_at > now {
                break;
            }

            let Some(item) = self.items.pop() else {
                break;
            };
            ready.push(item);
        }

        ready
    }

    /// Earliest queued fire time, stale entries included
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.items.peek().map(|item| item.fire_at)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
