// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};
use oe_core::TriggerConfig;

fn make_trigger(id: &str) -> Trigger {
    let t0 = Utc.with_ymd_and_hms(2016, 1, 20, 15, 11, 0).unwrap();
    Trigger::new(
        TriggerId::new(id),
        TriggerConfig::new("crontab", "* * * * *"),
        t0,
        t0,
    )
}

#[test]
fn apply_store_inserts_trigger() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("t-1"),
    });

    assert!(state.triggers.contains_key(&TriggerId::new("t-1")));
}

#[test]
fn apply_store_replaces_existing_record() {
    let mut state = MaterializedState::default();
    let trigger = make_trigger("t-1");
    let updated = trigger.with_pattern("0 * * * *", trigger.created_at);

    state.apply(&StoreOperation::Store { trigger });
    state.apply(&StoreOperation::Store {
        trigger: updated.clone(),
    });

    assert_eq!(state.triggers.len(), 1);
    assert_eq!(state.triggers[&TriggerId::new("t-1")], updated);
}

#[test]
fn apply_delete_removes_trigger() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("t-1"),
    });
    state.apply(&StoreOperation::Delete {
        id: TriggerId::new("t-1"),
    });

    assert!(state.triggers.is_empty());
}

#[test]
fn active_triggers_skip_invalid_ones() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("b"),
    });
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("a"),
    });
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("c").invalidated(),
    });

    let ids: Vec<String> = state
        .active_triggers()
        .into_iter()
        .map(|t| t.id.0)
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn snapshot_rebuilds_same_state() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("a"),
    });
    state.apply(&StoreOperation::Store {
        trigger: make_trigger("b").invalidated(),
    });

    let mut rebuilt = MaterializedState::default();
    for op in state.snapshot() {
        rebuilt.apply(&op);
    }

    assert_eq!(rebuilt.triggers, state.triggers);
}
