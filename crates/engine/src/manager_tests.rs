// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::catch_up::CatchUpMode;
use chrono::{Duration as ChronoDuration, TimeZone};
use oe_adapters::{FakeNotifyAdapter, FakeOperationAdapter};
use oe_core::{FakeClock, RetryPolicy, SequentialIdGen, TriggerState};
use oe_storage::MemoryTriggerStore;

type TestManager = TriggerManager<
    MemoryTriggerStore,
    FakeOperationAdapter,
    FakeNotifyAdapter,
    FakeClock,
    SequentialIdGen,
>;

struct Harness {
    manager: TestManager,
    store: MemoryTriggerStore,
    operations: FakeOperationAdapter,
    notify: FakeNotifyAdapter,
    clock: FakeClock,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 20, 15, 11, 0).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 20, hour, minute, 0).unwrap()
}

/// Dialect with a single occurrence at 15:30 on 2016-01-20
struct OnceAt;

impl TimeFormat for OnceAt {
    fn validate(&self, pattern: &str) -> Result<(), TimeFormatError> {
        if pattern.is_empty() {
            return Err(TimeFormatError::missing_pattern());
        }
        Ok(())
    }

    fn compute_next(
        &self,
        pattern: &str,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TimeFormatError> {
        if from < at(15, 30) {
            Ok(at(15, 30))
        } else {
            Err(TimeFormatError::HorizonExceeded {
                pattern: pattern.to_string(),
                from,
            })
        }
    }

    fn get_interval(&self, _pattern: &str) -> Result<u64, TimeFormatError> {
        Ok(86_400)
    }
}

fn once_at() -> Box<dyn TimeFormat> {
    Box::new(OnceAt)
}

fn setup_with(store: MemoryTriggerStore, config: EngineConfig) -> Harness {
    let operations = FakeOperationAdapter::new();
    let notify = FakeNotifyAdapter::new();
    let clock = FakeClock::at(t0());

    let mut formats = TimeFormatRegistry::with_defaults();
    formats.register("once", once_at);

    let manager = TriggerManager::new(
        ManagerDeps {
            store: store.clone(),
            operations: operations.clone(),
            notify: notify.clone(),
        },
        formats,
        clock.clone(),
        SequentialIdGen::new("trigger"),
        config,
        DispatchConfig::new().with_retry(RetryPolicy::immediate(2)),
    );

    Harness {
        manager,
        store,
        operations,
        notify,
        clock,
    }
}

fn setup() -> Harness {
    setup_with(MemoryTriggerStore::new(), EngineConfig::default())
}

fn cron(pattern: &str) -> TriggerConfig {
    TriggerConfig::new("crontab", pattern).with_operations(vec![OperationId::new("backup")])
}

fn fired_ids(fired: &[FiredTrigger]) -> Vec<&str> {
    fired.iter().map(|f| f.trigger_id.as_str()).collect()
}

// -- create ------------------------------------------------------------------

#[tokio::test]
async fn create_schedules_first_fire_from_now() {
    let h = setup();

    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    assert_eq!(id, TriggerId::new("trigger-1"));
    let trigger = h.manager.get_trigger(&id).unwrap();
    assert_eq!(trigger.version, 0);
    assert_eq!(trigger.created_at, t0());
    assert_eq!(trigger.next_fire_at, Some(at(15, 12)));
    assert_eq!(h.store.get(&id), Some(trigger));
    assert_eq!(h.manager.next_deadline(), Some(at(15, 12)));
}

#[tokio::test]
async fn create_rejects_empty_pattern() {
    let h = setup();

    let err = h.manager.create_trigger(cron("")).await.unwrap_err();

    match err {
        ManagerError::InvalidInput(msg) => assert_eq!(msg, "the trigger pattern is None"),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
    assert!(h.store.is_empty());
    assert!(h.manager.list_triggers().is_empty());
}

#[tokio::test]
async fn create_rejects_malformed_pattern() {
    let h = setup();

    let err = h.manager.create_trigger(cron("*")).await.unwrap_err();

    match err {
        ManagerError::InvalidInput(msg) => {
            assert!(msg.starts_with("the trigger pattern '*' is invalid"), "{}", msg)
        }
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[tokio::test]
async fn create_rejects_impossible_pattern() {
    let h = setup();
    let err = h.manager.create_trigger(cron("0 0 30 2 *")).await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidInput(_)));
}

#[tokio::test]
async fn create_rejects_unknown_dialect() {
    let h = setup();

    let err = h
        .manager
        .create_trigger(TriggerConfig::new("rrule", "FREQ=DAILY"))
        .await
        .unwrap_err();

    match err {
        ManagerError::InvalidInput(msg) => assert!(msg.contains("rrule"), "{}", msg),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[tokio::test]
async fn create_enforces_min_interval() {
    let config = EngineConfig::new().with_min_interval(std::time::Duration::from_secs(300));
    let h = setup_with(MemoryTriggerStore::new(), config);

    let err = h.manager.create_trigger(cron("* * * * *")).await.unwrap_err();
    match err {
        ManagerError::InvalidInput(msg) => assert!(msg.contains("minimum of 300s"), "{}", msg),
        other => panic!("expected InvalidInput, got {:?}", other),
    }

    assert!(h.manager.create_trigger(cron("*/5 * * * *")).await.is_ok());
}

#[tokio::test]
async fn min_interval_applies_to_clustered_occurrences() {
    let config = EngineConfig::new().with_min_interval(std::time::Duration::from_secs(3600));
    let h = setup_with(MemoryTriggerStore::new(), config);

    // Once a day, but the two daily fires are a minute apart
    let err = h.manager.create_trigger(cron("0,1 0 * * *")).await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidInput(_)), "{:?}", err);

    let id = h.manager.create_trigger(cron("0 0 * * *")).await.unwrap();
    let err = h.manager.update_trigger(&id, "0,1 0 * * *").await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidInput(_)), "{:?}", err);
    assert_eq!(h.manager.get_trigger(&id).unwrap().pattern, "0 0 * * *");
}

#[tokio::test]
async fn create_surfaces_storage_failure() {
    let h = setup();
    h.store.fail_next(1);

    let err = h.manager.create_trigger(cron("* * * * *")).await.unwrap_err();

    assert!(matches!(err, ManagerError::Storage(_)));
    assert!(h.manager.list_triggers().is_empty());
    assert_eq!(h.manager.next_deadline(), None);
}

// -- firing ------------------------------------------------------------------

#[tokio::test]
async fn triggers_fire_in_deadline_order() {
    let h = setup();
    let late = h.manager.create_trigger(cron("30 15 * * *")).await.unwrap();
    let early = h.manager.create_trigger(cron("20 15 * * *")).await.unwrap();

    h.clock.set(at(15, 31));
    let fired = h.manager.tick().await;

    assert_eq!(fired_ids(&fired), vec![early.as_str(), late.as_str()]);
    assert_eq!(fired[0].fire_at, at(15, 20));
    assert_eq!(fired[1].fire_at, at(15, 30));
}

#[tokio::test]
async fn nothing_fires_before_deadline() {
    let h = setup();
    h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.clock.set(at(15, 11) + ChronoDuration::seconds(59));
    assert!(h.manager.tick().await.is_empty());
    assert!(h.operations.calls().is_empty());
}

#[tokio::test]
async fn fire_checkpoints_next_occurrence_from_fire_instant() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.clock.set(at(15, 12) + ChronoDuration::seconds(30));
    let fired = h.manager.tick().await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].fire_at, at(15, 12));

    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(15, 13)));
    assert_eq!(h.manager.next_deadline(), Some(at(15, 13)));

    // Same instant again: nothing new is due
    assert!(h.manager.tick().await.is_empty());
}

#[tokio::test]
async fn lagging_loop_fires_once_and_resumes_from_now() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.clock.set(at(15, 20) + ChronoDuration::seconds(30));
    let fired = h.manager.tick().await;

    assert_eq!(fired.len(), 1);
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(15, 21)));
    assert!(h.manager.tick().await.is_empty());
}

#[tokio::test]
async fn fire_dispatches_bound_operations() {
    let h = setup();
    let config = cron("* * * * *").with_project("project-a").with_operations(vec![
        OperationId::new("backup"),
        OperationId::new("verify"),
    ]);
    let id = h.manager.create_trigger(config).await.unwrap();

    h.clock.set(at(15, 12));
    let mut fired = h.manager.tick().await;
    let report = fired.remove(0).dispatch.await.unwrap();

    assert_eq!(report.trigger_id, id);
    assert_eq!(
        report.accepted,
        vec![OperationId::new("backup"), OperationId::new("verify")]
    );
    let calls = h.operations.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].context.routing_key, "project-a");
    assert_eq!(calls[0].context.fire_at, at(15, 12));
}

#[tokio::test]
async fn failing_dispatch_does_not_stop_schedule() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    h.operations.fail_operation("backup", u32::MAX);

    h.clock.set(at(15, 12));
    let mut fired = h.manager.tick().await;
    let report = fired.remove(0).dispatch.await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(h.notify.messages(crate::dispatcher::DISPATCH_CHANNEL).len(), 1);
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(15, 13)));
}

// -- update ------------------------------------------------------------------

#[tokio::test]
async fn update_before_fire_discards_stale_schedule() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.manager.update_trigger(&id, "30 15 * * *").await.unwrap();

    let trigger = h.manager.get_trigger(&id).unwrap();
    assert_eq!(trigger.version, 1);
    assert_eq!(trigger.pattern, "30 15 * * *");
    assert_eq!(trigger.next_fire_at, Some(at(15, 30)));
    assert_eq!(h.store.get(&id).unwrap().version, 1);

    h.clock.set(at(15, 13));
    assert!(h.manager.tick().await.is_empty());
    assert!(h.operations.calls().is_empty());

    h.clock.set(at(15, 30));
    let fired = h.manager.tick().await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].fire_at, at(15, 30));
}

#[tokio::test]
async fn update_reschedules_from_now_not_old_schedule() {
    let h = setup();
    let id = h.manager.create_trigger(cron("0 * * * *")).await.unwrap();
    assert_eq!(h.manager.get_trigger(&id).unwrap().next_fire_at, Some(at(16, 0)));

    h.clock.set(at(15, 40));
    h.manager.update_trigger(&id, "45 * * * *").await.unwrap();

    assert_eq!(h.manager.get_trigger(&id).unwrap().next_fire_at, Some(at(15, 45)));
}

#[tokio::test]
async fn invalid_update_keeps_prior_pattern_and_schedule() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    let before = h.manager.get_trigger(&id).unwrap();

    let err = h.manager.update_trigger(&id, "61 * * * *").await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidInput(_)));

    assert_eq!(h.manager.get_trigger(&id).unwrap(), before);
    assert_eq!(h.store.get(&id).unwrap(), before);

    h.clock.set(at(15, 12));
    assert_eq!(h.manager.tick().await.len(), 1);
}

#[tokio::test]
async fn failed_update_write_keeps_prior_schedule() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    h.store.fail_next(1);

    let err = h.manager.update_trigger(&id, "30 15 * * *").await.unwrap_err();
    assert!(matches!(err, ManagerError::Storage(_)));
    assert_eq!(h.manager.get_trigger(&id).unwrap().version, 0);

    h.clock.set(at(15, 12));
    assert_eq!(h.manager.tick().await.len(), 1);
}

#[tokio::test]
async fn update_unknown_trigger_is_not_found() {
    let h = setup();
    let err = h
        .manager
        .update_trigger(&TriggerId::new("missing"), "* * * * *")
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(id) if id.as_str() == "missing"));
}

// -- delete ------------------------------------------------------------------

#[tokio::test]
async fn deleted_trigger_never_fires() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.manager.delete_trigger(&id).await.unwrap();

    assert!(h.store.get(&id).is_none());
    assert!(h.manager.get_trigger(&id).is_none());
    // The queue entry lingers until popped
    assert_eq!(h.manager.next_deadline(), Some(at(15, 12)));

    h.clock.set(at(15, 30));
    assert!(h.manager.tick().await.is_empty());
    assert!(h.operations.calls().is_empty());
    assert_eq!(h.manager.next_deadline(), None);
}

#[tokio::test]
async fn delete_unknown_trigger_is_not_found() {
    let h = setup();
    let err = h
        .manager
        .delete_trigger(&TriggerId::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
}

#[tokio::test]
async fn failed_delete_keeps_trigger() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    h.store.fail_next(1);

    assert!(matches!(
        h.manager.delete_trigger(&id).await,
        Err(ManagerError::Storage(_))
    ));
    assert!(h.manager.get_trigger(&id).is_some());
}

#[tokio::test]
async fn delete_wins_over_entry_popped_concurrently() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    h.clock.set(at(15, 12));

    let manager = Arc::new(h.manager);
    let lock = manager.trigger_lock(&id);
    let held = lock.lock().await;

    // Delete queues first on the trigger lock
    let deleting = {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        tokio::spawn(async move { manager.delete_trigger(&id).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    // The loop pops the entry, then waits behind the delete
    let ticking = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.tick().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(manager.next_deadline(), None, "entry should already be popped");

    drop(held);
    deleting.await.unwrap().unwrap();
    let fired = ticking.await.unwrap();

    assert!(fired.is_empty());
    assert!(h.operations.calls().is_empty());
    assert!(h.store.get(&id).is_none());
}

// -- bindings and lookup ------------------------------------------------------

#[tokio::test]
async fn operation_bindings_are_persisted_without_version_bump() {
    let h = setup();
    let id = h
        .manager
        .create_trigger(TriggerConfig::new("crontab", "* * * * *"))
        .await
        .unwrap();

    assert!(h
        .manager
        .register_operation(&id, OperationId::new("backup"))
        .await
        .unwrap());
    assert!(!h
        .manager
        .register_operation(&id, OperationId::new("backup"))
        .await
        .unwrap());
    assert!(h
        .manager
        .register_operation(&id, OperationId::new("verify"))
        .await
        .unwrap());

    let stored = h.store.get(&id).unwrap();
    assert_eq!(
        stored.operations,
        vec![OperationId::new("backup"), OperationId::new("verify")]
    );
    assert_eq!(stored.version, 0);

    assert!(h
        .manager
        .unregister_operation(&id, &OperationId::new("backup"))
        .await
        .unwrap());
    assert!(!h
        .manager
        .unregister_operation(&id, &OperationId::new("backup"))
        .await
        .unwrap());

    h.clock.set(at(15, 12));
    let mut fired = h.manager.tick().await;
    let report = fired.remove(0).dispatch.await.unwrap();
    assert_eq!(report.accepted, vec![OperationId::new("verify")]);
}

#[tokio::test]
async fn binding_unknown_trigger_is_not_found() {
    let h = setup();
    let err = h
        .manager
        .register_operation(&TriggerId::new("missing"), OperationId::new("backup"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
}

#[tokio::test]
async fn list_triggers_is_ordered_by_id() {
    let h = setup();
    for _ in 0..3 {
        h.manager.create_trigger(cron("0 * * * *")).await.unwrap();
    }

    let ids: Vec<String> = h
        .manager
        .list_triggers()
        .into_iter()
        .map(|t| t.id.0)
        .collect();
    assert_eq!(ids, vec!["trigger-1", "trigger-2", "trigger-3"]);
}

// -- horizon -------------------------------------------------------------------

#[tokio::test]
async fn exhausted_schedule_marks_trigger_invalid_and_alerts() {
    let h = setup();
    let id = h
        .manager
        .create_trigger(TriggerConfig::new("once", "launch"))
        .await
        .unwrap();

    h.clock.set(at(15, 31));
    let fired = h.manager.tick().await;
    assert_eq!(fired.len(), 1);

    let stored = h.store.get(&id).unwrap();
    assert_eq!(stored.state, TriggerState::Invalid);
    assert_eq!(stored.next_fire_at, None);
    assert_eq!(h.manager.get_trigger(&id).unwrap().state, TriggerState::Invalid);
    assert!(h.store.load_active_triggers().await.unwrap().is_empty());
    assert_eq!(h.manager.next_deadline(), None);

    let alerts = h.notify.messages(TRIGGER_CHANNEL);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains(id.as_str()), "alert: {}", alerts[0]);

    // Other triggers keep running
    h.manager.create_trigger(cron("* * * * *")).await.unwrap();
    h.clock.set(at(15, 32));
    assert_eq!(h.manager.tick().await.len(), 1);
}

#[tokio::test]
async fn update_of_exhausted_schedule_reports_horizon() {
    let h = setup();
    let id = h
        .manager
        .create_trigger(TriggerConfig::new("once", "launch"))
        .await
        .unwrap();
    h.clock.set(at(15, 31));
    h.manager.tick().await;

    h.clock.set(at(15, 0) + ChronoDuration::days(1));
    let err = h.manager.update_trigger(&id, "again").await.unwrap_err();
    assert!(matches!(err, ManagerError::HorizonExceeded(_)));
    assert_eq!(h.manager.get_trigger(&id).unwrap().state, TriggerState::Invalid);
}

// -- deferred checkpoints ---------------------------------------------------------

#[tokio::test]
async fn failed_checkpoint_is_deferred_and_flushed() {
    let config = EngineConfig::new().with_checkpoint_retry(std::time::Duration::from_secs(5));
    let h = setup_with(MemoryTriggerStore::new(), config);
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.clock.set(at(15, 12));
    h.store.fail_next(1);
    let fired = h.manager.tick().await;

    // The fire still happened and the in-memory schedule moved on
    assert_eq!(fired.len(), 1);
    assert_eq!(h.manager.pending_checkpoints(), 1);
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(15, 12)));
    assert_eq!(h.manager.next_deadline(), Some(at(15, 13)));
    assert!(h.manager.next_wait() <= std::time::Duration::from_secs(5));

    h.manager.flush_pending().await;

    assert_eq!(h.manager.pending_checkpoints(), 0);
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(15, 13)));
}

#[tokio::test]
async fn deferred_checkpoint_is_dropped_when_trigger_is_deleted() {
    let h = setup();
    let id = h.manager.create_trigger(cron("* * * * *")).await.unwrap();

    h.clock.set(at(15, 12));
    h.store.fail_next(1);
    h.manager.tick().await;
    assert_eq!(h.manager.pending_checkpoints(), 1);

    h.manager.delete_trigger(&id).await.unwrap();
    h.manager.flush_pending().await;

    assert_eq!(h.manager.pending_checkpoints(), 0);
    assert!(h.store.get(&id).is_none());
}

// -- recovery ------------------------------------------------------------------

fn persisted(id: &str, pattern: &str, next_fire_at: DateTime<Utc>) -> Trigger {
    Trigger::new(
        TriggerId::new(id),
        cron(pattern),
        next_fire_at - ChronoDuration::minutes(1),
        next_fire_at,
    )
}

#[tokio::test]
async fn overdue_checkpoint_fires_exactly_once_after_restart() {
    let store = MemoryTriggerStore::new();
    store
        .store_trigger(&persisted("nightly", "* * * * *", at(15, 12)))
        .await
        .unwrap();

    let h = setup_with(store, EngineConfig::default());
    h.clock.set(at(18, 0));

    let summary = h.manager.recover().await.unwrap();
    assert_eq!(
        summary,
        RecoverySummary {
            restored: 1,
            overdue: 1,
            invalidated: 0
        }
    );

    let fired = h.manager.tick().await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].fire_at, at(15, 12));

    let id = TriggerId::new("nightly");
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(18, 1)));
    assert!(h.manager.tick().await.is_empty());

    h.clock.set(at(18, 1));
    assert_eq!(h.manager.tick().await.len(), 1);
}

#[tokio::test]
async fn skip_missed_policy_reschedules_without_firing() {
    let store = MemoryTriggerStore::new();
    store
        .store_trigger(&persisted("nightly", "* * * * *", at(15, 12)))
        .await
        .unwrap();

    let config = EngineConfig::new().with_catch_up(CatchUpMode::SkipMissed);
    let h = setup_with(store, config);
    h.clock.set(at(18, 0));

    let summary = h.manager.recover().await.unwrap();
    assert_eq!(summary.overdue, 1);

    assert!(h.manager.tick().await.is_empty());
    let id = TriggerId::new("nightly");
    assert_eq!(h.store.get(&id).unwrap().next_fire_at, Some(at(18, 1)));
}

#[tokio::test]
async fn future_checkpoint_is_kept_on_restart() {
    let store = MemoryTriggerStore::new();
    store
        .store_trigger(&persisted("hourly", "0 * * * *", at(16, 0)))
        .await
        .unwrap();

    let h = setup_with(store, EngineConfig::default());
    let summary = h.manager.recover().await.unwrap();

    assert_eq!(summary.overdue, 0);
    assert_eq!(h.manager.next_deadline(), Some(at(16, 0)));
    assert!(h.manager.tick().await.is_empty());
}

#[tokio::test]
async fn invalid_triggers_are_not_recovered() {
    let store = MemoryTriggerStore::new();
    store
        .store_trigger(&persisted("dead", "* * * * *", at(15, 12)).invalidated())
        .await
        .unwrap();

    let h = setup_with(store, EngineConfig::default());
    let summary = h.manager.recover().await.unwrap();

    assert_eq!(summary.restored, 0);
    assert!(h.manager.list_triggers().is_empty());
}

#[tokio::test]
async fn unknown_dialect_is_invalidated_on_recovery() {
    let store = MemoryTriggerStore::new();
    let mut trigger = persisted("legacy", "* * * * *", at(15, 12));
    trigger.dialect = "retired".to_string();
    store.store_trigger(&trigger).await.unwrap();

    let h = setup_with(store, EngineConfig::default());
    let summary = h.manager.recover().await.unwrap();

    assert_eq!(summary.invalidated, 1);
    assert_eq!(
        h.store.get(&TriggerId::new("legacy")).unwrap().state,
        TriggerState::Invalid
    );
    assert_eq!(h.notify.messages(TRIGGER_CHANNEL).len(), 1);
}

#[tokio::test]
async fn recovery_surfaces_storage_failure() {
    let h = setup();
    h.store.fail_next(1);
    assert!(matches!(
        h.manager.recover().await,
        Err(ManagerError::Storage(_))
    ));
}

// -- control loop ----------------------------------------------------------------

#[tokio::test]
async fn run_wakes_early_and_stops_on_shutdown() {
    let config = EngineConfig::new().with_idle_wait(std::time::Duration::from_secs(3600));
    let h = setup_with(MemoryTriggerStore::new(), config);
    let operations = h.operations.clone();
    let clock = h.clock.clone();
    let manager = Arc::new(h.manager);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .run(async {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    manager.create_trigger(cron("* * * * *")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(operations.calls().is_empty());

    // The loop is sleeping toward a deadline a minute away; a wake cuts it short
    clock.set(at(15, 12));
    manager.wake();

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while operations.calls().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    stop_tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn next_wait_is_bounded_by_idle_wait() {
    let config = EngineConfig::new().with_idle_wait(std::time::Duration::from_secs(30));
    let h = setup_with(MemoryTriggerStore::new(), config);

    assert_eq!(h.manager.next_wait(), std::time::Duration::from_secs(30));

    h.manager.create_trigger(cron("0 * * * *")).await.unwrap();
    assert_eq!(h.manager.next_wait(), std::time::Duration::from_secs(30));

    h.clock.set(at(15, 59) + ChronoDuration::seconds(50));
    assert_eq!(h.manager.next_wait(), std::time::Duration::from_secs(10));

    h.clock.set(at(16, 5));
    assert_eq!(h.manager.next_wait(), std::time::Duration::ZERO);
}
