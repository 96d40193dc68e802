// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger manager: registration API, recovery and the control loop
//!
//! Lock order is per-trigger async lock, then the schedule mutex. The
//! schedule mutex is never held across an await, so persistence calls for
//! one trigger never stall the queue or mutations of other triggers.

use crate::catch_up::{CatchUpPolicy, Resume};
use crate::config::{DispatchConfig, EngineConfig};
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::ManagerError;
use crate::scheduler::{ScheduledEntry, Scheduler};
use chrono::{DateTime, Utc};
use oe_adapters::{NotifyAdapter, OperationAdapter};
use oe_core::{
    Clock, IdGen, OperationId, TimeFormat, TimeFormatError, TimeFormatRegistry, Trigger,
    TriggerConfig, TriggerId,
};
use oe_storage::TriggerStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Alert channel for triggers that can no longer be scheduled
pub const TRIGGER_CHANNEL: &str = "triggers";

/// Adapter dependencies of the manager
pub struct ManagerDeps<S, O, N> {
    pub store: S,
    pub operations: O,
    pub notify: N,
}

/// A trigger handed to the dispatcher by [`TriggerManager::tick`]
#[derive(Debug)]
pub struct FiredTrigger {
    pub trigger_id: TriggerId,
    pub fire_at: DateTime<Utc>,
    /// Resolves once every bound operation was accepted or abandoned
    pub dispatch: JoinHandle<DispatchReport>,
}

/// Outcome of startup recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Active triggers put back on the schedule
    pub restored: usize,
    /// Restored triggers whose checkpoint had already passed
    pub overdue: usize,
    /// Triggers marked invalid during recovery
    pub invalidated: usize,
}

#[derive(Default)]
struct Schedule {
    triggers: HashMap<TriggerId, Trigger>,
    scheduler: Scheduler,
}

/// Owns the live schedule and drives fires for every trigger
pub struct TriggerManager<S, O, N, C: Clock, I: IdGen> {
    store: S,
    dispatcher: Dispatcher<O, N>,
    notify: N,
    clock: C,
    id_gen: I,
    formats: TimeFormatRegistry,
    config: EngineConfig,
    catch_up: Box<dyn CatchUpPolicy>,
    schedule: Mutex<Schedule>,
    /// Serializes mutation and fire handling of the same trigger
    locks: Mutex<HashMap<TriggerId, Arc<tokio::sync::Mutex<()>>>>,
    /// Checkpoint writes that failed during fire handling
    pending: Mutex<HashMap<TriggerId, Trigger>>,
    wake: Notify,
}

impl<S, O, N, C, I> TriggerManager<S, O, N, C, I>
where
    S: TriggerStore,
    O: OperationAdapter,
    N: NotifyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(
        deps: ManagerDeps<S, O, N>,
        formats: TimeFormatRegistry,
        clock: C,
        id_gen: I,
        config: EngineConfig,
        dispatch: DispatchConfig,
    ) -> Self {
        Self {
            store: deps.store,
            dispatcher: Dispatcher::new(deps.operations, deps.notify.clone(), dispatch),
            notify: deps.notify,
            clock,
            id_gen,
            formats,
            catch_up: config.catch_up.policy(),
            config,
            schedule: Mutex::new(Schedule::default()),
            locks: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            wake: Notify::new(),
        }
    }

    /// Replace the configured catch-up policy
    pub fn with_catch_up(mut self, policy: Box<dyn CatchUpPolicy>) -> Self {
        self.catch_up = policy;
        self
    }

    // -- Registration API ----------------------------------------------------

    /// Validate, schedule and persist a new trigger
    pub async fn create_trigger(&self, config: TriggerConfig) -> Result<TriggerId, ManagerError> {
        let format = self.checked_format(&config.dialect, &config.pattern)?;
        let id = self.id_gen.next_id();
        let now = self.clock.now();
        let next = next_occurrence(format.as_ref(), &id, &config.pattern, now)?;

        let trigger = Trigger::new(id.clone(), config, now, next);
        self.store.store_trigger(&trigger).await?;

        tracing::info!(
            trigger = %id,
            dialect = %trigger.dialect,
            pattern = %trigger.pattern,
            next_fire_at = %next,
            "trigger registered"
        );
        self.insert_scheduled(trigger);
        Ok(id)
    }

    /// Replace a trigger's pattern and reschedule it from now.
    ///
    /// On any error the previous pattern and schedule stay in effect.
    pub async fn update_trigger(&self, id: &TriggerId, pattern: &str) -> Result<(), ManagerError> {
        let lock = self.trigger_lock(id);
        let _guard = lock.lock().await;

        let current = self
            .get_trigger(id)
            .ok_or_else(|| ManagerError::NotFound(id.clone()))?;
        let format = self.checked_format(&current.dialect, pattern)?;
        let now = self.clock.now();
        let next = next_occurrence(format.as_ref(), id, pattern, now)?;

        let updated = current.with_pattern(pattern, next);
        self.store.store_trigger(&updated).await?;

        tracing::info!(
            trigger = %id,
            pattern,
            version = updated.version,
            next_fire_at = %next,
            "trigger updated"
        );
        self.lock_pending().remove(id);
        self.insert_scheduled(updated);
        Ok(())
    }

    /// Remove a trigger; queued entries for it are dropped when popped
    pub async fn delete_trigger(&self, id: &TriggerId) -> Result<(), ManagerError> {
        let lock = self.trigger_lock(id);
        let _guard = lock.lock().await;

        if !self.lock_schedule().triggers.contains_key(id) {
            return Err(ManagerError::NotFound(id.clone()));
        }
        self.store.delete_trigger(id).await?;

        self.lock_schedule().triggers.remove(id);
        self.lock_pending().remove(id);
        self.lock_locks().remove(id);
        tracing::info!(trigger = %id, "trigger deleted");
        Ok(())
    }

    /// Subscribe an operation to a trigger; `false` if already bound
    pub async fn register_operation(
        &self,
        id: &TriggerId,
        operation: OperationId,
    ) -> Result<bool, ManagerError> {
        self.modify_bindings(id, |trigger| trigger.bind_operation(operation))
            .await
    }

    /// Unsubscribe an operation from a trigger; `false` if it was not bound
    pub async fn unregister_operation(
        &self,
        id: &TriggerId,
        operation: &OperationId,
    ) -> Result<bool, ManagerError> {
        self.modify_bindings(id, |trigger| trigger.unbind_operation(operation))
            .await
    }

    pub fn get_trigger(&self, id: &TriggerId) -> Option<Trigger> {
        self.lock_schedule().triggers.get(id).cloned()
    }

    /// Snapshot of every known trigger, ordered by id
    pub fn list_triggers(&self) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = self.lock_schedule().triggers.values().cloned().collect();
        triggers.sort_by(|a, b| a.id.cmp(&b.id));
        triggers
    }

    // -- Recovery --------------------------------------------------------------

    /// Load active triggers from the store and put them back on the schedule.
    ///
    /// Overdue checkpoints go through the catch-up policy, so the elapsed
    /// intervals are never replayed one by one.
    pub async fn recover(&self) -> Result<RecoverySummary, ManagerError> {
        let triggers = self.store.load_active_triggers().await?;
        let now = self.clock.now();
        let mut summary = RecoverySummary::default();

        for trigger in triggers {
            let format = match self.formats.get(&trigger.dialect) {
                Ok(format) => format,
                Err(e) => {
                    self.invalidate(&trigger, &e).await;
                    summary.invalidated += 1;
                    continue;
                }
            };

            let resume = match trigger.next_fire_at {
                Some(checkpoint) if checkpoint > now => Resume::FireAt(checkpoint),
                Some(checkpoint) => {
                    summary.overdue += 1;
                    self.catch_up.resume(checkpoint, now)
                }
                None => Resume::Reschedule,
            };

            let trigger = match resume {
                Resume::FireAt(at) => trigger.with_checkpoint(at),
                Resume::Reschedule => match format.compute_next(&trigger.pattern, now) {
                    Ok(next) => {
                        let rescheduled = trigger.with_checkpoint(next);
                        self.checkpoint(&rescheduled).await;
                        rescheduled
                    }
                    Err(e) => {
                        self.invalidate(&trigger, &e).await;
                        summary.invalidated += 1;
                        continue;
                    }
                },
            };

            tracing::debug!(
                trigger = %trigger.id,
                next_fire_at = ?trigger.next_fire_at,
                "trigger restored"
            );
            self.insert_scheduled(trigger);
            summary.restored += 1;
        }

        tracing::info!(
            restored = summary.restored,
            overdue = summary.overdue,
            invalidated = summary.invalidated,
            "recovery complete"
        );
        Ok(summary)
    }

    // -- Control loop ----------------------------------------------------------

    /// Run the control loop until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("trigger loop started");

        loop {
            self.flush_pending().await;
            let fired = self.tick().await;
            if !fired.is_empty() {
                tracing::debug!(count = fired.len(), "dispatched");
            }

            let wait = self.next_wait();
            tracing::trace!(wait_ms = wait.as_millis() as u64, "waiting");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::info!("trigger loop stopped");
    }

    /// Fire every entry that is due now.
    ///
    /// Dispatch runs in the background; checkpoints are written before this
    /// returns.
    pub async fn tick(&self) -> Vec<FiredTrigger> {
        let now = self.clock.now();
        let due = self.lock_schedule().scheduler.poll(now);

        let mut fired = Vec::new();
        for entry in due {
            if let Some(f) = self.fire(entry, now).await {
                fired.push(f);
            }
        }
        fired
    }

    /// Retry checkpoint writes that failed during earlier fires
    pub async fn flush_pending(&self) {
        let ids: Vec<TriggerId> = self.lock_pending().keys().cloned().collect();

        for id in ids {
            let lock = self.trigger_lock(&id);
            let _guard = lock.lock().await;

            let Some(record) = self.lock_pending().get(&id).cloned() else {
                continue;
            };
            match self.store.store_trigger(&record).await {
                Ok(()) => {
                    self.lock_pending().remove(&id);
                    tracing::info!(trigger = %id, "deferred checkpoint written");
                }
                Err(e) => {
                    tracing::warn!(trigger = %id, error = %e, "deferred checkpoint still failing")
                }
            }
        }
    }

    /// Triggers with a checkpoint not yet persisted
    pub fn pending_checkpoints(&self) -> usize {
        self.lock_pending().len()
    }

    /// Earliest queued deadline, stale entries included
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.lock_schedule().scheduler.next_fire_time()
    }

    /// Interrupt the control loop's wait
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    // -- Internals -------------------------------------------------------------

    async fn fire(&self, entry: ScheduledEntry, now: DateTime<Utc>) -> Option<FiredTrigger> {
        let lock = self.trigger_lock(&entry.trigger_id);
        let _guard = lock.lock().await;

        // Re-check under the trigger lock: a delete or update may have won
        let trigger = {
            let schedule = self.lock_schedule();
            match schedule.triggers.get(&entry.trigger_id) {
                Some(t)
                    if t.is_active()
                        && t.version == entry.version
                        && t.next_fire_at == Some(entry.fire_at) =>
                {
                    t.clone()
                }
                _ => {
                    tracing::debug!(
                        trigger = %entry.trigger_id,
                        version = entry.version,
                        fire_at = %entry.fire_at,
                        "discarding stale entry"
                    );
                    return None;
                }
            }
        };

        tracing::info!(
            trigger = %trigger.id,
            fire_at = %entry.fire_at,
            operations = trigger.operations.len(),
            "trigger fired"
        );
        let dispatch = self.dispatcher.dispatch(&trigger, entry.fire_at);

        let next = self
            .formats
            .get(&trigger.dialect)
            .and_then(|format| resume_after(format.as_ref(), &trigger.pattern, entry.fire_at, now));
        match next {
            Ok(next) => {
                let advanced = trigger.with_checkpoint(next);
                self.checkpoint(&advanced).await;
                self.insert_scheduled(advanced);
            }
            Err(e) => self.invalidate(&trigger, &e).await,
        }

        Some(FiredTrigger {
            trigger_id: entry.trigger_id,
            fire_at: entry.fire_at,
            dispatch,
        })
    }

    /// Persist a checkpoint, deferring it if the store gives up
    async fn checkpoint(&self, trigger: &Trigger) {
        match self.store.store_trigger(trigger).await {
            Ok(()) => {
                self.lock_pending().remove(&trigger.id);
            }
            Err(e) => {
                tracing::error!(
                    trigger = %trigger.id,
                    next_fire_at = ?trigger.next_fire_at,
                    error = %e,
                    "checkpoint write failed, will retry"
                );
                self.lock_pending()
                    .insert(trigger.id.clone(), trigger.clone());
            }
        }
    }

    /// Mark a trigger invalid, persist that, and alert an operator
    async fn invalidate(&self, trigger: &Trigger, reason: &TimeFormatError) {
        tracing::error!(
            trigger = %trigger.id,
            pattern = %trigger.pattern,
            error = %reason,
            "trigger can no longer be scheduled, marking invalid"
        );

        let invalid = trigger.invalidated();
        self.checkpoint(&invalid).await;
        self.lock_schedule()
            .triggers
            .insert(invalid.id.clone(), invalid);

        let message = format!("trigger {} was marked invalid: {}", trigger.id, reason);
        if let Err(e) = self.notify.send(TRIGGER_CHANNEL, &message).await {
            tracing::warn!(error = %e, "failed to send trigger alert");
        }
    }

    async fn modify_bindings<F>(&self, id: &TriggerId, change: F) -> Result<bool, ManagerError>
    where
        F: FnOnce(&mut Trigger) -> bool,
    {
        let lock = self.trigger_lock(id);
        let _guard = lock.lock().await;

        let mut trigger = self
            .get_trigger(id)
            .ok_or_else(|| ManagerError::NotFound(id.clone()))?;
        if !change(&mut trigger) {
            return Ok(false);
        }
        self.store.store_trigger(&trigger).await?;

        tracing::info!(trigger = %id, operations = ?trigger.operations, "bindings changed");
        self.lock_pending().remove(id);
        self.lock_schedule().triggers.insert(id.clone(), trigger);
        Ok(true)
    }

    /// Look up the dialect and check the pattern against it
    fn checked_format(
        &self,
        dialect: &str,
        pattern: &str,
    ) -> Result<Arc<dyn TimeFormat>, ManagerError> {
        let format = self.formats.get(dialect)?;
        format.validate(pattern)?;

        let interval = format.get_interval(pattern)?;
        let min = self.config.min_interval.as_secs();
        if interval < min {
            return Err(ManagerError::InvalidInput(format!(
                "the trigger pattern '{}' fires every {}s, more often than the minimum of {}s",
                pattern, interval, min
            )));
        }
        Ok(format)
    }

    /// Record a trigger and queue its next fire
    fn insert_scheduled(&self, trigger: Trigger) {
        let Some(fire_at) = trigger.next_fire_at else {
            return;
        };
        {
            let mut schedule = self.lock_schedule();
            schedule.scheduler.schedule(ScheduledEntry {
                trigger_id: trigger.id.clone(),
                fire_at,
                version: trigger.version,
            });
            schedule.triggers.insert(trigger.id.clone(), trigger);
        }
        self.wake.notify_one();
    }

    fn next_wait(&self) -> Duration {
        let now = self.clock.now();
        let mut wait = match self.next_deadline() {
            Some(deadline) => (deadline - now).to_std().unwrap_or(Duration::ZERO),
            None => self.config.idle_wait,
        };
        wait = wait.min(self.config.idle_wait);
        if !self.lock_pending().is_empty() {
            wait = wait.min(self.config.checkpoint_retry);
        }
        wait
    }

    fn trigger_lock(&self, id: &TriggerId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.lock_locks().entry(id.clone()).or_default())
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<TriggerId, Trigger>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_locks(&self) -> MutexGuard<'_, HashMap<TriggerId, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First occurrence after `now` for a trigger being created or updated
fn next_occurrence(
    format: &dyn TimeFormat,
    id: &TriggerId,
    pattern: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ManagerError> {
    format.compute_next(pattern, now).map_err(|e| match e {
        TimeFormatError::HorizonExceeded { .. } => ManagerError::HorizonExceeded(id.clone()),
        other => other.into(),
    })
}

/// Next occurrence after a fire at `fire_at`.
///
/// Cadence follows the fire instant; occurrences already behind `now` are
/// skipped rather than replayed.
fn resume_after(
    format: &dyn TimeFormat,
    pattern: &str,
    fire_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeFormatError> {
    let next = format.compute_next(pattern, fire_at)?;
    if next > now {
        Ok(next)
    } else {
        format.compute_next(pattern, now)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
