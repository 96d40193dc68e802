// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Trigger scheduling engine
//!
//! The [`TriggerManager`] keeps every active trigger on a time-ordered
//! queue, fires what is due, checkpoints the next occurrence and hands the
//! bound operations to the [`Dispatcher`].

mod catch_up;
mod config;
mod dispatcher;
mod error;
mod manager;
mod scheduler;

pub use catch_up::{CatchUpMode, CatchUpPolicy, FireOnce, Resume, SkipMissed};
pub use config::{DispatchConfig, EngineConfig};
pub use dispatcher::{DispatchReport, Dispatcher, DISPATCH_CHANNEL};
pub use error::ManagerError;
pub use manager::{FiredTrigger, ManagerDeps, RecoverySummary, TriggerManager, TRIGGER_CHANNEL};
pub use scheduler::{ScheduledEntry, Scheduler};
