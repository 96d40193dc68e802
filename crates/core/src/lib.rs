// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oe-core: domain types for the operation engine's trigger subsystem
//!
//! This crate provides:
//! - Injectable clocks and id generators
//! - The pluggable [`TimeFormat`] dialect family and its registry
//! - The [`Trigger`] entity and its operation bindings
//! - Bounded retry policies shared by storage and dispatch

pub mod clock;
pub mod id;
pub mod retry;
pub mod time_format;
pub mod trigger;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use retry::RetryPolicy;
pub use time_format::{Crontab, TimeFormat, TimeFormatError, TimeFormatFactory, TimeFormatRegistry};
pub use trigger::{
    OperationId, Trigger, TriggerConfig, TriggerId, TriggerState, DEFAULT_ROUTING_KEY,
};
