// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage of trigger definitions and next-fire checkpoints

mod memory;
mod retrying;
mod state;
mod store;
mod wal;
mod wal_store;

pub use memory::MemoryTriggerStore;
pub use retrying::RetryingStore;
pub use state::{MaterializedState, StoreOperation};
pub use store::{StorageError, TriggerStore};
pub use wal::Wal;
pub use wal_store::WalTriggerStore;
