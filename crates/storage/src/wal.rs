// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only trigger log
//!
//! One JSON record per line, each fsynced before `append` returns. A crash
//! mid-append can leave a final line without its newline; replay drops it
//! and `open` cuts it off before new records are written. A failed append
//! is rolled back to the last complete record.

use crate::state::StoreOperation;
use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct WalRecord {
    seq: u64,
    op: StoreOperation,
}

/// Handle for appending to the log
pub struct Wal {
    file: File,
    sequence: u64,
    /// Length of the log through its last complete record
    end: u64,
}

impl Wal {
    /// Open or create the log, discarding a torn final record
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let intact = complete_prefix(&contents);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        if intact < contents.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - intact,
                "truncating torn record at end of log"
            );
            file.set_len(intact as u64)?;
        }

        let sequence = contents[..intact]
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .count() as u64;
        Ok(Self {
            file,
            sequence,
            end: intact as u64,
        })
    }

    /// Append one operation and fsync; returns its sequence number.
    ///
    /// Anything past the last complete record, such as the bytes of an
    /// earlier append that failed halfway, is cut off first.
    pub fn append(&mut self, op: &StoreOperation) -> Result<u64, StorageError> {
        let record = WalRecord {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        if self.file.metadata()?.len() != self.end {
            tracing::warn!(end = self.end, "discarding partial record before append");
            self.file.set_len(self.end)?;
        }

        if let Err(e) = self
            .file
            .write_all(&line)
            .and_then(|()| self.file.sync_all())
        {
            if let Err(rollback) = self.file.set_len(self.end) {
                tracing::error!(error = %rollback, "failed to roll back partial record");
            }
            return Err(e.into());
        }

        self.end += line.len() as u64;
        self.sequence = record.seq;
        Ok(record.seq)
    }

    /// Records written so far, including those replayed at open
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read every complete record in order. A missing log is empty.
    pub fn replay(path: &Path) -> Result<Vec<StoreOperation>, StorageError> {
        let contents = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let intact = complete_prefix(&contents);
        if intact < contents.len() {
            tracing::warn!(path = %path.display(), "ignoring torn record at end of log");
        }

        contents[..intact]
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_slice::<WalRecord>(line)
                    .map(|record| record.op)
                    .map_err(StorageError::from)
            })
            .collect()
    }

    /// Replace the log at `path` with exactly `ops`.
    ///
    /// Written to a sibling file and renamed into place, so a crash leaves
    /// either the old log or the new one.
    pub fn rewrite(path: &Path, ops: &[StoreOperation]) -> Result<(), StorageError> {
        let tmp = path.with_extension("wal.tmp");
        {
            let mut file = File::create(&tmp)?;
            for (seq, op) in (1u64..).zip(ops) {
                let record = WalRecord {
                    seq,
                    op: op.clone(),
                };
                serde_json::to_writer(&mut file, &record)?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Length of `contents` up to and including its last newline
fn complete_prefix(contents: &[u8]) -> usize {
    contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
