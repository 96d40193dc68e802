// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};
use oe_core::{Trigger, TriggerConfig, TriggerId};
use std::io::Write;

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
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&StoreOperation::Store {
            trigger: make_trigger("t-1"),
        })
        .unwrap();
        wal.append(&StoreOperation::Delete {
            id: TriggerId::new("t-1"),
        })
        .unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], StoreOperation::Store { .. }));
    assert!(matches!(ops[1], StoreOperation::Delete { .. }));
}

fn delete_op(id: &str) -> StoreOperation {
    StoreOperation::Delete {
        id: TriggerId::new(id),
    }
}

#[test]
fn sequence_resumes_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        assert_eq!(wal.append(&delete_op("x")).unwrap(), 1);
    }

    let mut wal = Wal::open(&path).unwrap();
    assert_eq!(wal.sequence(), 1);
    assert_eq!(wal.append(&delete_op("y")).unwrap(), 2);
}

#[test]
fn replay_ignores_torn_final_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&delete_op("kept")).unwrap();
    }
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"seq":2,"op":{"Del"#).unwrap();
    drop(file);

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], StoreOperation::Delete { id } if id.0 == "kept"));
}

#[test]
fn open_cuts_torn_record_before_appending() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&delete_op("a")).unwrap();
    }
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"seq\":2").unwrap();
    drop(file);

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        wal.append(&delete_op("b")).unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[1], StoreOperation::Delete { id } if id.0 == "b"));
}

#[test]
fn wal_replay_nonexistent() {
    let path = Path::new("/nonexistent/path/wal");
    let ops = Wal::replay(path).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn wal_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("wal").join("triggers.wal");

    let wal = Wal::open(&path).unwrap();
    assert_eq!(wal.sequence(), 0);
    assert!(path.exists());
}

#[test]
fn wal_rewrite_replaces_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        for _ in 0..3 {
            wal.append(&StoreOperation::Store {
                trigger: make_trigger("t-1"),
            })
            .unwrap();
        }
    }

    Wal::rewrite(
        &path,
        &[StoreOperation::Store {
            trigger: make_trigger("t-2"),
        }],
    )
    .unwrap();

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], StoreOperation::Store { trigger } if trigger.id.0 == "t-2"));
    assert_eq!(Wal::open(&path).unwrap().sequence(), 1);
}

#[test]
fn wal_replay_rejects_corrupt_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    std::fs::write(&path, "{not json}\n").unwrap();

    let err = Wal::replay(&path).unwrap_err();
    assert!(matches!(err, StorageError::Json(_)));
}

#[test]
fn append_discards_partial_record_left_by_failed_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal = Wal::open(&path).unwrap();
    wal.append(&StoreOperation::Store {
        trigger: make_trigger("t-1"),
    })
    .unwrap();

    // Bytes of a write that failed halfway through
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"seq":2,"op":{"op":"sto"#).unwrap();
    drop(file);

    assert_eq!(wal.append(&delete_op("t-1")).unwrap(), 2);

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], StoreOperation::Store { trigger } if trigger.id.0 == "t-1"));
    assert!(matches!(&ops[1], StoreOperation::Delete { id } if id.0 == "t-1"));
}
