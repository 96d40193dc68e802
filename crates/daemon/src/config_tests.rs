// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oe_engine::CatchUpMode;
use std::time::Duration;

#[test]
fn empty_file_uses_defaults() {
    let settings: Settings = toml::from_str("").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.storage.retry, RetryPolicy::default());
    assert_eq!(settings.executor.endpoint, None);
}

#[test]
fn full_file_parses() {
    let settings: Settings = toml::from_str(
        r#"
        state_dir = "/var/lib/oe"

        [engine]
        min_interval = "5m"
        catch_up = "skip_missed"

        [dispatch]
        max_concurrent = 4
        timeout = "2s"

        [dispatch.retry]
        attempts = 5
        first = "50ms"

        [storage.retry]
        attempts = 10

        [executor]
        endpoint = "http://workers.internal:8080"
        "#,
    )
    .unwrap();

    assert_eq!(settings.state_dir, Some(PathBuf::from("/var/lib/oe")));
    assert_eq!(settings.engine.min_interval, Duration::from_secs(300));
    assert_eq!(settings.engine.catch_up, CatchUpMode::SkipMissed);
    assert_eq!(settings.dispatch.max_concurrent, 4);
    assert_eq!(settings.dispatch.timeout, Duration::from_secs(2));
    assert_eq!(settings.dispatch.retry.attempts, 5);
    assert_eq!(settings.dispatch.retry.first, Duration::from_millis(50));
    assert_eq!(settings.storage.retry.attempts, 10);
    assert_eq!(
        settings.executor.endpoint.as_deref(),
        Some("http://workers.internal:8080")
    );
}

#[test]
fn unknown_section_is_rejected() {
    let result: Result<Settings, _> = toml::from_str("[scheduler]\nfoo = 1\n");
    assert!(result.is_err());
}

#[test]
fn paths_follow_default_state_dir() {
    let config = Config::from_settings(Settings::default(), Path::new("/home/u/.local/state/oe"));

    assert_eq!(config.state_dir, PathBuf::from("/home/u/.local/state/oe"));
    assert_eq!(
        config.lock_path,
        PathBuf::from("/home/u/.local/state/oe/daemon.pid")
    );
    assert_eq!(
        config.wal_path,
        PathBuf::from("/home/u/.local/state/oe/wal/triggers.wal")
    );
}

#[test]
fn configured_state_dir_wins() {
    let settings = Settings {
        state_dir: Some(PathBuf::from("/srv/oe")),
        ..Settings::default()
    };
    let config = Config::from_settings(settings, Path::new("/ignored"));

    assert_eq!(config.log_path, PathBuf::from("/srv/oe/daemon.log"));
}

#[test]
fn load_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oed.toml");
    std::fs::write(
        &path,
        format!("state_dir = {:?}\n", dir.path().join("state").display().to_string()),
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.state_dir, dir.path().join("state"));
}

#[test]
fn load_reports_missing_file() {
    let result = Config::load(Some(Path::new("/nonexistent/oed.toml")));
    assert!(matches!(result, Err(LifecycleError::ConfigRead(_, _))));
}
