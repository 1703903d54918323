use std::path::PathBuf;

use provctl::config::{
    self, ProviderConfig, ProvctlConfig, RetentionConfig, CURRENT_VERSION,
};

#[test]
fn v0_config_is_migrated() {
    let v0 = r#"{
        "state_path": "/var/lib/provctl/state.json",
        "actor": "ops",
        "auto_snapshot": false
    }"#;

    let config = config::parse_config(v0).unwrap();
    assert_eq!(config.config_version, 1);
    assert_eq!(config.snapshot_dir, PathBuf::from("/var/lib/provctl/snapshots"));
    assert_eq!(config.event_log_path, PathBuf::from("/var/lib/provctl/events.jsonl"));
    assert_eq!(config.actor, "ops");
    assert!(!config.auto_snapshot);
    assert!(config.providers.is_empty());
    assert_eq!(config.reconcile_interval_secs, 60);
    assert_eq!(config.drift_interval_secs, 300);
}

#[test]
fn migration_keeps_explicit_paths() {
    let json = serde_json::json!({
        "state_path": "/data/state.json",
        "snapshot_dir": "/backups",
    });

    let migrated = config::migrate(json, 0).unwrap();
    assert_eq!(migrated["snapshot_dir"], "/backups");
    assert_eq!(migrated["event_log_path"], "/data/events.jsonl");
    assert_eq!(migrated["config_version"], 1);
}

#[test]
fn newer_config_is_rejected() {
    let json = serde_json::json!({ "config_version": CURRENT_VERSION + 1 });
    let err = config::migrate(json, CURRENT_VERSION + 1).unwrap_err();
    assert!(err.to_string().contains("newer than this build supports"));
}

#[test]
fn v0_without_state_path_is_rejected() {
    assert!(config::parse_config(r#"{"actor": "ops"}"#).is_err());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provctl").join("config.json");

    let mut config = ProvctlConfig::default_in(dir.path());
    config.config_version = 0;
    config.retention = RetentionConfig {
        max_age_days: Some(7),
        max_count: None,
    };
    config::save_config(&config, &path).unwrap();

    let loaded = config::load_config(&path).unwrap();
    assert_eq!(loaded.config_version, CURRENT_VERSION);
    assert_eq!(loaded.retention, config.retention);
    assert_eq!(loaded.providers, config.providers);
    assert!(!path.with_extension("json.tmp").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn default_config_lives_under_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProvctlConfig::default_in(dir.path());

    assert_eq!(config.state_path, dir.path().join("state.json"));
    let names: Vec<&str> = config.providers.iter().map(ProviderConfig::name).collect();
    assert_eq!(names, vec!["aws", "azure"]);
    assert!(config.auto_snapshot);
}

#[test]
fn retention_policy_converts_days() {
    let policy = RetentionConfig {
        max_age_days: Some(2),
        max_count: Some(5),
    }
    .policy();
    assert_eq!(policy.max_age, Some(std::time::Duration::from_secs(2 * 86_400)));
    assert_eq!(policy.max_count, Some(5));
    assert!(RetentionConfig::default().policy().is_unbounded());
}
