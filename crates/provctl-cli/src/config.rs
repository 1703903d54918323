use std::path::{Path, PathBuf};
use std::time::Duration;

use provctl_engine::RetentionPolicy;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
pub const CURRENT_VERSION: u32 = 1;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvctlConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub state_path: PathBuf,
    /// Added in v1; v0 configs get `<state dir>/snapshots`.
    pub snapshot_dir: PathBuf,
    /// Added in v1; v0 configs get `<state dir>/events.jsonl`.
    pub event_log_path: PathBuf,
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_drift_interval")]
    pub drift_interval_secs: u64,
    /// Take a snapshot before apply, delete, and drift remediation.
    #[serde(default)]
    pub auto_snapshot: bool,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remote_state: Option<RemoteStateConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Local stand-in for a cloud, with its inventory kept in a JSON file.
    Simulated { name: String, inventory_path: PathBuf },
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Simulated { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_age_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_count: Option<usize>,
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: self
                .max_age_days
                .map(|days| Duration::from_secs(days.saturating_mul(SECS_PER_DAY))),
            max_count: self.max_count,
        }
    }
}

/// S3 location that mirrors the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStateConfig {
    pub region: String,
    pub bucket: String,
    #[serde(default = "default_remote_key")]
    pub key: String,
}

fn default_actor() -> String {
    "provctl".to_string()
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_drift_interval() -> u64 {
    300
}

fn default_remote_key() -> String {
    "provctl/state.json".to_string()
}

impl ProvctlConfig {
    /// A fresh config keeping all data under `data_dir`, with simulated
    /// `aws` and `azure` providers.
    pub fn default_in(data_dir: &Path) -> Self {
        let simulated = |name: &str| ProviderConfig::Simulated {
            name: name.to_string(),
            inventory_path: data_dir.join(format!("inventory-{name}.json")),
        };
        Self {
            config_version: CURRENT_VERSION,
            state_path: data_dir.join("state.json"),
            snapshot_dir: data_dir.join("snapshots"),
            event_log_path: data_dir.join("events.jsonl"),
            actor: default_actor(),
            providers: vec![simulated("aws"), simulated("azure")],
            reconcile_interval_secs: default_reconcile_interval(),
            drift_interval_secs: default_drift_interval(),
            auto_snapshot: true,
            retention: RetentionConfig {
                max_age_days: None,
                max_count: Some(20),
            },
            remote_state: None,
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    pub fn drift_interval(&self) -> Duration {
        Duration::from_secs(self.drift_interval_secs.max(1))
    }
}

fn data_dir() -> eyre::Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre::eyre!("no data directory found"))?;
    Ok(base.join("provctl"))
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("provctl").join("config.json"))
}

pub fn default_config() -> eyre::Result<ProvctlConfig> {
    Ok(ProvctlConfig::default_in(&data_dir()?))
}

pub fn load_config(path: &Path) -> eyre::Result<ProvctlConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    parse_config(&contents)
}

/// Load `path`, or the default config when no file exists there yet.
pub fn load_or_default(path: &Path) -> eyre::Result<ProvctlConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        default_config()
    }
}

/// Parse a config document, migrating it to [`CURRENT_VERSION`] first.
pub fn parse_config(contents: &str) -> eyre::Result<ProvctlConfig> {
    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: ProvctlConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update provctl."
        ));
    }

    // v0 -> v1: add snapshot_dir and event_log_path next to the state file
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        let state_path = obj
            .get("state_path")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .ok_or_else(|| eyre::eyre!("config is missing state_path"))?;
        let state_dir = state_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        obj.entry("snapshot_dir").or_insert(serde_json::Value::String(
            state_dir.join("snapshots").display().to_string(),
        ));
        obj.entry("event_log_path").or_insert(serde_json::Value::String(
            state_dir.join("events.jsonl").display().to_string(),
        ));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 -> v1 (added snapshot_dir, event_log_path)");
    }

    Ok(json)
}

pub fn save_config(config: &ProvctlConfig, path: &Path) -> eyre::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // Set restrictive permissions on Unix before renaming
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
