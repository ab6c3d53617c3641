use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::reconcile::DeletionMode;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub login_url: String,
    pub calendar_url: String,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            login_url: "https://exp-t.jp/account/login/expa".into(),
            calendar_url: "https://exp-t.jp/e/event/calendar".into(),
            user_agent: concat!("seminar-desk/", env!("CARGO_PKG_VERSION")).into(),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub deletion_mode: DeletionMode,
    pub interval_secs: u64,
    pub treat_unrecognized_as_empty: bool,
    pub max_attempts: usize,
    pub run_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            deletion_mode: DeletionMode::Hard,
            interval_secs: 15 * 60,
            treat_unrecognized_as_empty: false,
            max_attempts: 3,
            run_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub file: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            file: "seminar-desk.db".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub sync: SyncSettings,
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database.file)
    }

    /// Set one dotted key, e.g. `sync.interval_secs`, from its string form.
    fn assign(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |err: &dyn std::fmt::Display| anyhow!("Invalid value for {key}: {err}");
        match key {
            "source.login_url" => self.source.login_url = non_empty(key, value)?,
            "source.calendar_url" => self.source.calendar_url = non_empty(key, value)?,
            "source.user_agent" => self.source.user_agent = non_empty(key, value)?,
            "source.max_body_bytes" => {
                self.source.max_body_bytes = value.parse::<usize>().map_err(|e| invalid(&e))?
            }
            "sync.deletion_mode" => {
                self.sync.deletion_mode = value.parse::<DeletionMode>().map_err(|e| invalid(&e))?
            }
            "sync.interval_secs" => {
                let secs = value.parse::<u64>().map_err(|e| invalid(&e))?;
                if secs == 0 {
                    bail!("sync.interval_secs must be greater than zero");
                }
                self.sync.interval_secs = secs;
            }
            "sync.treat_unrecognized_as_empty" => {
                self.sync.treat_unrecognized_as_empty =
                    value.parse::<bool>().map_err(|e| invalid(&e))?
            }
            "sync.max_attempts" => {
                let attempts = value.parse::<usize>().map_err(|e| invalid(&e))?;
                if attempts == 0 {
                    bail!("sync.max_attempts must be at least 1");
                }
                self.sync.max_attempts = attempts;
            }
            "sync.run_timeout_secs" => {
                let secs = value.parse::<u64>().map_err(|e| invalid(&e))?;
                if secs == 0 {
                    bail!("sync.run_timeout_secs must be greater than zero");
                }
                self.sync.run_timeout_secs = secs;
            }
            "database.file" => self.database.file = non_empty(key, value)?,
            other => bail!("Unknown setting '{other}'"),
        }
        Ok(())
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{key} cannot be empty");
    }
    Ok(value.to_string())
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update one key and write the file. The in-memory copy is only changed
    /// when the value is valid.
    pub fn set(&self, key: &str, value: &str) -> Result<Settings> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = guard.clone();
        updated.assign(key, value)?;
        self.persist(&updated)?;
        *guard = updated.clone();
        Ok(updated)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let store = SettingsStore::new(path.clone()).unwrap();

        store.set("sync.deletion_mode", "soft").unwrap();
        store.set("sync.interval_secs", "300").unwrap();

        let reloaded = SettingsStore::new(path).unwrap().snapshot();
        assert_eq!(reloaded.sync.deletion_mode, DeletionMode::Soft);
        assert_eq!(reloaded.sync.interval_secs, 300);
        assert_eq!(reloaded.source, SourceSettings::default());
    }

    #[test]
    fn invalid_values_leave_settings_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE)).unwrap();

        assert!(store.set("sync.interval_secs", "0").is_err());
        assert!(store.set("sync.run_timeout_secs", "0").is_err());
        assert!(store.set("sync.deletion_mode", "archive").is_err());
        assert!(store.set("source.login_url", "  ").is_err());
        assert!(store.set("source.password", "x").is_err());
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "sync": { "treat_unrecognized_as_empty": true } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().snapshot();
        assert!(settings.sync.treat_unrecognized_as_empty);
        assert_eq!(settings.sync.max_attempts, 3);
        assert_eq!(settings.database, DatabaseSettings::default());
    }
}
