//! Small persisted app settings (currently just the videos goal date).
//!
//! Stored as JSON under the state directory, read and rewritten whole —
//! the file is a handful of keys, not a database.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Target date the videos board counts down to, `"YYYY-MM-DD"`.
    #[serde(default)]
    pub goal_date: Option<String>,
}

/// JSON-file-backed settings store.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<AppSettings, SettingsError> {
        if !self.path.exists() {
            return Ok(AppSettings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn goal_date(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.load()?.goal_date)
    }

    pub fn set_goal_date(&self, value: Option<String>) -> Result<(), SettingsError> {
        let mut settings = self.load()?;
        settings.goal_date = value;
        self.save(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.goal_date().unwrap(), None);
    }

    #[test]
    fn goal_date_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        store.set_goal_date(Some("2025-12-31".to_string())).unwrap();
        assert_eq!(store.goal_date().unwrap().as_deref(), Some("2025-12-31"));

        // clearing persists too
        store.set_goal_date(None).unwrap();
        assert_eq!(store.goal_date().unwrap(), None);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
        store.set_goal_date(Some("2026-01-31".to_string())).unwrap();
        assert_eq!(store.goal_date().unwrap().as_deref(), Some("2026-01-31"));
    }
}
