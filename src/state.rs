//! Application state and configuration loading.
//!
//! All shared state is carried explicitly in [`AppState`] — the caches, the
//! row source, the goal book — so nothing lives in module-level singletons
//! and tests can inject their own sources and clocks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono_tz::Tz;

use crate::cache::ValueCache;
use crate::error::ApiError;
use crate::goals::GoalBook;
use crate::settings::SettingsStore;
use crate::types::{BoardPayload, BoardStats, Config};
use crate::upstream::sheets::{RowSource, SheetsApi, ValueRange};
use crate::upstream::tracker::TrackerApi;
use crate::weekdate::{self, WeekId};

/// Shared application state, built once at startup.
pub struct AppState {
    pub config: Config,
    pub rows: Arc<dyn RowSource>,
    pub tracker: Option<TrackerApi>,
    pub goal_book: GoalBook,
    pub board_cache: ValueCache<BoardPayload>,
    pub values_cache: ValueCache<ValueRange>,
    pub stats_cache: ValueCache<BoardStats>,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rows: Arc<dyn RowSource> = Arc::new(SheetsApi::new(config.sheets.api_token.clone()));
        Self::with_rows(config, rows)
    }

    /// Build state with an injected row source (tests use canned matrices
    /// and fetch counters instead of the network).
    pub fn with_rows(config: Config, rows: Arc<dyn RowSource>) -> Self {
        let tracker = config.tracker.clone().map(TrackerApi::new);
        let goal_book = GoalBook::new(config.goals.clone());
        let fresh = config.cache.fresh_ttl_ms;
        let stale = config.cache.stale_ttl_ms;

        Self {
            rows,
            tracker,
            goal_book,
            board_cache: ValueCache::with_ttls_ms(fresh, stale),
            values_cache: ValueCache::with_ttls_ms(fresh, stale),
            stats_cache: ValueCache::with_ttls_ms(fresh, stale),
            settings: SettingsStore::new(state_dir().join("settings.json")),
            config,
        }
    }

    /// Timezone the "current week" is computed in for future-week
    /// suppression. Falls back to UTC on an unknown zone name.
    pub fn report_tz(&self) -> Tz {
        self.config.report_timezone.parse().unwrap_or_else(|_| {
            log::warn!(
                "Unknown reportTimezone '{}', falling back to UTC",
                self.config.report_timezone
            );
            chrono_tz::UTC
        })
    }

    pub fn now_week(&self) -> WeekId {
        weekdate::current_week(self.report_tz()).id()
    }
}

/// The state directory (~/.pulseboard).
pub fn state_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".pulseboard")
}

/// Canonical config file path (~/.pulseboard/config.json).
pub fn config_path() -> Result<PathBuf, ApiError> {
    let home = dirs::home_dir()
        .ok_or_else(|| ApiError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".pulseboard").join("config.json"))
}

/// Load configuration from ~/.pulseboard/config.json.
pub fn load_config() -> Result<Config, ApiError> {
    let path = config_path()?;
    if !path.exists() {
        return Err(ApiError::Configuration(format!(
            "Config file not found at {}. Create it with at least {{ \"sheets\": {{ \"boardSpreadsheetId\": \"...\" }} }}",
            path.display()
        )));
    }
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config, ApiError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ApiError::Configuration(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| ApiError::Configuration(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "sheets": {{
                    "boardSpreadsheetId": "abc123",
                    "tabs": [
                        {{"name": "Content", "columns": [0, 1, 2]}},
                        {{"name": "Termine", "columns": [0], "merge": false}}
                    ]
                }},
                "cache": {{"freshTtlMs": 30000, "staleTtlMs": 300000}},
                "goals": {{
                    "sets": [{{"fromWeek": 202530, "goals": {{"Posts": 5}}}}]
                }}
            }}"#
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.sheets.board_spreadsheet_id.as_deref(), Some("abc123"));
        assert_eq!(config.sheets.tabs.len(), 2);
        assert!(!config.sheets.tabs[1].merge);
        assert_eq!(config.cache.fresh_ttl_ms, 30_000);
        assert_eq!(config.goals.sets[0].goals["Posts"], 5.0);
    }

    #[test]
    fn malformed_config_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let config = Config {
            report_timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        let state = AppState::new(config);
        assert_eq!(state.report_tz(), chrono_tz::UTC);
    }
}
