//! Shared payload and configuration types.
//!
//! Everything the UI consumes is serialized camelCase. Config mirrors
//! ~/.pulseboard/config.json and is loaded once at startup (see state.rs).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ============================================================================
// Cells
// ============================================================================

/// A single spreadsheet cell as returned by the values API.
///
/// The API mixes strings, raw numbers and booleans in one matrix; empty
/// cells may arrive as JSON null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Text(String::new())
    }
}

impl Cell {
    /// Display form of the cell, as a header label or date string.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Cell::Null => String::new(),
        }
    }

    /// Numeric value of the cell. Accepts a comma as decimal separator;
    /// empty or unparseable cells are 0, never an error.
    pub fn as_number(&self) -> f64 {
        match self {
            Cell::Number(n) => {
                if n.is_finite() {
                    *n
                } else {
                    0.0
                }
            }
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                trimmed.replace(',', ".").parse::<f64>().unwrap_or(0.0)
            }
            Cell::Bool(_) | Cell::Null => 0.0,
        }
    }
}

/// Date string layout used by a source's date column. Never inferred from
/// content — each tab declares which one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateFormat {
    /// `24.12.2025` — used by the content/outreach sheets.
    #[default]
    DayMonthYearDots,
    /// `12/24/2025` — legacy sheets.
    MonthDayYearSlashes,
}

// ============================================================================
// Aggregate payload (what the dashboard charts from)
// ============================================================================

/// Five-way actual-vs-goal classification used for at-a-glance coloring.
/// Ordered: Red < Orange < Yellow < Green < Over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBand {
    Red,
    Orange,
    Yellow,
    Green,
    Over,
}

/// One day inside a week bucket: the date plus that day's merged column sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRow {
    pub date: String,
    pub sums: Vec<f64>,
}

/// One ISO-week bucket of aggregated sums, with the per-day breakdown kept
/// alongside and one status entry per output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekAgg {
    /// `"2025-W07"` — sortable display key.
    pub key: String,
    pub year: i32,
    pub week: u32,
    /// First/last calendar date with data in this bucket (not the ISO week's
    /// Monday/Sunday).
    pub start: String,
    pub end: String,
    pub sums: Vec<f64>,
    pub days: Vec<DayRow>,
    pub statuses: Vec<Option<StatusBand>>,
}

/// Aggregates for one logical dashboard tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabAgg {
    pub tab: String,
    pub range: String,
    pub headers_out: Vec<String>,
    pub weeks: Vec<WeekAgg>,
    /// For part columns (per-person breakdowns), the base metric each one
    /// belongs to; `None` for base columns and unresolvable parts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub part_bases: Vec<Option<String>>,
}

/// The full payload served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPayload {
    pub tabs: Vec<TabAgg>,
    pub generated_at: String,
}

impl BoardPayload {
    pub fn tab(&self, name: &str) -> Option<&TabAgg> {
        self.tabs.iter().find(|t| t.tab == name)
    }
}

// ============================================================================
// Tracker stats payload
// ============================================================================

/// Per-status rollups from the kanban tracker board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub items_by_status: BTreeMap<String, Vec<String>>,
    pub last_updated: Option<String>,
}

// ============================================================================
// Summary query surface
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub tab: String,
    pub period: SummaryPeriod,
    pub fields: Vec<String>,
    pub summary: BTreeMap<String, f64>,
    pub generated_at: String,
}

// ============================================================================
// Configuration
// ============================================================================

/// Root configuration, loaded from ~/.pulseboard/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
    #[serde(default)]
    pub tracker: Option<TrackerConfig>,
    /// IANA timezone the "current week" is computed in for future-week
    /// suppression (the sheets are maintained in this zone).
    #[serde(default = "default_report_timezone")]
    pub report_timezone: String,
    /// Browser edit links by document key, served via the sheet-link surface.
    #[serde(default)]
    pub doc_links: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheets: SheetsConfig::default(),
            cache: CacheConfig::default(),
            goals: GoalsConfig::default(),
            tracker: None,
            report_timezone: default_report_timezone(),
            doc_links: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsConfig {
    /// Bearer token for the values API.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Spreadsheet holding the merged dashboard tabs.
    #[serde(default)]
    pub board_spreadsheet_id: Option<String>,
    /// Per-year spreadsheets for the raw values surface.
    #[serde(default)]
    pub spreadsheet_ids_by_year: HashMap<String, String>,
    /// Range fetched from the per-year spreadsheets.
    #[serde(default = "default_yearly_range")]
    pub yearly_range: String,
    #[serde(default = "default_merged_tab")]
    pub merged_tab: String,
    #[serde(default)]
    pub tabs: Vec<TabConfig>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            board_spreadsheet_id: None,
            spreadsheet_ids_by_year: HashMap::new(),
            yearly_range: default_yearly_range(),
            merged_tab: default_merged_tab(),
            tabs: Vec::new(),
        }
    }
}

/// One source tab of the board spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfig {
    pub name: String,
    /// Zero-based columns of the original rows to keep (column 0 is the date
    /// column by convention). Empty keeps every column.
    #[serde(default)]
    pub columns: Vec<usize>,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default = "default_tab_range")]
    pub range: String,
    /// Merged tabs feed the combined weekly aggregation; the rest pass
    /// through as placeholder tabs.
    #[serde(default = "default_true")]
    pub merge: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_fresh_ttl_ms")]
    pub fresh_ttl_ms: u64,
    #[serde(default = "default_stale_ttl_ms")]
    pub stale_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_ms: default_fresh_ttl_ms(),
            stale_ttl_ms: default_stale_ttl_ms(),
        }
    }
}

/// Weekly goal configuration: an ordered list of date-ranged goal sets plus
/// the alias table used to resolve part columns to their base metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsConfig {
    #[serde(default)]
    pub sets: Vec<GoalSetConfig>,
    #[serde(default)]
    pub part_aliases: HashMap<String, String>,
}

/// Goals in effect from `fromWeek` through `toWeek` inclusive; no `toWeek`
/// means "from this week onward". Weeks are encoded isoYear*100 + isoWeek.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSetConfig {
    pub from_week: i32,
    #[serde(default)]
    pub to_week: Option<i32>,
    #[serde(default)]
    pub goals: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_base_url")]
    pub base_url: String,
    pub token: String,
    pub database_id: String,
    #[serde(default = "default_tracker_version")]
    pub version: String,
}

fn default_report_timezone() -> String {
    "Europe/Vienna".to_string()
}

fn default_yearly_range() -> String {
    "Revenue".to_string()
}

fn default_merged_tab() -> String {
    "Merged".to_string()
}

fn default_tab_range() -> String {
    "A1:L".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fresh_ttl_ms() -> u64 {
    60_000
}

fn default_stale_ttl_ms() -> u64 {
    600_000
}

fn default_tracker_base_url() -> String {
    "https://api.notion.com".to_string()
}

fn default_tracker_version() -> String {
    "2022-06-28".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_deserializes_mixed_matrix() {
        let json = r#"[["Date", "Posts", 2025], ["01.01.2025", "5,5", null], [true, 3.25, ""]]"#;
        let rows: Vec<Vec<Cell>> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0][2], Cell::Number(2025.0));
        assert_eq!(rows[1][2], Cell::Null);
        assert_eq!(rows[2][0], Cell::Bool(true));
    }

    #[test]
    fn cell_as_number_accepts_comma_decimal() {
        assert_eq!(Cell::Text("5,5".into()).as_number(), 5.5);
        assert_eq!(Cell::Text("12.75".into()).as_number(), 12.75);
        assert_eq!(Cell::Text("".into()).as_number(), 0.0);
        assert_eq!(Cell::Text("n/a".into()).as_number(), 0.0);
        assert_eq!(Cell::Number(4.0).as_number(), 4.0);
        assert_eq!(Cell::Null.as_number(), 0.0);
    }

    #[test]
    fn cell_as_text_renders_integral_numbers_without_fraction() {
        assert_eq!(Cell::Number(2025.0).as_text(), "2025");
        assert_eq!(Cell::Number(3.5).as_text(), "3.5");
    }

    #[test]
    fn config_defaults_fill_missing_sections() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.cache.fresh_ttl_ms, 60_000);
        assert_eq!(cfg.cache.stale_ttl_ms, 600_000);
        assert_eq!(cfg.report_timezone, "Europe/Vienna");
        assert_eq!(cfg.sheets.merged_tab, "Merged");
        assert!(cfg.tracker.is_none());
    }

    #[test]
    fn tab_config_defaults() {
        let tab: TabConfig = serde_json::from_str(r#"{"name": "Content"}"#).unwrap();
        assert_eq!(tab.range, "A1:L");
        assert!(tab.merge);
        assert_eq!(tab.date_format, DateFormat::DayMonthYearDots);
    }
}
