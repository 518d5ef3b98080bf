//! Board payload build service — the fetch → project → aggregate → bucket →
//! classify pipeline, wrapped as one unit of work behind the board cache.
//!
//! The pipeline itself is pure (`assemble_payload`); only the outer function
//! touches the network and the clock, so tests drive the whole thing from
//! canned value ranges.

use std::sync::Arc;

use chrono::Utc;

use crate::aggregate::{self, SourceTable};
use crate::error::ApiError;
use crate::goals::{self, GoalBook};
use crate::projector::{self, ColumnSelection, ProjectedTable, RawTable};
use crate::state::AppState;
use crate::types::{BoardPayload, Config, DayRow, TabAgg, WeekAgg};
use crate::upstream::sheets::ValueRange;
use crate::weekdate::{self, WeekId};

const BOARD_CACHE_KEY: &str = "board";

/// Build (or serve from cache) the full dashboard payload.
pub async fn build_board_payload(
    state: &AppState,
    force: bool,
) -> Result<Arc<BoardPayload>, ApiError> {
    let spreadsheet_id = state
        .config
        .sheets
        .board_spreadsheet_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Configuration("No board spreadsheet id configured".to_string()))?;
    if state.config.sheets.tabs.is_empty() {
        return Err(ApiError::Configuration(
            "No source tabs configured".to_string(),
        ));
    }

    let ranges: Vec<String> = state
        .config
        .sheets
        .tabs
        .iter()
        .map(|t| format!("{}!{}", t.name, t.range))
        .collect();
    let rows = state.rows.clone();
    let config = &state.config;
    let book = &state.goal_book;
    let now_week = state.now_week();

    state
        .board_cache
        .get_with(BOARD_CACHE_KEY, force, || async move {
            let value_ranges = rows.batch_values(&spreadsheet_id, &ranges).await?;
            log::debug!("board fetch: {} ranges", value_ranges.len());
            Ok::<_, ApiError>(assemble_payload(
                &value_ranges,
                config,
                book,
                now_week,
                Utc::now().to_rfc3339(),
            ))
        })
        .await
}

/// Assemble the payload from fetched value ranges.
///
/// Merge-flagged tabs are projected, aggregated by day, bucketed by ISO week
/// and classified against the goal book as one combined tab; the remaining
/// tabs pass through as placeholders.
pub fn assemble_payload(
    value_ranges: &[ValueRange],
    config: &Config,
    book: &GoalBook,
    now_week: WeekId,
    generated_at: String,
) -> BoardPayload {
    let mut selection = ColumnSelection::new();
    for tab in &config.sheets.tabs {
        if !tab.columns.is_empty() {
            selection.insert(tab.name.clone(), tab.columns.clone());
        }
    }

    let projected: Vec<ProjectedTable> = value_ranges
        .iter()
        .map(|vr| {
            projector::project(
                RawTable {
                    source: vr.tab_name().to_string(),
                    range: vr.range.clone(),
                    values: vr.values.clone(),
                },
                &selection,
            )
        })
        .collect();
    let find = |name: &str| projected.iter().find(|p| p.source == name);

    // Merged tab: flattened "Tab:Header" labels (date column dropped), one
    // combined weekly aggregation across every merge-flagged source.
    let mut headers_out = Vec::new();
    let mut merged_ranges = Vec::new();
    let mut sources = Vec::new();
    for tab in config.sheets.tabs.iter().filter(|t| t.merge) {
        let Some(table) = find(&tab.name) else {
            log::warn!("Configured tab '{}' missing from fetch response", tab.name);
            continue;
        };
        for header in table.headers.iter().skip(1) {
            headers_out.push(format!("{}:{}", tab.name, header));
        }
        merged_ranges.push(table.range.clone());
        sources.push(SourceTable {
            table,
            date_format: tab.date_format,
        });
    }

    let (layout, records) = aggregate::aggregate_daily(&sources);
    let buckets = aggregate::bucket_weeks(&records, &layout);

    let weeks: Vec<WeekAgg> = buckets
        .iter()
        .map(|bucket| {
            let week = bucket.week_of();
            let sums: Vec<f64> = bucket.sums.iter().copied().map(aggregate::round2).collect();
            let statuses = goals::classify_statuses(&sums, &headers_out, book, week, now_week);
            WeekAgg {
                key: week.key(),
                year: bucket.iso_year,
                week: bucket.iso_week,
                start: weekdate::format_ymd(bucket.start),
                end: weekdate::format_ymd(bucket.end),
                sums,
                days: bucket
                    .days
                    .iter()
                    .map(|day| DayRow {
                        date: weekdate::format_ymd(day.date),
                        sums: day.sums.iter().copied().map(aggregate::round2).collect(),
                    })
                    .collect(),
                statuses,
            }
        })
        .collect();

    let part_bases = headers_out
        .iter()
        .map(|header| book.resolve_part_base(header))
        .collect();

    let mut tabs = vec![TabAgg {
        tab: config.sheets.merged_tab.clone(),
        range: merged_ranges.join(" | "),
        headers_out,
        weeks,
        part_bases,
    }];

    for tab in config.sheets.tabs.iter().filter(|t| !t.merge) {
        tabs.push(TabAgg {
            tab: tab.name.clone(),
            range: find(&tab.name).map(|p| p.range.clone()).unwrap_or_default(),
            headers_out: Vec::new(),
            weeks: Vec::new(),
            part_bases: Vec::new(),
        });
    }

    BoardPayload { tabs, generated_at }
}
