//! Service facade consumed by the UI/API boundary.
//!
//! Every function returns either a structurally complete payload or an
//! [`ApiError`] whose class tells the boundary which HTTP status to answer
//! with. Malformed query parameters are rejected here, before any
//! aggregation or upstream work.

use std::sync::Arc;

use crate::board;
use crate::error::ApiError;
use crate::state::AppState;
use crate::summarize;
use crate::types::{BoardPayload, BoardStats, SummaryPeriod, SummaryQuery, SummaryResult};
use crate::upstream::sheets::ValueRange;
use crate::upstream::tracker::{self, TrackerError};
use crate::weekdate;

const STATS_CACHE_KEY: &str = "videos";

/// The aggregated dashboard payload (cached, coalesced, stale-on-error).
pub async fn board_payload(state: &AppState, force: bool) -> Result<Arc<BoardPayload>, ApiError> {
    board::build_board_payload(state, force).await
}

/// Sum named fields over a date window of the already-bucketed day data.
pub async fn board_summary(
    state: &AppState,
    query: SummaryQuery,
) -> Result<SummaryResult, ApiError> {
    if query.fields.is_empty() {
        return Err(ApiError::Validation(
            "Required: start, end, fields[]".to_string(),
        ));
    }
    let start = weekdate::parse_ymd(&query.start)
        .ok_or_else(|| ApiError::Validation(format!("Invalid start date: {}", query.start)))?;
    let end = weekdate::parse_ymd(&query.end)
        .ok_or_else(|| ApiError::Validation(format!("Invalid end date: {}", query.end)))?;

    let payload = board::build_board_payload(state, query.force).await?;
    let tab_name = query
        .tab
        .clone()
        .unwrap_or_else(|| state.config.sheets.merged_tab.clone());
    let tab = payload
        .tab(&tab_name)
        .ok_or_else(|| ApiError::Validation(format!("Tab not found: {}", tab_name)))?;

    let summary = summarize::summarize_period(tab, start, end, &query.fields);
    Ok(SummaryResult {
        tab: tab_name,
        period: SummaryPeriod {
            start: query.start,
            end: query.end,
        },
        fields: query.fields,
        summary,
        generated_at: payload.generated_at.clone(),
    })
}

/// Raw values of the configured per-year spreadsheet, cached per year.
pub async fn sheet_values(
    state: &AppState,
    year: &str,
    force: bool,
) -> Result<Arc<ValueRange>, ApiError> {
    let spreadsheet_id = state
        .config
        .sheets
        .spreadsheet_ids_by_year
        .get(year)
        .cloned()
        .ok_or_else(|| ApiError::Configuration(format!("Missing sheet id for year {}", year)))?;

    let rows = state.rows.clone();
    let range = state.config.sheets.yearly_range.clone();
    state
        .values_cache
        .get_with(year, force, || async move {
            rows.values(&spreadsheet_id, &range)
                .await
                .map_err(ApiError::from)
        })
        .await
}

/// Per-status card rollups from the kanban tracker board.
pub async fn tracker_stats(state: &AppState, force: bool) -> Result<Arc<BoardStats>, ApiError> {
    let Some(tracker_api) = state.tracker.as_ref() else {
        return Err(TrackerError::NotConfigured.into());
    };

    state
        .stats_cache
        .get_with(STATS_CACHE_KEY, force, || async move {
            let cards = tracker_api.fetch_cards().await?;
            Ok::<_, ApiError>(tracker::board_stats(&cards))
        })
        .await
}

/// Browser edit URL for a configured document key.
pub fn sheet_edit_link(state: &AppState, doc: &str) -> Result<String, ApiError> {
    let link = state
        .config
        .doc_links
        .get(doc)
        .ok_or_else(|| ApiError::Validation(format!("Unknown document: {}", doc)))?;
    let url = url::Url::parse(link)
        .map_err(|e| ApiError::Configuration(format!("Invalid link for '{}': {}", doc, e)))?;
    Ok(url.to_string())
}

/// The persisted videos goal date, if one was saved.
pub fn goal_date(state: &AppState) -> Result<Option<String>, ApiError> {
    Ok(state.settings.goal_date()?)
}

/// Save the videos goal date (`"YYYY-MM-DD"`).
pub fn set_goal_date(state: &AppState, value: &str) -> Result<(), ApiError> {
    if weekdate::parse_ymd(value).is_none() {
        return Err(ApiError::Validation(format!(
            "Invalid goal date: {}",
            value
        )));
    }
    state.settings.set_goal_date(Some(value.to_string()))?;
    Ok(())
}
