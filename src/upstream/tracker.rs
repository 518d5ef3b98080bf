//! Kanban tracker client — per-status card rollups for the videos board.
//!
//! The tracker exposes a paginated database query endpoint; each card
//! carries a status property and an optional human-facing ID property. The
//! dashboard only needs counts and ID lists per status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{send_with_retry, RetryPolicy};
use crate::types::{BoardStats, TrackerConfig};

/// Errors from tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Tracker error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Tracker is not configured")]
    NotConfigured,
}

/// One card, reduced to what the stats rollup needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardCard {
    pub status: String,
    pub display_id: String,
    pub last_edited: Option<DateTime<Utc>>,
}

/// reqwest-backed tracker client.
pub struct TrackerApi {
    client: reqwest::Client,
    config: TrackerConfig,
}

impl TrackerApi {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch every card of the configured board, following pagination.
    pub async fn fetch_cards(&self) -> Result<Vec<BoardCard>, TrackerError> {
        let url = format!(
            "{}/v1/databases/{}/query",
            self.config.base_url, self.config.database_id
        );

        let mut cards = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::json!({ "page_size": 100 });
            if let Some(ref c) = cursor {
                body["start_cursor"] = Value::String(c.clone());
            }

            let request = self
                .client
                .post(&url)
                .bearer_auth(&self.config.token)
                .header("Notion-Version", &self.config.version)
                .json(&body);

            let resp = send_with_retry(request, &RetryPolicy::default()).await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(TrackerError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: Value = resp.json().await?;
            for item in page["results"].as_array().into_iter().flatten() {
                cards.push(parse_card(item));
            }

            cursor = match page["has_more"].as_bool() {
                Some(true) => page["next_cursor"].as_str().map(String::from),
                _ => None,
            };
            if cursor.is_none() {
                break;
            }
        }

        Ok(cards)
    }
}

/// Reduce a raw card page to its status, display id and edit timestamp.
///
/// Status comes from a `Status` property of either status or select type,
/// defaulting to "Unknown". The display id prefers the custom `ID` property
/// (number, title, rich text, or unique-id) and falls back to the page id.
pub fn parse_card(page: &Value) -> BoardCard {
    let status = page["properties"]["Status"]["status"]["name"]
        .as_str()
        .or_else(|| page["properties"]["Status"]["select"]["name"].as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let id_prop = &page["properties"]["ID"];
    let display_id = id_prop["number"]
        .as_f64()
        .map(|n| format!("{}", n as i64))
        .or_else(|| id_prop["title"][0]["plain_text"].as_str().map(String::from))
        .or_else(|| id_prop["rich_text"][0]["plain_text"].as_str().map(String::from))
        .or_else(|| {
            id_prop["unique_id"]["number"]
                .as_f64()
                .map(|n| format!("{}", n as i64))
        })
        .unwrap_or_else(|| page["id"].as_str().unwrap_or_default().to_string());

    let last_edited = page["last_edited_time"]
        .as_str()
        .or_else(|| page["created_time"].as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    BoardCard {
        status,
        display_id,
        last_edited,
    }
}

/// Roll cards up into the stats payload the dashboard renders.
pub fn board_stats(cards: &[BoardCard]) -> BoardStats {
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut items_by_status: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut last_edited: Option<DateTime<Utc>> = None;

    for card in cards {
        *by_status.entry(card.status.clone()).or_insert(0) += 1;
        items_by_status
            .entry(card.status.clone())
            .or_default()
            .push(card.display_id.clone());
        if let Some(ts) = card.last_edited {
            last_edited = Some(match last_edited {
                Some(prev) if prev >= ts => prev,
                _ => ts,
            });
        }
    }

    BoardStats {
        total: cards.len() as u64,
        by_status,
        items_by_status,
        last_updated: last_edited.map(|ts| ts.to_rfc3339()),
    }
}
