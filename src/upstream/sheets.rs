//! Spreadsheet values API client.
//!
//! Fetches `{ range, values }` matrices for one or more tabs. The service
//! layer consumes this through the [`RowSource`] trait so tests can swap in
//! canned matrices and fetch counters.

use serde::{Deserialize, Serialize};

use super::{send_with_retry, RetryPolicy};
use crate::types::Cell;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Errors from the values API.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("No sheets API token configured")]
    NoToken,
}

/// One fetched tab: the resolved range string plus the cell matrix, row 0
/// being the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<Cell>>,
}

impl ValueRange {
    /// The tab name before the `!` of an A1 range ("Content!A1:L" → "Content").
    pub fn tab_name(&self) -> &str {
        self.range.split('!').next().unwrap_or("Unknown")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

/// Async row source abstraction over the values API.
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    async fn values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange, SheetsError>;

    async fn batch_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError>;
}

/// reqwest-backed [`RowSource`].
pub struct SheetsApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SheetsApi {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn token(&self) -> Result<&str, SheetsError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(SheetsError::NoToken)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl RowSource for SheetsApi {
    async fn values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange, SheetsError> {
        let token = self.token()?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, spreadsheet_id, range
        );
        let request = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ]);

        let resp = Self::check(send_with_retry(request, &RetryPolicy::default()).await?).await?;
        let mut out: ValueRange = resp.json().await?;
        if out.range.is_empty() {
            out.range = range.to_string();
        }
        Ok(out)
    }

    async fn batch_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError> {
        let token = self.token()?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values:batchGet",
            self.base_url, spreadsheet_id
        );

        let mut query: Vec<(&str, &str)> = vec![
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("dateTimeRenderOption", "FORMATTED_STRING"),
        ];
        for range in ranges {
            query.push(("ranges", range.as_str()));
        }

        let request = self.client.get(&url).bearer_auth(token).query(&query);
        let resp = Self::check(send_with_retry(request, &RetryPolicy::default()).await?).await?;
        let body: BatchGetResponse = resp.json().await?;
        Ok(body.value_ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_deserializes_mixed_cells() {
        let json = r#"{
            "range": "Content!A1:L200",
            "values": [
                ["Date", "Posts", "Comments"],
                ["01.01.2025", 3, "5,5"],
                ["02.01.2025", "", null]
            ]
        }"#;
        let vr: ValueRange = serde_json::from_str(json).unwrap();
        assert_eq!(vr.tab_name(), "Content");
        assert_eq!(vr.values.len(), 3);
        assert_eq!(vr.values[1][1], Cell::Number(3.0));
        assert_eq!(vr.values[2][2], Cell::Null);
    }

    #[test]
    fn batch_response_tolerates_missing_values() {
        let json = r#"{"valueRanges": [{"range": "Termine!A1:A"}]}"#;
        let body: BatchGetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.value_ranges.len(), 1);
        assert!(body.value_ranges[0].values.is_empty());
    }

    #[test]
    fn missing_token_is_its_own_error() {
        let api = SheetsApi::new(None);
        assert!(matches!(api.token(), Err(SheetsError::NoToken)));
        let api = SheetsApi::new(Some(String::new()));
        assert!(matches!(api.token(), Err(SheetsError::NoToken)));
    }

    #[test]
    fn tab_name_falls_back_for_bare_ranges() {
        let vr = ValueRange {
            range: "Revenue".to_string(),
            values: vec![],
        };
        assert_eq!(vr.tab_name(), "Revenue");
    }
}
