//! Service-level error taxonomy.
//!
//! Malformed *data* never errors (dates drop, numbers become 0); errors are
//! reserved for malformed requests, operator configuration mistakes, and
//! unavailable upstream infrastructure. The three classes map directly to
//! HTTP status classes at whatever boundary hosts this crate.

use thiserror::Error;

use crate::settings::SettingsError;
use crate::upstream::sheets::SheetsError;
use crate::upstream::tracker::TrackerError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed query parameters — rejected before any aggregation work.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Operator mistake (missing sheet id, unreadable config). Not transient.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The row source or tracker is unreachable/misbehaving and no stale
    /// cache entry could cover for it.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Configuration,
    Upstream,
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Validation(_) => ErrorClass::Validation,
            ApiError::Configuration(_) => ErrorClass::Configuration,
            ApiError::Upstream(_) => ErrorClass::Upstream,
        }
    }

    /// HTTP status the hosting boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Validation => 400,
            ErrorClass::Configuration => 500,
            ErrorClass::Upstream => 502,
        }
    }
}

impl From<SheetsError> for ApiError {
    fn from(err: SheetsError) -> Self {
        match err {
            // a missing token is an operator mistake, not upstream weather
            SheetsError::NoToken => ApiError::Configuration(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotConfigured => ApiError::Configuration(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}
