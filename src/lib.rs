//! pulseboard — weekly KPI aggregation and caching behind the team dashboard.
//!
//! Data flow: row source → column projector → row aggregator → week bucketer
//! → goal/status classifier → cached payload → UI. The cache wraps the whole
//! pipeline per key with request coalescing and stale-on-error fallback.

pub mod aggregate;
pub mod api;
pub mod board;
pub mod cache;
pub mod error;
pub mod goals;
pub mod projector;
pub mod settings;
pub mod state;
pub mod summarize;
pub mod types;
pub mod upstream;
pub mod weekdate;
