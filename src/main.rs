//! One-shot CLI around the aggregation service: fetches through the cache
//! and prints the result as JSON. The dashboard's HTTP layer calls the same
//! api:: functions; this binary exists for operators and cron probes.

use std::process::ExitCode;

use pulseboard::api;
use pulseboard::error::ApiError;
use pulseboard::state::{load_config, AppState};
use pulseboard::types::SummaryQuery;

fn usage() -> ExitCode {
    eprintln!(
        "usage: pulseboard [--force] <command>\n\
         commands:\n\
         \x20 payload                          full dashboard payload (default)\n\
         \x20 stats                            tracker board rollups\n\
         \x20 values <year>                    raw per-year sheet values\n\
         \x20 summary <start> <end> <field>..  period totals (dates YYYY-MM-DD)\n\
         \x20 link <doc>                       browser edit link\n\
         \x20 goal-date [YYYY-MM-DD]           read or set the videos goal date"
    );
    ExitCode::from(2)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::Configuration(format!("Serialize error: {}", e)))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let force = args.iter().any(|a| a == "--force");
    args.retain(|a| a != "--force");

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let state = AppState::new(config);

    let result: Result<String, ApiError> = match args.first().map(String::as_str) {
        None | Some("payload") => match api::board_payload(&state, force).await {
            Ok(payload) => to_json(&*payload),
            Err(err) => Err(err),
        },
        Some("stats") => match api::tracker_stats(&state, force).await {
            Ok(stats) => to_json(&*stats),
            Err(err) => Err(err),
        },
        Some("values") => {
            let Some(year) = args.get(1) else {
                return usage();
            };
            match api::sheet_values(&state, year, force).await {
                Ok(values) => to_json(&*values),
                Err(err) => Err(err),
            }
        }
        Some("summary") => {
            let (Some(start), Some(end)) = (args.get(1), args.get(2)) else {
                return usage();
            };
            let fields: Vec<String> = args[3..].to_vec();
            let query = SummaryQuery {
                start: start.clone(),
                end: end.clone(),
                fields,
                tab: None,
                force,
            };
            match api::board_summary(&state, query).await {
                Ok(summary) => to_json(&summary),
                Err(err) => Err(err),
            }
        }
        Some("link") => {
            let Some(doc) = args.get(1) else {
                return usage();
            };
            api::sheet_edit_link(&state, doc)
        }
        Some("goal-date") => match args.get(1) {
            Some(value) => api::set_goal_date(&state, value).map(|_| value.clone()),
            None => api::goal_date(&state).map(|d| d.unwrap_or_else(|| "(unset)".to_string())),
        },
        Some(_) => return usage(),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error ({}): {}", err.status_code(), err);
            ExitCode::FAILURE
        }
    }
}
