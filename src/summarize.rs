//! Period summaries over already-bucketed day-level data.
//!
//! This re-aggregates the payload's per-day breakdowns — it never triggers a
//! new upstream fetch. Fields that resolve to no column contribute 0.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::round2;
use crate::types::TabAgg;
use crate::weekdate;

/// Sum each named field over days whose date falls within `[start, end]`
/// inclusive. A reversed range is swapped rather than rejected.
pub fn summarize_period(
    tab: &TabAgg,
    start: NaiveDate,
    end: NaiveDate,
    fields: &[String],
) -> BTreeMap<String, f64> {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };

    let indices: Vec<Option<usize>> = fields
        .iter()
        .map(|field| tab.headers_out.iter().position(|h| h == field))
        .collect();

    let mut totals: BTreeMap<String, f64> =
        fields.iter().map(|f| (f.clone(), 0.0)).collect();

    for week in &tab.weeks {
        for day in &week.days {
            let Some(date) = weekdate::parse_ymd(&day.date) else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            for (field, index) in fields.iter().zip(&indices) {
                let Some(col) = index else { continue };
                if let Some(value) = day.sums.get(*col) {
                    if let Some(total) = totals.get_mut(field) {
                        *total += value;
                    }
                }
            }
        }
    }

    for value in totals.values_mut() {
        *value = round2(*value);
    }
    totals
}
