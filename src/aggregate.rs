//! Daily aggregation and ISO-week bucketing.
//!
//! Rows from one or more projected sources are merged by calendar date into
//! per-day sum vectors, then grouped into ISO-week buckets that keep the
//! per-day breakdown alongside the weekly totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::projector::ProjectedTable;
use crate::types::{Cell, DateFormat};
use crate::weekdate::{self, IsoWeek};

/// A projected source table together with its date-column layout.
pub struct SourceTable<'a> {
    pub table: &'a ProjectedTable,
    pub date_format: DateFormat,
}

/// Column layout of the merged day vectors: source names with their value
/// column widths, in merge order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeLayout {
    pub sources: Vec<(String, usize)>,
}

impl MergeLayout {
    pub fn column_count(&self) -> usize {
        self.sources.iter().map(|(_, w)| w).sum()
    }
}

/// Per-day sums, one vector per source. A date that appears in several rows
/// of the same source accumulates; a date missing from a source keeps that
/// source's zero vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub per_source_sums: BTreeMap<String, Vec<f64>>,
}

impl DailyRecord {
    /// The day's sums concatenated in merge order.
    pub fn merged_sums(&self, layout: &MergeLayout) -> Vec<f64> {
        let mut out = Vec::with_capacity(layout.column_count());
        for (source, width) in &layout.sources {
            match self.per_source_sums.get(source) {
                Some(v) => out.extend_from_slice(v),
                None => out.extend(std::iter::repeat(0.0).take(*width)),
            }
        }
        out
    }
}

/// One ISO-week bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekBucket {
    pub iso_year: i32,
    pub iso_week: u32,
    /// Min/max calendar date of the constituent days — a bucket starts later
    /// than the ISO week's Monday when no data exists for earlier days.
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sums: Vec<f64>,
    pub days: Vec<DayValues>,
}

impl WeekBucket {
    pub fn week_of(&self) -> IsoWeek {
        IsoWeek {
            year: self.iso_year,
            week: self.iso_week,
        }
    }
}

/// Day-level entry inside a bucket: the date plus its merged sums.
#[derive(Debug, Clone, PartialEq)]
pub struct DayValues {
    pub date: NaiveDate,
    pub sums: Vec<f64>,
}

/// Walk every source's data rows and accumulate per-day sums.
///
/// Column 0 of each row is parsed as a date in the source's layout; rows
/// whose date does not parse are dropped (expected noise in hand-maintained
/// sheets, not an error). Every other cell parses numerically with 0 for
/// anything unparseable. Output is sorted ascending by date.
pub fn aggregate_daily(sources: &[SourceTable<'_>]) -> (MergeLayout, Vec<DailyRecord>) {
    let layout = MergeLayout {
        sources: sources
            .iter()
            .map(|s| (s.table.source.clone(), s.table.value_columns()))
            .collect(),
    };

    let mut by_date: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();

    for source in sources {
        let width = source.table.value_columns();
        for row in &source.table.rows {
            let raw_date = row.first().map(|c| c.as_text()).unwrap_or_default();
            let Some(date) = weekdate::parse_local_date(&raw_date, source.date_format) else {
                continue;
            };

            let record = by_date.entry(date).or_insert_with(|| DailyRecord {
                date,
                per_source_sums: layout
                    .sources
                    .iter()
                    .map(|(name, w)| (name.clone(), vec![0.0; *w]))
                    .collect(),
            });

            let Some(sums) = record.per_source_sums.get_mut(&source.table.source) else {
                continue;
            };
            for i in 0..width {
                sums[i] += row.get(i + 1).map(Cell::as_number).unwrap_or(0.0);
            }
        }
    }

    (layout, by_date.into_values().collect())
}

/// Group pre-sorted daily records into ISO-week buckets.
///
/// The caller guarantees ascending date order (aggregate_daily emits it);
/// unsorted input skews nothing but the day ordering inside a bucket, since
/// start/end use real min/max comparisons.
pub fn bucket_weeks(records: &[DailyRecord], layout: &MergeLayout) -> Vec<WeekBucket> {
    let column_count = layout.column_count();
    let mut buckets: BTreeMap<(i32, u32), WeekBucket> = BTreeMap::new();

    for record in records {
        let week = weekdate::iso_week_of(record.date);
        let bucket = buckets
            .entry((week.year, week.week))
            .or_insert_with(|| WeekBucket {
                iso_year: week.year,
                iso_week: week.week,
                start: record.date,
                end: record.date,
                sums: vec![0.0; column_count],
                days: Vec::new(),
            });

        if record.date < bucket.start {
            bucket.start = record.date;
        }
        if record.date > bucket.end {
            bucket.end = record.date;
        }

        let day_sums = record.merged_sums(layout);
        for (i, v) in day_sums.iter().enumerate() {
            bucket.sums[i] += v;
        }
        bucket.days.push(DayValues {
            date: record.date,
            sums: day_sums,
        });
    }

    buckets.into_values().collect()
}

/// Display rounding for emitted sums: two decimals, but only when the value
/// is non-integral (5.0 stays 5, not 5.00). Internal accumulation is never
/// rounded.
pub fn round2(x: f64) -> f64 {
    if x.fract() == 0.0 {
        x
    } else {
        (x * 100.0).round() / 100.0
    }
}
