//! Calendar date parsing and ISO-8601 week mapping.
//!
//! Dates in the source sheets are free-text in a per-tab layout; parsing is
//! total (returns `None`, never an error) because hand-maintained sheets are
//! expected to contain noise.

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::types::DateFormat;

/// Numeric encoding of an ISO week: isoYear * 100 + isoWeek (202547 = 2025
/// week 47). Lets goal ranges and future-week checks compare numerically.
pub type WeekId = i32;

/// An (ISO year, ISO week) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    pub fn id(&self) -> WeekId {
        self.year * 100 + self.week as i32
    }

    /// Display key, e.g. `"2025-W07"`.
    pub fn key(&self) -> String {
        format!("{}-W{:02}", self.year, self.week)
    }
}

/// Parse a free-text date string in the given layout.
///
/// Returns `None` for anything that does not match the layout or is not a
/// real calendar date (day 32, month 13, trailing garbage). The layout is
/// always supplied by the caller; it is never guessed from the string.
pub fn parse_local_date(raw: &str, format: DateFormat) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let pattern = match format {
        DateFormat::DayMonthYearDots => "%d.%m.%Y",
        DateFormat::MonthDayYearSlashes => "%m/%d/%Y",
    };
    NaiveDate::parse_from_str(trimmed, pattern).ok()
}

/// Map a date to its ISO-8601 week: weeks run Monday-Sunday and week 1 is
/// the week containing the year's first Thursday.
pub fn iso_week_of(date: NaiveDate) -> IsoWeek {
    let w = date.iso_week();
    IsoWeek {
        year: w.year(),
        week: w.week(),
    }
}

/// `"YYYY-MM-DD"`; round-trips exactly with [`parse_ymd`].
pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_ymd(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// The current ISO week in the given timezone. Future-week suppression keys
/// off this, so "now" follows the zone the sheets are maintained in rather
/// than the server's zone.
pub fn current_week(tz: Tz) -> IsoWeek {
    iso_week_of(Utc::now().with_timezone(&tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_dotted_day_month_year() {
        assert_eq!(
            parse_local_date("24.12.2025", DateFormat::DayMonthYearDots),
            Some(d(2025, 12, 24))
        );
        // single-digit day and month
        assert_eq!(
            parse_local_date("1.1.2025", DateFormat::DayMonthYearDots),
            Some(d(2025, 1, 1))
        );
    }

    #[test]
    fn parses_slashed_month_day_year() {
        assert_eq!(
            parse_local_date("12/24/2025", DateFormat::MonthDayYearSlashes),
            Some(d(2025, 12, 24))
        );
    }

    #[test]
    fn rejects_invalid_calendar_dates() {
        assert_eq!(parse_local_date("32.01.2025", DateFormat::DayMonthYearDots), None);
        assert_eq!(parse_local_date("01.13.2025", DateFormat::DayMonthYearDots), None);
        assert_eq!(parse_local_date("02/29/2025", DateFormat::MonthDayYearSlashes), None);
    }

    #[test]
    fn rejects_wrong_layout_and_noise() {
        // layout is caller-supplied, never inferred
        assert_eq!(parse_local_date("12/24/2025", DateFormat::DayMonthYearDots), None);
        assert_eq!(parse_local_date("24.12.2025", DateFormat::MonthDayYearSlashes), None);
        assert_eq!(parse_local_date("", DateFormat::DayMonthYearDots), None);
        assert_eq!(parse_local_date("Summe", DateFormat::DayMonthYearDots), None);
        assert_eq!(parse_local_date("24.12.2025 extra", DateFormat::DayMonthYearDots), None);
    }

    #[test]
    fn iso_week_boundary_cases() {
        // Dec 31, 2024 (a Tuesday) belongs to week 1 of 2025.
        let w = iso_week_of(d(2024, 12, 31));
        assert_eq!((w.year, w.week), (2025, 1));

        // Jan 1, 2023 (a Sunday) belongs to week 52 of 2022.
        let w = iso_week_of(d(2023, 1, 1));
        assert_eq!((w.year, w.week), (2022, 52));

        // Mid-year sanity check.
        let w = iso_week_of(d(2025, 7, 1));
        assert_eq!((w.year, w.week), (2025, 27));
    }

    #[test]
    fn week_id_and_key() {
        let w = IsoWeek { year: 2025, week: 7 };
        assert_eq!(w.id(), 202507);
        assert_eq!(w.key(), "2025-W07");
        assert!(IsoWeek { year: 2026, week: 1 }.id() > IsoWeek { year: 2025, week: 52 }.id());
    }

    #[test]
    fn ymd_round_trips() {
        let date = d(2025, 3, 9);
        assert_eq!(parse_ymd(&format_ymd(date)), Some(date));
        assert_eq!(format_ymd(parse_ymd("2025-03-09").unwrap()), "2025-03-09");
    }
}
