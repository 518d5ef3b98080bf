//! Weekly goals and actual-vs-goal status classification.
//!
//! Headers coming out of the merged aggregation carry a source-tab prefix
//! (`"Content:Comments"`). Only base/total columns are goal-classified; part
//! columns (per-person breakdowns like `"J_Comments"`) are display-only and
//! resolve back to their base metric through an alias table with a substring
//! fallback.

use std::collections::BTreeSet;

use crate::types::{GoalsConfig, StatusBand};
use crate::weekdate::{IsoWeek, WeekId};

// ============================================================================
// Column classification
// ============================================================================

/// What a header column represents once classified: a base metric, or a
/// per-person part of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Base,
    PartJ,
    PartA,
}

/// Accepted part markers. A column is a part when its label carries the
/// marker letter next to a separator (prefix `"J_"`/`"J "`/`"J-"`, suffix
/// `"_J"`/`" J"`/`"-J"`) or parenthesized (`"(J)"`), case-insensitive.
const PART_MARKERS: &[(char, ColumnKind)] = &[('J', ColumnKind::PartJ), ('A', ColumnKind::PartA)];

const MARKER_SEPARATORS: &[char] = &['_', ' ', '-'];

/// Strip a `"Source:"` tab prefix from a header label.
pub fn strip_source_prefix(header: &str) -> &str {
    match header.find(':') {
        Some(idx) => header[idx + 1..].trim(),
        None => header.trim(),
    }
}

/// Classify a (already prefix-stripped) column label.
pub fn classify_column(name: &str) -> ColumnKind {
    let trimmed = name.trim();
    for (marker, kind) in PART_MARKERS {
        if has_part_marker(trimmed, *marker) {
            return *kind;
        }
    }
    ColumnKind::Base
}

fn has_part_marker(name: &str, marker: char) -> bool {
    let chars: Vec<char> = name.chars().collect();
    if chars.is_empty() {
        return false;
    }
    let matches_marker = |c: char| c.to_ascii_uppercase() == marker;

    // bare "J", or leading "J_" / "J " / "J-"
    if matches_marker(chars[0]) && (chars.len() == 1 || MARKER_SEPARATORS.contains(&chars[1])) {
        return true;
    }
    // trailing "_J" / " J" / "-J"
    if chars.len() >= 2
        && matches_marker(chars[chars.len() - 1])
        && MARKER_SEPARATORS.contains(&chars[chars.len() - 2])
    {
        return true;
    }
    // parenthesized "(J)" at either end
    let upper = name.to_ascii_uppercase();
    let paren = format!("({})", marker);
    upper.starts_with(&paren) || upper.ends_with(&paren)
}

/// Remove the part marker from a label, yielding the base-name candidate
/// used by the fallback resolution scan ("J_Comments" → "Comments").
fn strip_part_marker(name: &str) -> String {
    let trimmed = name.trim();
    let upper = trimmed.to_ascii_uppercase();

    for (marker, _) in PART_MARKERS {
        let paren = format!("({})", marker);
        if upper.ends_with(&paren) {
            return trimmed[..trimmed.len() - paren.len()]
                .trim_end_matches(MARKER_SEPARATORS)
                .trim()
                .to_string();
        }
        if upper.starts_with(&paren) {
            return trimmed[paren.len()..]
                .trim_start_matches(MARKER_SEPARATORS)
                .trim()
                .to_string();
        }

        let chars: Vec<char> = trimmed.chars().collect();
        let matches_marker = |c: char| c.to_ascii_uppercase() == *marker;
        if !chars.is_empty()
            && matches_marker(chars[0])
            && (chars.len() == 1 || MARKER_SEPARATORS.contains(&chars[1]))
        {
            return chars[1..]
                .iter()
                .collect::<String>()
                .trim_start_matches(MARKER_SEPARATORS)
                .trim()
                .to_string();
        }
        if chars.len() >= 2
            && matches_marker(chars[chars.len() - 1])
            && MARKER_SEPARATORS.contains(&chars[chars.len() - 2])
        {
            return chars[..chars.len() - 2]
                .iter()
                .collect::<String>()
                .trim_end_matches(MARKER_SEPARATORS)
                .trim()
                .to_string();
        }
    }
    trimmed.to_string()
}

// ============================================================================
// Goal book
// ============================================================================

/// Ordered, date-ranged weekly goal sets. The first set whose week range
/// contains the queried week wins; a missing label fails closed (no goal,
/// never an error).
#[derive(Debug, Clone, Default)]
pub struct GoalBook {
    config: GoalsConfig,
}

impl GoalBook {
    pub fn new(config: GoalsConfig) -> Self {
        Self { config }
    }

    /// Weekly goal for a base label in a given week, if any set covers it.
    pub fn resolve(&self, label: &str, week: WeekId) -> Option<f64> {
        self.config
            .sets
            .iter()
            .find(|s| week >= s.from_week && s.to_week.map_or(true, |to| week <= to))
            .and_then(|s| s.goals.get(label).copied())
    }

    /// Whether any goal set knows this base label.
    pub fn is_goal_key(&self, name: &str) -> bool {
        self.config.sets.iter().any(|s| s.goals.contains_key(name))
    }

    /// All base labels across every set, in deterministic order.
    pub fn known_bases(&self) -> BTreeSet<&str> {
        self.config
            .sets
            .iter()
            .flat_map(|s| s.goals.keys().map(String::as_str))
            .collect()
    }

    /// Goal key for a raw header label: strip the tab prefix, refuse part
    /// columns, and require the base label to exist in some goal set.
    pub fn goal_key_from_header(&self, header: &str) -> Option<String> {
        let name = strip_source_prefix(header);
        if classify_column(name) != ColumnKind::Base {
            return None;
        }
        if self.is_goal_key(name) {
            Some(name.to_string())
        } else {
            None
        }
    }

    /// Best-effort base metric for a part column: exact alias table first,
    /// then the marker-stripped candidate against known bases, then a
    /// substring scan. `None` for base columns and unresolvable parts.
    pub fn resolve_part_base(&self, header: &str) -> Option<String> {
        let name = strip_source_prefix(header);
        if classify_column(name) == ColumnKind::Base {
            return None;
        }

        if let Some(base) = self.config.part_aliases.get(name) {
            return Some(base.clone());
        }

        let candidate = strip_part_marker(name);
        if candidate.is_empty() {
            return None;
        }
        if self.is_goal_key(&candidate) {
            return Some(candidate);
        }

        let lowered = candidate.to_ascii_lowercase();
        self.known_bases()
            .into_iter()
            .find(|base| {
                let b = base.to_ascii_lowercase();
                b.contains(&lowered) || lowered.contains(&b)
            })
            .map(|base| base.to_string())
    }
}

// ============================================================================
// Status banding
// ============================================================================

/// Band an actual/goal ratio. Non-finite ratios (goal 0 through division,
/// NaN) are unclassified.
pub fn status_from_ratio(ratio: f64) -> Option<StatusBand> {
    if !ratio.is_finite() {
        return None;
    }
    Some(if ratio < 0.30 {
        StatusBand::Red
    } else if ratio < 0.60 {
        StatusBand::Orange
    } else if ratio < 0.80 {
        StatusBand::Yellow
    } else if ratio <= 1.00 {
        StatusBand::Green
    } else {
        StatusBand::Over
    })
}

/// One status per header for a week bucket.
///
/// Weeks strictly after `now_week` are fully suppressed — the UI must not
/// color ahead of data existing. Current and past weeks classify normally,
/// including zero actuals (ratio 0 → red).
pub fn classify_statuses(
    sums: &[f64],
    headers: &[String],
    book: &GoalBook,
    week: IsoWeek,
    now_week: WeekId,
) -> Vec<Option<StatusBand>> {
    let is_future = week.id() > now_week;
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let key = book.goal_key_from_header(header)?;
            let goal = book.resolve(&key, week.id())?;
            if goal == 0.0 || !goal.is_finite() {
                return None;
            }
            if is_future {
                return None;
            }
            let actual = sums.get(i).copied().unwrap_or(0.0);
            status_from_ratio(actual / goal)
        })
        .collect()
}
