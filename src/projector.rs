//! Column projection — narrows each source's rows to its declared columns.
//!
//! Spreadsheet rows are routinely ragged; indices past the end of a row
//! project to an empty cell instead of failing the whole table.

use std::collections::HashMap;

use crate::types::Cell;

/// A raw values matrix for one source tab, row 0 being the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub source: String,
    pub range: String,
    pub values: Vec<Vec<Cell>>,
}

/// Source name → ordered zero-based column indices to retain. Indices refer
/// to positions in the original row and apply to header and data rows alike.
pub type ColumnSelection = HashMap<String, Vec<usize>>;

/// A projected table: header labels split off from the data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTable {
    pub source: String,
    pub range: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ProjectedTable {
    /// Number of numeric value columns (everything after the date column).
    pub fn value_columns(&self) -> usize {
        self.headers.len().saturating_sub(1)
    }
}

/// Project a table through its column selection. A source absent from the
/// selection (or with an empty index list) passes through unprojected.
pub fn project(table: RawTable, selection: &ColumnSelection) -> ProjectedTable {
    let keep = selection.get(&table.source).filter(|k| !k.is_empty());

    let projected: Vec<Vec<Cell>> = match keep {
        Some(indices) => table
            .values
            .into_iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect(),
        None => table.values,
    };

    let mut rows = projected.into_iter();
    let headers: Vec<String> = rows
        .next()
        .map(|hdr| hdr.iter().map(Cell::as_text).collect())
        .unwrap_or_default();

    ProjectedTable {
        source: table.source,
        range: table.range,
        headers,
        rows: rows.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn table(source: &str, values: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            source: source.to_string(),
            range: format!("{}!A1:L", source),
            values,
        }
    }

    #[test]
    fn keeps_declared_columns_in_order() {
        let mut sel = ColumnSelection::new();
        sel.insert("Outreach".to_string(), vec![0, 2]);

        let out = project(
            table(
                "Outreach",
                vec![
                    vec![t("Date"), t("Calls"), t("DMs")],
                    vec![t("01.01.2025"), t("4"), t("12")],
                ],
            ),
            &sel,
        );

        assert_eq!(out.headers, vec!["Date", "DMs"]);
        assert_eq!(out.rows, vec![vec![t("01.01.2025"), t("12")]]);
        assert_eq!(out.value_columns(), 1);
    }

    #[test]
    fn unselected_source_passes_through() {
        let sel = ColumnSelection::new();
        let out = project(
            table(
                "Content",
                vec![vec![t("Date"), t("Posts")], vec![t("02.01.2025"), t("3")]],
            ),
            &sel,
        );
        assert_eq!(out.headers, vec!["Date", "Posts"]);
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn ragged_rows_pad_with_empty_cells() {
        let mut sel = ColumnSelection::new();
        sel.insert("Content".to_string(), vec![0, 1, 5]);

        let out = project(
            table(
                "Content",
                vec![
                    vec![t("Date"), t("Posts")],
                    // row shorter than the projected column list
                    vec![t("03.01.2025")],
                ],
            ),
            &sel,
        );

        assert_eq!(out.headers, vec!["Date", "Posts", ""]);
        assert_eq!(out.rows[0], vec![t("03.01.2025"), t(""), t("")]);
    }

    #[test]
    fn empty_table_yields_empty_headers_and_rows() {
        let sel = ColumnSelection::new();
        let out = project(table("Content", vec![]), &sel);
        assert!(out.headers.is_empty());
        assert!(out.rows.is_empty());
    }

    #[test]
    fn numeric_header_cells_become_labels() {
        let sel = ColumnSelection::new();
        let out = project(
            table("Revenue", vec![vec![Cell::Number(2025.0), t("Umsatz")]]),
            &sel,
        );
        assert_eq!(out.headers, vec!["2025", "Umsatz"]);
    }
}
