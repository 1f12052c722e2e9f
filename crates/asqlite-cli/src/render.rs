// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text table rendering for result rows.

use asqlite::Row;

/// Render `rows` under `columns` as a left-aligned, pipe-separated table.
pub fn render_table(columns: &[String], rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().iter().map(ToString::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, columns.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for line in &cells {
        push_line(&mut out, line.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

/// One-line summary for statements that return no rows.
pub fn summary(rows_affected: u64, last_insert_rowid: Option<i64>) -> String {
    match last_insert_rowid {
        Some(rowid) if rows_affected > 0 => {
            format!("{rows_affected} row(s) affected, last rowid {rowid}")
        }
        _ => format!("{rows_affected} row(s) affected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asqlite::Value;
    use std::sync::Arc;

    #[test]
    fn columns_are_padded_to_the_widest_cell() {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        let rows = vec![
            Row::new(columns.clone(), vec![Value::Integer(1), Value::Text("alpha".into())]),
            Row::new(columns.clone(), vec![Value::Integer(200), Value::Null]),
        ];
        let table = render_table(&columns, &rows);
        assert_eq!(
            table,
            "id  | name\n\
             --- | -----\n\
             1   | alpha\n\
             200 | NULL\n"
        );
    }

    #[test]
    fn empty_results_still_print_the_header() {
        let columns = vec!["x".to_string()];
        assert_eq!(render_table(&columns, &[]), "x\n-\n");
    }

    #[test]
    fn summary_mentions_rowid_only_for_changes() {
        assert_eq!(summary(1, Some(4)), "1 row(s) affected, last rowid 4");
        assert_eq!(summary(0, Some(4)), "0 row(s) affected");
        assert_eq!(summary(3, None), "3 row(s) affected");
    }
}
