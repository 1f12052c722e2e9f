// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escaping helpers for values spliced into SQL text (identifiers, LIKE patterns).

/// Prefix every character of `param` found in `forbidden` with `escape`.
pub fn sql_escape(param: &str, forbidden: &[char], escape: &str) -> String {
    let mut out = String::with_capacity(param.len());
    for c in param.chars() {
        if forbidden.contains(&c) {
            out.push_str(escape);
        }
        out.push(c);
    }
    out
}

/// Quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", sql_escape(ident, &['"'], "\""))
}

/// Escape a string for use inside `LIKE ... ESCAPE '\'`.
pub fn escape_like(pattern: &str) -> String {
    sql_escape(pattern, &['%', '_', '\\'], "\\")
}
