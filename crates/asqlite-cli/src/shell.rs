// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asqlite shell` command implementation.
//!
//! Interactive REPL with readline history. SQL accumulates across lines
//! until one ends with `;`. Lines starting with `.` are meta commands.
//! Ctrl+C while a statement runs interrupts it; at the prompt it discards
//! the pending input, or exits when there is none.

use std::io::Write;

use asqlite::{
    escape_like, quote_identifier, AsqliteError, Connection, ConnectionConfig, Params, Result,
};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::exec;

/// One line of input, interpreted against what was typed before it.
#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Incomplete,
    Sql(String),
    Meta(Meta),
}

#[derive(Debug, PartialEq)]
enum Meta {
    Quit,
    Help,
    Tables(Option<String>),
    Count(String),
    Stats,
    Unknown(String),
}

/// Runs the `asqlite shell` interactive REPL.
pub async fn run_shell(config: &ConnectionConfig) -> Result<()> {
    let conn = Connection::open_with(config)?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| AsqliteError::internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "asqlite shell".bold().green());
    println!(
        "Connected to {}. Type {} for commands, {} to exit.\n",
        conn.database().cyan(),
        ".help".yellow(),
        ".quit".yellow()
    );

    let prompt = format!("{}> ", "asqlite".green());
    let continuation = format!("{}> ", "   ...".green());
    let mut buffer = String::new();
    let mut stdout = std::io::stdout();

    loop {
        let shown = if buffer.is_empty() { &prompt } else { &continuation };
        match rl.readline(shown) {
            Ok(line) => match parse_line(&mut buffer, &line) {
                Input::Empty | Input::Incomplete => {}
                Input::Meta(Meta::Quit) => break,
                Input::Meta(meta) => {
                    let _ = rl.add_history_entry(line.trim());
                    if let Err(e) = run_meta(&conn, meta, &mut stdout).await {
                        eprintln!("{}: {e}", "error".red());
                    }
                }
                Input::Sql(sql) => {
                    let _ = rl.add_history_entry(sql.as_str());
                    if let Err(e) = run_sql(&conn, &sql, &mut stdout).await {
                        eprintln!("{}: {e}", "error".red());
                    }
                }
            },
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                if buffer.is_empty() {
                    break;
                }
                buffer.clear();
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    conn.close().await
}

fn parse_line(buffer: &mut String, line: &str) -> Input {
    let trimmed = line.trim();
    if buffer.is_empty() {
        if trimmed.is_empty() {
            return Input::Empty;
        }
        if let Some(command) = trimmed.strip_prefix('.') {
            return Input::Meta(parse_meta(command));
        }
    } else {
        buffer.push('\n');
    }
    buffer.push_str(line.trim_end());

    if trimmed.ends_with(';') {
        let sql = std::mem::take(buffer);
        Input::Sql(sql.trim().trim_end_matches(';').trim_end().to_string())
    } else {
        Input::Incomplete
    }
}

fn parse_meta(command: &str) -> Meta {
    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("quit" | "exit"), None) => Meta::Quit,
        (Some("help"), None) => Meta::Help,
        (Some("tables"), pattern) => Meta::Tables(pattern.map(str::to_string)),
        (Some("count"), Some(table)) => Meta::Count(table.to_string()),
        (Some("stats"), None) => Meta::Stats,
        _ => Meta::Unknown(command.to_string()),
    }
}

/// Run one statement; Ctrl+C interrupts it.
async fn run_sql<W: Write>(conn: &Connection, sql: &str, out: &mut W) -> Result<()> {
    debug!(sql = %sql, "executing");
    let work = async {
        let cursor = conn.execute(sql, ()).await?;
        exec::print_cursor(cursor, out).await
    };
    tokio::pin!(work);
    tokio::select! {
        result = &mut work => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            conn.interrupt();
            work.await
        }
    }
}

async fn run_meta<W: Write>(conn: &Connection, meta: Meta, out: &mut W) -> Result<()> {
    let written = match meta {
        Meta::Quit => Ok(()),
        Meta::Help => writeln!(
            out,
            ".tables [TEXT]  list tables and views, optionally filtered\n\
             .count TABLE    count the rows of TABLE\n\
             .stats          show connection counters\n\
             .quit           exit the shell"
        ),
        Meta::Tables(pattern) => {
            let names = list_tables(conn, pattern.as_deref()).await?;
            writeln!(out, "{}", names.join("\n"))
        }
        Meta::Count(table) => {
            let count = count_rows(conn, &table).await?;
            writeln!(out, "{count}")
        }
        Meta::Stats => {
            let stats = conn.stats().await?;
            writeln!(
                out,
                "open cursors: {}\ncursors released: {}\ntasks completed: {}",
                stats.open_cursors, stats.cursors_released, stats.tasks_completed
            )
        }
        Meta::Unknown(command) => writeln!(out, "unknown command `.{command}`; try .help"),
    };
    written.map_err(|e| AsqliteError::internal(format!("failed to write output: {e}")))
}

/// Names of user tables and views containing `pattern`, sorted.
async fn list_tables(conn: &Connection, pattern: Option<&str>) -> Result<Vec<String>> {
    let like = format!("%{}%", escape_like(pattern.unwrap_or("")));
    let mut cursor = conn
        .execute(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') \
               AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
               AND name LIKE ?1 ESCAPE '\\' \
             ORDER BY name",
            Params::from([like]),
        )
        .await?;
    cursor
        .fetch_all()
        .await?
        .iter()
        .map(|row| row.get::<String>(0))
        .collect()
}

async fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT count(*) FROM {}", quote_identifier(table));
    let mut cursor = conn.execute(sql, ()).await?;
    match cursor.fetch_one().await? {
        Some(row) => row.get(0),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_accumulate_until_a_semicolon() {
        let mut buffer = String::new();
        assert_eq!(parse_line(&mut buffer, "SELECT 1,"), Input::Incomplete);
        assert_eq!(parse_line(&mut buffer, "  2;"), Input::Sql("SELECT 1,\n  2".into()));
        assert!(buffer.is_empty());
        assert_eq!(parse_line(&mut buffer, "   "), Input::Empty);
    }

    #[test]
    fn meta_commands_only_start_a_fresh_statement() {
        let mut buffer = String::new();
        assert_eq!(parse_line(&mut buffer, ".quit"), Input::Meta(Meta::Quit));
        assert_eq!(parse_line(&mut buffer, "SELECT"), Input::Incomplete);
        assert_eq!(parse_line(&mut buffer, ".x;"), Input::Sql("SELECT\n.x".into()));
    }

    #[test]
    fn meta_commands_parse_their_arguments() {
        assert_eq!(parse_meta("tables"), Meta::Tables(None));
        assert_eq!(parse_meta("tables us"), Meta::Tables(Some("us".into())));
        assert_eq!(parse_meta("count users"), Meta::Count("users".into()));
        assert_eq!(parse_meta("count"), Meta::Unknown("count".into()));
        assert_eq!(parse_meta("exit"), Meta::Quit);
        assert_eq!(parse_meta("frobnicate"), Meta::Unknown("frobnicate".into()));
    }

    async fn sample() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_script(
            "CREATE TABLE users(id);
             CREATE TABLE user_roles(id);
             CREATE TABLE \"odd \"\"name\"(id);
             CREATE VIEW active_users AS SELECT id FROM users;
             INSERT INTO users VALUES (1), (2);",
        )
        .await
        .unwrap();
        conn
    }

    #[tokio::test]
    async fn tables_are_filtered_literally() {
        let conn = sample().await;
        let all = list_tables(&conn, None).await.unwrap();
        assert_eq!(all, vec!["active_users", "odd \"name", "user_roles", "users"]);

        // `_` is a literal here, not a single-character wildcard.
        let filtered = list_tables(&conn, Some("s_r")).await.unwrap();
        assert!(filtered.is_empty());
        let filtered = list_tables(&conn, Some("user_")).await.unwrap();
        assert_eq!(filtered, vec!["user_roles"]);
    }

    #[tokio::test]
    async fn count_quotes_the_table_name() {
        let conn = sample().await;
        assert_eq!(count_rows(&conn, "users").await.unwrap(), 2);
        assert_eq!(count_rows(&conn, "odd \"name").await.unwrap(), 0);
        assert!(count_rows(&conn, "missing").await.is_err());
    }

    #[tokio::test]
    async fn stats_and_unknown_commands_print() {
        let conn = sample().await;
        let mut out = Vec::new();
        run_meta(&conn, Meta::Stats, &mut out).await.unwrap();
        run_meta(&conn, Meta::Unknown("nope".into()), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("open cursors: 0"));
        assert!(text.contains("unknown command `.nope`"));
    }

    #[tokio::test]
    async fn sql_results_are_printed() {
        let conn = sample().await;
        let mut out = Vec::new();
        run_sql(&conn, "SELECT id FROM users ORDER BY id", &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id\n--\n1\n2\n");
    }
}
