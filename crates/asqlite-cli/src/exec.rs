// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asqlite exec` command implementation.

use std::io::Write;

use asqlite::{AsqliteError, Connection, ConnectionConfig, Cursor, Result, Row};
use futures::TryStreamExt;
use tracing::debug;

use crate::render;

/// Run every statement in order on one connection, writing results to `out`.
///
/// Stops at the first failing statement. The connection is closed either way.
pub async fn run_exec<W: Write>(
    config: &ConnectionConfig,
    statements: &[String],
    out: &mut W,
) -> Result<()> {
    let conn = Connection::open_with(config)?;
    let result = run_statements(&conn, statements, out).await;
    let closed = conn.close().await;
    result.and(closed)
}

async fn run_statements<W: Write>(
    conn: &Connection,
    statements: &[String],
    out: &mut W,
) -> Result<()> {
    for sql in statements {
        debug!(sql = %sql, "executing");
        let cursor = conn.execute(sql.as_str(), ()).await?;
        print_cursor(cursor, out).await?;
    }
    Ok(())
}

/// Print a cursor's rows as a table, or a change summary if it has no
/// result columns.
pub async fn print_cursor<W: Write>(cursor: Cursor, out: &mut W) -> Result<()> {
    if cursor.columns().is_empty() {
        let line = render::summary(cursor.rows_affected(), cursor.last_insert_rowid());
        return writeln!(out, "{line}").map_err(io_error);
    }
    let columns = cursor.columns().to_vec();
    let rows: Vec<Row> = cursor.into_stream().try_collect().await?;
    write!(out, "{}", render::render_table(&columns, &rows)).map_err(io_error)
}

fn io_error(e: std::io::Error) -> AsqliteError {
    AsqliteError::internal(format!("failed to write output: {e}"))
}
