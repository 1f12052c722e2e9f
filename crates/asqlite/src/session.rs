// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-side state: the borrowed handle and every open prepared query.
//!
//! A `Session` lives on the worker thread's stack for as long as the
//! connection is open. Its lifetime parameter ties each prepared statement to
//! the handle, so no statement can escape the worker or outlive the close.

use std::collections::HashMap;
use std::sync::Arc;

use asqlite_core::{AsqliteError, ConnectionStats, IsolationLevel, Params, Result, Row, Value};
use rusqlite::Statement;
use tracing::{debug, trace};

/// Key of one worker-side query state, handed to the owning cursor.
pub(crate) type CursorId = u64;

struct QueryState<'c> {
    stmt: Statement<'c>,
    columns: Arc<[String]>,
}

/// What a cursor needs to know about the statement that created it.
#[derive(Debug)]
pub(crate) struct QueryInfo {
    /// `None` when the statement finished inside the creating task.
    pub id: Option<CursorId>,
    pub columns: Arc<[String]>,
    /// Rows already read by the creating task.
    pub rows: Vec<Row>,
    pub last_insert_rowid: Option<i64>,
    pub rows_affected: u64,
}

/// One batch pulled from an open query.
#[derive(Debug)]
pub(crate) struct Batch {
    pub rows: Vec<Row>,
    /// The query has no more rows and its state has been released.
    pub done: bool,
}

pub(crate) struct Session<'c> {
    conn: &'c rusqlite::Connection,
    queries: HashMap<CursorId, QueryState<'c>>,
    next_id: CursorId,
    released: u64,
    completed: u64,
}

impl<'c> Session<'c> {
    pub(crate) fn new(conn: &'c rusqlite::Connection) -> Self {
        Self {
            conn,
            queries: HashMap::new(),
            next_id: 1,
            released: 0,
            completed: 0,
        }
    }

    /// The borrowed handle.
    pub(crate) fn conn(&self) -> &'c rusqlite::Connection {
        self.conn
    }

    /// Prepare, bind, and step `sql`.
    ///
    /// Side effects happen here, not on the first fetch. A read-only query is
    /// stepped once; a statement that writes is run to completion and its
    /// rows (such as `RETURNING` output) are buffered, because SQLite only
    /// reports the change count once the statement finishes. A statement that
    /// finishes here is finalized before returning.
    pub(crate) fn execute(&mut self, sql: &str, params: &Params) -> Result<QueryInfo> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        params.bind(&mut stmt)?;

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let readonly = stmt.readonly();
        let batch = if readonly { 1 } else { usize::MAX };
        let (rows, done) = pull(&mut stmt, &columns, batch)?;
        let (last_insert_rowid, rows_affected) = outcome(conn, readonly);

        let id = if done {
            None
        } else {
            let id = self.next_id;
            self.next_id += 1;
            self.queries.insert(
                id,
                QueryState {
                    stmt,
                    columns: columns.clone(),
                },
            );
            trace!(cursor = id, open = self.queries.len(), "query state registered");
            Some(id)
        };

        Ok(QueryInfo {
            id,
            columns,
            rows,
            last_insert_rowid,
            rows_affected,
        })
    }

    /// Run one prepared statement once per parameter set.
    pub(crate) fn execute_many(&mut self, sql: &str, param_sets: &[Params]) -> Result<QueryInfo> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let readonly = stmt.readonly();
        let mut rows_affected = 0u64;
        for params in param_sets {
            params.bind(&mut stmt)?;
            rows_affected += stmt.raw_execute()? as u64;
        }

        // Several executions leave no single rowid to report.
        Ok(QueryInfo {
            id: None,
            columns: Arc::from(Vec::new()),
            rows: Vec::new(),
            last_insert_rowid: None,
            rows_affected: if readonly { 0 } else { rows_affected },
        })
    }

    /// Run a semicolon-separated script. Rows produced by it are discarded.
    pub(crate) fn execute_script(&mut self, script: &str) -> Result<QueryInfo> {
        let conn = self.conn();
        conn.execute_batch(script)?;
        let (last_insert_rowid, rows_affected) = outcome(conn, false);
        Ok(QueryInfo {
            id: None,
            columns: Arc::from(Vec::new()),
            rows: Vec::new(),
            last_insert_rowid,
            rows_affected,
        })
    }

    /// Pull up to `max` rows from an open query.
    ///
    /// The state is released when the query runs out of rows or fails.
    pub(crate) fn fetch(&mut self, id: CursorId, max: usize) -> Result<Batch> {
        let state = self
            .queries
            .get_mut(&id)
            .ok_or_else(|| AsqliteError::usage(format!("cursor {id} has no open query")))?;
        match pull(&mut state.stmt, &state.columns, max) {
            Ok((rows, false)) => Ok(Batch { rows, done: false }),
            Ok((rows, true)) => {
                self.release(id);
                Ok(Batch { rows, done: true })
            }
            Err(e) => {
                self.release(id);
                Err(e.into())
            }
        }
    }

    /// Finalize one query state. Returns `false` if it was already gone.
    pub(crate) fn release(&mut self, id: CursorId) -> bool {
        let released = self.queries.remove(&id).is_some();
        if released {
            self.released += 1;
            trace!(cursor = id, open = self.queries.len(), "query state released");
        }
        released
    }

    /// Finalize every open query state.
    pub(crate) fn release_all(&mut self) {
        let count = self.queries.len();
        if count > 0 {
            self.queries.clear();
            self.released += count as u64;
            debug!(count, "released open query states");
        }
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        let conn = self.conn();
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        let conn = self.conn();
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    pub(crate) fn begin(&mut self, level: IsolationLevel) -> Result<()> {
        self.conn().execute_batch(&level.begin_statement())?;
        Ok(())
    }

    pub(crate) fn in_transaction(&self) -> Result<bool> {
        Ok(!self.conn().is_autocommit())
    }

    pub(crate) fn task_finished(&mut self) {
        self.completed += 1;
    }

    pub(crate) fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            open_cursors: self.queries.len(),
            cursors_released: self.released,
            tasks_completed: self.completed,
        }
    }
}

/// Step `stmt` for at most `max` rows.
///
/// Returns `true` alongside the rows when the statement completed (SQLite has
/// already reset it). Otherwise the statement is left positioned mid-result
/// so the next pull continues where this one stopped.
fn pull(
    stmt: &mut Statement<'_>,
    columns: &Arc<[String]>,
    max: usize,
) -> rusqlite::Result<(Vec<Row>, bool)> {
    let max = max.max(1);
    let width = columns.len();
    let mut batch = Vec::with_capacity(max.min(256));
    let mut rows = stmt.raw_query();
    while batch.len() < max {
        let Some(row) = rows.next()? else {
            return Ok((batch, true));
        };
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(Value::from(row.get_ref(i)?));
        }
        batch.push(Row::new(columns.clone(), values));
    }
    // Dropping `Rows` resets the statement, which would restart the query on
    // the next pull. It owns nothing but borrows, so forgetting it leaks nothing.
    std::mem::forget(rows);
    Ok((batch, false))
}

/// Last insert rowid and change count as seen right after a statement ran.
fn outcome(conn: &rusqlite::Connection, readonly: bool) -> (Option<i64>, u64) {
    if readonly {
        return (None, 0);
    }
    (Some(conn.last_insert_rowid()), conn.changes() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t(x INTEGER);
             INSERT INTO t VALUES (1), (2), (3), (4), (5);",
        )
        .unwrap();
        conn
    }

    fn ints(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.get::<i64>(0).unwrap()).collect()
    }

    #[test]
    fn first_row_is_read_at_execute_time() {
        let conn = conn();
        let mut session = Session::new(&conn);
        let info = session
            .execute("SELECT x FROM t ORDER BY x", &Params::None)
            .unwrap();
        assert_eq!(ints(&info.rows), vec![1]);
        assert_eq!(&*info.columns, &["x".to_string()]);
        assert!(info.id.is_some());
        assert_eq!(session.stats().open_cursors, 1);
    }

    #[test]
    fn batches_continue_where_the_previous_one_stopped() {
        let conn = conn();
        let mut session = Session::new(&conn);
        let id = session
            .execute("SELECT x FROM t ORDER BY x", &Params::None)
            .unwrap()
            .id
            .unwrap();

        let first = session.fetch(id, 2).unwrap();
        assert_eq!(ints(&first.rows), vec![2, 3]);
        assert!(!first.done);

        let second = session.fetch(id, 10).unwrap();
        assert_eq!(ints(&second.rows), vec![4, 5]);
        assert!(second.done);

        let stats = session.stats();
        assert_eq!(stats.open_cursors, 0);
        assert_eq!(stats.cursors_released, 1);
        assert!(session.fetch(id, 1).is_err());
    }

    #[test]
    fn statements_without_rows_finish_immediately() {
        let conn = conn();
        let mut session = Session::new(&conn);
        let info = session
            .execute("INSERT INTO t VALUES (?1)", &Params::from([6]))
            .unwrap();
        assert!(info.id.is_none());
        assert!(info.rows.is_empty());
        assert_eq!(info.rows_affected, 1);
        assert_eq!(info.last_insert_rowid, Some(6));
        assert_eq!(session.stats().open_cursors, 0);
    }

    #[test]
    fn writes_run_to_completion_and_buffer_returned_rows() {
        let conn = conn();
        let mut session = Session::new(&conn);
        session.execute("DELETE FROM t", &Params::None).unwrap();
        let info = session
            .execute("INSERT INTO t VALUES (10), (20) RETURNING x", &Params::None)
            .unwrap();
        assert!(info.id.is_none());
        assert_eq!(ints(&info.rows), vec![10, 20]);
        assert_eq!(info.rows_affected, 2);
        assert_eq!(session.stats().open_cursors, 0);
    }

    #[test]
    fn execute_many_sums_changes() {
        let conn = conn();
        let mut session = Session::new(&conn);
        let sets = vec![Params::from([10]), Params::from([11]), Params::from([12])];
        let info = session
            .execute_many("INSERT INTO t VALUES (?1)", &sets)
            .unwrap();
        assert_eq!(info.rows_affected, 3);
        assert_eq!(info.last_insert_rowid, None);
        let err = session
            .execute_many("SELECT x FROM t", &[Params::None])
            .unwrap_err();
        assert!(matches!(
            err,
            AsqliteError::Resource {
                source: rusqlite::Error::ExecuteReturnedResults
            }
        ));
    }

    #[test]
    fn release_all_finalizes_everything() {
        let conn = conn();
        let mut session = Session::new(&conn);
        for _ in 0..3 {
            session.execute("SELECT x FROM t", &Params::None).unwrap();
        }
        session.release_all();
        let stats = session.stats();
        assert_eq!(stats.open_cursors, 0);
        assert_eq!(stats.cursors_released, 3);
        assert!(!session.release(1));
    }

    #[test]
    fn commit_and_rollback_are_noops_outside_a_transaction() {
        let conn = conn();
        let mut session = Session::new(&conn);
        session.commit().unwrap();
        session.rollback().unwrap();
        session.begin(IsolationLevel::Immediate).unwrap();
        assert!(session.in_transaction().unwrap());
        session.rollback().unwrap();
        assert!(!session.in_transaction().unwrap());
    }
}
