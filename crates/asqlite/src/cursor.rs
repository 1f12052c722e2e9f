// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy, batched access to a query's result rows.

use std::collections::VecDeque;
use std::sync::Arc;

use asqlite_core::{AsqliteError, Result, Row};
use futures::Stream;
use tracing::trace;

use crate::executor::Executor;
use crate::session::{Batch, CursorId, QueryInfo};

/// Where a cursor is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rows may remain, either buffered locally or on the worker.
    Open,
    /// Every row has been handed out; the worker holds nothing for it.
    Exhausted,
    /// Closed explicitly. Terminal.
    Closed,
}

/// Caller-side handle to one query's results.
///
/// Rows are pulled from the worker in batches and handed out one at a time.
/// The query state itself stays on the worker thread. It is released when
/// the rows run out, on [`Cursor::close`], or when an unclosed cursor is
/// dropped, whichever comes first, and exactly once.
pub struct Cursor {
    executor: Arc<Executor>,
    id: Option<CursorId>,
    buffer: VecDeque<Row>,
    columns: Arc<[String]>,
    last_insert_rowid: Option<i64>,
    rows_affected: u64,
    batch_size: usize,
    closed: bool,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("state", &self.state())
            .field("buffered", &self.buffer.len())
            .field("columns", &self.columns)
            .field("last_insert_rowid", &self.last_insert_rowid)
            .field("rows_affected", &self.rows_affected)
            .finish()
    }
}

impl Cursor {
    pub(crate) fn new(executor: Arc<Executor>, info: QueryInfo, batch_size: usize) -> Self {
        Self {
            executor,
            id: info.id,
            buffer: info.rows.into(),
            columns: info.columns,
            last_insert_rowid: info.last_insert_rowid,
            rows_affected: info.rows_affected,
            batch_size: batch_size.max(1),
            closed: false,
        }
    }

    pub fn state(&self) -> CursorState {
        if self.closed {
            CursorState::Closed
        } else if self.id.is_none() && self.buffer.is_empty() {
            CursorState::Exhausted
        } else {
            CursorState::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Column names of the result set; empty for statements without one.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rowid of the last insert made by the connection, as observed right
    /// after this cursor's statement ran. `Some(0)` if nothing was ever
    /// inserted. `None` for read-only statements and for `execute_many`.
    pub fn last_insert_rowid(&self) -> Option<i64> {
        self.last_insert_rowid
    }

    /// Rows changed by the statement; `0` for read-only statements.
    ///
    /// Statements that write are run to completion before the cursor is
    /// returned, so this is exact even when they also return rows.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Next row, or `None` once the result set is exhausted.
    ///
    /// Refills the local buffer with one batch per worker round trip. If this
    /// future is dropped while a batch is in flight, that batch is lost.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        self.ensure_open()?;
        if self.buffer.is_empty() {
            self.refill(self.batch_size).await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Next single row, pulling no more than one row from the worker.
    ///
    /// Rows already buffered by [`Cursor::next`] come first, so mixing the two
    /// never reorders results.
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        self.ensure_open()?;
        if self.buffer.is_empty() {
            self.refill(1).await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Up to `n` rows; fewer only when the result set runs out.
    pub async fn fetch_many(&mut self, n: usize) -> Result<Vec<Row>> {
        self.ensure_open()?;
        while self.buffer.len() < n && self.id.is_some() {
            self.refill(n - self.buffer.len()).await?;
        }
        let take = n.min(self.buffer.len());
        Ok(self.buffer.drain(..take).collect())
    }

    /// Every remaining row.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        self.ensure_open()?;
        while self.id.is_some() {
            self.refill(self.batch_size).await?;
        }
        Ok(self.buffer.drain(..).collect())
    }

    /// Turn the cursor into a stream of rows.
    ///
    /// The stream ends after the last row or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Row>> {
        futures::stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.next().await {
                Ok(Some(row)) => Some((Ok(row), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Release the worker-side query state. Closing twice is a no-op, and so
    /// is closing after the connection itself was closed.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();
        let Some(id) = self.id.take() else {
            return Ok(());
        };
        let released = self
            .executor
            .run(move |session| Ok(session.release(id)))
            .await;
        match released {
            Ok(_) => Ok(()),
            Err(AsqliteError::ClosedConnection) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(AsqliteError::usage("cursor is closed"))
        } else {
            Ok(())
        }
    }

    async fn refill(&mut self, max: usize) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        match self.executor.run(move |session| session.fetch(id, max)).await {
            Ok(Batch { rows, done }) => {
                if done {
                    self.id = None;
                }
                self.buffer.extend(rows);
                Ok(())
            }
            Err(e) => {
                // The worker drops the state of a failed query.
                self.id = None;
                Err(e)
            }
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            trace!(cursor = id, "releasing abandoned cursor");
            self.executor.spawn(move |session| {
                session.release(id);
            });
        }
    }
}
