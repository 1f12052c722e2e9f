// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public connection handle.

use std::sync::Arc;
use std::time::Duration;

use asqlite_config::ConnectionConfig;
use asqlite_core::{AsqliteError, ConnectionStats, IsolationLevel, Params, Result};
use rusqlite::InterruptHandle;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cursor::Cursor;
use crate::executor::{Executor, TaskHandle};
use crate::extension::{self, AggregateFunction, Collation, ScalarFunction};
use crate::scope::{ScopeLock, TransactionScope};

/// An asynchronous SQLite connection.
///
/// The underlying handle lives on a dedicated worker thread. Every method
/// that touches it queues exactly one task there; tasks run one at a time in
/// the order they were queued, whichever caller queued them. Operations are
/// queued when the method is called, so the returned [`TaskHandle`]s may be
/// awaited in any order without affecting execution order.
///
/// `Connection` is cheap to clone. Clones share the worker, the handle and
/// the transaction scope. The worker shuts down after [`Connection::close`],
/// or once every clone and every cursor has been dropped; in both cases
/// already-queued work still runs first.
///
/// ```no_run
/// # async fn demo() -> asqlite::Result<()> {
/// let conn = asqlite::Connection::open_in_memory()?;
/// conn.execute_script("CREATE TABLE t(x)").await?;
/// conn.execute("INSERT INTO t VALUES (?1)", [1]).await?;
/// let mut rows = conn.execute("SELECT x FROM t", ()).await?;
/// while let Some(row) = rows.next().await? {
///     println!("{}", row.get::<i64>(0)?);
/// }
/// conn.close().await
/// # }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Arc<Executor>,
    scope: ScopeLock,
    interrupt: InterruptHandle,
    config: ConnectionConfig,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.inner.config.database)
            .field("executor", &self.inner.executor)
            .finish()
    }
}

impl Connection {
    /// Open a database file (or any SQLite target string) with default settings.
    pub fn open(database: impl Into<String>) -> Result<Self> {
        Self::open_with(&ConnectionConfig::for_database(database))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(&ConnectionConfig::default())
    }

    /// Open with explicit settings.
    ///
    /// The database is opened and configured on the calling thread, then
    /// handed to a new worker thread. From then on only the worker touches it.
    pub fn open_with(config: &ConnectionConfig) -> Result<Self> {
        let (executor, interrupt) = Executor::bootstrap(&config.worker_thread_name, || {
            let conn = open_handle(config)?;
            let interrupt = conn.get_interrupt_handle();
            Ok((conn, interrupt))
        })?;

        info!(
            database = %config.database,
            thread = %config.worker_thread_name,
            "connection opened"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                executor: Arc::new(executor),
                scope: Arc::new(Mutex::new(())),
                interrupt,
                config: config.clone(),
            }),
        })
    }

    /// Run one statement and return a cursor over its results.
    ///
    /// The statement's side effects happen when this task runs, even if the
    /// returned cursor is never read.
    pub fn execute(&self, sql: impl Into<String>, params: impl Into<Params>) -> TaskHandle<Cursor> {
        let sql = sql.into();
        let params = params.into();
        let executor = self.inner.executor.clone();
        let batch_size = self.inner.config.fetch_batch_size;
        self.inner.executor.run(move |session| {
            let info = session.execute(&sql, &params)?;
            Ok(Cursor::new(executor, info, batch_size))
        })
    }

    /// Run one statement once per parameter set, in a single task.
    ///
    /// Statements that return rows are rejected. The cursor yields nothing;
    /// its `rows_affected` is the total over all sets.
    pub fn execute_many<I>(&self, sql: impl Into<String>, param_sets: I) -> TaskHandle<Cursor>
    where
        I: IntoIterator,
        I::Item: Into<Params>,
    {
        let sql = sql.into();
        let param_sets: Vec<Params> = param_sets.into_iter().map(Into::into).collect();
        let executor = self.inner.executor.clone();
        let batch_size = self.inner.config.fetch_batch_size;
        self.inner.executor.run(move |session| {
            let info = session.execute_many(&sql, &param_sets)?;
            Ok(Cursor::new(executor, info, batch_size))
        })
    }

    /// Run a script of semicolon-separated statements. Any rows it produces
    /// are discarded.
    pub fn execute_script(&self, script: impl Into<String>) -> TaskHandle<Cursor> {
        let script = script.into();
        let executor = self.inner.executor.clone();
        let batch_size = self.inner.config.fetch_batch_size;
        self.inner.executor.run(move |session| {
            let info = session.execute_script(&script)?;
            Ok(Cursor::new(executor, info, batch_size))
        })
    }

    /// Open a transaction at the configured isolation level.
    pub fn begin(&self) -> TaskHandle<()> {
        let level = self.inner.config.isolation_level;
        self.inner.executor.run(move |session| session.begin(level))
    }

    /// Commit the open transaction. A no-op when none is open.
    pub fn commit(&self) -> TaskHandle<()> {
        self.inner.executor.run(|session| session.commit())
    }

    /// Roll back the open transaction. A no-op when none is open.
    pub fn rollback(&self) -> TaskHandle<()> {
        self.inner.executor.run(|session| session.rollback())
    }

    /// Close the connection.
    ///
    /// Work queued before this call still runs. Open cursors are released,
    /// then the handle is closed on the worker. Anything queued afterwards
    /// fails with [`AsqliteError::ClosedConnection`]. Closing again is a
    /// no-op that succeeds.
    pub async fn close(&self) -> Result<()> {
        let Some(reply) = self.inner.executor.close() else {
            return Ok(());
        };
        let result = reply.await.unwrap_or_else(|_| {
            Err(AsqliteError::internal(
                "worker exited without reporting the close",
            ))
        });
        match &result {
            Ok(()) => info!(database = %self.inner.config.database, "connection closed"),
            Err(e) => debug!(error = %e, "closing connection failed"),
        }
        result
    }

    /// Ask the statement currently running on the worker to abort.
    ///
    /// Runs on the calling thread without queueing, since its purpose is to
    /// reach a task that is already running. The interrupted statement fails
    /// with an `SQLITE_INTERRUPT` resource error. Does nothing if the
    /// connection is closed.
    ///
    /// SQLite counts a cursor left open mid-result as a running statement.
    /// While any such cursor exists the interrupt stays pending, and the
    /// next statement to step fails with it, whichever task runs it. Close
    /// or exhaust open cursors before interrupting to affect only the
    /// statement in flight.
    pub fn interrupt(&self) {
        debug!("interrupting running statement");
        self.inner.interrupt.interrupt();
    }

    /// Register a scalar SQL function. `n_args` of `-1` accepts any count.
    pub fn create_function<F>(
        &self,
        name: impl Into<String>,
        n_args: i32,
        deterministic: bool,
        function: F,
    ) -> TaskHandle<()>
    where
        F: ScalarFunction,
    {
        let name = name.into();
        let function: Box<dyn ScalarFunction> = Box::new(function);
        self.inner.executor.run(move |session| {
            extension::register_scalar(session.conn(), &name, n_args, deterministic, function)?;
            debug!(function = %name, n_args, "registered scalar function");
            Ok(())
        })
    }

    /// Register an aggregate SQL function.
    pub fn create_aggregate<A>(
        &self,
        name: impl Into<String>,
        n_args: i32,
        deterministic: bool,
        aggregate: A,
    ) -> TaskHandle<()>
    where
        A: AggregateFunction,
    {
        let name = name.into();
        self.inner.executor.run(move |session| {
            extension::register_aggregate(session.conn(), &name, n_args, deterministic, aggregate)?;
            debug!(function = %name, n_args, "registered aggregate function");
            Ok(())
        })
    }

    /// Register a text collation.
    pub fn create_collation<C>(&self, name: impl Into<String>, collation: C) -> TaskHandle<()>
    where
        C: Collation,
    {
        let name = name.into();
        let collation: Box<dyn Collation> = Box::new(collation);
        self.inner.executor.run(move |session| {
            extension::register_collation(session.conn(), &name, collation)?;
            debug!(collation = %name, "registered collation");
            Ok(())
        })
    }

    /// Run `f` against the raw handle on the worker thread.
    ///
    /// The handle is only borrowed for the duration of `f`.
    pub fn call<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.inner.executor.run(move |session| f(session.conn()))
    }

    /// Whether a transaction is open on the handle.
    pub fn in_transaction(&self) -> TaskHandle<bool> {
        self.inner.executor.run(|session| session.in_transaction())
    }

    /// Worker-side counters. Reflects every task queued before this one.
    pub fn stats(&self) -> TaskHandle<ConnectionStats> {
        self.inner.executor.run(|session| Ok(session.stats()))
    }

    /// Isolation level used by [`Connection::begin`].
    pub fn isolation_level(&self) -> IsolationLevel {
        self.inner.config.isolation_level
    }

    /// Acquire the transaction scope, waiting until no other caller holds it.
    pub async fn scope(&self) -> TransactionScope {
        TransactionScope::acquire(&self.inner.scope).await
    }

    /// Acquire the transaction scope only if it is free right now.
    pub fn try_scope(&self) -> Option<TransactionScope> {
        TransactionScope::try_acquire(&self.inner.scope)
    }

    /// Whether [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        !self.inner.executor.is_accepting()
    }

    pub fn database(&self) -> &str {
        &self.inner.config.database
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

/// Open and configure the handle. Runs on the calling thread, before the
/// worker exists.
fn open_handle(config: &ConnectionConfig) -> Result<rusqlite::Connection> {
    let conn = if config.database == ":memory:" {
        rusqlite::Connection::open_in_memory()?
    } else {
        rusqlite::Connection::open(&config.database)?
    };

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;

    if let Some(mode) = &config.journal_mode {
        if !mode.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AsqliteError::Config(format!("invalid journal_mode `{mode}`")));
        }
        let applied: String =
            conn.query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))?;
        debug!(requested = %mode, applied = %applied, "journal mode set");
    }
    Ok(conn)
}
