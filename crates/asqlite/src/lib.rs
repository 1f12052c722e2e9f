// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async access to a SQLite connection that lives on one worker thread.
//!
//! A [`Connection`] owns a dedicated thread that alone touches the SQLite
//! handle. Callers on any thread or task queue operations onto it and await
//! the results; the worker runs them strictly in queue order. Query results
//! come back through a [`Cursor`] that pulls rows in batches, and a
//! [`TransactionScope`] lets one caller run a multi-statement sequence
//! without another caller's sequence landing in the middle of it.

mod connection;
mod cursor;
mod executor;
mod extension;
mod scope;
mod session;

pub use connection::Connection;
pub use cursor::{Cursor, CursorState};
pub use executor::TaskHandle;
pub use extension::{AggregateFunction, Collation, FunctionError, ScalarFunction};
pub use scope::TransactionScope;

pub use asqlite_config::ConnectionConfig;
pub use asqlite_core::{
    escape_like, quote_identifier, sql_escape, AsqliteError, ColumnIndex, ConnectionStats,
    IsolationLevel, Params, Result, Row, Value,
};

pub use rusqlite;
