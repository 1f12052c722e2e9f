// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared vocabulary for the asqlite workspace.
//!
//! Holds the error type every bridge operation returns, the owned values
//! and rows that cross between callers and the worker thread, statement
//! parameters, and small SQL escaping helpers.

pub mod error;
pub mod escape;
pub mod params;
pub mod row;
pub mod types;
pub mod value;

pub use error::{AsqliteError, Result};
pub use escape::{escape_like, quote_identifier, sql_escape};
pub use params::Params;
pub use row::{ColumnIndex, Row};
pub use types::{ConnectionStats, IsolationLevel};
pub use value::Value;
