// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result rows addressable by position and by column name.

use std::ops::Index;
use std::sync::Arc;

use rusqlite::types::{FromSql, FromSqlError};

use crate::error::{AsqliteError, Result};
use crate::value::Value;

/// One result row, detached from the statement that produced it.
///
/// Rows of the same cursor share a single column-name list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

/// Something that selects a column of a [`Row`].
pub trait ColumnIndex {
    fn position(&self, row: &Row) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn position(&self, row: &Row) -> Result<usize> {
        if *self < row.values.len() {
            Ok(*self)
        } else {
            Err(rusqlite::Error::InvalidColumnIndex(*self).into())
        }
    }
}

impl ColumnIndex for &str {
    fn position(&self, row: &Row) -> Result<usize> {
        row.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(self))
            .ok_or_else(|| rusqlite::Error::InvalidColumnName(self.to_string()).into())
    }
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Typed access through SQLite's own conversion rules.
    pub fn get<T: FromSql>(&self, idx: impl ColumnIndex) -> Result<T> {
        let pos = idx.position(self)?;
        let value = self.values[pos].as_value_ref();
        T::column_result(value).map_err(|err| {
            let source = match err {
                FromSqlError::InvalidType => rusqlite::Error::InvalidColumnType(
                    pos,
                    self.column_name(pos).to_string(),
                    value.data_type(),
                ),
                FromSqlError::OutOfRange(i) => rusqlite::Error::IntegralValueOutOfRange(pos, i),
                other => rusqlite::Error::FromSqlConversionFailure(
                    pos,
                    value.data_type(),
                    Box::new(other),
                ),
            };
            AsqliteError::Resource { source }
        })
    }

    /// Raw value access; `None` if the column does not exist.
    pub fn value(&self, idx: impl ColumnIndex) -> Option<&Value> {
        idx.position(self).ok().map(|pos| &self.values[pos])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn column_name(&self, pos: usize) -> &str {
        self.columns.get(pos).map(String::as_str).unwrap_or("")
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        &self.values[idx]
    }
}

impl Index<&str> for Row {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.value(name) {
            Some(v) => v,
            None => panic!("no column named `{name}`"),
        }
    }
}
