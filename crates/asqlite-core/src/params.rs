// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statement parameters: positional or named.

use rusqlite::Statement;

use crate::value::Value;

/// Parameters bound to one statement execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    /// Bound to `?`, `?N` placeholders in order.
    Positional(Vec<Value>),
    /// Bound by placeholder name, including its prefix (`:id`, `@id`, `$id`).
    Named(Vec<(String, Value)>),
}

impl Params {
    /// Build named parameters from `(name, value)` pairs.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(v) => v.len(),
            Params::Named(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind every parameter onto `stmt`.
    ///
    /// The number of values must match the statement's placeholder count
    /// exactly, so bindings left over from a previous execution are always
    /// overwritten. Named parameters must each name an existing placeholder.
    pub fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        let expected = stmt.parameter_count();
        match self {
            Params::None | Params::Positional(_) => {
                let values: &[Value] = match self {
                    Params::Positional(v) => v,
                    _ => &[],
                };
                if values.len() != expected {
                    return Err(rusqlite::Error::InvalidParameterCount(
                        values.len(),
                        expected,
                    ));
                }
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, value)?;
                }
            }
            Params::Named(pairs) => {
                if pairs.len() != expected {
                    return Err(rusqlite::Error::InvalidParameterCount(pairs.len(), expected));
                }
                for (name, value) in pairs {
                    let idx = stmt
                        .parameter_index(name)?
                        .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.clone()))?;
                    stmt.raw_bind_parameter(idx, value)?;
                }
            }
        }
        Ok(())
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Params {
    fn from(values: [T; N]) -> Self {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }
}
