// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `${NAME}` substitution for configuration strings.
//!
//! `$$` produces a literal `$`. Any other `$` must open a `${...}` reference.

use thiserror::Error;

/// Failure to expand a template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstError {
    /// A `$` not followed by `$` or `{`.
    #[error("stray `$` at byte {offset}")]
    StrayDollar { offset: usize },

    /// A `${` with no closing `}`.
    #[error("unterminated `${{` at byte {offset}")]
    Unterminated { offset: usize },

    /// The lookup had no value for the referenced name.
    #[error("undefined variable `{name}`")]
    Undefined { name: String },
}

/// Expand `input`, resolving names through `lookup`.
pub fn envsubst<F>(input: &str, lookup: F) -> Result<String, SubstError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut offset = 0;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let at = offset + pos;
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            offset = at + 2;
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = body
                .find('}')
                .ok_or(SubstError::Unterminated { offset: at })?;
            let name = &body[..end];
            let value = lookup(name).ok_or_else(|| SubstError::Undefined {
                name: name.to_string(),
            })?;
            out.push_str(&value);
            offset = at + 2 + end + 1;
            rest = &body[end + 1..];
        } else {
            return Err(SubstError::StrayDollar { offset: at });
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Expand `input` against the process environment.
pub fn envsubst_env(input: &str) -> Result<String, SubstError> {
    envsubst(input, |name| std::env::var(name).ok())
}
