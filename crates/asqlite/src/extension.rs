// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-defined SQL functions, aggregates, and collations.
//!
//! Implementations are moved onto the worker thread when registered and are
//! only ever invoked there, from inside SQLite, while some task runs a
//! statement that uses them.

use std::cmp::Ordering;
use std::panic::AssertUnwindSafe;

use asqlite_core::Value;
use rusqlite::functions::{Aggregate, Context, FunctionFlags};

/// Error type a user callback may return. It reaches the caller as the
/// failure of the statement that invoked the callback.
pub type FunctionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A scalar SQL function.
///
/// Implemented for every `Fn(&[Value]) -> Result<Value, FunctionError>`.
pub trait ScalarFunction: Send + 'static {
    fn invoke(&self, args: &[Value]) -> Result<Value, FunctionError>;
}

impl<F> ScalarFunction for F
where
    F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + 'static,
{
    fn invoke(&self, args: &[Value]) -> Result<Value, FunctionError> {
        self(args)
    }
}

/// An aggregate SQL function folding rows into one value.
pub trait AggregateFunction: Send + 'static {
    /// Per-group accumulator.
    type State;

    fn init(&self) -> Self::State;

    fn step(&self, state: &mut Self::State, args: &[Value]) -> Result<(), FunctionError>;

    /// Produce the result. Called with a fresh state for an empty group.
    fn finalize(&self, state: Self::State) -> Result<Value, FunctionError>;
}

/// A text collation usable in `ORDER BY ... COLLATE name`.
///
/// Implemented for every `Fn(&str, &str) -> Ordering`.
pub trait Collation: Send + 'static {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

impl<F> Collation for F
where
    F: Fn(&str, &str) -> Ordering + Send + 'static,
{
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self(a, b)
    }
}

pub(crate) fn flags(deterministic: bool) -> FunctionFlags {
    if deterministic {
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC
    } else {
        FunctionFlags::SQLITE_UTF8
    }
}

fn arguments(ctx: &Context<'_>) -> Vec<Value> {
    (0..ctx.len()).map(|i| Value::from(ctx.get_raw(i))).collect()
}

/// Register `function` on `conn`. Runs on the worker thread.
pub(crate) fn register_scalar(
    conn: &rusqlite::Connection,
    name: &str,
    n_args: i32,
    deterministic: bool,
    function: Box<dyn ScalarFunction>,
) -> rusqlite::Result<()> {
    let function = AssertUnwindSafe(function);
    conn.create_scalar_function(name, n_args, flags(deterministic), move |ctx| {
        function
            .invoke(&arguments(ctx))
            .map_err(rusqlite::Error::UserFunctionError)
    })
}

/// Register `aggregate` on `conn`. Runs on the worker thread.
pub(crate) fn register_aggregate<A: AggregateFunction>(
    conn: &rusqlite::Connection,
    name: &str,
    n_args: i32,
    deterministic: bool,
    aggregate: A,
) -> rusqlite::Result<()> {
    conn.create_aggregate_function(
        name,
        n_args,
        flags(deterministic),
        AggregateAdapter(AssertUnwindSafe(aggregate)),
    )
}

/// Register `collation` on `conn`. Runs on the worker thread.
pub(crate) fn register_collation(
    conn: &rusqlite::Connection,
    name: &str,
    collation: Box<dyn Collation>,
) -> rusqlite::Result<()> {
    let collation = AssertUnwindSafe(collation);
    conn.create_collation(name, move |a: &str, b: &str| collation.compare(a, b))
}

struct AggregateAdapter<A>(AssertUnwindSafe<A>);

impl<A: AggregateFunction> Aggregate<AssertUnwindSafe<A::State>, Value> for AggregateAdapter<A> {
    fn init(&self, _ctx: &mut Context<'_>) -> rusqlite::Result<AssertUnwindSafe<A::State>> {
        Ok(AssertUnwindSafe(self.0.init()))
    }

    fn step(
        &self,
        ctx: &mut Context<'_>,
        state: &mut AssertUnwindSafe<A::State>,
    ) -> rusqlite::Result<()> {
        self.0
            .step(&mut state.0, &arguments(ctx))
            .map_err(rusqlite::Error::UserFunctionError)
    }

    fn finalize(
        &self,
        _ctx: &mut Context<'_>,
        state: Option<AssertUnwindSafe<A::State>>,
    ) -> rusqlite::Result<Value> {
        let state = match state {
            Some(AssertUnwindSafe(state)) => state,
            None => self.0.init(),
        };
        self.0
            .finalize(state)
            .map_err(rusqlite::Error::UserFunctionError)
    }
}
