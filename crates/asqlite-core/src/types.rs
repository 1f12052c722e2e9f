// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small descriptor types shared by configuration and the connection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Locking behaviour of an explicit `BEGIN`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum IsolationLevel {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl IsolationLevel {
    /// The statement that opens a transaction at this level.
    pub fn begin_statement(self) -> String {
        format!("BEGIN {self}")
    }
}

/// Counters read from the worker thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Per-query states currently held by the worker.
    pub open_cursors: usize,
    /// Per-query states released since the connection opened.
    pub cursors_released: u64,
    /// Tasks the worker finished before this one.
    pub tasks_completed: u64,
}
