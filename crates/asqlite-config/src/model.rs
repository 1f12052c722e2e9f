// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at load time instead of being silently ignored.

use asqlite_core::IsolationLevel;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AsqliteConfig {
    /// How connections are opened and driven.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Log output settings for the binary.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AsqliteConfig {
    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Settings applied when a connection is opened.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Database target: a file path, a `file:` URI, or `:memory:`.
    /// `${VAR}` references are expanded at load time.
    #[serde(default = "default_database")]
    pub database: String,

    /// Rows pulled from the worker per round trip while iterating a cursor.
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,

    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enforce foreign key constraints (`PRAGMA foreign_keys`).
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,

    /// Optional `PRAGMA journal_mode` value, e.g. `WAL`.
    #[serde(default)]
    pub journal_mode: Option<String>,

    /// Level used by explicit `begin()` calls.
    #[serde(default)]
    pub isolation_level: IsolationLevel,

    /// Name given to the worker thread.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            fetch_batch_size: default_fetch_batch_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
            journal_mode: None,
            isolation_level: IsolationLevel::default(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

impl ConnectionConfig {
    /// Defaults with a different database target.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Returns `true` for targets that never touch the filesystem.
    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:" || self.database.contains("mode=memory")
    }
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn default_fetch_batch_size() -> usize {
    64
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_foreign_keys() -> bool {
    true
}

fn default_worker_thread_name() -> String {
    "asqlite-worker".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
