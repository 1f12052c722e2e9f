// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation and string expansion.

use crate::diagnostic::ConfigError;
use crate::model::AsqliteConfig;
use crate::subst;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Expand `${VAR}` references in string settings against the process environment.
pub fn expand_config(config: &mut AsqliteConfig) -> Result<(), Vec<ConfigError>> {
    match subst::envsubst_env(&config.connection.database) {
        Ok(expanded) => {
            config.connection.database = expanded;
            Ok(())
        }
        Err(source) => Err(vec![ConfigError::Substitution {
            key: "connection.database".to_string(),
            source,
        }]),
    }
}

/// Validate semantic constraints serde cannot express.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &AsqliteConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let conn = &config.connection;

    if conn.database.trim().is_empty() {
        errors.push(invalid("connection.database must not be empty"));
    }

    if conn.fetch_batch_size == 0 {
        errors.push(invalid("connection.fetch_batch_size must be at least 1"));
    }

    if conn.worker_thread_name.trim().is_empty() {
        errors.push(invalid("connection.worker_thread_name must not be empty"));
    }

    if conn.busy_timeout_ms > i32::MAX as u64 {
        errors.push(invalid(format!(
            "connection.busy_timeout_ms must be at most {}, got {}",
            i32::MAX,
            conn.busy_timeout_ms
        )));
    }

    if let Some(mode) = &conn.journal_mode {
        if !JOURNAL_MODES.contains(&mode.to_ascii_uppercase().as_str()) {
            errors.push(invalid(format!(
                "connection.journal_mode `{mode}` is not one of {}",
                JOURNAL_MODES.join(", ")
            )));
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(invalid(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
