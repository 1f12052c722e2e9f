// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for asqlite connections.
//!
//! TOML files layered with environment overrides through Figment, strict
//! key checking (`deny_unknown_fields`), `${VAR}` expansion of the database
//! target, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use asqlite_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.connection.database);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod subst;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AsqliteConfig, ConnectionConfig, LoggingConfig};
pub use subst::{envsubst, SubstError};

/// Load from the standard hierarchy, expand, and validate.
pub fn load_and_validate() -> Result<AsqliteConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load one explicit file (plus env overrides), expand, and validate.
pub fn load_and_validate_path(path: &Path) -> Result<AsqliteConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load a TOML string, expand, and validate. Useful for tests.
pub fn load_and_validate_str(toml_content: &str) -> Result<AsqliteConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish<F>(
    loaded: Result<AsqliteConfig, figment::Error>,
    sources: F,
) -> Result<AsqliteConfig, Vec<ConfigError>>
where
    F: FnOnce() -> Vec<(String, String)>,
{
    match loaded {
        Ok(mut config) => {
            validation::expand_config(&mut config)?;
            validation::validate_config(&config)?;
            tracing::debug!(database = %config.connection.database, "configuration loaded");
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read every existing config file so diagnostics can point into it.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_file_paths()
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let shown = if path.is_relative() {
                std::env::current_dir()
                    .map(|d| d.join(&path))
                    .unwrap_or(path)
            } else {
                path
            };
            Some((shown.display().to_string(), content))
        })
        .collect()
}
