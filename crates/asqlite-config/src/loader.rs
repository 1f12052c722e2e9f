// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./asqlite.toml` > `~/.config/asqlite/asqlite.toml` >
//! `/etc/asqlite/asqlite.toml`, with `ASQLITE_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AsqliteConfig;

/// Name of the configuration file looked up in every layer.
pub const CONFIG_FILE_NAME: &str = "asqlite.toml";

const SYSTEM_CONFIG_PATH: &str = "/etc/asqlite/asqlite.toml";

/// Every file layer, lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("asqlite").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Build the layered Figment without extracting it.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. System, user and local `asqlite.toml` files
/// 3. `ASQLITE_*` environment variables
pub fn build_figment() -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(AsqliteConfig::default()));
    config_file_paths()
        .into_iter()
        .fold(figment, |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<AsqliteConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<AsqliteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AsqliteConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<AsqliteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AsqliteConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `ASQLITE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map` rather than `Env::split("_")` because keys such as
/// `fetch_batch_size` contain underscores themselves. The key reaches the
/// mapping in its original case, so it is lowercased first.
fn env_provider() -> Env {
    Env::prefixed("ASQLITE_").map(|key| {
        key.as_str()
            .to_ascii_lowercase()
            .replacen("connection_", "connection.", 1)
            .replacen("logging_", "logging.", 1)
            .into()
    })
}
