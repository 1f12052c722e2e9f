// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! asqlite - run SQL against a worker-owned SQLite connection.
//!
//! This is the binary entry point.

mod exec;
mod render;
mod shell;

use std::path::{Path, PathBuf};

use asqlite_config::{AsqliteConfig, ConfigError};
use clap::{Parser, Subcommand};
use colored::Colorize;

/// asqlite - run SQL against a worker-owned SQLite connection.
#[derive(Parser, Debug)]
#[command(name = "asqlite", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database target, overriding `connection.database`.
    #[arg(long, short, global = true, value_name = "PATH")]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run SQL statements in order and print any rows they return.
    Exec {
        /// Statements to run, one per argument.
        #[arg(required = true)]
        sql: Vec<String>,
    },
    /// Launch an interactive SQL shell.
    Shell,
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.database) {
        Ok(config) => config,
        Err(errors) => {
            asqlite_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Exec { sql } => {
            exec::run_exec(&config.connection, &sql, &mut std::io::stdout()).await
        }
        Commands::Shell => shell::run_shell(&config.connection).await,
        Commands::Config => match config.to_toml_string() {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => Err(asqlite::AsqliteError::Config(e.to_string())),
        },
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

/// Load configuration from `path` (or the standard hierarchy) and apply the
/// command-line database override.
fn load_config(
    path: Option<&Path>,
    database: Option<String>,
) -> Result<AsqliteConfig, Vec<ConfigError>> {
    let mut config = match path {
        Some(path) => asqlite_config::load_and_validate_path(path)?,
        None => asqlite_config::load_and_validate()?,
    };
    if let Some(database) = database {
        config.connection.database = database;
    }
    Ok(config)
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("asqlite={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn exec_requires_at_least_one_statement() {
        assert!(Cli::try_parse_from(["asqlite", "exec"]).is_err());
        let cli = Cli::try_parse_from(["asqlite", "exec", "SELECT 1", "SELECT 2"]).unwrap();
        match cli.command {
            Commands::Exec { sql } => assert_eq!(sql, vec!["SELECT 1", "SELECT 2"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["asqlite", "shell", "--database", "app.db"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some("app.db"));
        assert!(matches!(cli.command, Commands::Shell));
    }

    #[test]
    fn database_flag_overrides_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asqlite.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[connection]\ndatabase = \"from-file.db\"\nfetch_batch_size = 8").unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.connection.database, "from-file.db");

        let config = load_config(Some(&path), Some("override.db".to_string())).unwrap();
        assert_eq!(config.connection.database, "override.db");
        assert_eq!(config.connection.fetch_batch_size, 8);
    }

    #[test]
    fn config_command_takes_no_arguments() {
        let cli = Cli::try_parse_from(["asqlite", "config", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
        assert!(Cli::try_parse_from(["asqlite", "config", "extra"]).is_err());
    }

    #[test]
    fn invalid_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asqlite.toml");
        std::fs::write(&path, "[connection]\nfetch_batch_size = 0\n").unwrap();
        let errors = load_config(Some(&path), None).unwrap_err();
        assert!(!errors.is_empty());
    }
}
