//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Configuration file used when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "sqlhub.toml";

#[derive(Parser, Debug)]
#[command(name = "sqlhub")]
#[command(about = "Run SQL against H2, SQLite, PostgreSQL or MySQL through one interface")]
#[command(
    long_about = r#"Run SQL against H2, SQLite, PostgreSQL or MySQL through one interface

USAGE:
  sqlhub init-config                 # Write a default config (SQLite)
  sqlhub check                       # Open and close the configured database
  sqlhub classify "select 1"         # Classify a query in the backend's dialect
  sqlhub query "select * from t"     # Run a query
  sqlhub is-table items              # Check that a table exists
  sqlhub truncate items              # Delete every row of a table

EXIT CODES:
  0  success
  1  usage, configuration or statement error
  2  database error"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (.toml or .json)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log prefix, overriding the configured one
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the configured database and report its state
    Check,

    /// Classify a query by its leading keyword
    Classify {
        /// Query text
        query: String,
    },

    /// Classify, validate and run a query
    Query {
        /// SQL text
        sql: String,
    },

    /// Report whether a table exists
    IsTable {
        /// Table name
        table: String,
    },

    /// Delete every row of a table
    Truncate {
        /// Table name
        table: String,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
