//! CLI command dispatch
//!
//! Every command except `init-config` loads the configuration file and builds
//! one database instance from it. Commands that touch tables open the
//! instance first and close it before returning.

use crate::cli::{Cli, Command, Error, Result, EXIT_SUCCESS};
use sqlhub_databases::{
    AnyDatabase, ConfigManager, DatabaseConfig, DatabaseFactory, QueryResult, ResultSet,
};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the parsed command and return the process exit code
pub fn run_cli(cli: Cli) -> ExitCode {
    match run_command(&cli) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

fn run_command(cli: &Cli) -> Result<()> {
    if let Command::InitConfig { force } = cli.command {
        return init_config(&cli.config, cli.prefix.as_deref(), force);
    }

    let config = load_config(&cli.config, cli.prefix.as_deref())?;
    let mut db = DatabaseFactory::build(&config)?;

    match &cli.command {
        Command::Classify { query } => {
            let statement = db.statement(query)?;
            if cli.json {
                println!("{}", serde_json::to_string(&statement)?);
            } else {
                println!("{statement}");
            }
            Ok(())
        }
        command => {
            open(&mut db)?;
            let result = run_open(&mut db, command, cli.json);
            db.close();
            result
        }
    }
}

fn init_config(path: &Path, prefix: Option<&str>, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::InvalidArgs(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let mut manager = ConfigManager::with_config_file(path);
    if let Some(prefix) = prefix {
        manager.config_mut().prefix = prefix.to_string();
    }
    manager.save_config()?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn load_config(path: &Path, prefix: Option<&str>) -> Result<DatabaseConfig> {
    if !path.exists() {
        return Err(Error::InvalidArgs(format!(
            "config file {} not found (run `sqlhub init-config`)",
            path.display()
        )));
    }

    let mut manager = ConfigManager::with_config_file(path);
    manager.load_config()?;
    if let Some(prefix) = prefix {
        manager.config_mut().prefix = prefix.to_string();
    }
    manager.validate()?;

    debug!("Using {} backend", manager.config().backend.driver());
    Ok(manager.config().clone())
}

fn open(db: &mut AnyDatabase) -> Result<()> {
    if db.open() {
        return Ok(());
    }
    let reason = db
        .last_error()
        .map(|record| record.message.clone())
        .unwrap_or_else(|| format!("could not open {} database", db.driver()));
    Err(Error::Database(reason))
}

fn run_open(db: &mut AnyDatabase, command: &Command, json: bool) -> Result<()> {
    match command {
        Command::Check => {
            let open = db.is_open();
            if json {
                let output = serde_json::json!({
                    "driver": db.driver(),
                    "state": db.state(),
                    "open": open,
                });
                println!("{output}");
            } else {
                println!("{} database is {}", db.driver(), db.state());
            }
            if open {
                Ok(())
            } else {
                Err(Error::Database(format!(
                    "{} connection did not answer",
                    db.driver()
                )))
            }
        }
        Command::Query { sql } => {
            let result = db.query(sql)?;
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                print_result(&mut io::stdout().lock(), &result)?;
            }
            Ok(())
        }
        Command::IsTable { table } => {
            let exists = db.is_table(table)?;
            if json {
                println!("{}", serde_json::json!({ "table": table, "exists": exists }));
            } else {
                println!("{exists}");
            }
            Ok(())
        }
        Command::Truncate { table } => {
            if !db.truncate(table)? {
                let reason = db
                    .last_error()
                    .map(|record| record.message.clone())
                    .unwrap_or_else(|| format!("could not truncate \"{table}\""));
                return Err(Error::Database(reason));
            }
            if json {
                println!("{}", serde_json::json!({ "table": table, "truncated": true }));
            } else {
                println!("Truncated {table}");
            }
            Ok(())
        }
        Command::Classify { .. } | Command::InitConfig { .. } => Ok(()),
    }
}

fn print_result<W: Write>(out: &mut W, result: &QueryResult) -> Result<()> {
    match result {
        QueryResult::Rows(rows) => print_rows(out, rows),
        QueryResult::Updated(count) => Ok(writeln!(out, "{count} row(s) affected")?),
    }
}

/// Tab-separated rows under a header line
fn print_rows<W: Write>(out: &mut W, rows: &ResultSet) -> Result<()> {
    if !rows.columns.is_empty() {
        writeln!(out, "{}", rows.columns.join("\t"))?;
    }
    for row in &rows.rows {
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlhub_databases::Value;

    #[test]
    fn test_print_rows_tab_separated() {
        let rows = ResultSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec![Value::Integer(1), Value::Text("bolt".to_string())],
                vec![Value::Integer(2), Value::Null],
            ],
        };
        let mut out = Vec::new();
        print_result(&mut out, &QueryResult::Rows(rows)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id\tname\n1\tbolt\n2\tNULL\n");
    }

    #[test]
    fn test_print_write_failure_is_io_error() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = print_result(&mut Closed, &QueryResult::Updated(3)).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.exit_code(), crate::cli::EXIT_FAILURE);
    }
}
