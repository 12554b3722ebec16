//! SQLHub CLI

use clap::Parser;
use sqlhub::cli::{run_cli, Cli, EXIT_FAILURE, EXIT_SUCCESS};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() {
                EXIT_FAILURE
            } else {
                EXIT_SUCCESS
            });
        }
    };

    init_tracing(cli.log_json);
    std::process::exit(run_cli(cli));
}

/// Log to stderr, filtered by SQLHUB_LOG, then RUST_LOG, then `warn`
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("SQLHUB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
