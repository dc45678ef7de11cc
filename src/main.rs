use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use passgen::cli::{self, Cli};
use passgen::config::Config;
use passgen::docker::{self, CliDaemon};
use passgen::logging::{LogConfig, default_log_path, init_logging};
use passgen::store::{self, PasswordStore, StdinConfirmation};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("configuration error")?;

    init_logging(&LogConfig::new(default_log_path()?))?;

    // The database container must be up before anything touches the table.
    let daemon = CliDaemon::connect()?;
    docker::ensure_running(&daemon, &config.container_spec())?;

    let client = store::connect_with_retry(
        &config.connection_string(),
        store::CONNECT_BUDGET,
        store::CONNECT_INTERVAL,
    )
    .context("failed connecting to database")?;

    let mut store = PasswordStore::new(
        client,
        config.encryption_key(),
        Box::new(StdinConfirmation),
    );
    store.ensure_schema()?;

    cli::dispatch(cli.command, &mut store)
}
