//! sfextract - Extract Salesforce survey responses into cached CSV snapshots
//!
//! Loads configuration from the environment (and an optional `.env` file),
//! then either serves the latest cached snapshot or fetches, flattens and
//! caches a fresh one.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use sfextract::cache::CacheStore;
use sfextract::cli::Cli;
use sfextract::config::Config;
use sfextract::extract::Extractor;
use sfextract::salesforce::SalesforceClient;

fn main() -> ExitCode {
    // .env is optional; a missing file just means the environment is
    // already populated
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let cache = CacheStore::new(config.cache_root());
    let source = SalesforceClient::new(&config);
    let extractor = Extractor::new(cache, source, cli.dataset.clone());

    let table = extractor.extract(cli.fetch)?;
    info!(
        "dataset '{}': {} rows x {} columns",
        cli.dataset,
        table.num_rows(),
        table.num_columns()
    );

    if cli.print {
        table.write_csv_to(io::stdout().lock())?;
    }

    Ok(())
}
