mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use verdict_core::config::{load_dotenv, Config};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    // Logs go to stderr; stdout carries results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env();

    match args.command {
        Command::Validate(validate) => commands::validate(&config, validate),
        Command::Evaluate(evaluate) => commands::evaluate(config, evaluate).await,
    }
}
