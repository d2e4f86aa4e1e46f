mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use std::process::ExitCode;

use cinedex_core::telemetry::{init_tracing, LogFormat, DEFAULT_FILTER};
use clap::Parser;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Human
    };
    init_tracing(format, DEFAULT_FILTER)?;

    let envelope = commands::run(&cli).await?;
    output::render(&envelope, cli.pretty)
}
