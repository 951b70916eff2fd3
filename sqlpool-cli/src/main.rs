//! sqlpool CLI entry point.

use clap::Parser;

use sqlpool_cli::cli::{Cli, Command};
use sqlpool_cli::commands;
use sqlpool_cli::error::CliResult;
use sqlpool_cli::output;

#[tokio::main]
async fn main() {
    sqlpool_core::logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Command::Bench(args) => commands::bench::run(args, config).await,
        Command::Status(args) => commands::status::run(args, config).await,
        Command::Version => commands::version::run().await,
    }
}
