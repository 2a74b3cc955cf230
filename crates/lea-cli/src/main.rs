//! lea CLI - a minimalist SQL transformation orchestrator

use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{ls, run, teardown, test};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let exit_code = match &cli.command {
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Test(args) => test::execute(args, &cli.global).await,
        cli::Commands::Ls(args) => ls::execute(args, &cli.global).await,
        cli::Commands::Teardown(args) => teardown::execute(args, &cli.global).await,
    };

    std::process::exit(exit_code);
}
