use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragqa::cli::commands::{handle_config, handle_ingest, handle_query, handle_serve};
use ragqa::cli::{Cli, Commands};
use ragqa::models::OutputFormat;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "ragqa=debug,tower_http=debug"
    } else {
        "ragqa=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    run_command(cli.command, cli.format, cli.verbose).await
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Serve(args) => handle_serve(args).await,
        Commands::Ingest(args) => handle_ingest(args, format, verbose).await,
        Commands::Query(args) => handle_query(args, format, verbose).await,
        Commands::Config(cmd) => handle_config(cmd, format, verbose).await,
    }
}
