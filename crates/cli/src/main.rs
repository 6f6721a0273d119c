//! SMS Search CLI - Route SMS queries to verticals or the online fallback
//!
//! Usage:
//!   sms-search init [dir]                       - Write a starter config
//!   sms-search query --phone <number> <query>   - Answer one query
//!   sms-search verticals                        - List configured verticals

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::app::App;
use cli::commands::{InitCommand, QueryCommand, VerticalsCommand};

#[derive(Parser)]
#[command(name = "sms-search")]
#[command(about = "SMS Search - Keyword verticals with online fallback")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter sms-search.yaml
    Init(InitCommand),
    /// Answer a query sent from a phone number
    Query(QueryCommand),
    /// List configured verticals
    Verticals(VerticalsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init(cmd) = &cli.command {
        init_logging("info");
        return cmd.run();
    }

    let config = App::load_config(cli.config.as_deref())?;
    init_logging(&config.log_filter);
    let app = App::from_config(config)?;

    match &cli.command {
        Commands::Query(cmd) => cmd.run(&app, cli.json),
        Commands::Verticals(cmd) => cmd.run(&app, cli.json),
        Commands::Init(_) => Ok(()),
    }
}

/// RUST_LOG wins over the configured filter
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
