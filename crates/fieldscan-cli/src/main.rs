//! CLI application for extracting insurance fields from document text.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, process, schema};

/// Extract structured fields from insurance documents
#[derive(Parser)]
#[command(name = "fieldscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Field schema file (default: built-in insurance schema)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single document
    Process(process::ProcessArgs),

    /// Extract fields from many documents in parallel
    Batch(batch::BatchArgs),

    /// Inspect or validate field schemas
    Schema(schema::SchemaArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    let schema_path = cli.schema.as_deref();

    match cli.command {
        Commands::Process(args) => process::run(args, config_path, schema_path).await,
        Commands::Batch(args) => batch::run(args, config_path, schema_path).await,
        Commands::Schema(args) => schema::run(args, config_path, schema_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
