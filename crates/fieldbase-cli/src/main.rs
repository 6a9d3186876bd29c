//! Fieldbase Command-Line Client
//!
//! Inspects and edits a local fieldbase workspace: custom field schemas,
//! their entries, links between entries, and the deals that reference them.

mod commands;
mod executor;
mod formatter;

use clap::Parser;
use commands::Command;
use fieldbase_core::{StoreConfig, Workspace};
use formatter::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Fieldbase Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "fieldbase")]
#[command(version, about = "Fieldbase Command-Line Client")]
pub struct Args {
    /// Workspace directory (defaults to the platform data directory)
    #[arg(short = 'd', long, env = "FIELDBASE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Open the workspace in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldbase=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = if args.ephemeral {
        Workspace::in_memory()
    } else {
        let dir = args.data_dir.unwrap_or_else(default_data_dir);
        tracing::debug!(path = %dir.display(), "opening workspace");
        Workspace::open(&StoreConfig::new(dir))?
    };

    let formatter = formatter::create_formatter(args.format);
    let output = executor::execute(&mut workspace, args.command, &*formatter)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldbase")
}
