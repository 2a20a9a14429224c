//! ChangeFinder CLI
//!
//! Command-line interface for attributing entity snapshot streams

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "changefinder")]
#[command(about = "ChangeFinder - Explain why entity fields changed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Attribute every change in a snapshot stream
    Attribute(commands::attribute::AttributeArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Attribute(args) => commands::attribute::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
