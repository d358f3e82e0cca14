//! revkeep CLI
//!
//! Command-line interface for a revkeep history database

use clap::{Parser, Subcommand};
use revkeep_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "revkeep")]
#[command(about = "revkeep - Object version history", long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = ".revkeep/store.db")]
    db: String,

    /// Schema file describing types and registrations
    #[arg(long, global = true, default_value = "revkeep.yaml")]
    schema: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the database
    Migrate,
    /// Show recent history as text
    Log(commands::log::LogArgs),
    /// Show one revision with its field diffs
    Show(commands::show::ShowArgs),
    /// Restore the objects of a revision
    Revert(commands::revert::RevertArgs),
}

fn main() {
    init(Profile::Development);
    let cli = Cli::parse();
    let ctx = commands::Context {
        db: cli.db,
        schema: cli.schema,
    };

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&ctx),
        Commands::Log(args) => commands::log::execute(&ctx, args),
        Commands::Show(args) => commands::show::execute(&ctx, args),
        Commands::Revert(args) => commands::revert::execute(&ctx, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
