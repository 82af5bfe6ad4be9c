//! Vellum CLI
//!
//! Command-line interface over the versioning engine. Results are printed
//! to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vellum_core::logging_facility;
use vellum_core::VellumConfig;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "vellum")]
#[command(about = "Vellum - transaction-time versioning for SQLite entities", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "vellum.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the ledger and the per-entity tables
    Init(commands::init::InitArgs),
    /// Create, update or delete an entity
    Entity(commands::entity::EntityArgs),
    /// Changesets of one entity
    History(commands::history::HistoryArgs),
    /// State of one entity as of a transaction
    AsOf(commands::history::AsOfArgs),
    /// Restore an entity to its state at a past transaction
    Revert(commands::revert::RevertArgs),
    /// Check version chains against their invariants
    Verify(commands::maintenance::VerifyArgs),
    /// Recompute cached change flags of one entity type
    RebuildFlags(commands::maintenance::RebuildFlagsArgs),
    /// Inspect the transaction ledger
    Transaction(commands::transaction::TransactionArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = VellumConfig::load(&cli.config)?;
    logging_facility::init(config.logging.profile);
    let mut session = commands::Session::open(config)?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &mut session),
        Commands::Entity(args) => commands::entity::execute(args, &mut session),
        Commands::History(args) => commands::history::execute(args, &session),
        Commands::AsOf(args) => commands::history::execute_as_of(args, &session),
        Commands::Revert(args) => commands::revert::execute(args, &mut session),
        Commands::Verify(args) => commands::maintenance::execute_verify(args, &session),
        Commands::RebuildFlags(args) => commands::maintenance::execute_rebuild(args, &mut session),
        Commands::Transaction(args) => commands::transaction::execute(args, &session),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
