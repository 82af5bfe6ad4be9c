//! Transaction ledger inspection

use clap::{Args, Subcommand};
use vellum_core::model::TransactionId;
use vellum_engine::transaction_changes;
use vellum_store::LedgerRepo;

use super::{print_json, Session};

#[derive(Debug, Args)]
pub struct TransactionArgs {
    #[command(subcommand)]
    pub command: TransactionCommand,
}

#[derive(Debug, Subcommand)]
pub enum TransactionCommand {
    /// Everything one transaction wrote
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Most recent transactions, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn execute(args: TransactionArgs, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        TransactionCommand::Show { id } => {
            let changes =
                transaction_changes(&session.conn, &session.registry, TransactionId::new(id))?;
            print_json(&changes)
        }
        TransactionCommand::List { limit } => {
            let transactions = LedgerRepo::list_recent(&session.conn, limit)?;
            print_json(&transactions)
        }
    }
}
