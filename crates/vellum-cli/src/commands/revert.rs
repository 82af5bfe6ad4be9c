//! Revert command

use clap::Args;
use vellum_core::model::{EntityId, TransactionId};
use vellum_engine::{revert, version_at};

use super::{print_json, Session};

#[derive(Debug, Args)]
pub struct RevertArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub id: String,

    /// Transaction whose state is restored
    #[arg(long = "to")]
    pub target: i64,

    #[arg(long)]
    pub actor: Option<String>,
}

pub fn execute(args: RevertArgs, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let id = EntityId::new(args.id);
    let transaction = revert(
        &mut session.conn,
        &session.registry,
        &args.entity_type,
        &id,
        TransactionId::new(args.target),
        args.actor.as_deref(),
    )?;
    let row = version_at(
        &session.conn,
        &session.registry,
        &args.entity_type,
        &id,
        transaction.id,
    )?;
    print_json(&serde_json::json!({ "transaction": transaction, "row": row }))
}
