//! Chain verification and flag rebuild

use clap::Args;
use vellum_core::model::EntityId;
use vellum_engine::{rebuild_change_flags, verify_all, verify_chain};

use super::{print_json, Session};

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    /// Check a single entity; all entities of the type otherwise
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct RebuildFlagsArgs {
    #[arg(long = "type")]
    pub entity_type: String,
}

/// Prints the reports and fails when any chain is unhealthy
pub fn execute_verify(args: VerifyArgs, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let reports = match args.id {
        Some(id) => vec![verify_chain(
            &session.conn,
            &session.registry,
            &args.entity_type,
            &EntityId::new(id),
        )?],
        None => verify_all(&session.conn, &session.registry, &args.entity_type)?,
    };
    print_json(&reports)?;

    let unhealthy = reports.iter().filter(|r| !r.is_healthy()).count();
    if unhealthy > 0 {
        return Err(format!("{} version chain(s) violate their invariants", unhealthy).into());
    }
    Ok(())
}

pub fn execute_rebuild(
    args: RebuildFlagsArgs,
    session: &mut Session,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = rebuild_change_flags(&mut session.conn, &session.registry, &args.entity_type)?;
    print_json(&report)
}
