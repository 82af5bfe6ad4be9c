//! Database initialisation

use clap::Args;
use serde_json::json;
use vellum_store::migrations::applied_migrations;

use super::{print_json, Session};

#[derive(Debug, Args)]
pub struct InitArgs {}

/// Opening the session already bootstrapped the database; report what exists
pub fn execute(_args: InitArgs, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let migrations: Vec<_> = applied_migrations(&session.conn)?
        .into_iter()
        .map(|m| json!({ "migration_id": m.migration_id, "checksum": m.checksum }))
        .collect();
    let entity_types: Vec<_> = session
        .registry
        .schemas()
        .map(|schema| {
            json!({
                "name": schema.name(),
                "table": schema.table(),
                "version_table": schema.version_table(),
                "columns": schema.columns().iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();

    print_json(&json!({
        "database": session.config.database.path,
        "migrations": migrations,
        "entity_types": entity_types,
    }))
}
