//! Entity mutations, one transaction per invocation

use clap::{Args, Subcommand};
use vellum_core::model::EntityId;
use vellum_engine::{apply_engine_command, EngineCommand};

use super::{print_json, Session};

#[derive(Debug, Args)]
pub struct EntityArgs {
    #[command(subcommand)]
    pub command: EntityCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntityCommand {
    /// Create an entity from a JSON object holding its primary key
    Create(CreateArgs),
    /// Merge a JSON object of changed columns over the current state
    Update(UpdateArgs),
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub json: String,

    /// Acting user; omit for the system actor
    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub json: String,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub actor: Option<String>,
}

fn parse_json(raw: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    serde_json::from_str(raw).map_err(|e| format!("--json is not valid JSON: {}", e).into())
}

pub fn execute(args: EntityArgs, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let (cmd, actor) = match args.command {
        EntityCommand::Create(a) => {
            let schema = session.registry.get(&a.entity_type)?;
            let columns = schema.columns_from_json(&parse_json(&a.json)?)?;
            (
                EngineCommand::Create {
                    entity_type: a.entity_type,
                    columns,
                },
                a.actor,
            )
        }
        EntityCommand::Update(a) => {
            let schema = session.registry.get(&a.entity_type)?;
            let changes = schema.columns_from_json(&parse_json(&a.json)?)?;
            (
                EngineCommand::Update {
                    entity_type: a.entity_type,
                    entity_id: EntityId::new(a.id),
                    changes,
                },
                a.actor,
            )
        }
        EntityCommand::Delete(a) => (
            EngineCommand::Delete {
                entity_type: a.entity_type,
                entity_id: EntityId::new(a.id),
            },
            a.actor,
        ),
    };

    let result = apply_engine_command(cmd, &mut session.conn, &session.registry, actor.as_deref())?;
    print_json(&result)
}
