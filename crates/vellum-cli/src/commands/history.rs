//! History and point-in-time reads

use clap::{Args, ValueEnum};
use vellum_core::model::{EntityId, TransactionId};
use vellum_core::diff::render_history;
use vellum_core::ChangeDetection;
use vellum_engine::{show_changesets_with, version_at, versions};

use super::{print_json, Session};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Detection {
    /// Trust the stored change flags
    Flags,
    /// Compare adjacent snapshots
    Values,
}

impl From<Detection> for ChangeDetection {
    fn from(d: Detection) -> Self {
        match d {
            Detection::Flags => ChangeDetection::Flags,
            Detection::Values => ChangeDetection::Values,
        }
    }
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub id: String,

    #[arg(long, value_enum, default_value_t = Detection::Values)]
    pub detection: Detection,

    /// Print raw version rows instead of changesets
    #[arg(long, conflicts_with = "markdown")]
    pub raw: bool,

    /// Print a Markdown table per transaction instead of JSON
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Debug, Args)]
pub struct AsOfArgs {
    #[arg(long = "type")]
    pub entity_type: String,

    #[arg(long)]
    pub id: String,

    /// Transaction id
    #[arg(long = "tx")]
    pub transaction_id: i64,
}

pub fn execute(args: HistoryArgs, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let id = EntityId::new(args.id);
    if args.raw {
        let records = versions(&session.conn, &session.registry, &args.entity_type, &id)?;
        return print_json(&records);
    }
    let changesets = show_changesets_with(
        &session.conn,
        &session.registry,
        &args.entity_type,
        &id,
        args.detection.into(),
    )?;
    if args.markdown {
        print!("{}", render_history(&args.entity_type, id.as_str(), &changesets));
        return Ok(());
    }
    print_json(&changesets)
}

pub fn execute_as_of(args: AsOfArgs, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let row = version_at(
        &session.conn,
        &session.registry,
        &args.entity_type,
        &EntityId::new(args.id),
        TransactionId::new(args.transaction_id),
    )?;
    print_json(&row)
}
