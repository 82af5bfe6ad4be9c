//! Subcommand implementations

pub mod entity;
pub mod history;
pub mod init;
pub mod maintenance;
pub mod revert;
pub mod transaction;

use rusqlite::Connection;
use serde::Serialize;
use std::time::Duration;
use vellum_core::registry::SchemaRegistry;
use vellum_core::VellumConfig;
use vellum_store::db;

/// Loaded configuration, schema registry and a bootstrapped connection
pub struct Session {
    pub config: VellumConfig,
    pub registry: SchemaRegistry,
    pub conn: Connection,
}

impl Session {
    pub fn open(config: VellumConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = config.registry()?;
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut conn = db::open(&config.database.path)?;
        db::configure(&conn, Duration::from_millis(config.database.busy_timeout_ms))?;
        db::bootstrap(&mut conn, &registry)?;
        Ok(Self {
            config,
            registry,
            conn,
        })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
