//! Connection management

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use vellum_core::registry::SchemaRegistry;

pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// In-memory database, mostly for tests
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Foreign keys on, WAL journal, and a busy timeout after which a waiting
/// writer gives up with `Conflict`.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;
    // In-memory databases report "memory" and keep their journal mode
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(from_rusqlite)?;
    tracing::debug!(journal_mode = %mode, "Configured connection");
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;
    Ok(())
}

/// Apply migrations and create the live/version tables of every registered
/// entity type. Idempotent.
pub fn bootstrap(conn: &mut Connection, registry: &SchemaRegistry) -> Result<()> {
    crate::migrations::apply_migrations(conn)?;
    crate::ddl::install_entity_tables(conn, registry)?;
    Ok(())
}
