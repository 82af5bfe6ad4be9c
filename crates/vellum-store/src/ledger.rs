//! Transaction Ledger
//!
//! Append-only `transactions` table. Ids come from SQLite's AUTOINCREMENT
//! sequence, never from application memory, and are only allocated inside
//! a write transaction, so id order is commit order.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{ActorId, Transaction, TransactionId};

use crate::errors::{from_rusqlite, Result};

const SELECT_TRANSACTION: &str = "SELECT id, issued_at, actor_id FROM transactions";

fn decode(row: &Row<'_>) -> rusqlite::Result<(i64, i64, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn to_transaction((id, issued_at, actor_id): (i64, i64, Option<String>)) -> Result<Transaction> {
    let issued_at = DateTime::from_timestamp_millis(issued_at).ok_or_else(|| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("decode_transaction")
            .with_transaction_id(TransactionId::new(id))
            .with_message(format!("issued_at {} out of range", issued_at))
    })?;
    Ok(Transaction {
        id: TransactionId::new(id),
        issued_at,
        actor_id: actor_id.map(ActorId::new),
    })
}

/// Ledger queries and the single allocation write
pub struct LedgerRepo;

impl LedgerRepo {
    /// Record `actor` the first time it is seen
    pub fn ensure_actor(conn: &Connection, actor: &ActorId, seen_at: DateTime<Utc>) -> Result<()> {
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO actors (actor_id, first_seen_at) VALUES (?1, ?2)",
                params![actor.as_str(), seen_at.timestamp_millis()],
            )
            .map_err(from_rusqlite)?;
        if inserted > 0 {
            tracing::info!(actor_id = %actor, "Registered new actor");
        }
        Ok(())
    }

    /// Append a transaction and return it with its allocated id.
    ///
    /// Must run inside the caller's write transaction.
    pub fn allocate(
        conn: &Connection,
        issued_at: DateTime<Utc>,
        actor: Option<&ActorId>,
    ) -> Result<Transaction> {
        let issued_at = issued_at.trunc_subsecs(3);
        if let Some(actor) = actor {
            Self::ensure_actor(conn, actor, issued_at)?;
        }
        conn.execute(
            "INSERT INTO transactions (issued_at, actor_id) VALUES (?1, ?2)",
            params![issued_at.timestamp_millis(), actor.map(ActorId::as_str)],
        )
        .map_err(from_rusqlite)?;

        Ok(Transaction {
            id: TransactionId::new(conn.last_insert_rowid()),
            issued_at,
            actor_id: actor.cloned(),
        })
    }

    pub fn get(conn: &Connection, id: TransactionId) -> Result<Option<Transaction>> {
        let raw = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TRANSACTION),
                [id.get()],
                decode,
            )
            .optional()
            .map_err(from_rusqlite)?;
        raw.map(to_transaction).transpose()
    }

    /// Fetch several transactions; ids missing from the ledger are absent
    /// from the result.
    pub fn get_many(
        conn: &Connection,
        ids: &BTreeSet<TransactionId>,
    ) -> Result<BTreeMap<TransactionId, Transaction>> {
        let mut stmt = conn
            .prepare_cached(&format!("{} WHERE id = ?1", SELECT_TRANSACTION))
            .map_err(from_rusqlite)?;
        let mut found = BTreeMap::new();
        for id in ids {
            let raw = stmt
                .query_row([id.get()], decode)
                .optional()
                .map_err(from_rusqlite)?;
            if let Some(raw) = raw {
                let tx = to_transaction(raw)?;
                found.insert(tx.id, tx);
            }
        }
        Ok(found)
    }

    /// Most recent transactions first
    pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<Transaction>> {
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY id DESC LIMIT ?1", SELECT_TRANSACTION))
            .map_err(from_rusqlite)?;
        let raw = stmt
            .query_map([limit as i64], decode)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        raw.into_iter().map(to_transaction).collect()
    }
}
