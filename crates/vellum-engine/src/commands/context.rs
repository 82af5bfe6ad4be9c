//! Transaction Context
//!
//! A [`TransactionHandle`] owns the SQLite write transaction of one unit of
//! work together with its ledger entry. Every write goes through the
//! handle's own connection, so a handle from another connection cannot be
//! mixed in, and `commit`/`abort` consume it, so a closed handle cannot be
//! written through.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use std::cell::Cell;
use std::time::Instant;
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{ActorId, Transaction, TransactionId};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_core_types::RequestContext;
use vellum_store::errors::{from_rusqlite, Result};
use vellum_store::LedgerRepo;

use crate::commands::elapsed_ms;

pub struct TransactionHandle<'conn> {
    tx: rusqlite::Transaction<'conn>,
    transaction: Transaction,
    context: RequestContext,
    poisoned: Cell<bool>,
}

impl<'conn> TransactionHandle<'conn> {
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction.id
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn actor_id(&self) -> Option<&ActorId> {
        self.transaction.actor_id.as_ref()
    }

    pub fn issued_at(&self) -> chrono::DateTime<Utc> {
        self.transaction.issued_at
    }

    pub fn request_context(&self) -> &RequestContext {
        &self.context
    }

    /// Connection scoped to this unit of work
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    /// True once a write under this handle has failed; commit will refuse
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.get()
    }

    /// Pass `result` through, poisoning the handle on error
    pub(crate) fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.poisoned.set(true);
        }
        result
    }
}

/// Open a unit of work for `actor_id` (`None` is the system actor)
pub fn begin_transaction<'conn>(
    conn: &'conn mut Connection,
    actor_id: Option<&str>,
) -> Result<TransactionHandle<'conn>> {
    begin_transaction_with(conn, actor_id, RequestContext::new())
}

/// [`begin_transaction`] carrying the caller's correlation ids.
///
/// Takes the SQLite write lock immediately; if another writer holds it past
/// the busy timeout the result is a retryable `Conflict`.
pub fn begin_transaction_with<'conn>(
    conn: &'conn mut Connection,
    actor_id: Option<&str>,
    context: RequestContext,
) -> Result<TransactionHandle<'conn>> {
    let start = Instant::now();
    log_op_start!(
        "begin_transaction",
        actor_id = actor_id.unwrap_or(""),
        request_id = %context.request_id,
        trace_id = context.trace_id.as_ref().map_or("", |t| t.as_str())
    );

    let result = open(conn, actor_id, context);
    match &result {
        Ok(handle) => log_op_end!(
            "begin_transaction",
            duration_ms = elapsed_ms(start),
            transaction_id = handle.transaction_id().get()
        ),
        Err(e) => log_op_error!("begin_transaction", e, duration_ms = elapsed_ms(start)),
    }
    result
}

fn open<'conn>(
    conn: &'conn mut Connection,
    actor_id: Option<&str>,
    context: RequestContext,
) -> Result<TransactionHandle<'conn>> {
    let actor = match actor_id {
        Some(id) if id.trim().is_empty() => {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("begin_transaction")
                .with_message("actor id must not be empty; omit it for the system actor"))
        }
        Some(id) => Some(ActorId::new(id)),
        None => None,
    };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| {
            let err = from_rusqlite(e)
                .with_op("begin_transaction")
                .with_request_id(context.request_id.clone());
            match &context.trace_id {
                Some(trace_id) => err.with_trace_id(trace_id.clone()),
                None => err,
            }
        })?;
    let transaction = LedgerRepo::allocate(&tx, Utc::now(), actor.as_ref())?;

    Ok(TransactionHandle {
        tx,
        transaction,
        context,
        poisoned: Cell::new(false),
    })
}

/// Make every write under `handle` durable.
///
/// A poisoned handle is rolled back instead and reported as
/// `InvariantViolation`, so a partly written version chain never commits.
pub fn commit(handle: TransactionHandle<'_>) -> Result<Transaction> {
    let start = Instant::now();
    let transaction_id = handle.transaction_id().get();
    log_op_start!("commit", transaction_id = transaction_id);

    let result = if handle.is_poisoned() {
        let TransactionHandle { tx, transaction, .. } = handle;
        match tx.rollback() {
            Ok(()) => Err(ExError::new(ExErrorKind::InvariantViolation)
                .with_op("commit")
                .with_transaction_id(transaction.id)
                .with_message("a write under this transaction failed; it was rolled back")),
            Err(e) => Err(from_rusqlite(e).with_op("commit")),
        }
    } else {
        let TransactionHandle { tx, transaction, .. } = handle;
        tx.commit()
            .map(|_| transaction)
            .map_err(|e| from_rusqlite(e).with_op("commit"))
    };

    match &result {
        Ok(_) => log_op_end!("commit", duration_ms = elapsed_ms(start), transaction_id = transaction_id),
        Err(e) => log_op_error!("commit", e, duration_ms = elapsed_ms(start), transaction_id = transaction_id),
    }
    result
}

/// Discard the unit of work; neither its ledger entry nor any version row
/// written under it becomes visible.
pub fn abort(handle: TransactionHandle<'_>) -> Result<()> {
    let start = Instant::now();
    let transaction_id = handle.transaction_id().get();
    log_op_start!("abort", transaction_id = transaction_id);

    let result = handle
        .tx
        .rollback()
        .map_err(|e| from_rusqlite(e).with_op("abort"));

    match &result {
        Ok(()) => log_op_end!("abort", duration_ms = elapsed_ms(start), transaction_id = transaction_id),
        Err(e) => log_op_error!("abort", e, duration_ms = elapsed_ms(start), transaction_id = transaction_id),
    }
    result
}
