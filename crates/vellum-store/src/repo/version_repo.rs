//! Version table access
//!
//! Rows are only ever inserted, closed once (`end_transaction_id` set), or
//! have their `_mod` cache rewritten by a flag rebuild. Nothing here deletes.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeSet;
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{Columns, EntityId, OperationKind, TransactionId, VersionRow};
use vellum_core::registry::EntitySchema;

use crate::codec::{entity_id_from_sql, entity_id_to_sql, from_sql, to_sql};
use crate::errors::{conflict_on_unique, from_rusqlite, Result};

fn select_list(schema: &EntitySchema) -> String {
    let mut names = vec![
        format!("\"{}\"", schema.primary_key()),
        "transaction_id".to_string(),
        "end_transaction_id".to_string(),
        "operation_type".to_string(),
    ];
    names.extend(schema.columns().iter().map(|c| format!("\"{}\"", c.name)));
    names.extend(
        schema
            .columns()
            .iter()
            .map(|c| format!("\"{}\"", c.flag_column())),
    );
    names.join(", ")
}

fn raw_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width).map(|i| row.get::<_, Value>(i)).collect()
}

fn integer(value: Value, what: &str) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(i),
        other => Err(ExError::new(ExErrorKind::Serialization)
            .with_op("decode_version_row")
            .with_message(format!("{} stored as {:?}", what, other.data_type()))),
    }
}

fn decode(schema: &EntitySchema, raw: Vec<Value>) -> Result<VersionRow> {
    let mut values = raw.into_iter();
    let mut next = || values.next().unwrap_or(Value::Null);

    let entity_id = entity_id_from_sql(next())?;
    let transaction_id = TransactionId::new(integer(next(), "transaction_id")?);
    let end_transaction_id = match next() {
        Value::Null => None,
        other => Some(TransactionId::new(integer(other, "end_transaction_id")?)),
    };
    let operation = OperationKind::from_code(integer(next(), "operation_type")?)?;

    let mut columns = Columns::new();
    for col in schema.columns() {
        columns.set(col.name.clone(), from_sql(&col.name, col.ty, next())?);
    }
    let mut changed = BTreeSet::new();
    for col in schema.columns() {
        if integer(next(), &col.flag_column())? != 0 {
            changed.insert(col.name.clone());
        }
    }

    Ok(VersionRow {
        entity_id,
        transaction_id,
        end_transaction_id,
        operation,
        columns,
        changed,
    })
}

fn query_rows(
    conn: &Connection,
    schema: &EntitySchema,
    sql: &str,
    params: Vec<Value>,
) -> Result<Vec<VersionRow>> {
    let width = 4 + 2 * schema.columns().len();
    let mut stmt = conn.prepare_cached(sql).map_err(from_rusqlite)?;
    let raw = stmt
        .query_map(params_from_iter(params), |row| raw_row(row, width))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    raw.into_iter().map(|r| decode(schema, r)).collect()
}

pub struct VersionRepo;

impl VersionRepo {
    /// Every version row of one entity, oldest first
    pub fn chain(conn: &Connection, schema: &EntitySchema, id: &EntityId) -> Result<Vec<VersionRow>> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1 ORDER BY transaction_id",
            select_list(schema),
            schema.version_table(),
            schema.primary_key()
        );
        query_rows(conn, schema, &sql, vec![entity_id_to_sql(schema, id)?])
    }

    /// The row with `end_transaction_id IS NULL`, if any
    pub fn open_row(
        conn: &Connection,
        schema: &EntitySchema,
        id: &EntityId,
    ) -> Result<Option<VersionRow>> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1 AND end_transaction_id IS NULL",
            select_list(schema),
            schema.version_table(),
            schema.primary_key()
        );
        let mut rows = query_rows(conn, schema, &sql, vec![entity_id_to_sql(schema, id)?])?;
        Ok(rows.pop())
    }

    /// Close the open row that started at `started_at`.
    ///
    /// Fails with `Conflict` when that row is no longer open, i.e. another
    /// writer already closed it.
    pub fn close(
        conn: &Connection,
        schema: &EntitySchema,
        id: &EntityId,
        started_at: TransactionId,
        end: TransactionId,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE \"{}\" SET end_transaction_id = ?1
             WHERE \"{}\" = ?2 AND transaction_id = ?3 AND end_transaction_id IS NULL",
            schema.version_table(),
            schema.primary_key()
        );
        let affected = conn
            .execute(
                &sql,
                params_from_iter([
                    Value::Integer(end.get()),
                    entity_id_to_sql(schema, id)?,
                    Value::Integer(started_at.get()),
                ]),
            )
            .map_err(from_rusqlite)?;
        if affected != 1 {
            return Err(ExError::new(ExErrorKind::Conflict)
                .with_op("close_version_row")
                .with_entity_type(schema.name())
                .with_entity_id(id.as_str())
                .with_transaction_id(end)
                .with_message(format!(
                    "open version row from transaction {} was closed concurrently",
                    started_at
                )));
        }
        Ok(())
    }

    /// Append a version row; a uniqueness failure is a `Conflict`
    pub fn insert(conn: &Connection, schema: &EntitySchema, row: &VersionRow) -> Result<()> {
        let width = 4 + 2 * schema.columns().len();
        let placeholders: Vec<String> = (1..=width).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            schema.version_table(),
            select_list(schema),
            placeholders.join(", ")
        );

        let mut values = vec![
            entity_id_to_sql(schema, &row.entity_id)?,
            Value::Integer(row.transaction_id.get()),
            row.end_transaction_id
                .map_or(Value::Null, |t| Value::Integer(t.get())),
            Value::Integer(row.operation.code()),
        ];
        values.extend(schema.columns().iter().map(|c| to_sql(row.columns.get(&c.name))));
        values.extend(
            schema
                .columns()
                .iter()
                .map(|c| Value::Integer(i64::from(row.is_changed(&c.name)))),
        );

        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| {
                conflict_on_unique(e)
                    .with_op("insert_version_row")
                    .with_entity_type(schema.name())
                    .with_entity_id(row.entity_id.as_str())
                    .with_transaction_id(row.transaction_id)
            })?;
        Ok(())
    }

    /// Overwrite the `_mod` cache of one row
    pub fn set_flags(
        conn: &Connection,
        schema: &EntitySchema,
        id: &EntityId,
        transaction_id: TransactionId,
        changed: &BTreeSet<String>,
    ) -> Result<()> {
        let assignments: Vec<String> = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ?{}", c.flag_column(), i + 1))
            .collect();
        let n = schema.columns().len();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{} AND transaction_id = ?{}",
            schema.version_table(),
            assignments.join(", "),
            schema.primary_key(),
            n + 1,
            n + 2
        );
        let mut values: Vec<Value> = schema
            .columns()
            .iter()
            .map(|c| Value::Integer(i64::from(changed.contains(&c.name))))
            .collect();
        values.push(entity_id_to_sql(schema, id)?);
        values.push(Value::Integer(transaction_id.get()));
        conn.execute(&sql, params_from_iter(values))
            .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Ids of every entity with at least one version row
    pub fn entity_ids(conn: &Connection, schema: &EntitySchema) -> Result<Vec<EntityId>> {
        let sql = format!(
            "SELECT DISTINCT \"{pk}\" FROM \"{vt}\" ORDER BY \"{pk}\"",
            pk = schema.primary_key(),
            vt = schema.version_table()
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let raw = stmt
            .query_map([], |row| row.get::<_, Value>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        raw.into_iter().map(entity_id_from_sql).collect()
    }

    /// Entities of this type written by one transaction
    pub fn written_by(
        conn: &Connection,
        schema: &EntitySchema,
        transaction_id: TransactionId,
    ) -> Result<Vec<(EntityId, OperationKind)>> {
        let sql = format!(
            "SELECT \"{}\", operation_type FROM \"{}\" WHERE transaction_id = ?1 ORDER BY 1",
            schema.primary_key(),
            schema.version_table()
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let raw = stmt
            .query_map([transaction_id.get()], |row| {
                Ok((row.get::<_, Value>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        raw.into_iter()
            .map(|(id, code)| -> Result<(EntityId, OperationKind)> {
                Ok((entity_id_from_sql(id)?, OperationKind::from_code(code)?))
            })
            .collect()
    }}
