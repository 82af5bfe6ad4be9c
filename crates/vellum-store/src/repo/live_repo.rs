//! Live table access: one row per existing entity, current values only

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{Columns, EntityId};
use vellum_core::registry::EntitySchema;

use crate::codec::{entity_id_to_sql, from_sql, to_sql};
use crate::errors::{from_rusqlite, Result};

fn not_found(schema: &EntitySchema, id: &EntityId, op: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op)
        .with_entity_type(schema.name())
        .with_entity_id(id.as_str())
        .with_message(format!("{} {} does not exist", schema.name(), id))
}

pub struct LiveRepo;

impl LiveRepo {
    pub fn get(conn: &Connection, schema: &EntitySchema, id: &EntityId) -> Result<Option<Columns>> {
        let names: Vec<String> = schema
            .columns()
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect();
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1",
            names.join(", "),
            schema.table(),
            schema.primary_key()
        );
        let width = schema.columns().len();
        let mut stmt = conn.prepare_cached(&sql).map_err(from_rusqlite)?;
        let mut rows = stmt
            .query_map([entity_id_to_sql(schema, id)?], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(from_rusqlite)?;

        let Some(raw) = rows.next() else {
            return Ok(None);
        };
        let raw = raw.map_err(from_rusqlite)?;

        let mut columns = Columns::new();
        for (col, value) in schema.columns().iter().zip(raw) {
            columns.set(col.name.clone(), from_sql(&col.name, col.ty, value)?);
        }
        Ok(Some(columns))
    }

    /// Insert a new live row; an existing id is `AlreadyExists`
    pub fn insert(
        conn: &Connection,
        schema: &EntitySchema,
        id: &EntityId,
        columns: &Columns,
    ) -> Result<()> {
        let mut names = vec![format!("\"{}\"", schema.primary_key())];
        names.extend(schema.columns().iter().map(|c| format!("\"{}\"", c.name)));
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            schema.table(),
            names.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![entity_id_to_sql(schema, id)?];
        values.extend(schema.columns().iter().map(|c| to_sql(columns.get(&c.name))));
        conn.execute(&sql, params_from_iter(values)).map_err(|e| {
            from_rusqlite(e)
                .with_op("insert_live_row")
                .with_entity_type(schema.name())
                .with_entity_id(id.as_str())
        })?;
        Ok(())
    }

    /// Replace every versioned column of an existing row
    pub fn update(
        conn: &Connection,
        schema: &EntitySchema,
        id: &EntityId,
        columns: &Columns,
    ) -> Result<()> {
        let assignments: Vec<String> = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ?{}", c.name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
            schema.table(),
            assignments.join(", "),
            schema.primary_key(),
            schema.columns().len() + 1
        );
        let mut values: Vec<Value> = schema
            .columns()
            .iter()
            .map(|c| to_sql(columns.get(&c.name)))
            .collect();
        values.push(entity_id_to_sql(schema, id)?);

        let affected = conn
            .execute(&sql, params_from_iter(values))
            .map_err(from_rusqlite)?;
        if affected == 0 {
            return Err(not_found(schema, id, "update_live_row"));
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, schema: &EntitySchema, id: &EntityId) -> Result<()> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?1",
            schema.table(),
            schema.primary_key()
        );
        let affected = conn
            .execute(&sql, [entity_id_to_sql(schema, id)?])
            .map_err(from_rusqlite)?;
        if affected == 0 {
            return Err(not_found(schema, id, "delete_live_row"));
        }
        Ok(())
    }
}
