//! Conversion between `ColumnValue` and SQLite storage values.
//!
//! | ColumnType | SQLite storage |
//! |---|---|
//! | text | TEXT |
//! | integer | INTEGER |
//! | real | REAL |
//! | boolean | INTEGER 0/1 |
//! | timestamp | INTEGER Unix milliseconds |
//! | json | TEXT (serialized document) |

use chrono::DateTime;
use rusqlite::types::Value;
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{ColumnType, ColumnValue, EntityId};
use vellum_core::registry::EntitySchema;

use crate::errors::Result;

pub fn to_sql(value: &ColumnValue) -> Value {
    match value {
        ColumnValue::Null => Value::Null,
        ColumnValue::Bool(b) => Value::Integer(i64::from(*b)),
        ColumnValue::Integer(i) => Value::Integer(*i),
        ColumnValue::Real(r) => Value::Real(*r),
        ColumnValue::Text(s) => Value::Text(s.clone()),
        ColumnValue::Timestamp(ts) => Value::Integer(ts.timestamp_millis()),
        ColumnValue::Json(v) => Value::Text(v.to_string()),
    }
}

fn decode_error(column: &str, ty: ColumnType, found: &Value) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("decode_column")
        .with_message(format!(
            "column '{}' declared {} holds {:?}",
            column,
            ty,
            found.data_type()
        ))
}

pub fn from_sql(column: &str, ty: ColumnType, value: Value) -> Result<ColumnValue> {
    let decoded = match (ty, value) {
        (_, Value::Null) => ColumnValue::Null,
        (ColumnType::Text, Value::Text(s)) => ColumnValue::Text(s),
        (ColumnType::Integer, Value::Integer(i)) => ColumnValue::Integer(i),
        (ColumnType::Real, Value::Real(r)) => ColumnValue::Real(r),
        (ColumnType::Real, Value::Integer(i)) => ColumnValue::Real(i as f64),
        (ColumnType::Boolean, Value::Integer(i)) => ColumnValue::Bool(i != 0),
        (ColumnType::Timestamp, Value::Integer(ms)) => DateTime::from_timestamp_millis(ms)
            .map(ColumnValue::Timestamp)
            .ok_or_else(|| decode_error(column, ty, &Value::Integer(ms)))?,
        (ColumnType::Json, Value::Text(s)) => {
            let doc = serde_json::from_str(&s).map_err(|e| {
                ExError::new(ExErrorKind::Serialization)
                    .with_op("decode_column")
                    .with_message(format!("column '{}' holds invalid JSON: {}", column, e))
            })?;
            ColumnValue::Json(doc)
        }
        (ty, other) => return Err(decode_error(column, ty, &other)),
    };
    Ok(decoded)
}

/// Bind value for the primary key column of `schema`
pub fn entity_id_to_sql(schema: &EntitySchema, id: &EntityId) -> Result<Value> {
    match schema.primary_key_type() {
        ColumnType::Integer => id.as_str().parse::<i64>().map(Value::Integer).map_err(|_| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_entity_type(schema.name())
                .with_entity_id(id.as_str())
                .with_message(format!(
                    "'{}' is not a valid integer key for {}",
                    id,
                    schema.name()
                ))
        }),
        _ => Ok(Value::Text(id.as_str().to_string())),
    }
}

pub fn entity_id_from_sql(value: Value) -> Result<EntityId> {
    match value {
        Value::Text(s) => Ok(EntityId::new(s)),
        Value::Integer(i) => Ok(EntityId::new(i.to_string())),
        other => Err(ExError::new(ExErrorKind::Serialization)
            .with_op("decode_entity_id")
            .with_message(format!("unexpected key storage {:?}", other.data_type()))),
    }
}
