use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared storage type of a versioned column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    /// UTC instant, persisted as Unix milliseconds
    Timestamp,
    /// Arbitrary JSON document (arrays, nested objects), persisted as text
    Json,
}

impl ColumnType {
    /// SQLite type affinity used in generated DDL
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Json => "TEXT",
            ColumnType::Integer | ColumnType::Boolean | ColumnType::Timestamp => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        };
        f.write_str(name)
    }
}

/// A single column value as captured in a live row or a version snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Short name of the variant, used in type-mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "null",
            ColumnValue::Bool(_) => "boolean",
            ColumnValue::Integer(_) => "integer",
            ColumnValue::Real(_) => "real",
            ColumnValue::Text(_) => "text",
            ColumnValue::Timestamp(_) => "timestamp",
            ColumnValue::Json(_) => "json",
        }
    }

    /// Whether this value may be stored in a column of type `ty`.
    ///
    /// Null fits every type; nullability is checked by the schema.
    pub fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (ColumnValue::Null, _)
                | (ColumnValue::Bool(_), ColumnType::Boolean)
                | (ColumnValue::Integer(_), ColumnType::Integer)
                | (ColumnValue::Real(_), ColumnType::Real)
                | (ColumnValue::Integer(_), ColumnType::Real)
                | (ColumnValue::Text(_), ColumnType::Text)
                | (ColumnValue::Timestamp(_), ColumnType::Timestamp)
                | (ColumnValue::Json(_), ColumnType::Json)
        )
    }

    /// `None` for SQL NULL, otherwise the value itself
    pub fn into_option(self) -> Option<ColumnValue> {
        match self {
            ColumnValue::Null => None,
            other => Some(other),
        }
    }

    /// Parse a JSON input value into the representation for `ty`.
    ///
    /// Timestamps accept RFC 3339 strings or Unix milliseconds.
    pub fn from_json(ty: ColumnType, value: &serde_json::Value) -> Option<ColumnValue> {
        use serde_json::Value;
        if value.is_null() {
            return Some(ColumnValue::Null);
        }
        match ty {
            ColumnType::Text => value.as_str().map(|s| ColumnValue::Text(s.to_string())),
            ColumnType::Integer => value.as_i64().map(ColumnValue::Integer),
            ColumnType::Real => value.as_f64().map(ColumnValue::Real),
            ColumnType::Boolean => value.as_bool().map(ColumnValue::Bool),
            ColumnType::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| ColumnValue::Timestamp(dt.with_timezone(&Utc))),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(DateTime::from_timestamp_millis)
                    .map(ColumnValue::Timestamp),
                _ => None,
            },
            ColumnType::Json => Some(ColumnValue::Json(value.clone())),
        }
    }
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnValue::Null => f.write_str("NULL"),
            ColumnValue::Bool(b) => write!(f, "{}", b),
            ColumnValue::Integer(i) => write!(f, "{}", i),
            ColumnValue::Real(r) => write!(f, "{}", r),
            ColumnValue::Text(s) => write!(f, "{:?}", s),
            ColumnValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            ColumnValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::Text(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::Text(s)
    }
}

impl From<i64> for ColumnValue {
    fn from(i: i64) -> Self {
        ColumnValue::Integer(i)
    }
}

impl From<bool> for ColumnValue {
    fn from(b: bool) -> Self {
        ColumnValue::Bool(b)
    }
}

impl From<f64> for ColumnValue {
    fn from(r: f64) -> Self {
        ColumnValue::Real(r)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(ts: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(ts)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}
