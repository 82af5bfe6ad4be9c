//! Per-entity-type schema descriptors.

use chrono::SubsecRound;
use std::collections::BTreeSet;

use crate::errors::{Result, VersioningError};
use crate::model::{ColumnType, ColumnValue, Columns, EntityId};

/// Audit columns added to every entity type declared `audited`
pub const AUDIT_DATE_CREATED: &str = "date_created";
pub const AUDIT_DATE_UPDATED: &str = "date_updated";
pub const AUDIT_CREATED_BY: &str = "created_by";
pub const AUDIT_UPDATED_BY: &str = "updated_by";

/// Bookkeeping columns of every version table
const RESERVED: &[&str] = &["transaction_id", "end_transaction_id", "operation_type"];

const MAX_IDENTIFIER_LEN: usize = 63;

/// Check that `name` is safe to interpolate into generated SQL
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_head && valid_tail && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(VersioningError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// One versioned column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }

    /// Name of the `_mod` flag column in the version table
    pub fn flag_column(&self) -> String {
        format!("{}_mod", self.name)
    }
}

/// Static description of one tracked entity type.
///
/// Built once through [`EntitySchemaBuilder`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    primary_key: String,
    primary_key_type: ColumnType,
    columns: Vec<ColumnDescriptor>,
    unversioned: BTreeSet<String>,
    audited: bool,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>, primary_key: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            name: name.into(),
            primary_key: primary_key.into(),
            primary_key_type: ColumnType::Text,
            columns: Vec::new(),
            unversioned: BTreeSet::new(),
            audited: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live table name
    pub fn table(&self) -> &str {
        &self.name
    }

    pub fn version_table(&self) -> String {
        format!("{}_version", self.name)
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key_type(&self) -> ColumnType {
        self.primary_key_type
    }

    /// Versioned columns in declaration order (audit columns last)
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_unversioned(&self, name: &str) -> bool {
        self.unversioned.contains(name)
    }

    pub fn is_audited(&self) -> bool {
        self.audited
    }

    /// Extract the entity id from a column map holding the primary key
    pub fn primary_key_of(&self, columns: &Columns) -> Result<EntityId> {
        let id = match columns.get(&self.primary_key) {
            ColumnValue::Text(s) if !s.is_empty() => s.clone(),
            ColumnValue::Integer(i) => i.to_string(),
            _ => {
                return Err(VersioningError::MissingPrimaryKey {
                    entity_type: self.name.clone(),
                    primary_key: self.primary_key.clone(),
                })
            }
        };
        Ok(EntityId::new(id))
    }

    /// Reduce `input` to a full snapshot of the versioned columns.
    ///
    /// Drops the primary key and unversioned relationship names, rejects
    /// any other undeclared name, fills absent columns with `Null` and
    /// checks types and nullability.
    pub fn snapshot(&self, input: &Columns) -> Result<Columns> {
        for name in input.names() {
            if name != self.primary_key
                && !self.unversioned.contains(name)
                && self.column(name).is_none()
            {
                return Err(VersioningError::UnknownColumn {
                    entity_type: self.name.clone(),
                    column: name.to_string(),
                });
            }
        }

        let mut snapshot = Columns::new();
        for col in &self.columns {
            let value = input.get(&col.name).clone();
            if value.is_null() && !col.nullable {
                return Err(VersioningError::NullViolation {
                    entity_type: self.name.clone(),
                    column: col.name.clone(),
                });
            }
            if !value.fits(col.ty) {
                return Err(VersioningError::TypeMismatch {
                    entity_type: self.name.clone(),
                    column: col.name.clone(),
                    expected: col.ty,
                    found: value.type_name().to_string(),
                });
            }
            let value = match (col.ty, value) {
                (ColumnType::Real, ColumnValue::Integer(i)) => ColumnValue::Real(i as f64),
                // Stored as Unix milliseconds
                (ColumnType::Timestamp, ColumnValue::Timestamp(t)) => {
                    ColumnValue::Timestamp(t.trunc_subsecs(3))
                }
                (_, v) => v,
            };
            snapshot.set(col.name.clone(), value);
        }
        Ok(snapshot)
    }

    /// Parse a JSON object of column inputs, typed by this schema.
    ///
    /// Unversioned names are skipped; they never reach the version table.
    pub fn columns_from_json(&self, input: &serde_json::Value) -> Result<Columns> {
        let object = input.as_object().ok_or_else(|| VersioningError::Serialization {
            message: format!("{} input must be a JSON object", self.name),
        })?;

        let mut columns = Columns::new();
        for (name, raw) in object {
            if self.unversioned.contains(name) {
                continue;
            }
            let ty = if *name == self.primary_key {
                self.primary_key_type
            } else {
                self.column(name)
                    .map(|c| c.ty)
                    .ok_or_else(|| VersioningError::UnknownColumn {
                        entity_type: self.name.clone(),
                        column: name.clone(),
                    })?
            };
            let value =
                ColumnValue::from_json(ty, raw).ok_or_else(|| VersioningError::TypeMismatch {
                    entity_type: self.name.clone(),
                    column: name.clone(),
                    expected: ty,
                    found: json_kind(raw).to_string(),
                })?;
            columns.set(name.clone(), value);
        }
        Ok(columns)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Builder validating an [`EntitySchema`]
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    name: String,
    primary_key: String,
    primary_key_type: ColumnType,
    columns: Vec<ColumnDescriptor>,
    unversioned: BTreeSet<String>,
    audited: bool,
}

impl EntitySchemaBuilder {
    /// Primary key stored as INTEGER instead of TEXT
    pub fn integer_key(mut self) -> Self {
        self.primary_key_type = ColumnType::Integer;
        self
    }

    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDescriptor::new(name, ty, true));
        self
    }

    pub fn required_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDescriptor::new(name, ty, false));
        self
    }

    pub fn descriptor(mut self, descriptor: ColumnDescriptor) -> Self {
        self.columns.push(descriptor);
        self
    }

    /// Relationship or derived field that is accepted but never versioned
    pub fn unversioned(mut self, name: impl Into<String>) -> Self {
        self.unversioned.insert(name.into());
        self
    }

    /// Add and maintain the four audit columns
    pub fn audited(mut self) -> Self {
        self.audited = true;
        self
    }

    pub fn build(mut self) -> Result<EntitySchema> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.primary_key)?;
        if !matches!(
            self.primary_key_type,
            ColumnType::Text | ColumnType::Integer
        ) {
            return Err(VersioningError::InvalidSchema {
                reason: format!("{}: primary key must be text or integer", self.name),
            });
        }

        if self.audited {
            for (name, ty) in [
                (AUDIT_DATE_CREATED, ColumnType::Timestamp),
                (AUDIT_DATE_UPDATED, ColumnType::Timestamp),
                (AUDIT_CREATED_BY, ColumnType::Text),
                (AUDIT_UPDATED_BY, ColumnType::Text),
            ] {
                self.columns.push(ColumnDescriptor::new(name, ty, true));
            }
        }

        if self.columns.is_empty() {
            return Err(VersioningError::InvalidSchema {
                reason: format!("{}: at least one versioned column is required", self.name),
            });
        }

        let mut seen = BTreeSet::new();
        for col in &self.columns {
            validate_identifier(&col.name)?;
            if col.name == self.primary_key || RESERVED.contains(&col.name.as_str()) {
                return Err(VersioningError::InvalidSchema {
                    reason: format!("{}: column name '{}' is reserved", self.name, col.name),
                });
            }
            if !seen.insert(col.name.clone()) {
                return Err(VersioningError::InvalidSchema {
                    reason: format!("{}: duplicate column '{}'", self.name, col.name),
                });
            }
        }
        // A column literally named `<x>_mod` would collide with x's flag column
        for col in &self.columns {
            if seen.contains(&col.flag_column()) {
                return Err(VersioningError::InvalidSchema {
                    reason: format!(
                        "{}: column '{}' collides with the change flag of '{}'",
                        self.name,
                        col.flag_column(),
                        col.name
                    ),
                });
            }
        }
        for name in &self.unversioned {
            if seen.contains(name) || *name == self.primary_key {
                return Err(VersioningError::InvalidSchema {
                    reason: format!("{}: '{}' is both versioned and unversioned", self.name, name),
                });
            }
        }

        Ok(EntitySchema {
            name: self.name,
            primary_key: self.primary_key,
            primary_key_type: self.primary_key_type,
            columns: self.columns,
            unversioned: self.unversioned,
            audited: self.audited,
        })
    }
}
