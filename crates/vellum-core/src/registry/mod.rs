//! Schema Registry
//!
//! Static mapping from entity type name to its [`EntitySchema`]. Built once
//! at startup (from code or from configuration) and only read afterwards;
//! it is the single shared structure of the engine.

pub mod schema;

use std::collections::BTreeMap;

use crate::errors::{Result, VersioningError};
use crate::model::{Columns, EntityId};

pub use schema::{
    validate_identifier, ColumnDescriptor, EntitySchema, EntitySchemaBuilder, AUDIT_CREATED_BY,
    AUDIT_DATE_CREATED, AUDIT_DATE_UPDATED, AUDIT_UPDATED_BY,
};

/// Tables owned by the ledger and the migration runner
const RESERVED_TABLES: &[&str] = &["transactions", "actors", "schema_version"];

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Builder-style registration
    pub fn with(mut self, schema: EntitySchema) -> Result<Self> {
        self.register(schema)?;
        Ok(self)
    }

    /// Add an entity type; names must be unique across the registry
    pub fn register(&mut self, schema: EntitySchema) -> Result<()> {
        if RESERVED_TABLES.contains(&schema.name()) || schema.name().starts_with("sqlite_") {
            return Err(VersioningError::InvalidSchema {
                reason: format!("entity type name '{}' is reserved", schema.name()),
            });
        }
        let version_table = schema.version_table();
        if self.schemas.contains_key(schema.name()) || self.schemas.contains_key(&version_table) {
            return Err(VersioningError::InvalidSchema {
                reason: format!("entity type '{}' registered twice", schema.name()),
            });
        }
        if self
            .schemas
            .values()
            .any(|s| s.version_table() == schema.name())
        {
            return Err(VersioningError::InvalidSchema {
                reason: format!(
                    "entity type '{}' collides with a version table",
                    schema.name()
                ),
            });
        }
        self.schemas.insert(schema.name().to_string(), schema);
        Ok(())
    }

    pub fn get(&self, entity_type: &str) -> Result<&EntitySchema> {
        self.schemas
            .get(entity_type)
            .ok_or_else(|| VersioningError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })
    }

    /// Ordered versioned column descriptors of `entity_type`
    pub fn columns_of(&self, entity_type: &str) -> Result<&[ColumnDescriptor]> {
        Ok(self.get(entity_type)?.columns())
    }

    pub fn primary_key_of(&self, entity_type: &str, entity: &Columns) -> Result<EntityId> {
        self.get(entity_type)?.primary_key_of(entity)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

    fn schema(name: &str) -> EntitySchema {
        EntitySchema::builder(name, "id")
            .column("title", ColumnType::Text)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_and_columns_of() {
        let registry = SchemaRegistry::new().with(schema("reference")).unwrap();
        let cols = registry.columns_of("reference").unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name, "title");
        assert!(matches!(
            registry.columns_of("nope"),
            Err(VersioningError::UnknownEntityType { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = SchemaRegistry::new().with(schema("reference")).unwrap();
        assert!(registry.with(schema("reference")).is_err());
    }

    #[test]
    fn test_version_table_collision_rejected() {
        let registry = SchemaRegistry::new().with(schema("author")).unwrap();
        assert!(registry.clone().with(schema("author_version")).is_err());

        let registry = SchemaRegistry::new().with(schema("author_version")).unwrap();
        assert!(registry.with(schema("author")).is_err());
    }
}
