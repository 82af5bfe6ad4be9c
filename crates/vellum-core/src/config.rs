//! TOML configuration: database location, logging profile and the entity
//! types enrolled in versioning.
//!
//! ```toml
//! [database]
//! path = "vellum.db"
//!
//! [[entity]]
//! name = "reference"
//! primary_key = "curie"
//! columns = [{ name = "title", type = "text", nullable = false }]
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{Result, VersioningError};
use crate::logging_facility::Profile;
use crate::model::ColumnType;
use crate::registry::{ColumnDescriptor, EntitySchema, SchemaRegistry};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VellumConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub name: String,
    pub primary_key: String,
    #[serde(default)]
    pub primary_key_type: Option<ColumnType>,
    #[serde(default)]
    pub audited: bool,
    #[serde(default)]
    pub unversioned: Vec<String>,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl EntityConfig {
    pub fn to_schema(&self) -> Result<EntitySchema> {
        let mut builder = EntitySchema::builder(&self.name, &self.primary_key);
        match self.primary_key_type {
            None | Some(ColumnType::Text) => {}
            Some(ColumnType::Integer) => builder = builder.integer_key(),
            Some(other) => {
                return Err(VersioningError::Config {
                    reason: format!(
                        "entity '{}': primary_key_type must be text or integer, got {}",
                        self.name, other
                    ),
                })
            }
        }
        for col in &self.columns {
            builder = builder.descriptor(ColumnDescriptor::new(&col.name, col.ty, col.nullable));
        }
        for name in &self.unversioned {
            builder = builder.unversioned(name);
        }
        if self.audited {
            builder = builder.audited();
        }
        builder.build()
    }
}

impl VellumConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| VersioningError::Config {
            reason: e.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| VersioningError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }

    /// Build the schema registry from the `[[entity]]` tables
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for entity in &self.entities {
            registry.register(entity.to_schema()?)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[database]
path = "vellum.db"

[logging]
profile = "production"

[[entity]]
name = "reference"
primary_key = "curie"
audited = true
unversioned = ["authors", "cross_references"]
columns = [
  { name = "title", type = "text", nullable = false },
  { name = "volume", type = "text" },
  { name = "page_count", type = "integer" },
]

[[entity]]
name = "author"
primary_key = "author_id"
primary_key_type = "integer"
columns = [{ name = "name", type = "text" }]
"#;

    #[test]
    fn test_parse_sample() {
        let config = VellumConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.database.path, PathBuf::from("vellum.db"));
        assert_eq!(config.database.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.logging.profile, Profile::Production);
        assert_eq!(config.entities.len(), 2);
        assert!(config.entities[0].columns[1].nullable);
        assert!(!config.entities[0].columns[0].nullable);
    }

    #[test]
    fn test_registry_from_config() {
        let registry = VellumConfig::from_toml_str(SAMPLE)
            .unwrap()
            .registry()
            .unwrap();
        let reference = registry.get("reference").unwrap();
        assert!(reference.is_audited());
        assert!(reference.is_unversioned("authors"));
        assert_eq!(reference.columns().len(), 7);
        assert_eq!(
            registry.get("author").unwrap().primary_key_type(),
            ColumnType::Integer
        );
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = VellumConfig::from_toml_str("[database]\n").unwrap_err();
        assert!(matches!(err, VersioningError::Config { .. }));

        let bad_column = r#"
[database]
path = "x.db"

[[entity]]
name = "Bad Name"
primary_key = "id"
columns = [{ name = "title", type = "text" }]
"#;
        let config = VellumConfig::from_toml_str(bad_column).unwrap();
        assert!(config.registry().is_err());
    }
}
