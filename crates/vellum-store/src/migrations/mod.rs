//! Migration framework
//!
//! - Embedded SQL, applied in order, each in its own transaction
//! - Applied migrations recorded in `schema_version` with a checksum
//! - Re-running is a no-op; a changed migration body is an error

mod checksums;
mod embedded;
mod runner;

pub use checksums::compute_checksum;
pub use runner::{applied_migrations, apply_migrations, AppliedMigration};
