//! Vellum Store - SQLite persistence for the versioning engine
//!
//! Provides:
//! - Connection setup and embedded, checksummed migrations
//! - Live and version table DDL generated from the schema registry
//! - The transaction ledger
//! - Repositories for live rows and version rows

pub mod codec;
pub mod db;
pub mod ddl;
pub mod errors;
pub mod ledger;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use ledger::LedgerRepo;
pub use repo::{LiveRepo, VersionRepo};
