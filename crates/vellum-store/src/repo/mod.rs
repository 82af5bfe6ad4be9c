//! Repositories over the generated per-entity tables
//!
//! All functions take a `&Connection`; pass the open `rusqlite::Transaction`
//! (which derefs to a connection) to keep writes in the caller's unit of work.

pub mod live_repo;
pub mod version_repo;

pub use live_repo::LiveRepo;
pub use version_repo::VersionRepo;
