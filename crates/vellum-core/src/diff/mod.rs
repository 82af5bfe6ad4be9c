//! Changeset derivation.
//!
//! Compares adjacent version rows of one entity and produces, per
//! transaction, the `(old, new)` pair of every column that changed.
//!
//! ## Guarantees
//!
//! - **Determinism**: columns are reported in name order.
//! - **Recomputable**: with [`ChangeDetection::Values`] the stored `_mod`
//!   flags are ignored and the diff is derived from full snapshots.
//! - **Insert/delete boundary**: the first row diffs against an all-null
//!   state; a delete row reports no column changes.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{build_changesets, changed_columns, stale_flags};
pub use human_summary::render_history;
pub use model::{ChangeDetection, Changeset, ColumnChange};
