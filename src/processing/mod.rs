//! Sync processing logic.
//!
//! - [`reconcile`] - Converge the directory on a set of records
//! - [`run`] - Full run with input file and change cache

mod reconcile;
mod run;

// Re-export public functions
pub use reconcile::{is_manual, reconcile};
pub use run::{sync_file, SyncOptions, SyncOutcome};
