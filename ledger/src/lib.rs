//! ledger
//!
//! Persistent per-project sample ledger: a SQLite `project_summary` table
//! mirrored by a flat `project_summary.csv`, with a timestamped archive
//! taken before every overwrite.
#![deny(missing_docs)]

mod archive;
mod store;

pub use archive::Archiver;
pub use store::LedgerStore;
