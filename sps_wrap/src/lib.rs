//! CLI plumbing for the `sps` workflow binary: project paths, terminal
//! prompts, logging, and the per-stage orchestration that wires the
//! importer, thresholds, reconciler, and ledger together.

use itertools::Itertools;

pub mod mylog;
pub mod paths;
pub mod stages;
pub mod terminal;

pub fn print_error_chain(err: &anyhow::Error) {
    let error_chain = err.chain().join("\n\tCaused by: ");
    println!("ERROR: {error_chain}");
}
