//! sps
#![deny(missing_docs)]

use anyhow::Result;
use clap::Parser;
use sps_wrap::mylog::init_log;
use sps_wrap::paths::WorkflowPaths;
use sps_wrap::print_error_chain;
use sps_wrap::stages::{self, ReworkStatus};
use sps_wrap::terminal::TerminalDecisions;
use std::path::PathBuf;
use std::process::ExitCode;

const CMD: &str = "sps";

/// Track sequencing-library QC across both construction attempts and
/// reconcile FA results against the project ledger.
#[derive(Parser, Debug)]
#[clap(name = CMD)]
struct Sps {
    #[clap(subcommand)]
    subcmd: SubCommand,

    /// Project directory holding the ledger and stage folders.
    #[clap(long, global = true, default_value = ".")]
    project_dir: PathBuf,
}

#[derive(Parser, Debug)]
enum SubCommand {
    /// Analyze first-attempt FA results and write the reduced summary
    /// for review.
    #[clap(name = "first-attempt")]
    FirstAttempt,

    /// Merge the reviewed first-attempt summary and assign whole-plate
    /// rework.
    #[clap(name = "rework")]
    Rework,

    /// Analyze second-attempt FA results; writes the redo summary and the
    /// double-failed report.
    #[clap(name = "second-attempt")]
    SecondAttempt,

    /// Conclude the project: settle attempt accounting, select pooling
    /// sources, and generate the ESP smear upload files.
    #[clap(name = "conclude")]
    Conclude,
}

fn inner_main() -> Result<()> {
    let opts = Sps::parse();
    let paths = WorkflowPaths::new(&opts.project_dir);
    let mut decisions = TerminalDecisions;

    match opts.subcmd {
        SubCommand::FirstAttempt => stages::run_first_attempt(&paths, &mut decisions)?,
        SubCommand::Rework => {
            if stages::run_rework(&paths, &mut decisions)? == ReworkStatus::NoReworkNeeded {
                println!(
                    "No plates need rework. Skip the second-attempt stages and run \
                     `{CMD} conclude` once the reviewed summary is final."
                );
            }
        }
        SubCommand::SecondAttempt => stages::run_second_attempt(&paths, &mut decisions)?,
        SubCommand::Conclude => stages::run_conclude(&paths)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    init_log();
    match inner_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error_chain(&err);
            ExitCode::FAILURE
        }
    }
}
