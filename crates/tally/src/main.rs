//! The main entry point for the tally evaluator.

#![allow(unused_crate_dependencies)]

use std::process::ExitCode;

fn main() -> ExitCode {
    tally_cli::main_impl()
}
