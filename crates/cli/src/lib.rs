#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use tally_interface::{
    Result, Session,
    diagnostics::{DiagCtxt, FatalError},
};

pub mod utils;

pub use tally_config::Opts;

/// Parses the process arguments into [`Opts`].
///
/// Returns a clap error for `--help`, `--version` and invalid usage; the
/// caller is expected to `exit` with it.
pub fn parse_args<I, T>(args: I) -> std::result::Result<Opts, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    use clap::Parser;
    Opts::try_parse_from(args)
}

/// Runs the evaluator with the given parsed arguments.
pub fn run_args(opts: Opts) -> Result {
    utils::init_logger(opts.verbose);
    run_evaluator(opts)
}

/// Runs the evaluator to completion: builds a session, evaluates the
/// expression, prints the result, and reports the error summary.
pub fn run_evaluator(opts: Opts) -> Result {
    let Some(expression) = opts.expression.clone() else {
        // `arg_required_else_help` catches the empty invocation; this is for
        // programmatic callers.
        let dcx = DiagCtxt::new_early();
        return Err(dcx.err("no expression given").emit());
    };

    let sess = Session::builder().opts(opts).build();

    let res = tally_eval::evaluate(&sess, &expression);
    sess.dcx.print_error_count()?;
    let value = res?;

    // Full double precision, shortest round-trip form. Truncating further is
    // the terminal user's concern, not the evaluator's.
    println!("= {value}");
    Ok(())
}

/// The `main` body: parse the arguments, install the logger, run, and fold
/// everything into an exit code.
pub fn main_impl() -> std::process::ExitCode {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    FatalError::catch_with_exit_code(|| run_args(args))
}
