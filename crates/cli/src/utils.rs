//! Utility functions used by the tally CLI.

use tally_interface::diagnostics::DiagCtxt;

/// Initializes the tracing logger.
///
/// `RUST_LOG` takes precedence; `--verbose` defaults the filter to `debug`
/// for the tally crates so each pipeline stage traces its output.
pub fn init_logger(verbose: bool) {
    if let Err(e) = try_init_logger(verbose) {
        DiagCtxt::new_early().fatal(e).emit();
    }
}

fn try_init_logger(verbose: bool) -> Result<(), String> {
    use tracing_subscriber::prelude::*;

    let default_filter = if verbose { "debug" } else { "off" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| e.to_string())
}
