//! tally CLI arguments.

use crate::{ErrorFormat, Mode};

#[cfg(feature = "clap")]
use clap::{ColorChoice, Parser};

/// Terminal arithmetic expression evaluator.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "clap", derive(Parser))]
#[cfg_attr(feature = "clap", command(
    name = "tally",
    version,
    arg_required_else_help = true,
))]
#[allow(clippy::manual_non_exhaustive)]
pub struct Opts {
    /// The expression to evaluate.
    ///
    /// Example: "10.5 + 30 - sqrt(PI * 5.2) / 8"
    pub expression: Option<String>,

    /// Program mode. Only `expression` is implemented end-to-end.
    #[cfg_attr(
        feature = "clap",
        arg(long, value_enum, default_value_t, hide = true)
    )]
    pub mode: Mode,

    /// Coloring.
    #[cfg(feature = "clap")]
    #[cfg_attr(
        feature = "clap",
        arg(help_heading = "Display options", long, value_enum, default_value = "auto")
    )]
    pub color: ColorChoice,

    /// Trace each pipeline stage (tokens, AST, intermediate values).
    #[cfg_attr(feature = "clap", arg(help_heading = "Display options", long, short))]
    pub verbose: bool,

    /// How errors and other messages are produced.
    #[cfg_attr(
        feature = "clap",
        arg(help_heading = "Display options", long, value_enum, default_value_t)
    )]
    pub error_format: ErrorFormat,

    /// Whether to disable warnings.
    #[cfg_attr(feature = "clap", arg(help_heading = "Display options", long))]
    pub no_warnings: bool,

    // Allows `Opts { expression: x, ..Default::default() }` while reserving
    // the right to add fields.
    #[doc(hidden)]
    #[cfg_attr(feature = "clap", arg(skip))]
    pub _non_exhaustive: (),
}

impl Opts {
    /// Returns the color choice as a [`colorchoice::ColorChoice`].
    pub fn color_choice(&self) -> colorchoice::ColorChoice {
        #[cfg(feature = "clap")]
        return match self.color {
            ColorChoice::Auto => colorchoice::ColorChoice::Auto,
            ColorChoice::Always => colorchoice::ColorChoice::Always,
            ColorChoice::Never => colorchoice::ColorChoice::Never,
        };
        #[cfg(not(feature = "clap"))]
        return colorchoice::ColorChoice::Auto;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_opts() {
        let opts = Opts::default();
        assert_eq!(opts.mode, Mode::Expression);
        assert!(!opts.verbose);
        assert_eq!(opts.error_format, ErrorFormat::Human);
    }

    #[cfg(feature = "clap")]
    #[test]
    fn parse_args() {
        use clap::Parser;
        let opts = Opts::try_parse_from(["tally", "1 + 2", "--verbose"]).unwrap();
        assert_eq!(opts.expression.as_deref(), Some("1 + 2"));
        assert!(opts.verbose);
    }
}
