#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::fmt;

mod opts;
pub use opts::Opts;

pub use colorchoice::ColorChoice;

/// How the program was invoked, which determines the active [`Features`].
///
/// Only [`Expression`](Self::Expression) is wired up end-to-end today; the
/// other modes exist so that their feature sets can gate grammar and produce
/// `feature-disabled` diagnostics instead of nonsense.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[non_exhaustive]
pub enum Mode {
    /// A single expression passed as a command-line argument. Base features
    /// only: no definitions, no comments, no multi-line input.
    #[default]
    Expression,
    /// Interactive line-per-line evaluation with persistent definitions.
    Repl,
    /// An expression file: definitions, comments, line continuations, and one
    /// or more `= EXPRESSION` evaluation lines.
    File,
    /// A library file of definitions only; nothing is evaluated directly.
    Linker,
}

impl Mode {
    /// Returns the feature set active in this mode.
    pub const fn features(self) -> Features {
        match self {
            Self::Expression => Features {
                expression_eval: true,
                comments: false,
                newline_continuations: false,
                variable_definitions: false,
                function_definitions: false,
            },
            Self::Repl => Features {
                expression_eval: true,
                comments: false,
                newline_continuations: false,
                variable_definitions: true,
                function_definitions: true,
            },
            Self::File => Features {
                expression_eval: true,
                comments: true,
                newline_continuations: true,
                variable_definitions: true,
                function_definitions: true,
            },
            Self::Linker => Features {
                expression_eval: false,
                comments: true,
                newline_continuations: true,
                variable_definitions: true,
                function_definitions: true,
            },
        }
    }

    /// Returns a human-readable description of the mode.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Expression => "evaluate a single expression given as an argument",
            Self::Repl => "interactive session with one expression per line",
            Self::File => "evaluate an expression file line by line",
            Self::Linker => "load a definitions-only library file",
        }
    }
}

/// The set of language features active for one pipeline invocation.
///
/// Derived from a [`Mode`] and passed explicitly into every stage; there is no
/// process-wide mode state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Features {
    /// Whether expressions may be evaluated at all.
    pub expression_eval: bool,
    /// Whether `// ...` comments are recognized.
    pub comments: bool,
    /// Whether `\` at the end of a line continues the expression.
    pub newline_continuations: bool,
    /// Whether `NAME = EXPR` variable definitions are recognized.
    pub variable_definitions: bool,
    /// Whether `NAME(ARGS) = EXPR` function definitions are recognized.
    pub function_definitions: bool,
}

impl Features {
    /// The feature set of [`Mode::Expression`].
    pub const EXPRESSION: Self = Mode::Expression.features();

    /// Returns `true` if any kind of definition is allowed.
    pub const fn definitions(self) -> bool {
        self.variable_definitions || self.function_definitions
    }
}

/// A stage of the evaluation pipeline. Carried on diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Source text was split into raw tokens.
    Tokenize,
    /// Raw tokens were classified into typed tokens.
    Lex,
    /// The typed token stream was checked for well-formedness.
    Validate,
    /// The token stream was built into an AST.
    Parse,
    /// The AST was reduced to a value.
    Eval,
}

impl Stage {
    /// Returns the stage name as used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tokenize => "tokenize",
            Self::Lex => "lex",
            Self::Validate => "validate",
            Self::Parse => "parse",
            Self::Eval => "eval",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How errors and other messages are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ErrorFormat {
    /// Human-readable output with source snippets.
    #[default]
    Human,
    /// One line per diagnostic: `error[code]: stage: message at lo..hi`.
    Short,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_features() {
        assert!(Mode::Expression.features().expression_eval);
        assert!(!Mode::Expression.features().comments);
        assert!(!Mode::Expression.features().definitions());

        assert!(Mode::Repl.features().definitions());
        assert!(!Mode::Repl.features().comments);

        assert!(Mode::File.features().expression_eval);
        assert!(Mode::File.features().comments);
        assert!(Mode::File.features().newline_continuations);

        assert!(!Mode::Linker.features().expression_eval);
        assert!(Mode::Linker.features().definitions());
    }

    #[test]
    fn strings() {
        assert_eq!(Mode::Expression.to_string(), "expression");
        assert_eq!("linker".parse::<Mode>().unwrap(), Mode::Linker);
        assert_eq!(Stage::Validate.as_str(), "validate");
        assert_eq!("eval".parse::<Stage>().unwrap(), Stage::Eval);
        assert_eq!(ErrorFormat::default(), ErrorFormat::Human);
    }
}
