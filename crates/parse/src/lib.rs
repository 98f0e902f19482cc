#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use tally_interface::diagnostics::{DiagBuilder, ErrorGuaranteed};

pub mod lexer;
pub use lexer::{Cursor, CursorWithPos, Lexer, SymbolResolver, tokenize};

mod parser;
pub use parser::Parser;

mod validator;
pub use validator::validate;

// Convenience re-exports.
pub use tally_ast::{self as ast, token};
pub use tally_interface as interface;

/// Parser error type.
pub type PErr<'a> = DiagBuilder<'a, ErrorGuaranteed>;

/// Parser result type. This is a shorthand for `Result<T, PErr<'a>>`.
pub type PResult<'a, T> = Result<T, PErr<'a>>;
