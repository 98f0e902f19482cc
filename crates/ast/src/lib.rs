#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Convenience re-exports.
pub use bumpalo;
pub use tally_interface as interface;

mod arena;
pub use arena::Arena;

mod ast;
pub use ast::{BinOp, BinOpKind, CallArgs, Expr, ExprKind, Func};

pub mod token;
pub use token::{ConstKind, FuncKind, OpToken, Token, TokenKind};

pub mod visit;
pub use visit::Visit;
