#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![allow(unused_crate_dependencies)]

pub use tally_ast as ast;
pub use tally_cli as cli;
pub use tally_config as config;
pub use tally_eval as eval;
pub use tally_interface as interface;
pub use tally_parse as parse;

pub use tally_eval::{evaluate, evaluate_with_features};
pub use tally_interface::Session;
