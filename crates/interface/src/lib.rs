#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod diagnostics;
use diagnostics::ErrorGuaranteed;

mod pos;
pub use pos::{BytePos, CharPos};

mod session;
pub use session::{Session, SessionBuilder};

pub mod source_map;
pub use source_map::SourceMap;

mod span;
pub use span::Span;

pub use anstream::ColorChoice;
pub use tally_config as config;

/// The current version of tally.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pipeline result type.
pub type Result<T = (), E = ErrorGuaranteed> = std::result::Result<T, E>;

/// Pluralize a word based on a count.
#[macro_export]
macro_rules! pluralize {
    ($x:expr) => {
        if $x == 1 { "" } else { "s" }
    };
    ("was", $x:expr) => {
        if $x == 1 { "was" } else { "were" }
    };
}
