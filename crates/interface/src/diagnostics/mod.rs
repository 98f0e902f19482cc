//! Diagnostics implementation.
//!
//! The design follows the `rustc_errors` lineage: a context that owns an
//! emitter, a must-emit builder, and severity levels with emission guarantees.

use crate::Span;
use anstyle::{AnsiColor, Color};
use std::{
    borrow::Cow,
    fmt,
    panic::{self, Location},
    process::ExitCode,
};

mod builder;
pub use builder::{DiagBuilder, EmissionGuarantee};

mod context;
pub use context::{DiagCtxt, DiagCtxtFlags};

mod emitter;
pub use emitter::{DynEmitter, Emitter, HumanEmitter, InMemoryEmitter, SilentEmitter};

pub use tally_config::Stage;

/// Useful type to use with [`Result`] to indicate that an error has already
/// been reported to the user, so no need to continue checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// Creates a new `ErrorGuaranteed`.
    ///
    /// Use of this method is discouraged.
    #[inline]
    pub const fn new_unchecked() -> Self {
        Self(())
    }
}

/// Marker type which enables implementation of `bug` diagnostics: emitting one
/// aborts by panicking with [`ExplicitBug`] as the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BugAbort;

/// Panic payload of an emitted bug diagnostic.
#[derive(Clone, Copy, Debug)]
pub struct ExplicitBug;

/// Marker type which enables implementation of fatal diagnostics: emitting one
/// unwinds with [`FatalError`], to be caught at the driver boundary.
pub struct FatalAbort(());

/// Used as a panic payload to signify that a fatal error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct FatalError;

impl FatalError {
    /// Raises a fatal error that can be caught by [`catch`](Self::catch).
    pub fn raise(self) -> ! {
        panic::resume_unwind(Box::new(self))
    }

    /// Catches a fatal error that was raised by [`raise`](Self::raise).
    pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, ErrorGuaranteed> {
        panic::catch_unwind(panic::AssertUnwindSafe(f)).map_err(|value| {
            if value.is::<Self>() {
                ErrorGuaranteed::new_unchecked()
            } else {
                panic::resume_unwind(value)
            }
        })
    }

    /// Catches a fatal error that was raised by [`raise`](Self::raise).
    ///
    /// Returns [`FAILURE`](ExitCode::FAILURE) if an error was caught,
    /// [`SUCCESS`](ExitCode::SUCCESS) otherwise.
    pub fn catch_with_exit_code(f: impl FnOnce() -> Result<(), ErrorGuaranteed>) -> ExitCode {
        match Self::catch(f).and_then(std::convert::identity) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        }
    }
}

/// A diagnostic message. Either a static string or an owned one.
pub type DiagMsg = Cow<'static, str>;

/// A stable diagnostic code, e.g. `divide-by-zero`.
///
/// The full taxonomy lives in [`codes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagId {
    id: &'static str,
}

impl fmt::Display for DiagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

impl DiagId {
    /// Creates a diagnostic code. Prefer the constants in [`codes`].
    pub const fn new(id: &'static str) -> Self {
        Self { id }
    }

    /// Returns the code as a string.
    pub const fn as_str(self) -> &'static str {
        self.id
    }
}

/// The diagnostic code taxonomy, one constant per error class the pipeline can
/// produce.
pub mod codes {
    use super::DiagId;

    // tokenize
    pub const NO_INPUT: DiagId = DiagId::new("no-input");

    // lex
    pub const NUMBER_MULTIPLE_DECIMAL_POINTS: DiagId = DiagId::new("number-multiple-decimal-points");
    pub const INVALID_TOKEN: DiagId = DiagId::new("invalid-token");

    // validate
    pub const UNEXPECTED_TOKEN: DiagId = DiagId::new("unexpected-token");
    pub const EXPECTED_OPERATOR: DiagId = DiagId::new("expected-operator");
    pub const EXPECTED_OPERAND: DiagId = DiagId::new("expected-operand");
    pub const EMPTY_PARENTHESES: DiagId = DiagId::new("empty-parentheses");
    pub const FUNCTION_REQUIRES_ARGUMENT: DiagId = DiagId::new("function-requires-argument");
    pub const UNBALANCED_PARENTHESES: DiagId = DiagId::new("unbalanced-parentheses");
    pub const FEATURE_DISABLED: DiagId = DiagId::new("feature-disabled");
    pub const UNSUPPORTED: DiagId = DiagId::new("unsupported");

    // parse
    pub const INTERNAL: DiagId = DiagId::new("internal");

    // eval
    pub const DIVIDE_BY_ZERO: DiagId = DiagId::new("divide-by-zero");
    pub const FUNCTION_WRONG_ARITY: DiagId = DiagId::new("function-wrong-arity");
}

/// Diagnostic level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// An internal inconsistency. Aborts after emission.
    Bug,
    /// An error that causes an immediate abort.
    Fatal,
    /// An error in the input, which prevents evaluation from finishing. This
    /// is the most common case.
    Error,
    /// A warning about the input. Does not prevent evaluation.
    Warning,
    /// A message giving additional context, usually attached to another
    /// diagnostic.
    Note,
    /// A message suggesting how to fix something, usually attached to another
    /// diagnostic.
    Help,
}

impl Level {
    /// Returns the string representation of the level.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Bug => "error: internal error",
            Self::Fatal | Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
        }
    }

    /// Returns `true` if this level is an error.
    #[inline]
    pub fn is_error(self) -> bool {
        match self {
            Self::Bug | Self::Fatal | Self::Error => true,
            Self::Warning | Self::Note | Self::Help => false,
        }
    }

    /// Returns the style of this level.
    #[inline]
    pub fn style(self) -> anstyle::Style {
        anstyle::Style::new().fg_color(self.color()).bold()
    }

    /// Returns the color of this level.
    #[inline]
    pub const fn color(self) -> Option<Color> {
        match self {
            Self::Bug | Self::Fatal | Self::Error => Some(Color::Ansi(AnsiColor::BrightRed)),
            Self::Warning => Some(Color::Ansi(AnsiColor::BrightYellow)),
            Self::Note => Some(Color::Ansi(AnsiColor::BrightGreen)),
            Self::Help => Some(Color::Ansi(AnsiColor::BrightCyan)),
        }
    }
}

/// A collection of spans: one or more primary spans plus labeled spans.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MultiSpan {
    primary_spans: Vec<Span>,
    span_labels: Vec<(Span, DiagMsg)>,
}

impl From<Span> for MultiSpan {
    fn from(span: Span) -> Self {
        Self::from_span(span)
    }
}

impl MultiSpan {
    /// Creates an empty `MultiSpan`.
    pub const fn new() -> Self {
        Self { primary_spans: Vec::new(), span_labels: Vec::new() }
    }

    /// Creates a `MultiSpan` with a single primary span.
    pub fn from_span(span: Span) -> Self {
        Self { primary_spans: vec![span], span_labels: Vec::new() }
    }

    /// Returns the first primary span, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.primary_spans.first().copied()
    }

    /// Returns all primary spans.
    pub fn primary_spans(&self) -> &[Span] {
        &self.primary_spans
    }

    /// Adds a labeled span.
    pub fn push_span_label(&mut self, span: Span, label: impl Into<DiagMsg>) {
        self.span_labels.push((span, label.into()));
    }

    /// Returns the labeled spans.
    pub fn span_labels(&self) -> &[(Span, DiagMsg)] {
        &self.span_labels
    }

    /// Returns `true` if this contains no spans at all.
    pub fn is_empty(&self) -> bool {
        self.primary_spans.is_empty() && self.span_labels.is_empty()
    }
}

/// A "sub"-diagnostic attached to a parent diagnostic.
/// For example, a note attached to an error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubDiag {
    pub level: Level,
    pub msg: DiagMsg,
    pub span: MultiSpan,
}

/// A single diagnostic.
#[must_use]
#[derive(Clone, Debug)]
pub struct Diag {
    pub(crate) level: Level,
    pub msg: DiagMsg,
    pub code: Option<DiagId>,
    pub stage: Option<Stage>,
    pub span: MultiSpan,
    pub children: Vec<SubDiag>,

    pub created_at: &'static Location<'static>,
}

impl PartialEq for Diag {
    fn eq(&self, other: &Self) -> bool {
        self.keys() == other.keys()
    }
}

impl std::hash::Hash for Diag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.keys().hash(state);
    }
}

impl Diag {
    /// Creates a new `Diag` with a single message.
    #[track_caller]
    pub fn new(level: Level, msg: impl Into<DiagMsg>) -> Self {
        Self {
            level,
            msg: msg.into(),
            code: None,
            stage: None,
            span: MultiSpan::new(),
            children: Vec::new(),
            created_at: Location::caller(),
        }
    }

    /// Returns `true` if this diagnostic is an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.level.is_error()
    }

    /// Returns the level of this diagnostic.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Fields used for `PartialEq` and `Hash` implementations.
    fn keys(&self) -> impl PartialEq + std::hash::Hash + '_ {
        (&self.level, &self.msg, &self.code, &self.stage, &self.span, &self.children)
    }
}

/// Setters.
impl Diag {
    /// Sets the span of this diagnostic.
    pub fn span(&mut self, span: impl Into<MultiSpan>) -> &mut Self {
        self.span = span.into();
        self
    }

    /// Sets the code of this diagnostic.
    pub fn code(&mut self, code: DiagId) -> &mut Self {
        self.code = Some(code);
        self
    }

    /// Sets the pipeline stage that produced this diagnostic.
    pub fn stage(&mut self, stage: Stage) -> &mut Self {
        self.stage = Some(stage);
        self
    }

    /// Adds a span/label to be included in the resulting snippet.
    ///
    /// This span is *not* considered a "primary span"; only the span supplied
    /// to [`span`](Self::span) is primary.
    pub fn span_label(&mut self, span: Span, label: impl Into<DiagMsg>) -> &mut Self {
        self.span.push_span_label(span, label);
        self
    }

    /// Adds a note with the location where this diagnostic was created and
    /// emitted.
    pub(crate) fn locations_note(&mut self, emitted_at: &Location<'_>) -> &mut Self {
        let msg = format!("created at {},\nemitted at {}", self.created_at, emitted_at);
        self.note(msg)
    }
}

/// Sub-diagnostics.
impl Diag {
    /// Add a warning attached to this diagnostic.
    pub fn warn(&mut self, msg: impl Into<DiagMsg>) -> &mut Self {
        self.sub(Level::Warning, msg, MultiSpan::new())
    }

    /// Add a note to this diagnostic.
    pub fn note(&mut self, msg: impl Into<DiagMsg>) -> &mut Self {
        self.sub(Level::Note, msg, MultiSpan::new())
    }

    /// Prints the span with a note above it.
    /// This is like [`Diag::note()`], but it gets its own span.
    pub fn span_note(&mut self, span: impl Into<MultiSpan>, msg: impl Into<DiagMsg>) -> &mut Self {
        self.sub(Level::Note, msg, span)
    }

    /// Add a help message attached to this diagnostic.
    pub fn help(&mut self, msg: impl Into<DiagMsg>) -> &mut Self {
        self.sub(Level::Help, msg, MultiSpan::new())
    }

    /// Prints the span with some help above it.
    /// This is like [`Diag::help()`], but it gets its own span.
    pub fn span_help(&mut self, span: impl Into<MultiSpan>, msg: impl Into<DiagMsg>) -> &mut Self {
        self.sub(Level::Help, msg, span)
    }

    fn sub(
        &mut self,
        level: Level,
        msg: impl Into<DiagMsg>,
        span: impl Into<MultiSpan>,
    ) -> &mut Self {
        self.children.push(SubDiag { level, msg: msg.into(), span: span.into() });
        self
    }
}

/// The diagnostics a buffering emitter rendered, as one string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EmittedDiagnostics(pub String);

impl EmittedDiagnostics {
    /// Returns `true` if nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BytePos;

    #[test]
    fn level_predicates() {
        assert!(Level::Error.is_error());
        assert!(Level::Bug.is_error());
        assert!(!Level::Warning.is_error());
        assert_eq!(Level::Error.to_str(), "error");
    }

    #[test]
    fn diag_equality_ignores_location() {
        let a = Diag::new(Level::Error, "boom");
        let b = Diag::new(Level::Error, "boom");
        assert_eq!(a, b);
        let c = Diag::new(Level::Error, "bang");
        assert_ne!(a, c);
    }

    #[test]
    fn multi_span() {
        let span = Span::point(BytePos(2));
        let mut ms = MultiSpan::from_span(span);
        assert_eq!(ms.primary_span(), Some(span));
        ms.push_span_label(span, "here");
        assert_eq!(ms.span_labels().len(), 1);
        assert!(!ms.is_empty());
        assert!(MultiSpan::new().is_empty());
    }

    #[test]
    fn fatal_catch() {
        let res = FatalError::catch(|| -> () { FatalError.raise() });
        assert!(res.is_err());
        let ok = FatalError::catch(|| 42).unwrap();
        assert_eq!(ok, 42);
    }
}
