use super::{
    BugAbort, Diag, DiagBuilder, DiagMsg, EmissionGuarantee, EmittedDiagnostics, ErrorGuaranteed,
    FatalAbort, HumanEmitter, Level, SilentEmitter, emitter::DynEmitter,
};
use crate::{Result, SourceMap, pluralize};
use anstream::ColorChoice;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::{
    borrow::Cow,
    hash::BuildHasher,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Flags that control the behaviour of a [`DiagCtxt`].
#[derive(Clone, Copy)]
pub struct DiagCtxtFlags {
    /// If false, warning-level diagnostics are suppressed.
    pub can_emit_warnings: bool,
    /// If true, identical diagnostics are reported only once.
    pub deduplicate_diagnostics: bool,
    /// If true, every diagnostic carries a note with its creation and
    /// emission locations. Enabled by default in debug builds.
    pub track_diagnostics: bool,
}

impl Default for DiagCtxtFlags {
    fn default() -> Self {
        Self {
            can_emit_warnings: true,
            deduplicate_diagnostics: true,
            track_diagnostics: cfg!(debug_assertions),
        }
    }
}

/// A handler that deals with errors and other pipeline output.
///
/// Certain errors (fatal, bug) may cause immediate exit, others log errors for
/// later reporting.
pub struct DiagCtxt {
    inner: Mutex<DiagCtxtInner>,
}

struct DiagCtxtInner {
    emitter: Box<DynEmitter>,

    flags: DiagCtxtFlags,

    /// The number of errors that have been emitted, including duplicates.
    ///
    /// This is not necessarily the count that's reported to the user once
    /// the pipeline ends.
    err_count: usize,
    deduplicated_err_count: usize,
    /// The warning count, used for a recap upon finishing.
    warn_count: usize,
    deduplicated_warn_count: usize,
    note_count: usize,

    /// This set contains a hash of every diagnostic that has been emitted by
    /// this `DiagCtxt`. These hashes are used to avoid emitting the same
    /// error twice.
    emitted_diagnostics: FxHashSet<u64>,
}

impl DiagCtxt {
    /// Creates a new `DiagCtxt` with the given diagnostics emitter.
    pub fn new(emitter: Box<DynEmitter>) -> Self {
        Self {
            inner: Mutex::new(DiagCtxtInner {
                emitter,
                flags: DiagCtxtFlags::default(),
                err_count: 0,
                deduplicated_err_count: 0,
                warn_count: 0,
                deduplicated_warn_count: 0,
                note_count: 0,
                emitted_diagnostics: FxHashSet::default(),
            }),
        }
    }

    /// Creates a new `DiagCtxt` with a stderr emitter for emitting one-off or
    /// early fatal errors that contain no source information.
    pub fn new_early() -> Self {
        Self::with_stderr_emitter(None).set_flags(|flags| flags.track_diagnostics = false)
    }

    /// Creates a new `DiagCtxt` with a stderr emitter.
    pub fn with_stderr_emitter(source_map: Option<Arc<SourceMap>>) -> Self {
        Self::with_stderr_emitter_and_color(source_map, ColorChoice::Auto)
    }

    /// Creates a new `DiagCtxt` with a stderr emitter and a color choice.
    pub fn with_stderr_emitter_and_color(
        source_map: Option<Arc<SourceMap>>,
        color_choice: ColorChoice,
    ) -> Self {
        Self::new(Box::new(HumanEmitter::stderr(color_choice).source_map(source_map)))
    }

    /// Creates a new `DiagCtxt` with a silent emitter.
    ///
    /// Fatal diagnostics are still emitted, optionally with the given note.
    pub fn with_silent_emitter(fatal_note: Option<String>) -> Self {
        let fatal_emitter = HumanEmitter::stderr(ColorChoice::Auto);
        Self::new(Box::new(SilentEmitter::new(fatal_emitter).with_note(fatal_note)))
            .disable_warnings()
    }

    /// Creates a new `DiagCtxt` with a human emitter that renders diagnostics
    /// into a local buffer.
    pub fn with_buffer_emitter(
        source_map: Option<Arc<SourceMap>>,
        color_choice: ColorChoice,
    ) -> Self {
        Self::new(Box::new(HumanEmitter::buffered(color_choice).source_map(source_map)))
    }

    /// Creates a new `DiagCtxt` from the given options.
    ///
    /// This is the default `DiagCtxt` used by the `Session` if one is not
    /// provided manually: a human emitter to stderr, configured by
    /// `error_format`, `color` and `no_warnings`.
    pub fn from_opts(opts: &tally_config::Opts) -> Self {
        use tally_config::ColorChoice as Choice;
        let color = match opts.color_choice() {
            Choice::Always | Choice::AlwaysAnsi => ColorChoice::Always,
            Choice::Never => ColorChoice::Never,
            Choice::Auto => ColorChoice::Auto,
        };
        let source_map = Arc::new(SourceMap::empty());
        let emitter = HumanEmitter::stderr(color)
            .source_map(Some(source_map))
            .short(opts.error_format == tally_config::ErrorFormat::Short);
        Self::new(Box::new(emitter))
            .set_flags(|flags| flags.can_emit_warnings = !opts.no_warnings)
    }

    /// Gets the source map associated with this context's emitter.
    pub fn source_map(&self) -> Option<Arc<SourceMap>> {
        self.lock().emitter.source_map().cloned()
    }

    /// Sets flags.
    pub fn set_flags(self, f: impl FnOnce(&mut DiagCtxtFlags)) -> Self {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner).flags);
        self
    }

    /// Disables emitting warnings.
    pub fn disable_warnings(self) -> Self {
        self.set_flags(|f| f.can_emit_warnings = false)
    }

    /// Returns `true` if diagnostics are being tracked.
    pub fn track_diagnostics(&self) -> bool {
        self.lock().flags.track_diagnostics
    }

    /// Emits the given diagnostic with this context.
    #[inline]
    pub fn emit_diagnostic(&self, mut diagnostic: Diag) -> Result<(), ErrorGuaranteed> {
        self.emit_diagnostic_without_consuming(&mut diagnostic)
    }

    /// Emits the given diagnostic with this context, without consuming the
    /// diagnostic.
    ///
    /// **Note:** This function is intended to be used only internally in
    /// `DiagBuilder`. Use [`emit_diagnostic`](Self::emit_diagnostic) instead.
    pub(super) fn emit_diagnostic_without_consuming(
        &self,
        diagnostic: &mut Diag,
    ) -> Result<(), ErrorGuaranteed> {
        self.lock().emit_diagnostic_without_consuming(diagnostic)
    }

    /// Returns the number of errors that have been emitted, including
    /// duplicates.
    pub fn err_count(&self) -> usize {
        self.lock().err_count
    }

    /// Returns `Err` if any errors have been emitted.
    pub fn has_errors(&self) -> Result<(), ErrorGuaranteed> {
        if self.lock().has_errors() { Err(ErrorGuaranteed::new_unchecked()) } else { Ok(()) }
    }

    /// Returns the number of warnings that have been emitted, including
    /// duplicates.
    pub fn warn_count(&self) -> usize {
        self.lock().warn_count
    }

    /// Returns the number of notes that have been emitted.
    pub fn note_count(&self) -> usize {
        self.lock().note_count
    }

    /// Returns the rendered diagnostics. Can be empty.
    ///
    /// Returns `None` if the underlying emitter does not render to a local
    /// buffer, i.e. it was not created with
    /// [`with_buffer_emitter`](Self::with_buffer_emitter).
    pub fn emitted_diagnostics(&self) -> Option<EmittedDiagnostics> {
        let inner = self.lock();
        Some(EmittedDiagnostics(inner.emitter.local_buffer()?.to_string()))
    }

    /// Returns `Err` with the rendered diagnostics if any errors have been
    /// emitted.
    ///
    /// Returns `None` if the underlying emitter does not render to a local
    /// buffer, i.e. it was not created with
    /// [`with_buffer_emitter`](Self::with_buffer_emitter).
    pub fn emitted_errors(&self) -> Option<Result<(), EmittedDiagnostics>> {
        let inner = self.lock();
        let buffer = inner.emitter.local_buffer()?;
        Some(if inner.has_errors() {
            Err(EmittedDiagnostics(buffer.to_string()))
        } else {
            Ok(())
        })
    }

    /// Emits a summary diagnostic if any errors or warnings have been emitted.
    pub fn print_error_count(&self) -> Result {
        self.lock().print_error_count()
    }

    fn lock(&self) -> MutexGuard<'_, DiagCtxtInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Diag constructors.
///
/// Note that methods returning a [`DiagBuilder`] must also be marked with
/// `#[track_caller]`.
impl DiagCtxt {
    /// Creates a builder at the given `level` with the given `msg`.
    #[track_caller]
    pub fn diag<G: EmissionGuarantee>(
        &self,
        level: Level,
        msg: impl Into<DiagMsg>,
    ) -> DiagBuilder<'_, G> {
        DiagBuilder::new(self, level, msg)
    }

    /// Creates a builder at the `Bug` level with the given `msg`.
    #[track_caller]
    pub fn bug(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, BugAbort> {
        self.diag(Level::Bug, msg)
    }

    /// Creates a builder at the `Fatal` level with the given `msg`.
    #[track_caller]
    pub fn fatal(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, FatalAbort> {
        self.diag(Level::Fatal, msg)
    }

    /// Creates a builder at the `Error` level with the given `msg`.
    #[track_caller]
    pub fn err(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, ErrorGuaranteed> {
        self.diag(Level::Error, msg)
    }

    /// Creates a builder at the `Warning` level with the given `msg`.
    ///
    /// Attempting to `.emit()` the builder will only emit if
    /// `can_emit_warnings` is `true`.
    #[track_caller]
    pub fn warn(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, ()> {
        self.diag(Level::Warning, msg)
    }

    /// Creates a builder at the `Help` level with the given `msg`.
    #[track_caller]
    pub fn help(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, ()> {
        self.diag(Level::Help, msg)
    }

    /// Creates a builder at the `Note` level with the given `msg`.
    #[track_caller]
    pub fn note(&self, msg: impl Into<DiagMsg>) -> DiagBuilder<'_, ()> {
        self.diag(Level::Note, msg)
    }
}

impl DiagCtxtInner {
    fn emit_diagnostic(&mut self, mut diagnostic: Diag) -> Result<(), ErrorGuaranteed> {
        self.emit_diagnostic_without_consuming(&mut diagnostic)
    }

    fn emit_diagnostic_without_consuming(
        &mut self,
        diagnostic: &mut Diag,
    ) -> Result<(), ErrorGuaranteed> {
        if diagnostic.level == Level::Warning && !self.flags.can_emit_warnings {
            return Ok(());
        }

        let already_emitted = self.insert_diagnostic(diagnostic);
        if !(self.flags.deduplicate_diagnostics && already_emitted) {
            self.emitter.emit_diagnostic(diagnostic);
            if diagnostic.is_error() {
                self.deduplicated_err_count += 1;
            } else if diagnostic.level == Level::Warning {
                self.deduplicated_warn_count += 1;
            }
        }

        if diagnostic.is_error() {
            self.err_count += 1;
            Err(ErrorGuaranteed::new_unchecked())
        } else {
            if diagnostic.level == Level::Warning {
                self.warn_count += 1;
            } else if diagnostic.level == Level::Note {
                self.note_count += 1;
            }
            Ok(())
        }
    }

    fn print_error_count(&mut self) -> Result {
        let errors = match self.deduplicated_err_count {
            0 => None,
            1 => Some(Cow::from("aborting due to 1 previous error")),
            count => Some(Cow::from(format!("aborting due to {count} previous errors"))),
        };
        let warnings = match self.deduplicated_warn_count {
            0 => None,
            count => {
                Some(Cow::from(format!("{count} warning{} emitted", pluralize!(count))))
            }
        };

        match (errors, warnings) {
            (None, None) => Ok(()),
            (None, Some(w)) => {
                self.emit_diagnostic(Diag::new(Level::Warning, w))
            }
            (Some(e), None) => self.emit_diagnostic(Diag::new(Level::Error, e)),
            (Some(e), Some(w)) => {
                self.emit_diagnostic(Diag::new(Level::Error, format!("{e}; {w}")))
            }
        }
    }

    /// Inserts the given diagnostic into the set of emitted diagnostics.
    /// Returns `true` if the diagnostic was already emitted.
    fn insert_diagnostic(&mut self, diag: &Diag) -> bool {
        let hash = FxBuildHasher.hash_one(diag);
        !self.emitted_diagnostics.insert(hash)
    }

    fn has_errors(&self) -> bool {
        self.err_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffered() -> DiagCtxt {
        DiagCtxt::with_buffer_emitter(None, ColorChoice::Never)
            .set_flags(|f| f.track_diagnostics = false)
    }

    #[test]
    fn counts_and_has_errors() {
        let dcx = buffered();
        assert!(dcx.has_errors().is_ok());
        dcx.err("first").emit();
        dcx.warn("careful").emit();
        assert!(dcx.has_errors().is_err());
        assert_eq!(dcx.err_count(), 1);
        assert_eq!(dcx.warn_count(), 1);
    }

    #[test]
    fn deduplication() {
        let dcx = buffered();
        dcx.err("same").emit();
        dcx.err("same").emit();
        // Both bump the error count, but only one is rendered.
        assert_eq!(dcx.err_count(), 2);
        let rendered = dcx.emitted_diagnostics().unwrap().0;
        assert_eq!(rendered.matches("same").count(), 1);
    }

    #[test]
    fn no_warnings_flag() {
        let dcx = buffered().disable_warnings();
        dcx.warn("hidden").emit();
        assert_eq!(dcx.warn_count(), 0);
        assert!(dcx.emitted_diagnostics().unwrap().is_empty());
    }

    #[test]
    fn error_summary() {
        let dcx = buffered();
        dcx.err("a").emit();
        dcx.err("b").emit();
        let _ = dcx.print_error_count();
        let rendered = dcx.emitted_diagnostics().unwrap().0;
        assert!(rendered.contains("aborting due to 2 previous errors"), "{rendered}");
    }

    #[test]
    fn buffer_accessors_none_for_stderr() {
        let dcx = DiagCtxt::with_stderr_emitter(None);
        assert!(dcx.emitted_diagnostics().is_none());
        assert!(dcx.emitted_errors().is_none());
    }
}
