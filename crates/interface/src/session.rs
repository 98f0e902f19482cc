use crate::{
    SourceMap,
    diagnostics::{DiagCtxt, EmittedDiagnostics},
};
use anstream::ColorChoice;
use std::{fmt, sync::Arc};
use tally_config::{Features, Opts};

/// Information about the current evaluator session.
pub struct Session {
    /// The evaluator options.
    pub opts: Opts,
    /// The diagnostics context.
    pub dcx: DiagCtxt,
    /// The source map holding every input of this session.
    source_map: Arc<SourceMap>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Opts::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("opts", &self.opts).finish_non_exhaustive()
    }
}

/// [`Session`] builder.
#[derive(Default)]
#[must_use = "builders don't do anything unless you call `build`"]
pub struct SessionBuilder {
    dcx: Option<DiagCtxt>,
    source_map: Option<Arc<SourceMap>>,
    opts: Option<Opts>,
}

impl SessionBuilder {
    /// Sets the diagnostic context.
    ///
    /// If not set, it defaults to [`DiagCtxt::from_opts`].
    ///
    /// See also the `with_*_emitter` methods.
    pub fn dcx(mut self, dcx: DiagCtxt) -> Self {
        self.dcx = Some(dcx);
        self
    }

    /// Sets the source map.
    pub fn source_map(mut self, source_map: Arc<SourceMap>) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Sets the evaluator options.
    pub fn opts(mut self, opts: Opts) -> Self {
        self.opts = Some(opts);
        self
    }

    /// Sets the diagnostic context to a stderr emitter.
    #[inline]
    pub fn with_stderr_emitter(self) -> Self {
        self.with_stderr_emitter_and_color(ColorChoice::Auto)
    }

    /// Sets the diagnostic context to a stderr emitter and a color choice.
    #[inline]
    pub fn with_stderr_emitter_and_color(mut self, color_choice: ColorChoice) -> Self {
        let sm = self.get_source_map();
        self.dcx(DiagCtxt::with_stderr_emitter_and_color(Some(sm), color_choice))
    }

    /// Sets the diagnostic context to a human emitter that renders
    /// diagnostics to a local buffer.
    #[inline]
    pub fn with_buffer_emitter(mut self, color_choice: ColorChoice) -> Self {
        let sm = self.get_source_map();
        self.dcx(DiagCtxt::with_buffer_emitter(Some(sm), color_choice))
    }

    /// Sets the diagnostic context to a silent emitter.
    #[inline]
    pub fn with_silent_emitter(self, fatal_note: Option<String>) -> Self {
        self.dcx(DiagCtxt::with_silent_emitter(fatal_note))
    }

    /// Sets the diagnostic context to a buffer emitter without colors.
    /// Intended for tests.
    #[inline]
    pub fn with_test_emitter(mut self) -> Self {
        let sm = self.get_source_map();
        self.dcx(
            DiagCtxt::with_buffer_emitter(Some(sm), ColorChoice::Never)
                .set_flags(|flags| flags.track_diagnostics = false),
        )
    }

    fn get_source_map(&mut self) -> Arc<SourceMap> {
        self.source_map.get_or_insert_with(Default::default).clone()
    }

    /// Consumes the builder to create a new session.
    pub fn build(mut self) -> Session {
        let opts = self.opts.take().unwrap_or_default();
        let source_map = self.source_map.take().unwrap_or_default();
        let dcx = match self.dcx.take() {
            Some(dcx) => dcx,
            None => DiagCtxt::from_opts(&opts),
        };
        // Prefer the emitter's source map so spans resolve in diagnostics
        // even when only `dcx` was provided.
        let source_map = dcx.source_map().unwrap_or(source_map);
        tracing::debug!(version = crate::VERSION, "created new session");
        Session { opts, dcx, source_map }
    }
}

impl Session {
    /// Creates a new session builder.
    #[inline]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Creates a new session from the given options.
    ///
    /// See [`builder`](Self::builder) for a more flexible way to create a
    /// session.
    pub fn new(opts: Opts) -> Self {
        Self::builder().opts(opts).build()
    }

    /// Returns a reference to the source map.
    #[inline]
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Clones the source map.
    #[inline]
    pub fn clone_source_map(&self) -> Arc<SourceMap> {
        self.source_map.clone()
    }

    /// Returns the feature set of the session's mode.
    #[inline]
    pub fn features(&self) -> Features {
        self.opts.mode.features()
    }

    /// Returns the rendered diagnostics. Can be empty.
    ///
    /// Returns `None` if the underlying emitter does not render to a local
    /// buffer.
    #[inline]
    pub fn emitted_diagnostics(&self) -> Option<EmittedDiagnostics> {
        self.dcx.emitted_diagnostics()
    }

    /// Returns `Err` with the rendered diagnostics if any errors have been
    /// emitted.
    ///
    /// Returns `None` if the underlying emitter does not render to a local
    /// buffer.
    #[inline]
    pub fn emitted_errors(&self) -> Option<Result<(), EmittedDiagnostics>> {
        self.dcx.emitted_errors()
    }
}
