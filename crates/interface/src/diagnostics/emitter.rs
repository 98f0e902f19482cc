//! Diagnostic emitters.

use super::{Diag, Level, MultiSpan};
use crate::SourceMap;
use anstream::ColorChoice;
use std::{
    any::Any,
    fmt::Write as _,
    io::Write as _,
    sync::{Arc, Mutex, PoisonError},
};

/// Dynamic diagnostic emitter. See [`Emitter`].
pub type DynEmitter = dyn Emitter + Send;

/// Diagnostic emitter.
pub trait Emitter: Any {
    /// Emits a diagnostic.
    fn emit_diagnostic(&mut self, diagnostic: &Diag);

    /// Returns a reference to the source map, if any.
    #[inline]
    fn source_map(&self) -> Option<&Arc<SourceMap>> {
        None
    }

    /// Returns `true` if this emitter writes colors to its output stream.
    #[inline]
    fn supports_color(&self) -> bool {
        false
    }

    /// Upcast helper; object-safe replacement for trait upcasting.
    fn as_any(&self) -> &dyn Any;
}

impl DynEmitter {
    pub(crate) fn local_buffer(&self) -> Option<&str> {
        self.as_any().downcast_ref::<HumanEmitter>()?.buffer()
    }
}

/// Diagnostic emitter that only emits fatal diagnostics, with an optional
/// note attached.
pub struct SilentEmitter {
    fatal_emitter: Option<Box<DynEmitter>>,
    note: Option<String>,
}

impl SilentEmitter {
    /// Creates a new `SilentEmitter`. Emits fatal diagnostics with
    /// `fatal_emitter`.
    pub fn new(fatal_emitter: impl Emitter + Send) -> Self {
        Self { fatal_emitter: Some(Box::new(fatal_emitter)), note: None }
    }

    /// Creates a new `SilentEmitter` that does not emit any diagnostics at
    /// all.
    pub fn new_silent() -> Self {
        Self { fatal_emitter: None, note: None }
    }

    /// Sets the note to be emitted for fatal diagnostics.
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

impl Emitter for SilentEmitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diag) {
        let Some(fatal_emitter) = self.fatal_emitter.as_deref_mut() else { return };
        if diagnostic.level != Level::Fatal {
            return;
        }

        if let Some(note) = &self.note {
            let mut diagnostic = diagnostic.clone();
            diagnostic.note(note.clone());
            fatal_emitter.emit_diagnostic(&diagnostic);
        } else {
            fatal_emitter.emit_diagnostic(diagnostic);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An in-memory diagnostics sink.
///
/// Diagnostics are pushed to a shared buffer as-is, un-rendered. This is the
/// structured sink for library consumers and tests.
pub struct InMemoryEmitter {
    buffer: Arc<Mutex<Vec<Diag>>>,
}

impl InMemoryEmitter {
    /// Creates a new emitter, returning the emitter itself and the buffer.
    pub fn new() -> (Self, Arc<Mutex<Vec<Diag>>>) {
        let buffer = Arc::<Mutex<Vec<Diag>>>::default();
        (Self { buffer: Arc::clone(&buffer) }, buffer)
    }
}

impl Emitter for InMemoryEmitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diag) {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).push(diagnostic.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum Out {
    Stderr,
    Buffer(String),
}

/// A human-readable diagnostic emitter in the style of `rustc`.
///
/// Renders a colored header, the resolved source location, and a caret
/// snippet from the source map:
///
/// ```text
/// error[divide-by-zero]: division by zero
///  --> <expr>:1:6
///   |
/// 1 | 10 / 0
///   |      ^
/// ```
pub struct HumanEmitter {
    out: Out,
    colored: bool,
    short: bool,
    source_map: Option<Arc<SourceMap>>,
}

impl HumanEmitter {
    /// Creates an emitter that writes to stderr, coloring per `choice`.
    pub fn stderr(choice: ColorChoice) -> Self {
        let colored = match choice {
            ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                anstream::AutoStream::choice(&std::io::stderr()) != ColorChoice::Never
            }
        };
        Self { out: Out::Stderr, colored, short: false, source_map: None }
    }

    /// Creates an emitter that renders into a local string buffer, without
    /// colors unless explicitly forced.
    pub fn buffered(choice: ColorChoice) -> Self {
        let colored = matches!(choice, ColorChoice::Always | ColorChoice::AlwaysAnsi);
        Self { out: Out::Buffer(String::new()), colored, short: false, source_map: None }
    }

    /// Sets the source map used to resolve spans.
    pub fn source_map(mut self, source_map: Option<Arc<SourceMap>>) -> Self {
        self.source_map = source_map;
        self
    }

    /// Sets whether diagnostics are rendered as single lines.
    pub fn short(mut self, yes: bool) -> Self {
        self.short = yes;
        self
    }

    /// Returns the rendered buffer, if this emitter renders into one.
    pub fn buffer(&self) -> Option<&str> {
        match &self.out {
            Out::Buffer(buffer) => Some(buffer),
            Out::Stderr => None,
        }
    }

    fn styled(&self, style: anstyle::Style, s: &str) -> String {
        if self.colored {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    fn render(&self, diag: &Diag) -> String {
        if self.short {
            return self.render_short(diag);
        }

        let mut out = String::new();
        let level_style = diag.level().style();
        let bold = anstyle::Style::new().bold();

        // `error[divide-by-zero]: message`
        let mut header = diag.level().to_str().to_string();
        if let Some(code) = diag.code {
            header.push_str(&format!("[{code}]"));
        }
        let _ = write!(
            out,
            "{}{} {}\n",
            self.styled(level_style, &header),
            self.styled(bold, ":"),
            self.styled(bold, &diag.msg),
        );

        self.render_span(&mut out, &diag.span, diag.level());

        for child in &diag.children {
            let child_style = child.level.style();
            let _ = write!(
                out,
                "  = {}: {}\n",
                self.styled(child_style, child.level.to_str()),
                child.msg,
            );
            if let Some(span) = child.span.primary_span() {
                if let Some(sm) = &self.source_map {
                    let _ = write!(out, "    at {}\n", sm.span_to_diagnostic_string(span));
                }
            }
        }

        out
    }

    /// Renders the ` --> location` line and the caret snippet.
    fn render_span(&self, out: &mut String, span: &MultiSpan, level: Level) {
        let Some(sm) = &self.source_map else { return };
        let Some(primary) = span.primary_span() else { return };
        let Some(loc) = sm.lookup_position(primary.lo()) else { return };

        let arrow_style = anstyle::Style::new()
            .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightBlue)))
            .bold();

        let line_num = loc.line.to_string();
        let gutter = " ".repeat(line_num.len());

        let _ = write!(
            out,
            "{}{} {}:{}:{}\n",
            gutter,
            self.styled(arrow_style, "-->"),
            loc.file.name,
            loc.line,
            loc.col.0,
        );

        let Some(line_src) = loc.file.get_line(loc.line - 1) else { return };
        let bar = self.styled(arrow_style, "|");
        let _ = write!(out, "{gutter} {bar}\n");
        let _ = write!(out, "{} {} {}\n", self.styled(arrow_style, &line_num), bar, line_src);

        // Primary carets, with the label of the primary span if one exists.
        let col = loc.col.0 - 1;
        let width = primary.len().clamp(1, line_src.chars().count().saturating_sub(col).max(1));
        let carets = format!("{}{}", " ".repeat(col), "^".repeat(width));
        let primary_label = span
            .span_labels()
            .iter()
            .find(|(s, _)| *s == primary)
            .map(|(_, label)| format!(" {label}"))
            .unwrap_or_default();
        let _ = write!(
            out,
            "{gutter} {bar} {}{}\n",
            self.styled(level.style(), &carets),
            self.styled(level.style(), &primary_label),
        );

        // Secondary labels each get their own underline line.
        for (label_span, label) in span.span_labels() {
            if *label_span == primary {
                continue;
            }
            let Some(label_loc) = sm.lookup_position(label_span.lo()) else { continue };
            if label_loc.line != loc.line {
                continue;
            }
            let col = label_loc.col.0 - 1;
            let width = label_span.len().max(1);
            let dashes = format!("{}{} {label}", " ".repeat(col), "-".repeat(width));
            let _ = write!(out, "{gutter} {bar} {}\n", self.styled(arrow_style, &dashes));
        }
    }

    fn render_short(&self, diag: &Diag) -> String {
        let mut out = String::new();
        out.push_str(diag.level().to_str());
        if let Some(code) = diag.code {
            let _ = write!(out, "[{code}]");
        }
        out.push_str(": ");
        if let Some(stage) = diag.stage {
            let _ = write!(out, "{stage}: ");
        }
        out.push_str(&diag.msg);
        if let Some(span) = diag.span.primary_span() {
            if let Some(sm) = &self.source_map {
                let _ = write!(out, " --> {}", sm.span_to_diagnostic_string(span));
            }
        }
        out.push('\n');
        out
    }
}

impl Emitter for HumanEmitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diag) {
        let rendered = self.render(diagnostic);
        match &mut self.out {
            Out::Stderr => {
                let stderr = std::io::stderr();
                let choice = if self.colored { ColorChoice::Always } else { ColorChoice::Never };
                let mut stream = anstream::AutoStream::new(stderr.lock(), choice);
                let _ = stream.write_all(rendered.as_bytes());
            }
            Out::Buffer(buffer) => buffer.push_str(&rendered),
        }
    }

    fn source_map(&self) -> Option<&Arc<SourceMap>> {
        self.source_map.as_ref()
    }

    fn supports_color(&self) -> bool {
        self.colored
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BytePos, Span,
        diagnostics::{Diag, codes},
        source_map::FileName,
    };
    use tally_config::Stage;

    fn render(src: &str, f: impl FnOnce(&SourceMap) -> Diag) -> String {
        let sm = Arc::new(SourceMap::empty());
        sm.new_source_file(FileName::Expr, src).unwrap();
        let mut emitter =
            HumanEmitter::buffered(ColorChoice::Never).source_map(Some(sm.clone()));
        let diag = f(&sm);
        emitter.emit_diagnostic(&diag);
        emitter.buffer().unwrap().to_string()
    }

    #[test]
    fn caret_snippet() {
        let out = render("10 / 0", |_| {
            let mut diag = Diag::new(Level::Error, "division by zero");
            diag.code(codes::DIVIDE_BY_ZERO).span(Span::point(BytePos(5)));
            diag
        });
        assert_eq!(
            out,
            "error[divide-by-zero]: division by zero\n \
             --> <expr>:1:6\n  \
             |\n\
             1 | 10 / 0\n  \
             |      ^\n"
        );
    }

    #[test]
    fn primary_label_and_note() {
        let out = render("1 / 0", |_| {
            let span = Span::point(BytePos(4));
            let mut diag = Diag::new(Level::Error, "division by zero");
            diag.span(span);
            diag.span_label(span, "divisor is zero");
            diag.note("division is only defined for nonzero divisors");
            diag
        });
        assert!(out.contains("^ divisor is zero"), "{out}");
        assert!(out.contains("= note: division is only defined"), "{out}");
    }

    #[test]
    fn short_format() {
        let sm = Arc::new(SourceMap::empty());
        sm.new_source_file(FileName::Expr, "x + 1").unwrap();
        let mut emitter = HumanEmitter::buffered(ColorChoice::Never)
            .source_map(Some(sm))
            .short(true);
        let mut diag = Diag::new(Level::Error, "'x' is not a recognized token");
        diag.code(codes::INVALID_TOKEN).stage(Stage::Lex).span(Span::point(BytePos(0)));
        emitter.emit_diagnostic(&diag);
        assert_eq!(
            emitter.buffer().unwrap(),
            "error[invalid-token]: lex: 'x' is not a recognized token --> <expr>:1:1\n"
        );
    }

    #[test]
    fn in_memory_sink() {
        let (mut emitter, sink) = InMemoryEmitter::new();
        let mut diag = Diag::new(Level::Warning, "careful");
        diag.stage(Stage::Validate);
        emitter.emit_diagnostic(&diag);
        let sink = sink.lock().unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].stage, Some(Stage::Validate));
    }

    #[test]
    fn silent_swallows_errors() {
        let mut emitter = SilentEmitter::new_silent();
        emitter.emit_diagnostic(&Diag::new(Level::Error, "not shown"));
    }
}
