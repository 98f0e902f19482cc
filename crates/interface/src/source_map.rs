//! Types for tracking pipeline input and mapping spans back to it.

use crate::{BytePos, CharPos, Span};
use std::{
    fmt, io,
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

/// The name of a source handed to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FileName {
    /// An expression passed directly on the command line.
    Expr,
    /// An on-disk file.
    Real(PathBuf),
    /// A named virtual file, mostly used in tests.
    Custom(String),
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr => f.write_str("<expr>"),
            Self::Real(path) => path.display().fmt(f),
            Self::Custom(name) => write!(f, "<{name}>"),
        }
    }
}

impl From<PathBuf> for FileName {
    fn from(path: PathBuf) -> Self {
        Self::Real(path)
    }
}

impl FileName {
    /// Creates a custom file name.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

/// A single source, with a pre-computed line table.
#[derive(Debug)]
pub struct SourceFile {
    /// The name of the file.
    pub name: FileName,
    /// The complete source code.
    pub src: String,
    /// The start position of this file in the source map.
    pub start_pos: BytePos,
    /// Offsets of line beginnings, relative to `start_pos`. Never empty.
    lines: Vec<u32>,
}

impl SourceFile {
    fn new(name: FileName, src: String, start_pos: BytePos) -> Self {
        let mut lines = vec![0];
        lines.extend(
            src.bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| i as u32 + 1),
        );
        Self { name, src, start_pos, lines }
    }

    /// Returns the position one past the last byte of this file.
    pub fn end_pos(&self) -> BytePos {
        self.start_pos + BytePos::from_usize(self.src.len())
    }

    /// Returns the number of lines in this file.
    pub fn count_lines(&self) -> usize {
        self.lines.len()
    }

    /// Finds the 0-based line index containing the given relative position.
    pub fn lookup_line(&self, rel_pos: u32) -> usize {
        self.lines.partition_point(|&start| start <= rel_pos).saturating_sub(1)
    }

    /// Returns the source of the given 0-based line, without its terminator.
    pub fn get_line(&self, line_index: usize) -> Option<&str> {
        let start = *self.lines.get(line_index)? as usize;
        let end = match self.lines.get(line_index + 1) {
            Some(&next) => next as usize,
            None => self.src.len(),
        };
        Some(self.src[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Returns the relative offset of the start of the given 0-based line.
    pub fn line_start(&self, line_index: usize) -> Option<u32> {
        self.lines.get(line_index).copied()
    }

    fn relative_pos(&self, pos: BytePos) -> u32 {
        (pos - self.start_pos).to_u32()
    }
}

/// A resolved source location: file, 1-based line, 1-based column.
#[derive(Clone, Debug)]
pub struct Loc {
    pub file: Arc<SourceFile>,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters).
    pub col: CharPos,
}

/// An error that occurred while adding a source to the [`SourceMap`].
#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    #[error("sources exceed the 4 GiB source map limit")]
    OffsetOverflow,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Stores all sources of one session and resolves spans back into them.
///
/// Spans are absolute: each file occupies a distinct `[start_pos, end_pos]`
/// range, so a span identifies its file.
#[derive(Default)]
pub struct SourceMap {
    files: RwLock<Vec<Arc<SourceFile>>>,
}

impl fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMap").field("files", &self.files().len()).finish()
    }
}

impl SourceMap {
    /// Creates an empty source map.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if no sources have been added.
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    fn files(&self) -> Vec<Arc<SourceFile>> {
        self.files.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Adds a source to the map, assigning it the next free position range.
    pub fn new_source_file(
        &self,
        name: FileName,
        src: impl Into<String>,
    ) -> Result<Arc<SourceFile>, SourceMapError> {
        let src = src.into();
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        // Leave a one byte gap between files so that `end_pos` of one file
        // never aliases `start_pos` of the next.
        let start_pos = match files.last() {
            Some(last) => last.end_pos() + 1,
            None => BytePos(0),
        };
        let end = start_pos.to_usize().checked_add(src.len());
        if end.is_none() || end.unwrap_or(usize::MAX) > u32::MAX as usize {
            return Err(SourceMapError::OffsetOverflow);
        }
        let file = Arc::new(SourceFile::new(name, src, start_pos));
        files.push(file.clone());
        Ok(file)
    }

    /// Returns the file containing the given position, if any.
    pub fn lookup_file(&self, pos: BytePos) -> Option<Arc<SourceFile>> {
        let files = self.files();
        let idx = files.partition_point(|f| f.start_pos <= pos).checked_sub(1)?;
        let file = &files[idx];
        (pos <= file.end_pos()).then(|| file.clone())
    }

    /// Resolves a position to a file, line and column.
    pub fn lookup_position(&self, pos: BytePos) -> Option<Loc> {
        let file = self.lookup_file(pos)?;
        let rel = file.relative_pos(pos);
        let line = file.lookup_line(rel);
        let line_start = file.line_start(line)? as usize;
        let col = file.src.get(line_start..rel as usize)?.chars().count();
        Some(Loc { file, line: line + 1, col: CharPos(col + 1) })
    }

    /// Returns the source text covered by `span`.
    pub fn span_to_snippet(&self, span: Span) -> Option<String> {
        let file = self.lookup_file(span.lo())?;
        let lo = file.relative_pos(span.lo()) as usize;
        let hi = file.relative_pos(span.hi()) as usize;
        file.src.get(lo..hi).map(str::to_string)
    }

    /// Formats a span as `name:line:col` for diagnostics.
    pub fn span_to_diagnostic_string(&self, span: Span) -> String {
        match self.lookup_position(span.lo()) {
            Some(loc) => format!("{}:{}:{}", loc.file.name, loc.line, loc.col.0),
            None => format!("{}..{}", span.lo().0, span.hi().0),
        }
    }

    /// Returns `true` if `span` starts and ends on different lines.
    pub fn is_multiline(&self, span: Span) -> bool {
        match (self.lookup_position(span.lo()), self.lookup_position(span.hi())) {
            (Some(lo), Some(hi)) => lo.line != hi.line,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(src: &str) -> (SourceMap, Arc<SourceFile>) {
        let sm = SourceMap::empty();
        let file = sm.new_source_file(FileName::Expr, src).unwrap();
        (sm, file)
    }

    #[test]
    fn line_table() {
        let (_, file) = map_with("1 + 2\n3 * 4\n");
        assert_eq!(file.count_lines(), 3);
        assert_eq!(file.get_line(0), Some("1 + 2"));
        assert_eq!(file.get_line(1), Some("3 * 4"));
        assert_eq!(file.get_line(2), Some(""));
        assert_eq!(file.lookup_line(0), 0);
        assert_eq!(file.lookup_line(5), 0);
        assert_eq!(file.lookup_line(6), 1);
    }

    #[test]
    fn lookup_position() {
        let (sm, _) = map_with("10 / 0");
        let loc = sm.lookup_position(BytePos(5)).unwrap();
        assert_eq!(loc.line, 1);
        assert_eq!(loc.col, CharPos(6));
        assert_eq!(
            sm.span_to_diagnostic_string(Span::point(BytePos(5))),
            "<expr>:1:6"
        );
    }

    #[test]
    fn snippets() {
        let (sm, _) = map_with("sqrt(4)");
        let span = Span::new(BytePos(0), BytePos(4));
        assert_eq!(sm.span_to_snippet(span).as_deref(), Some("sqrt"));
        assert!(!sm.is_multiline(span));
    }

    #[test]
    fn multiple_files() {
        let sm = SourceMap::empty();
        let a = sm.new_source_file(FileName::custom("a"), "first").unwrap();
        let b = sm.new_source_file(FileName::custom("b"), "second").unwrap();
        assert_eq!(a.start_pos, BytePos(0));
        assert_eq!(b.start_pos, BytePos(6));
        let loc = sm.lookup_position(b.start_pos + 1).unwrap();
        assert_eq!(loc.file.name, FileName::custom("b"));
        assert_eq!(loc.col, CharPos(2));
    }

    #[test]
    fn missing_position() {
        let sm = SourceMap::empty();
        assert!(sm.lookup_position(BytePos(0)).is_none());
        assert_eq!(sm.span_to_diagnostic_string(Span::new(BytePos(1), BytePos(2))), "1..2");
    }
}
