//! Low-level expression tokenizer.
//!
//! Splits the source into *literals* (the fixed set of single-character
//! tokens) and *symbols* (maximal runs of everything else), without assigning
//! any meaning to symbol contents. Numbers, identifiers and garbage all reach
//! the lexer intact.

use tally_config::Features;
use tally_interface::BytePos;

/// Returns `true` if the given byte is considered whitespace.
#[inline]
pub const fn is_whitespace_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

/// Returns `true` if the given byte is one of the single-character literal
/// tokens: `+ - * / ^ ( ) , =`.
#[inline]
pub const fn is_literal_byte(b: u8) -> bool {
    matches!(b, b'+' | b'-' | b'*' | b'/' | b'^' | b'(' | b')' | b',' | b'=')
}

const EOF: u8 = b'\0';

/// A kind of raw token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawTokenKind {
    /// A whitespace run, including escaped line breaks when the
    /// newline-continuations feature is on.
    Whitespace,
    /// `// ...` up to (excluding) the line break. Only produced when the
    /// comments feature is on.
    LineComment,

    /// A maximal run of bytes that are neither whitespace nor literals.
    Symbol,

    // One-byte literals.
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `^`
    Caret,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `,`
    Comma,
    /// `=`
    Eq,

    /// End of input.
    Eof,
}

impl RawTokenKind {
    /// Returns `true` if this kind carries no content: whitespace, comments,
    /// end of input.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment | Self::Eof)
    }
}

/// A raw token: a kind and a length. Positions are recovered by summing
/// lengths, see [`CursorWithPos`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawToken {
    pub kind: RawTokenKind,
    pub len: u32,
}

impl RawToken {
    /// The end-of-input token.
    pub const EOF: Self = Self::new(RawTokenKind::Eof, 0);

    /// Creates a new raw token.
    pub const fn new(kind: RawTokenKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Peekable byte cursor over the source of one expression.
///
/// Position can be shifted forward via the `bump` method; the next bytes can
/// be peeked via `first` and `second`.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    bytes: std::slice::Iter<'a, u8>,
    features: Features,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor over the given input string slice.
    #[inline]
    pub fn new(input: &'a str, features: Features) -> Self {
        Self { bytes: input.as_bytes().iter(), features }
    }

    /// Creates a new iterator that also returns the position of each token in
    /// the input string, starting at 0.
    #[inline]
    pub fn with_pos(self) -> CursorWithPos<'a> {
        CursorWithPos { cursor: self, pos: 0 }
    }

    /// Parses a token from the input string.
    pub fn advance_token(&mut self) -> RawToken {
        // Track consumption through the slice pointer; the iterator is a pair
        // of `start` and `end` pointers internally.
        let start = self.as_bytes().len();

        let Some(first_byte) = self.bump() else { return RawToken::EOF };
        let kind = self.advance_token_kind(first_byte);

        let len = start - self.as_bytes().len();
        RawToken::new(kind, len as u32)
    }

    fn advance_token_kind(&mut self, first_byte: u8) -> RawTokenKind {
        match first_byte {
            // Comment, or the division operator.
            b'/' if self.features.comments && self.first() == b'/' => self.line_comment(),

            // Escaped line break.
            b'\\' if self.features.newline_continuations && self.at_line_break() => {
                self.eat_line_break();
                self.whitespace()
            }

            // Whitespace sequence.
            b if is_whitespace_byte(b) => self.whitespace(),

            // One-byte literals.
            b'+' => RawTokenKind::Plus,
            b'-' => RawTokenKind::Minus,
            b'*' => RawTokenKind::Star,
            b'/' => RawTokenKind::Slash,
            b'^' => RawTokenKind::Caret,
            b'(' => RawTokenKind::OpenParen,
            b')' => RawTokenKind::CloseParen,
            b',' => RawTokenKind::Comma,
            b'=' => RawTokenKind::Eq,

            // Everything else opens a symbol run.
            _ => self.symbol(),
        }
    }

    fn line_comment(&mut self) -> RawTokenKind {
        debug_assert!(self.first() == b'/');
        // Take Windows line endings (CRLF) into account.
        let b = self.as_bytes();
        let n = memchr::memchr2(b'\n', b'\r', b).unwrap_or(b.len());
        self.ignore_bytes(n);
        RawTokenKind::LineComment
    }

    /// Eats a whitespace run. When newline continuations are enabled, an
    /// escaped line break inside the run is swallowed as well.
    fn whitespace(&mut self) -> RawTokenKind {
        loop {
            self.eat_while(is_whitespace_byte);
            if self.features.newline_continuations && self.first() == b'\\' {
                let mut probe = self.clone();
                probe.bump();
                if probe.at_line_break() {
                    self.bump();
                    self.eat_line_break();
                    continue;
                }
            }
            break;
        }
        RawTokenKind::Whitespace
    }

    fn symbol(&mut self) -> RawTokenKind {
        self.eat_while(|b| !is_whitespace_byte(b) && !is_literal_byte(b) && b != b'\\');
        RawTokenKind::Symbol
    }

    /// Returns `true` if the cursor sits directly before a line break.
    fn at_line_break(&self) -> bool {
        self.first() == b'\n' || (self.first() == b'\r' && self.second() == b'\n')
    }

    fn eat_line_break(&mut self) {
        if self.first() == b'\r' {
            self.bump();
        }
        self.bump();
    }

    /// Returns the remaining input as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes.as_slice()
    }

    /// Peeks the next byte from the input stream without consuming it.
    /// Returns [`EOF`] at the end of input.
    #[inline]
    fn first(&self) -> u8 {
        self.peek_byte(0)
    }

    /// Peeks the second byte from the input stream without consuming it.
    #[inline]
    fn second(&self) -> u8 {
        self.peek_byte(1)
    }

    #[inline]
    fn peek_byte(&self, index: usize) -> u8 {
        self.as_bytes().get(index).copied().unwrap_or(EOF)
    }

    /// Checks if there is nothing more to consume.
    #[inline]
    fn is_eof(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Moves to the next byte, returning the current one.
    fn bump(&mut self) -> Option<u8> {
        self.bytes.next().copied()
    }

    /// Advances `n` bytes.
    #[inline]
    fn ignore_bytes(&mut self, n: usize) {
        debug_assert!(n <= self.as_bytes().len());
        self.bytes = self.as_bytes()[n..].iter();
    }

    /// Eats bytes while the predicate returns true, or until the end of input.
    #[inline]
    fn eat_while(&mut self, mut predicate: impl FnMut(u8) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = RawToken;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.advance_token();
        if token.kind == RawTokenKind::Eof { None } else { Some(token) }
    }
}

impl std::iter::FusedIterator for Cursor<'_> {}

/// [`Cursor`] that also tracks the position of each token in the input
/// string.
///
/// Created by calling [`Cursor::with_pos`].
#[derive(Clone, Debug)]
pub struct CursorWithPos<'a> {
    cursor: Cursor<'a>,
    pos: u32,
}

impl CursorWithPos<'_> {
    /// Returns the current position in the input string.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos as usize
    }
}

impl Iterator for CursorWithPos<'_> {
    type Item = (BytePos, RawToken);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next().map(|t| {
            let pos = self.pos;
            self.pos += t.len;
            (BytePos(pos), t)
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl std::iter::FusedIterator for CursorWithPos<'_> {}
