//! Expression lexer.
//!
//! Converts the [`Cursor`]'s raw output into typed [`Token`]s: numbers are
//! parsed into IEEE-754 doubles, identifiers are resolved against the
//! constant and function tables, and everything else is diagnosed.

use tally_ast::token::{ConstKind, FuncKind, OpToken, Token, TokenKind};
use tally_config::{Features, Stage};
use tally_interface::{
    BytePos, Result, Session, Span,
    diagnostics::{DiagCtxt, codes},
    source_map::SourceFile,
};

mod cursor;
pub use cursor::{
    Cursor, CursorWithPos, RawToken, RawTokenKind, is_literal_byte, is_whitespace_byte,
};

/// An optional symbol environment consulted by the lexer when an identifier
/// matches neither the constants nor the functions table, before it is
/// declared invalid.
///
/// This is the seam for user-defined variables and functions; the built-in
/// pipeline runs without one.
pub trait SymbolResolver {
    /// Resolves an identifier to a constant value.
    fn constant(&self, name: &str) -> Option<f64>;

    /// Resolves an identifier to a function.
    fn function(&self, name: &str) -> Option<FuncKind>;
}

/// Splits a source into raw tokens with absolute positions.
///
/// This is the first pipeline stage as a standalone operation; it fails with
/// `no-input` when the source is empty or contains only trivia.
pub fn tokenize(
    sess: &Session,
    file: &SourceFile,
    features: Features,
) -> Result<Vec<(BytePos, RawToken)>> {
    let tokens: Vec<_> = Cursor::new(&file.src, features)
        .with_pos()
        .map(|(pos, t)| (pos + file.start_pos, t))
        .collect();
    if tokens.iter().all(|(_, t)| t.kind.is_trivia()) {
        let span = Span::new_unchecked(file.start_pos, file.start_pos);
        return Err(sess
            .dcx
            .err("no expression given")
            .code(codes::NO_INPUT)
            .stage(Stage::Tokenize)
            .span(span)
            .emit());
    }
    tracing::trace!(n = tokens.len(), "tokenized");
    Ok(tokens)
}

/// Expression lexer.
///
/// Pulls raw tokens from a [`Cursor`] and "cooks" them into typed [`Token`]s,
/// recording a diagnostic for every malformed number and unknown identifier.
/// The lexer always runs to the end of the input so the user sees every
/// problem at once.
pub struct Lexer<'sess, 'src> {
    /// The lexing context.
    pub(crate) sess: &'sess Session,
    /// Cursor producing raw tokens.
    cursor: Cursor<'src>,
    /// Source text to tokenize.
    src: &'src str,
    /// The absolute offset of the current raw token.
    pos: BytePos,
    /// Initial position, read-only.
    start_pos: BytePos,
    /// Optional environment for user-defined symbols.
    resolver: Option<&'src dyn SymbolResolver>,
}

impl<'sess, 'src> Lexer<'sess, 'src> {
    /// Creates a new `Lexer` for the given source string, using the session's
    /// feature set.
    pub fn new(sess: &'sess Session, src: &'src str) -> Self {
        Self::with_start_pos(sess, src, BytePos(0))
    }

    /// Creates a new `Lexer` for the given source file.
    ///
    /// Note that the source file must be added to the source map before
    /// calling this function.
    pub fn from_source_file(sess: &'sess Session, file: &'src SourceFile) -> Self {
        Self::with_start_pos(sess, &file.src, file.start_pos)
    }

    /// Creates a new `Lexer` for the given source string and starting
    /// position.
    pub fn with_start_pos(sess: &'sess Session, src: &'src str, start_pos: BytePos) -> Self {
        Self {
            sess,
            cursor: Cursor::new(src, sess.features()),
            src,
            pos: start_pos,
            start_pos,
            resolver: None,
        }
    }

    /// Sets the symbol environment consulted for unknown identifiers.
    pub fn with_resolver(mut self, resolver: &'src dyn SymbolResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Overrides the session's feature set for this lexer.
    ///
    /// Must be called before any token is pulled; the cursor restarts from
    /// the beginning of the source.
    pub fn with_features(mut self, features: Features) -> Self {
        self.cursor = Cursor::new(self.src, features);
        self.pos = self.start_pos;
        self
    }

    /// Returns a reference to the diagnostic context.
    #[inline]
    pub fn dcx(&self) -> &'sess DiagCtxt {
        &self.sess.dcx
    }

    /// Consumes the lexer and collects the remaining tokens into a vector.
    ///
    /// Note that this skips trivia and invalid tokens; the diagnostic context
    /// records whether any were diagnosed.
    pub fn into_tokens(mut self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.src.len() / 3 + 1);
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tracing::trace!(src.len = self.src.len(), tokens.len = tokens.len(), "lexed");
        tokens
    }

    /// Returns the next typed token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            let RawToken { kind: raw_kind, len } = self.cursor.advance_token();
            let start = self.pos;
            self.pos += len;

            let kind = match raw_kind {
                RawTokenKind::Whitespace | RawTokenKind::LineComment => continue,

                RawTokenKind::Plus => TokenKind::Op(OpToken::Plus),
                RawTokenKind::Minus => TokenKind::Op(OpToken::Minus),
                RawTokenKind::Star => TokenKind::Op(OpToken::Star),
                RawTokenKind::Slash => TokenKind::Op(OpToken::Slash),
                RawTokenKind::Caret => TokenKind::Op(OpToken::Caret),
                RawTokenKind::OpenParen => TokenKind::OpenParen,
                RawTokenKind::CloseParen => TokenKind::CloseParen,
                RawTokenKind::Comma => TokenKind::Comma,
                RawTokenKind::Eq => TokenKind::Eq,

                RawTokenKind::Symbol => match self.cook_symbol(start, self.pos) {
                    Some(kind) => kind,
                    None => continue,
                },

                RawTokenKind::Eof => return None,
            };
            return Some(Token::new(kind, Span::new_unchecked(start, self.pos)));
        }
    }

    /// Classifies a symbol run: number, then constant, then function, then
    /// the resolver seam. Returns `None` after recording a diagnostic.
    fn cook_symbol(&self, start: BytePos, end: BytePos) -> Option<TokenKind> {
        let text = self.str_from_to(start, end);
        let span = Span::new_unchecked(start, end);

        match parse_number(text) {
            Ok(value) => return Some(TokenKind::Number(value)),
            Err(NumError::MultipleDecimalPoints { offset }) => {
                let point = Span::point(start + BytePos::from_usize(offset));
                self.dcx()
                    .err("numbers can only have one decimal point")
                    .code(codes::NUMBER_MULTIPLE_DECIMAL_POINTS)
                    .stage(Stage::Lex)
                    .span(point)
                    .span_label(point, "second decimal point")
                    .emit();
                return None;
            }
            // Not shaped like a number at all; try the identifier tables.
            Err(NumError::Empty | NumError::InvalidChar { .. }) => {}
        }

        if let Some(kind) = ConstKind::from_str(text) {
            return Some(TokenKind::Const(kind));
        }
        if let Some(kind) = FuncKind::from_str(text) {
            return Some(TokenKind::Func(kind));
        }
        if let Some(resolver) = self.resolver {
            if let Some(value) = resolver.constant(text) {
                return Some(TokenKind::Number(value));
            }
            if let Some(kind) = resolver.function(text) {
                return Some(TokenKind::Func(kind));
            }
        }

        self.dcx()
            .err(format!("`{text}` is not a recognized token"))
            .code(codes::INVALID_TOKEN)
            .stage(Stage::Lex)
            .span(span)
            .help("expected a number, a constant like `PI`, or a function like `sqrt`")
            .emit();
        None
    }

    /// Slice of the source text spanning from `start` up to but excluding
    /// `end`.
    fn str_from_to(&self, start: BytePos, end: BytePos) -> &'src str {
        let range = (start - self.start_pos).to_usize()..(end - self.start_pos).to_usize();
        &self.src[range]
    }
}

impl Iterator for Lexer<'_, '_> {
    type Item = Token;

    #[inline]
    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

impl std::iter::FusedIterator for Lexer<'_, '_> {}

/// Why a symbol failed to parse as a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumError {
    /// The input was empty. Unreachable from the tokenizer, which never
    /// produces empty symbols.
    Empty,
    /// A second decimal point at the given byte offset into the symbol.
    MultipleDecimalPoints { offset: usize },
    /// A byte that cannot appear in a number, at the given offset. The
    /// symbol may still be an identifier.
    InvalidChar { offset: usize },
}

/// Checks a symbol against the number grammar `-? digit+ ('.' digit+)?` and
/// converts it to an IEEE-754 double.
///
/// A minus sign is only valid at position zero; the tokenizer always splits
/// `-` off into its own token, but the lexer accepts glued negative numbers
/// for direct callers.
fn parse_number(s: &str) -> Result<f64, NumError> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return Err(NumError::Empty);
    }

    let mut seen_point = None::<usize>;
    let mut seen_digit = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'-' if i == 0 => {}
            b'0'..=b'9' => seen_digit = true,
            b'.' => {
                if seen_point.is_some() {
                    return Err(NumError::MultipleDecimalPoints { offset: i });
                }
                if !seen_digit {
                    // `.5` or `-.5`: not a number under this grammar.
                    return Err(NumError::InvalidChar { offset: i });
                }
                seen_point = Some(i);
            }
            _ => return Err(NumError::InvalidChar { offset: i }),
        }
    }
    if !seen_digit {
        // A lone `-`. Unreachable from the tokenizer.
        return Err(NumError::InvalidChar { offset: 0 });
    }
    if seen_point == Some(bytes.len() - 1) {
        // Trailing point with no fraction digits: `5.`.
        return Err(NumError::InvalidChar { offset: bytes.len() - 1 });
    }

    s.parse::<f64>().map_err(|_| NumError::InvalidChar { offset: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_interface::source_map::FileName;

    type Expected<'a> = &'a [(std::ops::Range<usize>, TokenKind)];

    fn check(src: &str, should_fail: bool, expected: Expected<'_>) {
        let sess = Session::builder().with_test_emitter().build();
        let tokens: Vec<_> = Lexer::new(&sess, src)
            .map(|t| (t.span.to_range(), t.kind))
            .collect();
        assert_eq!(sess.dcx.has_errors().is_err(), should_fail, "{src:?}");
        assert_eq!(tokens, expected, "{src:?}");
    }

    fn checks(tests: &[(&str, Expected<'_>)]) {
        for &(src, expected) in tests {
            check(src, false, expected);
        }
    }

    #[test]
    fn empty() {
        checks(&[("", &[]), (" ", &[]), (" \n\t ", &[])]);
    }

    #[test]
    fn numbers() {
        use TokenKind::Number;
        checks(&[
            ("0", &[(0..1, Number(0.0))]),
            ("42", &[(0..2, Number(42.0))]),
            ("10.5", &[(0..4, Number(10.5))]),
            ("  100.53 ", &[(2..8, Number(100.53))]),
            ("0.001", &[(0..5, Number(0.001))]),
        ]);
    }

    #[test]
    fn operators_and_punctuation() {
        use OpToken::*;
        use TokenKind::*;
        checks(&[
            ("+", &[(0..1, Op(Plus))]),
            ("-", &[(0..1, Op(Minus))]),
            ("*", &[(0..1, Op(Star))]),
            ("/", &[(0..1, Op(Slash))]),
            ("^", &[(0..1, Op(Caret))]),
            ("(", &[(0..1, OpenParen)]),
            (")", &[(0..1, CloseParen)]),
            (",", &[(0..1, Comma)]),
            ("=", &[(0..1, Eq)]),
            ("1+2", &[(0..1, Number(1.0)), (1..2, Op(Plus)), (2..3, Number(2.0))]),
        ]);
    }

    #[test]
    fn identifiers() {
        use TokenKind::*;
        checks(&[
            ("PI", &[(0..2, Const(ConstKind::Pi))]),
            ("TAU GC", &[(0..3, Const(ConstKind::Tau)), (4..6, Const(ConstKind::GaussConstant))]),
            ("sqrt", &[(0..4, Func(FuncKind::Sqrt))]),
            (
                "sqrt(PI)",
                &[
                    (0..4, Func(FuncKind::Sqrt)),
                    (4..5, OpenParen),
                    (5..7, Const(ConstKind::Pi)),
                    (7..8, CloseParen),
                ],
            ),
            ("log10", &[(0..5, Func(FuncKind::Log10))]),
        ]);
    }

    #[test]
    fn invalid_tokens() {
        use TokenKind::*;
        // Lexing continues after an error so every problem is reported.
        check("pi + 1", true, &[(3..4, Op(OpToken::Plus)), (5..6, Number(1.0))]);
        check("@ #", true, &[]);
        check("5. + 1", true, &[(3..4, Op(OpToken::Plus)), (5..6, Number(1.0))]);
    }

    #[test]
    fn multiple_decimal_points() {
        let sess = Session::builder().with_test_emitter().build();
        sess.source_map().new_source_file(FileName::Expr, "1.2.3 + 1").unwrap();
        let tokens = Lexer::new(&sess, "1.2.3 + 1").into_tokens();
        // The bad number is skipped, the rest lexes.
        assert_eq!(tokens.len(), 2);
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        // Reported at the offset of the second point.
        assert!(err.contains("number-multiple-decimal-points"), "{err}");
        assert!(err.contains("<expr>:1:4"), "{err}");
    }

    #[test]
    fn resolver_seam() {
        struct Env;
        impl SymbolResolver for Env {
            fn constant(&self, name: &str) -> Option<f64> {
                (name == "answer").then_some(42.0)
            }
            fn function(&self, name: &str) -> Option<FuncKind> {
                (name == "root").then_some(FuncKind::Sqrt)
            }
        }

        let sess = Session::builder().with_test_emitter().build();
        let env = Env;
        let tokens = Lexer::new(&sess, "answer root").with_resolver(&env).into_tokens();
        assert!(sess.dcx.has_errors().is_ok());
        assert_eq!(tokens[0].kind, TokenKind::Number(42.0));
        assert_eq!(tokens[1].kind, TokenKind::Func(FuncKind::Sqrt));
    }

    #[test]
    fn tokenize_stage_rejects_empty() {
        let sess = Session::builder().with_test_emitter().build();
        let file = sess.source_map().new_source_file(FileName::Expr, "   ").unwrap();
        assert!(tokenize(&sess, &file, sess.features()).is_err());
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        assert!(err.contains("no-input"), "{err}");
    }

    #[test]
    fn tokenize_stage_positions() {
        let sess = Session::builder().with_test_emitter().build();
        let file = sess.source_map().new_source_file(FileName::Expr, "1 + 2").unwrap();
        let raw = tokenize(&sess, &file, sess.features()).unwrap();
        assert_eq!(raw.len(), 5);
        assert_eq!(raw[2].0, BytePos(2));
        assert_eq!(raw[2].1.kind, RawTokenKind::Plus);
    }

    #[test]
    fn number_grammar() {
        assert_eq!(parse_number("42"), Ok(42.0));
        assert_eq!(parse_number("-5"), Ok(-5.0));
        assert_eq!(parse_number("10.25"), Ok(10.25));
        assert_eq!(parse_number("-0.5"), Ok(-0.5));
        assert_eq!(parse_number(""), Err(NumError::Empty));
        assert_eq!(parse_number("1.2.3"), Err(NumError::MultipleDecimalPoints { offset: 3 }));
        assert_eq!(parse_number("1..2"), Err(NumError::MultipleDecimalPoints { offset: 2 }));
        assert_eq!(parse_number(".5"), Err(NumError::InvalidChar { offset: 0 }));
        assert_eq!(parse_number("5."), Err(NumError::InvalidChar { offset: 1 }));
        assert_eq!(parse_number("-"), Err(NumError::InvalidChar { offset: 0 }));
        assert_eq!(parse_number("1-2"), Err(NumError::InvalidChar { offset: 1 }));
        assert_eq!(parse_number("abc"), Err(NumError::InvalidChar { offset: 0 }));
        assert_eq!(parse_number("1e5"), Err(NumError::InvalidChar { offset: 1 }));
    }
}
