//! Expression parser.

use crate::{Lexer, PResult};
use tally_ast::{
    Arena, Expr,
    token::{Token, TokenKind},
};
use tally_config::Stage;
use tally_interface::{
    Session, Span,
    diagnostics::{DiagCtxt, codes},
    source_map::SourceFile,
};

mod expr;

/// Expression parser.
///
/// Consumes a typed token stream that already passed [`validate`]; any
/// inconsistency it still encounters is therefore reported as an internal
/// error rather than recovered from.
///
/// [`validate`]: crate::validate
pub struct Parser<'sess, 'ast> {
    /// The parser session.
    pub sess: &'sess Session,
    /// The arena where the AST nodes are allocated.
    pub arena: &'ast Arena,

    /// The current token.
    pub token: Token,
    /// The previous token.
    pub prev_token: Token,

    /// The span of the end of the input, used for the end-of-input token.
    eof_span: Span,
    /// The token stream.
    tokens: std::vec::IntoIter<Token>,
}

impl<'sess, 'ast> Parser<'sess, 'ast> {
    /// Creates a new parser over a token stream.
    pub fn new(sess: &'sess Session, arena: &'ast Arena, tokens: Vec<Token>) -> Self {
        let eof_span = tokens.last().map_or(Span::DUMMY, |t| t.span.shrink_to_hi());
        let mut parser = Self {
            sess,
            arena,
            token: Token::DUMMY,
            prev_token: Token::DUMMY,
            eof_span,
            tokens: tokens.into_iter(),
        };
        parser.bump();
        parser
    }

    /// Creates a new parser from a source file, lexing it first.
    ///
    /// Note that the source file must be added to the source map before
    /// calling this function.
    pub fn from_source_file(
        sess: &'sess Session,
        arena: &'ast Arena,
        file: &SourceFile,
    ) -> Self {
        Self::from_lexer(arena, Lexer::from_source_file(sess, file))
    }

    /// Creates a new parser from a lexer.
    pub fn from_lexer(arena: &'ast Arena, lexer: Lexer<'sess, '_>) -> Self {
        Self::new(lexer.sess, arena, lexer.into_tokens())
    }

    /// Returns the diagnostic context.
    #[inline]
    pub fn dcx(&self) -> &'sess DiagCtxt {
        &self.sess.dcx
    }

    /// Allocates an expression on the AST arena.
    pub(crate) fn alloc(&self, expr: Expr<'ast>) -> &'ast Expr<'ast> {
        self.arena.alloc(expr)
    }

    /// Advances to the next token.
    pub fn bump(&mut self) {
        let next = self.tokens.next().unwrap_or(Token::new(TokenKind::Eof, self.eof_span));
        self.prev_token = std::mem::replace(&mut self.token, next);
    }

    /// Returns `true` if the current token is `kind`.
    #[inline]
    pub fn check(&self, kind: &TokenKind) -> bool {
        self.token.kind == *kind
    }

    /// Consumes the current token if it is `kind`. Returns `true` if it was.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        let is_present = self.check(kind);
        if is_present {
            self.bump();
        }
        is_present
    }

    /// Expects and consumes the token `kind`. Fails with an internal error if
    /// the current token is different: the validator must have admitted the
    /// stream for parsing to begin.
    pub fn expect(&mut self, kind: &TokenKind) -> PResult<'sess, ()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.internal_error(format!(
                "expected `{kind}`, found {}",
                self.token.full_description()
            )))
        }
    }

    /// Returns an "unexpected token" internal error for the current token.
    #[track_caller]
    pub fn unexpected<T>(&mut self) -> PResult<'sess, T> {
        Err(self.internal_error(format!("unexpected {}", self.token.full_description())))
    }

    /// Builds an internal parser error. Reachable only on token streams that
    /// never went through the validator.
    #[track_caller]
    fn internal_error(&self, msg: String) -> crate::PErr<'sess> {
        self.dcx()
            .err(msg)
            .code(codes::INTERNAL)
            .stage(Stage::Parse)
            .span(self.token.span)
            .note("this token stream should have been rejected by validation")
    }
}
