//! Semantic validation of the typed token stream.
//!
//! A single forward pass that checks local adjacency rules and global
//! parenthesis balance before parsing. Every violation is recorded; the pass
//! never stops early, so the user sees all problems at once.

use tally_ast::token::{Token, TokenKind};
use tally_config::{Features, Stage};
use tally_interface::{
    Result, Session, Span,
    diagnostics::{DiagId, DiagMsg, ErrorGuaranteed, codes},
};

/// Validates the typed token stream.
///
/// Returns `Err` if any violation was recorded. The tokens are not mutated;
/// this pass only decides whether parsing may proceed.
pub fn validate(sess: &Session, features: Features, tokens: &[Token]) -> Result<()> {
    Validator { sess, features, opened: Vec::new() }.run(tokens)
}

struct Validator<'sess> {
    sess: &'sess Session,
    features: Features,
    /// One entry per open parenthesis; `true` if it opened a function
    /// argument list.
    opened: Vec<bool>,
}

impl Validator<'_> {
    fn run(&mut self, tokens: &[Token]) -> Result<()> {
        let errors_before = self.sess.dcx.err_count();

        for (i, token) in tokens.iter().enumerate() {
            let prev = i.checked_sub(1).map(|i| &tokens[i]);
            let next = tokens.get(i + 1);
            self.check(token, prev, next);
        }

        if !self.opened.is_empty() {
            // Report at the last token, where the missing `)` would go.
            let span = tokens.last().map_or(Span::DUMMY, |t| t.span);
            let n = self.opened.len();
            self.err(
                format!("unbalanced parentheses: {n} unclosed `(`"),
                codes::UNBALANCED_PARENTHESES,
                span,
            );
        }

        if self.sess.dcx.err_count() > errors_before {
            Err(ErrorGuaranteed::new_unchecked())
        } else {
            tracing::trace!(n = tokens.len(), "validated");
            Ok(())
        }
    }

    fn check(&mut self, token: &Token, prev: Option<&Token>, next: Option<&Token>) {
        let prev_ends_operand = prev.is_some_and(|p| p.kind.is_operand_end());
        match token.kind {
            TokenKind::Number(_) | TokenKind::Const(_) => {
                if prev_ends_operand {
                    self.err(
                        format!("expected an operator, found {}", token.full_description()),
                        codes::EXPECTED_OPERATOR,
                        token.span,
                    );
                }
            }

            TokenKind::Op(op) => {
                // In operand position only the sign prefixes `+`/`-` are
                // allowed, and only when an operand (or another sign)
                // follows.
                if !prev_ends_operand && !op.is_sign() {
                    self.err(
                        format!("expected an operand before `{op}`"),
                        codes::EXPECTED_OPERAND,
                        token.span,
                    );
                }
                // A trailing operator has no right-hand side. Bad interior
                // successors are reported by the successor's own check.
                if next.is_none() {
                    self.err(
                        format!("expected an operand after `{op}`"),
                        codes::EXPECTED_OPERAND,
                        token.span,
                    );
                }
            }

            TokenKind::OpenParen => {
                if prev_ends_operand {
                    self.err(
                        "expected an operator before `(`",
                        codes::EXPECTED_OPERATOR,
                        token.span,
                    );
                }
                let for_function = prev.is_some_and(|p| matches!(p.kind, TokenKind::Func(_)));
                self.opened.push(for_function);
            }

            TokenKind::CloseParen => {
                let Some(for_function) = self.opened.pop() else {
                    self.err(
                        "unmatched closing parenthesis",
                        codes::UNBALANCED_PARENTHESES,
                        token.span,
                    );
                    return;
                };
                match prev.map(|p| &p.kind) {
                    Some(TokenKind::OpenParen) => {
                        let span = prev.map_or(token.span, |p| p.span.to(token.span));
                        if for_function {
                            self.err(
                                "this function requires an argument",
                                codes::FUNCTION_REQUIRES_ARGUMENT,
                                span,
                            );
                        } else {
                            self.err(
                                "empty parentheses",
                                codes::EMPTY_PARENTHESES,
                                span,
                            );
                        }
                    }
                    Some(TokenKind::Op(op)) => {
                        self.err(
                            format!("expected an operand after `{op}`, found `)`"),
                            codes::EXPECTED_OPERAND,
                            token.span,
                        );
                    }
                    Some(TokenKind::Comma) => {
                        self.err(
                            "expected an operand before `)`",
                            codes::EXPECTED_OPERAND,
                            token.span,
                        );
                    }
                    _ => {}
                }
            }

            TokenKind::Func(kind) => {
                if prev_ends_operand {
                    self.err(
                        format!("expected an operator, found {}", token.full_description()),
                        codes::EXPECTED_OPERATOR,
                        token.span,
                    );
                }
                if !next.is_some_and(|n| matches!(n.kind, TokenKind::OpenParen)) {
                    self.err(
                        format!("function `{kind}` requires a parenthesised argument list"),
                        codes::FUNCTION_REQUIRES_ARGUMENT,
                        token.span,
                    );
                }
            }

            TokenKind::Comma => {
                if self.opened.last() != Some(&true) {
                    self.err(
                        "`,` is only valid inside a function argument list",
                        codes::UNEXPECTED_TOKEN,
                        token.span,
                    );
                }
                if !prev_ends_operand {
                    self.err(
                        "expected an operand before `,`",
                        codes::EXPECTED_OPERAND,
                        token.span,
                    );
                }
                if next.is_none() {
                    self.err(
                        "expected an operand after `,`",
                        codes::EXPECTED_OPERAND,
                        token.span,
                    );
                }
            }

            TokenKind::Eq => {
                if self.features.definitions() {
                    self.err(
                        "variable and function definitions are not implemented yet",
                        codes::UNSUPPORTED,
                        token.span,
                    );
                } else {
                    self.sess
                        .dcx
                        .err("variable and function definitions are disabled in this mode")
                        .code(codes::FEATURE_DISABLED)
                        .stage(Stage::Validate)
                        .span(token.span)
                        .help("definitions like `name = expr` require a file or interactive mode")
                        .emit();
                }
            }

            TokenKind::Eof => {}
        }
    }

    fn err(&self, msg: impl Into<DiagMsg>, code: DiagId, span: Span) {
        self.sess.dcx.err(msg).code(code).stage(Stage::Validate).span(span).emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lexer;
    use tally_interface::source_map::FileName;

    /// Lexes and validates `src`, returning the rendered diagnostics, if any.
    fn validate_src(src: &str) -> Option<String> {
        let sess = Session::builder().with_test_emitter().build();
        sess.source_map().new_source_file(FileName::Expr, src).unwrap();
        let tokens = Lexer::new(&sess, src).into_tokens();
        assert!(sess.dcx.has_errors().is_ok(), "lexing failed for {src:?}");
        let res = validate(&sess, sess.features(), &tokens);
        let rendered = sess.emitted_errors().unwrap();
        assert_eq!(res.is_err(), rendered.is_err());
        rendered.err().map(|e| e.to_string())
    }

    #[track_caller]
    fn assert_valid(src: &str) {
        if let Some(err) = validate_src(src) {
            panic!("expected {src:?} to validate, got:\n{err}");
        }
    }

    #[track_caller]
    fn assert_invalid(src: &str, code: &str) {
        match validate_src(src) {
            Some(err) => assert!(err.contains(code), "wrong diagnostics for {src:?}:\n{err}"),
            None => panic!("expected {src:?} to fail with {code}"),
        }
    }

    #[test]
    fn accepts_well_formed() {
        assert_valid("1");
        assert_valid("PI");
        assert_valid("1 + 2");
        assert_valid("10.5 + 30 - sqrt(PI * 5.2) / 8");
        assert_valid("2^3^2");
        assert_valid("-4 + 2");
        assert_valid("(1 + 2) * 3");
        assert_valid("((1))");
        assert_valid("sin(cos(1))");
        assert_valid("1 * -2");
        assert_valid("(-4)");
        assert_valid("- -4");
        assert_valid("sqrt(-1)");
    }

    #[test]
    fn missing_operators() {
        assert_invalid("1 2", "expected-operator");
        assert_invalid("1 PI", "expected-operator");
        assert_invalid("(1)(2)", "expected-operator");
        assert_invalid("2 sqrt(4)", "expected-operator");
        assert_invalid("1 (2)", "expected-operator");
    }

    #[test]
    fn missing_operands() {
        assert_invalid("1 +", "expected-operand");
        assert_invalid("* 2", "expected-operand");
        assert_invalid("1 + * 2", "expected-operand");
        assert_invalid("(1 + )", "expected-operand");
        assert_invalid("^2", "expected-operand");
    }

    #[test]
    fn parentheses() {
        assert_invalid("sqrt(4", "unbalanced-parentheses");
        assert_invalid("(1 + 2", "unbalanced-parentheses");
        assert_invalid("1 + 2)", "unbalanced-parentheses");
        assert_invalid("()", "empty-parentheses");
        assert_invalid("sqrt()", "function-requires-argument");
        assert_invalid("sqrt 4", "function-requires-argument");
        assert_invalid("sqrt", "function-requires-argument");
    }

    #[test]
    fn unbalanced_reported_at_last_token() {
        let sess = Session::builder().with_test_emitter().build();
        sess.source_map().new_source_file(FileName::Expr, "sqrt(4").unwrap();
        let tokens = Lexer::new(&sess, "sqrt(4").into_tokens();
        let _ = validate(&sess, sess.features(), &tokens);
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        // The last token is the `4` at offset 5.
        assert!(err.contains("<expr>:1:6"), "{err}");
    }

    #[test]
    fn commas() {
        assert_invalid("1, 2", "unexpected-token");
        assert_invalid("(1, 2)", "unexpected-token");
        // Structurally fine here; arity is the evaluator's concern.
        assert_valid("sqrt(1, 2)");
        assert_invalid("sqrt(, 2)", "expected-operand");
        assert_invalid("sqrt(1, )", "expected-operand");
    }

    #[test]
    fn equals_feature_gated() {
        assert_invalid("1 = 2", "feature-disabled");

        // With definitions enabled the token is recognized but unimplemented.
        let sess = Session::builder()
            .opts(tally_config::Opts {
                mode: tally_config::Mode::Repl,
                ..Default::default()
            })
            .with_test_emitter()
            .build();
        let tokens = Lexer::new(&sess, "1 = 2").into_tokens();
        let res = validate(&sess, sess.features(), &tokens);
        assert!(res.is_err());
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        assert!(err.contains("unsupported"), "{err}");
    }

    #[test]
    fn aggregates_all_violations() {
        let sess = Session::builder().with_test_emitter().build();
        sess.source_map().new_source_file(FileName::Expr, "1 2 + * (").unwrap();
        let tokens = Lexer::new(&sess, "1 2 + * (").into_tokens();
        let _ = validate(&sess, sess.features(), &tokens);
        // `2` after `1`, `*` after `+`, and the unclosed `(` all report.
        assert!(sess.dcx.err_count() >= 3, "err_count = {}", sess.dcx.err_count());
    }
}
