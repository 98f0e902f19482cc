#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use tally_ast::Arena;
use tally_config::{Features, Stage};
use tally_interface::{
    Result, Session,
    diagnostics::{DiagBuilder, ErrorGuaranteed, codes},
    source_map::FileName,
};
use tally_parse::{Lexer, Parser, tokenize, validate};

mod evaluator;
pub use evaluator::Evaluator;

// Convenience re-exports.
pub use tally_ast as ast;
pub use tally_interface as interface;
pub use tally_parse as parse;

/// Evaluator error type.
pub type EErr<'a> = DiagBuilder<'a, ErrorGuaranteed>;

/// Evaluator result type. This is a shorthand for `Result<T, EErr<'a>>`.
pub type EResult<'a, T> = std::result::Result<T, EErr<'a>>;

/// Runs the whole pipeline on one expression source and returns its value,
/// using the feature set of the session's mode.
///
/// The stages run strictly in order (tokenize, lex, validate, parse,
/// evaluate) and the pipeline stops at the first stage that reported an
/// error, after that stage has reported everything it found. The AST arena
/// lives on the stack of this function and is released on every exit path.
pub fn evaluate(sess: &Session, src: &str) -> Result<f64> {
    let features = sess.features();
    if !features.expression_eval {
        let mode = sess.opts.mode;
        return Err(sess
            .dcx
            .err(format!("expression evaluation is disabled in {mode} mode"))
            .code(codes::FEATURE_DISABLED)
            .stage(Stage::Eval)
            .emit());
    }
    evaluate_with_features(sess, src, features)
}

/// Runs the whole pipeline with an explicit feature set, overriding the
/// session's mode-derived one.
#[tracing::instrument(level = "debug", skip(sess, src))]
pub fn evaluate_with_features(sess: &Session, src: &str, features: Features) -> Result<f64> {
    if !features.expression_eval {
        return Err(sess
            .dcx
            .err("expression evaluation is disabled")
            .code(codes::FEATURE_DISABLED)
            .stage(Stage::Eval)
            .emit());
    }

    let file = sess
        .source_map()
        .new_source_file(FileName::Expr, src)
        .map_err(|e| sess.dcx.err(e.to_string()).emit())?;

    // Tokenize. The raw pass rejects empty input; the lexer below re-derives
    // its product from the same cursor.
    let raw = tokenize(sess, &file, features)?;
    tracing::debug!(raw.len = raw.len(), "tokenized");

    // Lex.
    let errors_before = sess.dcx.err_count();
    let tokens = Lexer::from_source_file(sess, &file).with_features(features).into_tokens();
    if sess.dcx.err_count() > errors_before {
        return Err(ErrorGuaranteed::new_unchecked());
    }
    tracing::debug!(tokens.len = tokens.len(), "lexed");

    // Validate.
    validate(sess, features, &tokens)?;

    // Parse and evaluate share one arena; both stages' nodes die together
    // when this function returns.
    let arena = Arena::new();
    let mut parser = Parser::new(sess, &arena, tokens);
    let root = parser.parse_expr().map_err(|e| e.emit())?;
    tracing::debug!(ast.nodes = tally_ast::visit::node_count(root), "parsed");

    let value = evaluate_ast(sess, &arena, root)?;
    tracing::debug!(%value, nodes.bytes = arena.allocated_bytes(), "evaluated");
    Ok(value)
}

/// Runs only the evaluation stage on an already-parsed AST.
pub fn evaluate_ast<'ast>(
    sess: &Session,
    arena: &'ast Arena,
    root: &'ast ast::Expr<'ast>,
) -> Result<f64> {
    let evaluator = Evaluator::new(sess, arena);
    let result = evaluator.eval(root).map_err(|e| e.emit())?;
    result.as_number().ok_or_else(|| {
        sess.dcx
            .err("evaluation did not produce a constant")
            .code(codes::INTERNAL)
            .stage(Stage::Eval)
            .emit()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_config::{Mode, Opts};

    fn session() -> Session {
        Session::builder().with_test_emitter().build()
    }

    #[test]
    fn whole_pipeline() {
        let sess = session();
        assert_eq!(evaluate(&sess, "2^3^2"), Ok(512.0));
        assert_eq!(evaluate(&sess, "-4 + 2"), Ok(-2.0));
        assert_eq!(evaluate(&sess, "(1 + 2) * 3"), Ok(9.0));
    }

    #[test]
    fn halts_at_first_failing_stage() {
        // A lex error: the validator would also reject the trailing `+`, but
        // it must never run, so only the lex diagnostic is reported.
        let sess = session();
        assert!(evaluate(&sess, "1.2.3 +").is_err());
        assert_eq!(sess.dcx.err_count(), 1);
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        assert!(err.contains("number-multiple-decimal-points"), "{err}");
        assert!(!err.contains("expected-operand"), "{err}");
    }

    #[test]
    fn empty_input() {
        let sess = session();
        assert!(evaluate(&sess, "").is_err());
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        assert!(err.contains("no-input"), "{err}");
    }

    #[test]
    fn linker_mode_disables_evaluation() {
        let sess = Session::builder()
            .opts(Opts { mode: Mode::Linker, ..Default::default() })
            .with_test_emitter()
            .build();
        assert!(evaluate(&sess, "1 + 2").is_err());
        let err = sess.emitted_errors().unwrap().unwrap_err().to_string();
        assert!(err.contains("feature-disabled"), "{err}");
        assert!(err.contains("linker mode"), "{err}");
    }

    #[test]
    fn comments_only_in_file_mode() {
        let sess = session();
        assert!(evaluate(&sess, "1 + 2 // half").is_err());

        let sess = Session::builder()
            .opts(Opts { mode: Mode::File, ..Default::default() })
            .with_test_emitter()
            .build();
        assert_eq!(evaluate(&sess, "1 + 2 // half"), Ok(3.0));
    }

    #[test]
    fn continuations_in_file_mode() {
        let sess = Session::builder()
            .opts(Opts { mode: Mode::File, ..Default::default() })
            .with_test_emitter()
            .build();
        assert_eq!(evaluate(&sess, "1 + \\\n    2"), Ok(3.0));
    }

    #[test]
    fn repeated_evaluations_share_a_session() {
        let sess = session();
        assert_eq!(evaluate(&sess, "1 + 1"), Ok(2.0));
        assert_eq!(evaluate(&sess, "2 + 2"), Ok(4.0));
        assert!(sess.dcx.has_errors().is_ok());
    }

    #[test]
    fn explicit_features() {
        let sess = session();
        let features = Features { comments: true, ..Features::EXPRESSION };
        assert_eq!(evaluate_with_features(&sess, "2 * 3 // six", features), Ok(6.0));

        let off = Features { expression_eval: false, ..Features::EXPRESSION };
        assert!(evaluate_with_features(&sess, "1", off).is_err());
    }
}
