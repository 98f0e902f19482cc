//! Post-order AST evaluation.

use crate::EResult;
use tally_ast::{Arena, Expr, ExprKind};
use tally_config::Stage;
use tally_interface::{Session, Span, diagnostics::codes};

/// Tree-walking expression evaluator.
///
/// Reduces an AST to a single number node, post-order, left child first.
/// Every intermediate result is a fresh node in the arena carrying the span
/// of the node that produced it, so downstream diagnostics keep pointing into
/// the source; the input AST is never folded in place.
pub struct Evaluator<'sess, 'ast> {
    /// The evaluation context.
    pub sess: &'sess Session,
    /// The arena the results are allocated in, shared with the parser.
    pub arena: &'ast Arena,
}

impl<'sess, 'ast> Evaluator<'sess, 'ast> {
    /// Creates a new evaluator.
    pub fn new(sess: &'sess Session, arena: &'ast Arena) -> Self {
        Self { sess, arena }
    }

    /// Evaluates an expression to a number node.
    ///
    /// NaN and infinity propagate as values; the only evaluation-time errors
    /// are division by an exact zero and argument-count mismatches.
    pub fn eval(&self, expr: &'ast Expr<'ast>) -> EResult<'sess, &'ast Expr<'ast>> {
        match &expr.kind {
            ExprKind::Number(_) => Ok(expr),

            ExprKind::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                let l = self.number(lhs)?;
                let r = self.number(rhs)?;
                let value = match op.kind {
                    tally_ast::BinOpKind::Add => l + r,
                    tally_ast::BinOpKind::Sub => l - r,
                    tally_ast::BinOpKind::Mul => l * r,
                    tally_ast::BinOpKind::Div => {
                        if r == 0.0 {
                            return Err(self
                                .sess
                                .dcx
                                .err("division by zero")
                                .code(codes::DIVIDE_BY_ZERO)
                                .stage(Stage::Eval)
                                .span(rhs.span)
                                .span_label(rhs.span, "the divisor evaluates to zero"));
                        }
                        l / r
                    }
                    tally_ast::BinOpKind::Pow => l.powf(r),
                };
                Ok(self.constant(expr.span, value))
            }

            ExprKind::Call(func, args) => {
                let arity = func.kind.arity();
                if args.len() != arity {
                    let n = args.len();
                    return Err(self
                        .sess
                        .dcx
                        .err(format!(
                            "function `{func}` takes {arity} argument, {n} were given"
                        ))
                        .code(codes::FUNCTION_WRONG_ARITY)
                        .stage(Stage::Eval)
                        .span(args.span)
                        .span_label(func.span, "this function"));
                }
                let arg = self.eval(args.exprs[0])?;
                let value = func.kind.apply(self.number(arg)?);
                Ok(self.constant(expr.span, value))
            }

            ExprKind::Paren(inner) => {
                let inner = self.eval(inner)?;
                let value = self.number(inner)?;
                Ok(self.constant(expr.span, value))
            }
        }
    }

    /// Allocates a result node on the given span.
    fn constant(&self, span: Span, value: f64) -> &'ast Expr<'ast> {
        self.arena.alloc(Expr { span, kind: ExprKind::Number(value) })
    }

    /// Reads the value out of an evaluated node.
    fn number(&self, expr: &'ast Expr<'ast>) -> EResult<'sess, f64> {
        expr.as_number().ok_or_else(|| {
            self.sess
                .dcx
                .err("evaluation produced a non-constant node")
                .code(codes::INTERNAL)
                .stage(Stage::Eval)
                .span(expr.span)
        })
    }
}
