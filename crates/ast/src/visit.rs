//! Expression AST visitor.

use crate::{Expr, ExprKind};
use std::ops::ControlFlow;
use tally_interface::Span;

/// Expression AST traversal.
///
/// Each method's default implementation recurses into children via the
/// matching `walk_*` function; implementors override only what they care
/// about. Returning [`ControlFlow::Break`] stops the traversal early.
pub trait Visit<'ast> {
    /// The value returned when the traversal breaks.
    type BreakValue;

    fn visit_expr(&mut self, expr: &'ast Expr<'ast>) -> ControlFlow<Self::BreakValue> {
        walk_expr(self, expr)
    }

    fn visit_span(&mut self, _span: Span) -> ControlFlow<Self::BreakValue> {
        ControlFlow::Continue(())
    }
}

/// Recurses into the children of `expr`, visiting every span along the way.
pub fn walk_expr<'ast, V: Visit<'ast> + ?Sized>(
    visitor: &mut V,
    expr: &'ast Expr<'ast>,
) -> ControlFlow<V::BreakValue> {
    visitor.visit_span(expr.span)?;
    match &expr.kind {
        ExprKind::Number(_) => {}
        ExprKind::Binary(lhs, op, rhs) => {
            visitor.visit_expr(lhs)?;
            visitor.visit_span(op.span)?;
            visitor.visit_expr(rhs)?;
        }
        ExprKind::Call(func, args) => {
            visitor.visit_span(func.span)?;
            visitor.visit_span(args.span)?;
            for arg in args.exprs {
                visitor.visit_expr(arg)?;
            }
        }
        ExprKind::Paren(inner) => {
            visitor.visit_expr(inner)?;
        }
    }
    ControlFlow::Continue(())
}

/// Counts the nodes of an expression tree.
pub fn node_count(expr: &Expr<'_>) -> usize {
    struct Counter(usize);

    impl<'ast> Visit<'ast> for Counter {
        type BreakValue = std::convert::Infallible;

        fn visit_expr(&mut self, expr: &'ast Expr<'ast>) -> ControlFlow<Self::BreakValue> {
            self.0 += 1;
            walk_expr(self, expr)
        }
    }

    let mut counter = Counter(0);
    let _ = counter.visit_expr(expr);
    counter.0
}

/// Returns the span of the first node whose span does not lie within
/// `0..len`, if any. Every span a well-formed parse emits is in bounds.
pub fn first_out_of_bounds_span(expr: &Expr<'_>, len: usize) -> Option<Span> {
    struct Checker(usize);

    impl Visit<'_> for Checker {
        type BreakValue = Span;

        fn visit_span(&mut self, span: Span) -> ControlFlow<Span> {
            if span.hi().to_usize() > self.0 {
                ControlFlow::Break(span)
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    match Checker(len).visit_expr(expr) {
        ControlFlow::Break(span) => Some(span),
        ControlFlow::Continue(()) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, BinOp, BinOpKind, CallArgs, Func, FuncKind};
    use tally_interface::BytePos;

    fn sample(arena: &Arena) -> &Expr<'_> {
        // sqrt(1 + 2)
        let one = arena.alloc(Expr { span: sp(5, 6), kind: ExprKind::Number(1.0) });
        let two = arena.alloc(Expr { span: sp(9, 10), kind: ExprKind::Number(2.0) });
        let add = arena.alloc(Expr {
            span: sp(7, 8),
            kind: ExprKind::Binary(one, BinOp { span: sp(7, 8), kind: BinOpKind::Add }, two),
        });
        let args = arena.alloc_exprs([&*add].into_iter());
        arena.alloc(Expr {
            span: sp(0, 4),
            kind: ExprKind::Call(
                Func { span: sp(0, 4), kind: FuncKind::Sqrt },
                CallArgs { span: sp(4, 11), exprs: args },
            ),
        })
    }

    fn sp(lo: u32, hi: u32) -> Span {
        Span::new(BytePos(lo), BytePos(hi))
    }

    #[test]
    fn counts_nodes() {
        let arena = Arena::new();
        let expr = sample(&arena);
        // call + binary + two numbers
        assert_eq!(node_count(expr), 4);
    }

    #[test]
    fn bounds_checking() {
        let arena = Arena::new();
        let expr = sample(&arena);
        assert_eq!(first_out_of_bounds_span(expr, 11), None);
        let bad = first_out_of_bounds_span(expr, 9).unwrap();
        assert_eq!(bad.to_range(), 4..11);
    }
}
