//! Expression AST definitions.

use crate::token::{FuncKind, OpToken};
use std::fmt;
use tally_interface::Span;

/// An expression.
#[derive(Debug)]
pub struct Expr<'ast> {
    pub span: Span,
    pub kind: ExprKind<'ast>,
}

/// A kind of expression.
#[derive(Debug)]
pub enum ExprKind<'ast> {
    /// A numeric constant: a literal, a named constant, or an evaluation
    /// result. This is the sole shape of a fully evaluated expression.
    Number(f64),

    /// A binary operation: `a + b`.
    Binary(&'ast Expr<'ast>, BinOp, &'ast Expr<'ast>),

    /// A function call: `sqrt(x)`.
    Call(Func, CallArgs<'ast>),

    /// A parenthesised sub-expression: `(a + b)`.
    ///
    /// Kept explicit so printers and diagnostics can preserve the user's
    /// grouping; evaluation passes straight through it.
    Paren(&'ast Expr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Returns the numeric value of this expression if it is fully evaluated.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ExprKind::Number(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a printer that formats the tree in compact prefix form, e.g.
    /// `add(1, mul(2, 3))`.
    pub fn display(&self) -> ExprDisplay<'_> {
        ExprDisplay(self)
    }
}

/// A binary operation.
#[derive(Clone, Copy, Debug)]
pub struct BinOp {
    pub span: Span,
    pub kind: BinOpKind,
}

/// A kind of binary operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`
    Pow,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.to_str())
    }
}

impl BinOpKind {
    /// Returns the string representation of the operator.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }

    /// Returns the name used by the tree printer.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
        }
    }

    /// Maps an operator token to the binary operation it denotes.
    pub const fn from_token(op: OpToken) -> Self {
        match op {
            OpToken::Plus => Self::Add,
            OpToken::Minus => Self::Sub,
            OpToken::Star => Self::Mul,
            OpToken::Slash => Self::Div,
            OpToken::Caret => Self::Pow,
        }
    }
}

/// A function identifier together with its source location.
#[derive(Clone, Copy, Debug)]
pub struct Func {
    pub span: Span,
    pub kind: FuncKind,
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.to_str())
    }
}

/// A function call argument list.
#[derive(Debug)]
pub struct CallArgs<'ast> {
    /// The span of the parenthesised list, including the parentheses.
    pub span: Span,
    /// The argument expressions, in source order.
    pub exprs: &'ast [&'ast Expr<'ast>],
}

impl<'ast> CallArgs<'ast> {
    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// Compact prefix printer for expression trees, created by
/// [`Expr::display`].
pub struct ExprDisplay<'ast>(&'ast Expr<'ast>);

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_expr(self.0, f)
    }
}

fn fmt_expr(expr: &Expr<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &expr.kind {
        ExprKind::Number(value) => write!(f, "{value}"),
        ExprKind::Binary(lhs, op, rhs) => {
            write!(f, "{}(", op.kind.name())?;
            fmt_expr(lhs, f)?;
            f.write_str(", ")?;
            fmt_expr(rhs, f)?;
            f.write_str(")")
        }
        ExprKind::Call(func, args) => {
            write!(f, "{func}(")?;
            for (i, arg) in args.exprs.iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                fmt_expr(arg, f)?;
            }
            f.write_str(")")
        }
        ExprKind::Paren(inner) => {
            f.write_str("paren(")?;
            fmt_expr(inner, f)?;
            f.write_str(")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arena;

    fn num<'a>(arena: &'a Arena, value: f64) -> &'a Expr<'a> {
        arena.alloc(Expr { span: Span::DUMMY, kind: ExprKind::Number(value) })
    }

    #[test]
    fn printer() {
        let arena = Arena::new();
        // 1 + 2 + (PI ^ 2) / 3, right-leaning like the original notation
        let pi = num(&arena, std::f64::consts::PI);
        let two = num(&arena, 2.0);
        let pow = arena.alloc(Expr {
            span: Span::DUMMY,
            kind: ExprKind::Binary(pi, BinOp { span: Span::DUMMY, kind: BinOpKind::Pow }, two),
        });
        let paren = arena.alloc(Expr { span: Span::DUMMY, kind: ExprKind::Paren(pow) });
        let div = arena.alloc(Expr {
            span: Span::DUMMY,
            kind: ExprKind::Binary(
                paren,
                BinOp { span: Span::DUMMY, kind: BinOpKind::Div },
                num(&arena, 3.0),
            ),
        });
        let add = arena.alloc(Expr {
            span: Span::DUMMY,
            kind: ExprKind::Binary(
                num(&arena, 1.0),
                BinOp { span: Span::DUMMY, kind: BinOpKind::Add },
                div,
            ),
        });
        assert_eq!(
            add.display().to_string(),
            format!("add(1, div(paren(pow({}, 2)), 3))", std::f64::consts::PI)
        );
    }

    #[test]
    fn call_printer() {
        let arena = Arena::new();
        let ten = num(&arena, 10.0);
        let args = arena.alloc_exprs([ten].into_iter());
        let call = Expr {
            span: Span::DUMMY,
            kind: ExprKind::Call(
                Func { span: Span::DUMMY, kind: crate::FuncKind::Ln },
                CallArgs { span: Span::DUMMY, exprs: args },
            ),
        };
        assert_eq!(call.display().to_string(), "ln(10)");
        assert!(call.as_number().is_none());
        assert_eq!(ten.as_number(), Some(10.0));
    }

    #[test]
    fn op_mapping() {
        assert_eq!(BinOpKind::from_token(OpToken::Plus), BinOpKind::Add);
        assert_eq!(BinOpKind::from_token(OpToken::Caret), BinOpKind::Pow);
        assert_eq!(BinOpKind::Pow.to_str(), "^");
        assert_eq!(BinOpKind::Sub.name(), "sub");
    }
}
