use crate::{PResult, Parser};
use tally_ast::{BinOp, BinOpKind, CallArgs, Expr, ExprKind, Func, token::TokenKind};

impl<'sess, 'ast> Parser<'sess, 'ast> {
    /// Parses an expression.
    ///
    /// Returns the root node; every node's span is the span of its defining
    /// token (the operator, the function identifier, the opening parenthesis,
    /// or the literal).
    #[tracing::instrument(name = "parse", level = "debug", skip_all)]
    pub fn parse_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        let expr = self.parse_add_expr()?;
        if !self.token.is_eof() {
            return self.unexpected();
        }
        tracing::debug!(ast = %expr.display(), "parsed");
        Ok(expr)
    }

    /// `AddExpr := MulExpr ( ('+' | '-') MulExpr )*`, left-associative.
    fn parse_add_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        let mut expr = self.parse_mul_expr()?;
        while let Some(kind) = self.eat_op(&[BinOpKind::Add, BinOpKind::Sub]) {
            let op = BinOp { span: self.prev_token.span, kind };
            let rhs = self.parse_mul_expr()?;
            expr = self.alloc(Expr { span: op.span, kind: ExprKind::Binary(expr, op, rhs) });
        }
        Ok(expr)
    }

    /// `MulExpr := PowExpr ( ('*' | '/') PowExpr )*`, left-associative.
    fn parse_mul_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        let mut expr = self.parse_pow_expr()?;
        while let Some(kind) = self.eat_op(&[BinOpKind::Mul, BinOpKind::Div]) {
            let op = BinOp { span: self.prev_token.span, kind };
            let rhs = self.parse_pow_expr()?;
            expr = self.alloc(Expr { span: op.span, kind: ExprKind::Binary(expr, op, rhs) });
        }
        Ok(expr)
    }

    /// `PowExpr := Unary ( '^' PowExpr )?`, right-associative:
    /// `2^3^2` parses as `2^(3^2)`.
    fn parse_pow_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        let expr = self.parse_unary_expr()?;
        if let Some(kind) = self.eat_op(&[BinOpKind::Pow]) {
            let op = BinOp { span: self.prev_token.span, kind };
            let rhs = self.parse_pow_expr()?;
            return Ok(self.alloc(Expr { span: op.span, kind: ExprKind::Binary(expr, op, rhs) }));
        }
        Ok(expr)
    }

    /// `Unary := ('+' | '-') Unary | Primary`.
    ///
    /// A sign binds tighter than `^`. Unary minus is lowered to
    /// `0 - operand` with the zero on the minus token's span, so evaluation
    /// needs no unary node; unary plus is discarded.
    fn parse_unary_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        if self.eat_op(&[BinOpKind::Add]).is_some() {
            return self.parse_unary_expr();
        }
        if self.eat_op(&[BinOpKind::Sub]).is_some() {
            let span = self.prev_token.span;
            let zero = self.alloc(Expr { span, kind: ExprKind::Number(0.0) });
            let operand = self.parse_unary_expr()?;
            let op = BinOp { span, kind: BinOpKind::Sub };
            return Ok(self.alloc(Expr { span, kind: ExprKind::Binary(zero, op, operand) }));
        }
        self.parse_primary_expr()
    }

    /// `Primary := Number | Const | Func '(' Expr (',' Expr)* ')' | '(' Expr ')'`.
    fn parse_primary_expr(&mut self) -> PResult<'sess, &'ast Expr<'ast>> {
        let span = self.token.span;
        match self.token.kind {
            TokenKind::Number(value) => {
                self.bump();
                Ok(self.alloc(Expr { span, kind: ExprKind::Number(value) }))
            }
            TokenKind::Const(kind) => {
                self.bump();
                Ok(self.alloc(Expr { span, kind: ExprKind::Number(kind.value()) }))
            }
            TokenKind::Func(kind) => {
                self.bump();
                let func = Func { span, kind };
                let args = self.parse_call_args()?;
                Ok(self.alloc(Expr { span, kind: ExprKind::Call(func, args) }))
            }
            TokenKind::OpenParen => {
                self.bump();
                let inner = self.parse_add_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                Ok(self.alloc(Expr { span, kind: ExprKind::Paren(inner) }))
            }
            _ => self.unexpected(),
        }
    }

    /// Parses a parenthesised, comma-separated argument list.
    ///
    /// The argument count is recorded as-is; arity checking is the
    /// evaluator's concern so that multi-argument functions stay
    /// representable.
    fn parse_call_args(&mut self) -> PResult<'sess, CallArgs<'ast>> {
        let open = self.token.span;
        self.expect(&TokenKind::OpenParen)?;
        let mut exprs = Vec::with_capacity(1);
        exprs.push(self.parse_add_expr()?);
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_add_expr()?);
        }
        self.expect(&TokenKind::CloseParen)?;
        let span = open.to(self.prev_token.span);
        Ok(CallArgs { span, exprs: self.arena.alloc_exprs(exprs) })
    }

    /// Consumes the current token if it is an operator denoting one of
    /// `kinds`, returning the operation.
    fn eat_op(&mut self, kinds: &[BinOpKind]) -> Option<BinOpKind> {
        let op = self.token.as_op()?;
        let kind = BinOpKind::from_token(op);
        if kinds.contains(&kind) {
            self.bump();
            Some(kind)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lexer, validate};
    use tally_ast::Arena;
    use tally_interface::{Session, source_map::FileName};

    /// Lexes, validates and parses `src`, returning the compact tree form.
    fn parse(src: &str) -> String {
        let sess = Session::builder().with_test_emitter().build();
        sess.source_map().new_source_file(FileName::Expr, src).unwrap();
        let tokens = Lexer::new(&sess, src).into_tokens();
        validate(&sess, sess.features(), &tokens).unwrap();
        let arena = Arena::new();
        let mut parser = Parser::new(&sess, &arena, tokens);
        let result = match parser.parse_expr() {
            Ok(expr) => expr.display().to_string(),
            Err(err) => {
                err.cancel();
                panic!(
                    "failed to parse {src:?}: {}",
                    sess.emitted_diagnostics().unwrap().0
                )
            }
        };
        result
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("1 + 2 * 3"), "add(1, mul(2, 3))");
        assert_eq!(parse("1 * 2 + 3"), "add(mul(1, 2), 3)");
        assert_eq!(parse("1 + 2 / 3 - 4"), "sub(add(1, div(2, 3)), 4)");
        assert_eq!(parse("2 * 3 ^ 2"), "mul(2, pow(3, 2))");
    }

    #[test]
    fn associativity() {
        // Additive and multiplicative layers lean left.
        assert_eq!(parse("1 - 2 - 3"), "sub(sub(1, 2), 3)");
        assert_eq!(parse("8 / 4 / 2"), "div(div(8, 4), 2)");
        // The power layer leans right.
        assert_eq!(parse("2 ^ 3 ^ 2"), "pow(2, pow(3, 2))");
    }

    #[test]
    fn parens_are_explicit() {
        assert_eq!(parse("(1 + 2) * 3"), "mul(paren(add(1, 2)), 3)");
        assert_eq!(parse("((1))"), "paren(paren(1))");
    }

    #[test]
    fn unary_lowering() {
        assert_eq!(parse("-4 + 2"), "add(sub(0, 4), 2)");
        assert_eq!(parse("+4"), "4");
        assert_eq!(parse("- -4"), "sub(0, sub(0, 4))");
        assert_eq!(parse("1 * -2"), "mul(1, sub(0, 2))");
        // A sign binds tighter than `^`: `-2^2` is `(-2)^2`.
        assert_eq!(parse("-2 ^ 2"), "pow(sub(0, 2), 2)");
    }

    #[test]
    fn constants_become_numbers() {
        assert_eq!(parse("PI"), std::f64::consts::PI.to_string());
        assert_eq!(
            parse("TAU / 2"),
            format!("div({}, 2)", std::f64::consts::TAU)
        );
    }

    #[test]
    fn calls() {
        assert_eq!(parse("sqrt(4)"), "sqrt(4)");
        assert_eq!(parse("sin(cos(1))"), "sin(cos(1))");
        assert_eq!(parse("ln(10) + log10(100)"), "add(ln(10), log10(100))");
        // Multi-argument lists parse; arity is checked at evaluation time.
        assert_eq!(parse("sqrt(1, 2)"), "sqrt(1, 2)");
    }

    #[test]
    fn reference_expression() {
        assert_eq!(
            parse("10.5 + 30 - sqrt(PI * 5.2) / 8"),
            format!("sub(add(10.5, 30), div(sqrt(mul({}, 5.2)), 8))", std::f64::consts::PI)
        );
    }

    #[test]
    fn spans_point_at_defining_tokens() {
        let src = "1 + sqrt(4)";
        let sess = Session::builder().with_test_emitter().build();
        let tokens = Lexer::new(&sess, src).into_tokens();
        validate(&sess, sess.features(), &tokens).unwrap();
        let arena = Arena::new();
        let mut parser = Parser::new(&sess, &arena, tokens);
        let expr = parser.parse_expr().map_err(|e| e.cancel()).unwrap();
        // Root is the `+` at offset 2.
        assert_eq!(expr.span.to_range(), 2..3);
        let ExprKind::Binary(lhs, op, rhs) = &expr.kind else { panic!("not a binary node") };
        assert_eq!(op.span.to_range(), 2..3);
        assert_eq!(lhs.span.to_range(), 0..1);
        // The call node sits on the function identifier.
        assert_eq!(rhs.span.to_range(), 4..8);
        let ExprKind::Call(func, args) = &rhs.kind else { panic!("not a call node") };
        assert_eq!(func.span.to_range(), 4..8);
        // The argument list span covers the parentheses.
        assert_eq!(args.span.to_range(), 8..11);
    }

    #[test]
    fn every_span_is_in_bounds() {
        let src = "-(10.5 + 30) - sqrt(PI * 5.2) ^ 2 / 8";
        let sess = Session::builder().with_test_emitter().build();
        let tokens = Lexer::new(&sess, src).into_tokens();
        validate(&sess, sess.features(), &tokens).unwrap();
        let arena = Arena::new();
        let mut parser = Parser::new(&sess, &arena, tokens);
        let expr = parser.parse_expr().map_err(|e| e.cancel()).unwrap();
        assert_eq!(tally_ast::visit::first_out_of_bounds_span(expr, src.len()), None);
    }
}
