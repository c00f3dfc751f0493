//! Expression grammar, lowest precedence first:
//!
//! conditional, `or`, `and`, `not`, comparison, additive or `&` chain,
//! multiplicative, unary minus, `^`, postfix (`.name`, `[i]`, `(args)`),
//! `ref` and function literals, primaries.

use crate::{ParseError, Parser};
use rill_ir::{BinaryOp, Expr, ExprKind, FunctionDef, LogicalOp, TokenKind, UnaryOp};
use rill_stack::ensure_sufficient_stack;

impl Parser<'_, '_> {
    pub(crate) fn expression(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.conditional())
    }

    fn make(&self, kind: ExprKind, line: u32, start: u32) -> Expr {
        Expr::new(kind, line, self.span_from(start))
    }

    /// `then_expr if cond else else_expr`
    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let then_expr = self.or()?;
        if !self.accept(&TokenKind::If)? {
            return Ok(then_expr);
        }
        let cond = self.expression()?;
        self.expect(&TokenKind::Else, "in conditional expression")?;
        let else_expr = self.expression()?;
        Ok(self.make(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            line,
            start,
        ))
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let left = self.and()?;
        if !self.accept(&TokenKind::Or)? {
            return Ok(left);
        }
        self.skip_newlines()?;
        let right = self.or()?;
        Ok(self.make(
            ExprKind::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
            start,
        ))
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let left = self.not()?;
        if !self.accept(&TokenKind::And)? {
            return Ok(left);
        }
        self.skip_newlines()?;
        let right = self.and()?;
        Ok(self.make(
            ExprKind::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
            start,
        ))
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        if !self.accept(&TokenKind::Not)? {
            return self.comparison();
        }
        let operand = ensure_sufficient_stack(|| self.not())?;
        Ok(self.make(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            line,
            start,
        ))
    }

    /// Comparisons do not chain: `a < b < c` is a syntax error.
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let left = self.additive()?;
        let Some(op) = comparison_op(self.kind()) else {
            return Ok(left);
        };
        self.advance()?;
        let right = self.additive()?;
        if comparison_op(self.kind()).is_some() {
            return Err(self.invalid("comparison operators cannot be chained"));
        }
        Ok(self.make(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
            start,
        ))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let mut left = self.multiplicative()?;

        if self.accept(&TokenKind::Amp)? {
            let mut parts = vec![left];
            loop {
                self.skip_newlines()?;
                parts.push(self.multiplicative()?);
                if !self.accept(&TokenKind::Amp)? {
                    break;
                }
            }
            return Ok(self.make(ExprKind::Concat(parts), line, start));
        }

        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.multiplicative()?;
            left = self.make(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
                start,
            );
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let mut left = self.signed()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.signed()?;
            left = self.make(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
                start,
            );
        }
    }

    /// Unary minus. Negated numeric literals are folded into constants.
    fn signed(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        if !self.accept(&TokenKind::Minus)? {
            return self.exponential();
        }

        // i64::MIN has no positive counterpart.
        if let TokenKind::Int(n) = self.kind() {
            if *n == i64::MIN.unsigned_abs() {
                self.advance()?;
                if self.check(&TokenKind::Caret) {
                    return Err(self.invalid("integer literal is too large"));
                }
                return Ok(self.make(ExprKind::Int(i64::MIN), line, start));
            }
        }

        let operand = self.exponential()?;
        let kind = match operand.kind {
            ExprKind::Int(n) => ExprKind::Int(-n),
            ExprKind::Float(x) => ExprKind::Float(-x),
            _ => ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
        };
        Ok(self.make(kind, line, start))
    }

    /// `^` is left-associative.
    fn exponential(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let mut left = self.postfix()?;
        while self.accept(&TokenKind::Caret)? {
            let right = self.postfix()?;
            left = self.make(
                ExprKind::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
                start,
            );
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let mut expr = self.prefix()?;
        loop {
            let kind = if self.accept(&TokenKind::Dot)? {
                let name = self.ident("after \".\"")?;
                ExprKind::Field {
                    object: Box::new(expr),
                    name,
                }
            } else if self.accept(&TokenKind::LBracket)? {
                let indices = self.comma_list(&TokenKind::RBracket, "in index")?;
                if indices.is_empty() {
                    return Err(self.invalid("empty index"));
                }
                ExprKind::Index {
                    object: Box::new(expr),
                    indices,
                }
            } else if self.accept(&TokenKind::LParen)? {
                let args = self.comma_list(&TokenKind::RParen, "in argument list")?;
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                }
            } else {
                return Ok(expr);
            };
            expr = self.make(kind, line, start);
        }
    }

    /// `ref expr` and `function(params) ... end`.
    fn prefix(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        if self.accept(&TokenKind::Ref)? {
            let target = self.expression()?;
            return Ok(self.make(ExprKind::Ref(Box::new(target)), line, start));
        }
        if self.accept(&TokenKind::Function)? {
            const CONTEXT: &str = "in function literal";
            self.expect(&TokenKind::LParen, CONTEXT)?;
            let params = self.parameters()?;
            let body = self.block(CONTEXT)?;
            let def = FunctionDef {
                name: None,
                params,
                body,
                line,
            };
            return Ok(self.make(ExprKind::Function(Box::new(def)), line, start));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let (line, start) = (self.line(), self.start());
        let kind = match self.kind().clone() {
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::Str(text) => ExprKind::Str(text),
            TokenKind::Int(n) => match i64::try_from(n) {
                Ok(n) => ExprKind::Int(n),
                Err(_) => return Err(self.invalid("integer literal is too large")),
            },
            TokenKind::Float(bits) => ExprKind::Float(f64::from_bits(bits)),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Nan => ExprKind::Nan,
            TokenKind::LBracket => {
                self.advance()?;
                let items = self.comma_list(&TokenKind::RBracket, "in list literal")?;
                return Ok(self.make(ExprKind::List(items), line, start));
            }
            TokenKind::At => {
                self.advance()?;
                self.expect(&TokenKind::LBracket, "in array literal")?;
                let kind = self.array_literal()?;
                return Ok(self.make(kind, line, start));
            }
            TokenKind::LBrace => {
                self.advance()?;
                let kind = self.brace_literal()?;
                return Ok(self.make(kind, line, start));
            }
            TokenKind::LParen => {
                self.advance()?;
                self.skip_newlines()?;
                let inner = self.expression()?;
                self.skip_newlines()?;
                self.expect(&TokenKind::RParen, "in parenthesized expression")?;
                return Ok(inner);
            }
            _ => return Err(self.expected("an expression", "here")),
        };
        self.advance()?;
        Ok(self.make(kind, line, start))
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    /// Newlines between items are ignored.
    fn comma_list(
        &mut self,
        close: &TokenKind,
        context: &'static str,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        self.skip_newlines()?;
        if self.accept(close)? {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            self.skip_newlines()?;
            if !self.accept(&TokenKind::Comma)? {
                break;
            }
            self.skip_newlines()?;
            if self.check(close) {
                break;
            }
        }
        self.expect(close, context)?;
        Ok(items)
    }

    /// `@[a, b; c, d]` after the opening bracket. Rows are separated by `;`
    /// and must all have the same length.
    fn array_literal(&mut self) -> Result<ExprKind, ParseError> {
        const CONTEXT: &str = "in array literal";
        self.skip_newlines()?;
        if self.accept(&TokenKind::RBracket)? {
            return Ok(ExprKind::Array {
                items: Vec::new(),
                rows: 0,
                cols: 0,
            });
        }

        let mut items = Vec::new();
        let mut cols: Option<usize> = None;
        let mut row_len = 0;
        loop {
            items.push(self.expression()?);
            row_len += 1;
            self.skip_newlines()?;
            if self.accept(&TokenKind::Comma)? {
                self.skip_newlines()?;
                continue;
            }
            let row_done = self.check(&TokenKind::Semicolon);
            if row_done || self.check(&TokenKind::RBracket) {
                if cols.is_some_and(|n| n != row_len) {
                    return Err(self.invalid("inconsistent number of columns in array literal"));
                }
                cols = Some(row_len);
                row_len = 0;
            }
            if !row_done {
                break;
            }
            self.advance()?;
            self.skip_newlines()?;
        }
        self.expect(&TokenKind::RBracket, CONTEXT)?;

        let cols = cols.unwrap_or(0);
        let rows = if cols == 0 { 0 } else { items.len() / cols };
        Ok(ExprKind::Array { items, rows, cols })
    }

    /// `{}` and `{k: v, ...}` are tables, `{a, b}` is a set.
    fn brace_literal(&mut self) -> Result<ExprKind, ParseError> {
        const CONTEXT: &str = "in table literal";
        self.skip_newlines()?;
        if self.accept(&TokenKind::RBrace)? {
            return Ok(ExprKind::Table(Vec::new()));
        }

        let first = self.expression()?;
        if !self.accept(&TokenKind::Colon)? {
            self.skip_newlines()?;
            let mut items = vec![first];
            if self.accept(&TokenKind::Comma)? {
                items.extend(self.comma_list(&TokenKind::RBrace, "in set literal")?);
            } else {
                self.expect(&TokenKind::RBrace, "in set literal")?;
            }
            return Ok(ExprKind::Set(items));
        }

        let mut entries = vec![(first, self.expression()?)];
        loop {
            self.skip_newlines()?;
            if !self.accept(&TokenKind::Comma)? {
                break;
            }
            self.skip_newlines()?;
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let key = self.expression()?;
            self.expect(&TokenKind::Colon, CONTEXT)?;
            entries.push((key, self.expression()?));
        }
        self.expect(&TokenKind::RBrace, CONTEXT)?;
        Ok(ExprKind::Table(entries))
    }
}

fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::Spaceship => BinaryOp::Compare,
        _ => return None,
    })
}
