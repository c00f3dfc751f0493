//! Statement grammar.
//!
//! - `mod.rs`: module root, options, blocks and statements
//! - `expr.rs`: expressions, from conditionals down to primaries

mod expr;

use crate::{ParseError, Parser};
use rill_ir::{
    BinaryOp, Block, CompoundOp, Expr, ExprKind, FunctionDef, Module, ModuleOptions, Name, Param,
    Stmt, StmtKind, TokenKind, MAX_PARAMS,
};
use rill_stack::ensure_sufficient_stack;

impl Parser<'_, '_> {
    pub(crate) fn module(&mut self) -> Result<Module, ParseError> {
        let line = self.line();
        self.skip_separators()?;
        let options = self.options()?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.statement()?);
            self.statement_end()?;
            if self.at_block_end() && !self.check(&TokenKind::Eof) {
                return Err(self.expected("a statement", "at top level"));
            }
        }
        tracing::trace!(statements = stmts.len(), "parsed module");
        Ok(Module {
            options,
            body: Block::new(stmts, line),
        })
    }

    fn options(&mut self) -> Result<ModuleOptions, ParseError> {
        let mut options = ModuleOptions::default();
        while self.accept(&TokenKind::Option)? {
            if !self.accept(&TokenKind::Debug)? {
                return Err(self.invalid(format!(
                    "invalid option: expected \"debug\" but got {}",
                    self.kind().describe()
                )));
            }
            let mut value = true;
            if self.accept(&TokenKind::Assign)? {
                if self.accept(&TokenKind::False)? {
                    value = false;
                } else if !self.accept(&TokenKind::True)? {
                    return Err(
                        self.invalid("option value should be \"true\" (default) or \"false\"")
                    );
                }
            }
            options.debug = Some(value);
            self.skip_separators()?;
        }
        Ok(options)
    }

    /// Tokens that close the enclosing block without a separator.
    fn at_block_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::End
                | TokenKind::Else
                | TokenKind::Elsif
                | TokenKind::Until
                | TokenKind::Eof
        )
    }

    fn at_statement_end(&self) -> bool {
        self.token.is_separator() || self.at_block_end()
    }

    /// Statements are followed by a separator unless a block closes on the
    /// same line.
    fn statement_end(&mut self) -> Result<(), ParseError> {
        if self.token.is_separator() {
            self.skip_separators()
        } else if self.at_block_end() {
            Ok(())
        } else {
            Err(self.expected("a new line or \";\"", "after statement"))
        }
    }

    /// Parse statements up to (not including) one of `closers`.
    fn block_until(
        &mut self,
        closers: &[TokenKind],
        context: &'static str,
    ) -> Result<Block, ParseError> {
        let line = self.line();
        self.skip_separators()?;
        let mut stmts = Vec::new();
        loop {
            if closers.iter().any(|closer| self.check(closer)) {
                return Ok(Block::new(stmts, line));
            }
            if self.at_block_end() {
                return Err(self.expected(format!("\"{}\"", closers[0].spelling()), context));
            }
            stmts.push(self.statement()?);
            self.statement_end()?;
        }
    }

    /// `... end`, consuming the `end`.
    fn block(&mut self, context: &'static str) -> Result<Block, ParseError> {
        let body = self.block_until(&[TokenKind::End], context)?;
        self.expect(&TokenKind::End, context)?;
        Ok(body)
    }

    fn ident(&mut self, context: &'static str) -> Result<Name, ParseError> {
        if let TokenKind::Ident(name) = self.kind() {
            let name = name.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.expected("an identifier", context))
        }
    }

    pub(crate) fn statement(&mut self) -> Result<Stmt, ParseError> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let start = self.start();
        let keyword = self.kind().clone();

        let kind = match keyword {
            TokenKind::Print => {
                self.advance()?;
                self.print_statement()?
            }
            TokenKind::Local => {
                self.advance()?;
                self.skip_newlines()?;
                if self.accept(&TokenKind::Function)? {
                    StmtKind::Function {
                        def: self.function_declaration(line)?,
                        local: true,
                    }
                } else {
                    self.declaration()?
                }
            }
            TokenKind::If => {
                self.advance()?;
                self.if_statement()?
            }
            TokenKind::While => {
                self.advance()?;
                let cond = self.expression()?;
                self.expect(&TokenKind::Do, "in \"while\" loop")?;
                let body = self.block("in \"while\" loop")?;
                StmtKind::While { cond, body }
            }
            TokenKind::Repeat => {
                self.advance()?;
                let body = self.block_until(&[TokenKind::Until], "in \"repeat\" loop")?;
                self.expect(&TokenKind::Until, "in \"repeat\" loop")?;
                let cond = self.expression()?;
                StmtKind::Repeat { body, cond }
            }
            TokenKind::For => {
                self.advance()?;
                self.for_statement()?
            }
            TokenKind::Foreach => {
                self.advance()?;
                self.foreach_statement()?
            }
            TokenKind::Function => {
                self.advance()?;
                StmtKind::Function {
                    def: self.function_declaration(line)?,
                    local: false,
                }
            }
            TokenKind::Return => {
                self.advance()?;
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expression()?))
                }
            }
            TokenKind::Break => {
                self.advance()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                StmtKind::Continue
            }
            TokenKind::Pass => {
                self.advance()?;
                StmtKind::Pass
            }
            TokenKind::Assert => {
                self.advance()?;
                let cond = self.expression()?;
                let message = if self.accept(&TokenKind::Comma)? {
                    Some(self.expression()?)
                } else {
                    None
                };
                StmtKind::Assert { cond, message }
            }
            TokenKind::Throw => {
                self.advance()?;
                StmtKind::Throw(self.expression()?)
            }
            TokenKind::Do => {
                self.advance()?;
                StmtKind::Block(self.block("in \"do\" block")?)
            }
            TokenKind::Debug => {
                self.advance()?;
                if self.accept(&TokenKind::Eol)? {
                    StmtKind::Debug(self.block("in \"debug\" block")?)
                } else {
                    let stmt = self.statement()?;
                    StmtKind::Debug(Block::new(vec![stmt], line))
                }
            }
            _ => self.expression_statement()?,
        };

        Ok(Stmt::new(kind, line, self.span_from(start)))
    }

    fn print_statement(&mut self) -> Result<StmtKind, ParseError> {
        let mut args = Vec::new();
        let mut newline = true;
        if !self.at_statement_end() {
            args.push(self.expression()?);
            while self.accept(&TokenKind::Comma)? {
                if self.at_statement_end() {
                    newline = false;
                    break;
                }
                args.push(self.expression()?);
            }
        }
        Ok(StmtKind::Print { args, newline })
    }

    fn declaration(&mut self) -> Result<StmtKind, ParseError> {
        const CONTEXT: &str = "in variable declaration";
        let mut names = vec![self.ident(CONTEXT)?];
        while self.accept(&TokenKind::Comma)? {
            names.push(self.ident(CONTEXT)?);
        }

        let mut values = Vec::new();
        if self.accept(&TokenKind::Assign)? {
            values.push(self.expression()?);
            while self.accept(&TokenKind::Comma)? {
                values.push(self.expression()?);
            }
            if values.len() != names.len() {
                return Err(self.invalid(format!(
                    "invalid declaration: {} name(s) but {} value(s)",
                    names.len(),
                    values.len()
                )));
            }
        }
        Ok(StmtKind::Local { names, values })
    }

    fn if_statement(&mut self) -> Result<StmtKind, ParseError> {
        const CONTEXT: &str = "in \"if\" statement";
        let closers = [TokenKind::End, TokenKind::Elsif, TokenKind::Else];
        let mut branches = Vec::new();

        let cond = self.expression()?;
        self.expect(&TokenKind::Then, CONTEXT)?;
        branches.push((cond, self.block_until(&closers, CONTEXT)?));

        while self.accept(&TokenKind::Elsif)? {
            let cond = self.expression()?;
            self.expect(&TokenKind::Then, "in \"elsif\" condition")?;
            branches.push((cond, self.block_until(&closers, CONTEXT)?));
        }

        let else_block = if self.accept(&TokenKind::Else)? {
            Some(self.block_until(&[TokenKind::End], CONTEXT)?)
        } else {
            None
        };
        self.expect(&TokenKind::End, CONTEXT)?;

        Ok(StmtKind::If {
            branches,
            else_block,
        })
    }

    fn for_statement(&mut self) -> Result<StmtKind, ParseError> {
        const CONTEXT: &str = "in \"for\" loop";
        let var = self.ident(CONTEXT)?;
        self.expect(&TokenKind::Assign, CONTEXT)?;
        let start = self.expression()?;

        let descending = if self.accept(&TokenKind::To)? {
            false
        } else if self.accept(&TokenKind::Downto)? {
            true
        } else {
            return Err(self.expected("\"to\" or \"downto\"", CONTEXT));
        };
        let end = self.expression()?;

        let step = if self.accept(&TokenKind::Step)? {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Do, CONTEXT)?;
        let body = self.block(CONTEXT)?;

        Ok(StmtKind::For {
            var,
            start,
            end,
            step,
            descending,
            body,
        })
    }

    fn foreach_statement(&mut self) -> Result<StmtKind, ParseError> {
        const CONTEXT: &str = "in \"foreach\" loop";
        let first_by_ref = self.accept(&TokenKind::Ref)?;
        let first = self.ident(CONTEXT)?;

        let (key, value, by_ref) = if self.accept(&TokenKind::Comma)? {
            if first_by_ref {
                return Err(self.invalid("key in \"foreach\" loop cannot be taken by reference"));
            }
            let by_ref = self.accept(&TokenKind::Ref)?;
            (Some(first), self.ident(CONTEXT)?, by_ref)
        } else {
            (None, first, first_by_ref)
        };

        self.expect(&TokenKind::In, CONTEXT)?;
        // The loop always iterates over the collection in place.
        let collection = match self.expression()? {
            Expr {
                kind: ExprKind::Ref(inner),
                ..
            } => *inner,
            other => other,
        };
        self.expect(&TokenKind::Do, CONTEXT)?;
        let body = self.block(CONTEXT)?;

        Ok(StmtKind::Foreach {
            key,
            value,
            by_ref,
            collection,
            body,
        })
    }

    fn function_declaration(&mut self, line: u32) -> Result<FunctionDef, ParseError> {
        const CONTEXT: &str = "in function declaration";
        let name = self.ident(CONTEXT)?;
        self.expect(&TokenKind::LParen, CONTEXT)?;
        let params = self.parameters()?;
        let body = self.block(CONTEXT)?;
        Ok(FunctionDef {
            name: Some(name),
            params,
            body,
            line,
        })
    }

    /// Parameter list after the opening parenthesis.
    pub(crate) fn parameters(&mut self) -> Result<Vec<Param>, ParseError> {
        const CONTEXT: &str = "in parameter list";
        let mut params = Vec::new();
        self.skip_newlines()?;
        if self.accept(&TokenKind::RParen)? {
            return Ok(params);
        }
        loop {
            let line = self.line();
            let by_ref = self.accept(&TokenKind::Ref)?;
            let name = self.ident(CONTEXT)?;
            if params.iter().any(|p: &Param| p.name == name) {
                return Err(self.invalid(format!("duplicate parameter \"{name}\"")));
            }
            let ty = if self.accept(&TokenKind::As)? {
                Some(self.expression()?)
            } else {
                None
            };
            params.push(Param {
                name,
                by_ref,
                ty,
                line,
            });
            self.skip_newlines()?;
            if !self.accept(&TokenKind::Comma)? {
                break;
            }
            self.skip_newlines()?;
        }
        if params.len() > MAX_PARAMS {
            return Err(self.invalid(format!(
                "a function cannot have more than {MAX_PARAMS} parameters"
            )));
        }
        self.expect(&TokenKind::RParen, CONTEXT)?;
        Ok(params)
    }

    fn expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let target = self.expression()?;

        let op = match self.kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(CompoundOp::Arith(BinaryOp::Add)),
            TokenKind::MinusAssign => Some(CompoundOp::Arith(BinaryOp::Sub)),
            TokenKind::StarAssign => Some(CompoundOp::Arith(BinaryOp::Mul)),
            TokenKind::SlashAssign => Some(CompoundOp::Arith(BinaryOp::Div)),
            TokenKind::CaretAssign => Some(CompoundOp::Arith(BinaryOp::Pow)),
            TokenKind::PercentAssign => Some(CompoundOp::Arith(BinaryOp::Mod)),
            TokenKind::AmpAssign => Some(CompoundOp::Concat),
            _ => return Ok(StmtKind::Expr(target)),
        };

        if !target.is_place() {
            return Err(self.invalid("cannot assign to this expression"));
        }
        self.advance()?;
        let value = self.expression()?;
        Ok(StmtKind::Assign { target, op, value })
    }
}
