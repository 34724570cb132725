//! Recursive-descent parser.
//!
//! One method per grammar rule, precedence encoded in the call chain:
//!
//! ```text
//! expression -> compound -> assignment -> ternary -> or -> and
//!            -> equality -> comparison -> term -> factor -> unary
//!            -> call -> primary
//! ```
//!
//! Error recovery is per statement: a parse error is printed when raised
//! (through the [`Reporter`]) and the caller [`Parser::sync`]s to the next
//! statement boundary, so a broken file yields every diagnostic it can.
//!
//! `include "file";` is handled here rather than at runtime: the named file
//! is loaded through the [`SourceLoader`], lexed and parsed by a sub-parser
//! sharing this parser's context, and its statements are spliced in at the
//! include site. The context tracks resolved paths so a file included twice
//! in one run is an error instead of a double definition.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;
use std::{fs, io};

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, ProcDecl, Stmt, INIT_METHOD};
use crate::diag::Reporter;
use crate::error::{Result, TrypError};
use crate::lexer::Lexer;
use crate::token::{Keyword, Location, Operator, Token, TokenKind};

/// Where `include` gets its file contents from. Production uses [`FsLoader`];
/// tests substitute an in-memory map.
pub trait SourceLoader {
    fn load(&self, path: &str) -> io::Result<String>;

    /// Canonical form of `path` used for duplicate-include detection.
    fn resolve(&self, path: &str) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
    }
}

/// Loads includes from the real filesystem.
#[derive(Debug, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// In-memory loader for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.files.insert(name.into(), source.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file `{path}`"))
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

/// State shared between a parser and the sub-parsers it spawns for includes.
pub struct ParseCtx<'r> {
    pub reporter: &'r mut Reporter,
    pub loader: &'r dyn SourceLoader,
    /// Resolved paths already spliced in during this run.
    pub included: HashSet<PathBuf>,
    /// Session-wide node id counter; ids must stay unique across REPL
    /// inputs because closures keep earlier ASTs alive.
    pub next_id: &'r mut u32,
}

impl<'r> ParseCtx<'r> {
    /// `root` is the name the top-level source was loaded under. Its
    /// resolved path is seeded into `included` so a file that includes
    /// itself is rejected at the include site instead of being spliced in
    /// a second time.
    pub fn new(
        reporter: &'r mut Reporter,
        loader: &'r dyn SourceLoader,
        next_id: &'r mut u32,
        root: &str,
    ) -> Self {
        let mut included = HashSet::new();
        included.insert(loader.resolve(root));

        Self {
            reporter,
            loader,
            included,
            next_id,
        }
    }
}

pub struct Parser<'c, 'r> {
    ctx: &'c mut ParseCtx<'r>,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'c, 'r> Parser<'c, 'r> {
    pub fn new(ctx: &'c mut ParseCtx<'r>, tokens: Vec<Token>) -> Self {
        Self {
            ctx,
            tokens,
            pos: 0,
        }
    }

    /// Parse every statement, recovering at statement boundaries. The
    /// reporter's error count tells the caller whether the result is
    /// trustworthy.
    pub fn parse(mut self) -> Vec<Stmt> {
        info!("parsing {} tokens", self.tokens.len());

        let mut statements = Vec::new();
        while !self.at_end() {
            match self.declaration() {
                Ok(mut stmts) => statements.append(&mut stmts),
                Err(_) => self.sync(),
            }
        }
        statements
    }

    // ───────────────────────── token plumbing ───────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        if !self.at_end() {
            self.pos += 1;
        }
        self.previous().clone()
    }

    fn check_operator(&self, op: Operator) -> bool {
        self.peek().kind == TokenKind::Operator(op)
    }

    fn match_operator(&mut self, op: Operator) -> Option<Token> {
        if self.check_operator(op) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn match_operators(&mut self, ops: &[Operator]) -> Option<Token> {
        for &op in ops {
            if self.check_operator(op) {
                return Some(self.advance());
            }
        }
        None
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(kw)
    }

    fn match_keyword(&mut self, kw: Keyword) -> Option<Token> {
        if self.check_keyword(kw) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect_operator(&mut self, op: Operator, expected: &str) -> Result<Token> {
        match self.match_operator(op) {
            Some(token) => Ok(token),
            None => Err(self.error_expected(expected)),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<Token> {
        if matches!(self.peek().kind, TokenKind::Identifier) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(expected))
        }
    }

    /// Report and hand back an "expected X but found Y" error at the
    /// current token.
    fn error_expected(&mut self, expected: &str) -> TrypError {
        let found = self.peek().clone();
        self.ctx.reporter.expected_but_found(expected, &found)
    }

    fn next_id(&mut self) -> ExprId {
        let id = ExprId(*self.ctx.next_id);
        *self.ctx.next_id += 1;
        id
    }

    /// Skip forward to the most plausible start of the next statement.
    fn sync(&mut self) {
        debug!("recovering at {}", self.peek().loc);

        while !self.at_end() {
            self.advance();
            if self.previous().kind == TokenKind::Operator(Operator::Semicolon) {
                return;
            }
            match self.peek().kind {
                TokenKind::Keyword(
                    Keyword::Proc
                    | Keyword::Var
                    | Keyword::For
                    | Keyword::If
                    | Keyword::While
                    | Keyword::Return
                    | Keyword::Include,
                ) => return,
                _ => continue,
            }
        }
    }

    // ──────────────────────────── statements ────────────────────────────

    /// A declaration or statement. Returns a `Vec` because `include`
    /// expands to the statements of the included file.
    fn declaration(&mut self) -> Result<Vec<Stmt>> {
        if self.match_keyword(Keyword::Class).is_some() {
            return Ok(vec![self.class_decl()?]);
        }
        if self.match_keyword(Keyword::Proc).is_some() {
            return Ok(vec![self.proc_decl()?]);
        }
        if self.match_keyword(Keyword::Var).is_some() {
            return Ok(vec![self.var_decl()?]);
        }
        if self.match_keyword(Keyword::Include).is_some() {
            return self.include_decl();
        }
        Ok(vec![self.statement()?])
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_keyword(Keyword::If).is_some() {
            return self.if_stmt();
        }
        if self.match_keyword(Keyword::While).is_some() {
            return self.while_stmt();
        }
        if self.match_keyword(Keyword::For).is_some() {
            return self.for_stmt();
        }
        if let Some(keyword) = self.match_keyword(Keyword::Return) {
            return self.return_stmt(keyword);
        }
        if self.match_operator(Operator::OpenCurly).is_some() {
            return Ok(Stmt::Block(self.block()?));
        }

        let expr = self.expression()?;
        self.expect_operator(Operator::Semicolon, "`;` after expression")?;
        Ok(Stmt::Expression(expr))
    }

    /// Statements up to the closing `}`. Recovers internally so one bad
    /// statement does not drop the rest of the block.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check_operator(Operator::CloseCurly) && !self.at_end() {
            match self.declaration() {
                Ok(mut stmts) => statements.append(&mut stmts),
                Err(_) => self.sync(),
            }
        }
        self.expect_operator(Operator::CloseCurly, "`}` after block")?;
        Ok(statements)
    }

    fn var_decl(&mut self) -> Result<Stmt> {
        let name = self.expect_identifier("variable name after `var`")?;
        let initializer = if self.match_operator(Operator::Equal).is_some() {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect_operator(Operator::Semicolon, "`;` after variable declaration")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        self.expect_operator(Operator::OpenParen, "`(` after `if`")?;
        let condition = self.expression()?;
        self.expect_operator(Operator::CloseParen, "`)` after condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_keyword(Keyword::Else).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        self.expect_operator(Operator::OpenParen, "`(` after `while`")?;
        let condition = self.expression()?;
        self.expect_operator(Operator::CloseParen, "`)` after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for` has no AST node of its own; it desugars into a block holding
    /// the initializer and a `while` whose body runs the update last.
    fn for_stmt(&mut self) -> Result<Stmt> {
        self.expect_operator(Operator::OpenParen, "`(` after `for`")?;

        let initializer = if self.match_operator(Operator::Semicolon).is_some() {
            None
        } else if self.match_keyword(Keyword::Var).is_some() {
            Some(self.var_decl()?)
        } else {
            let expr = self.expression()?;
            self.expect_operator(Operator::Semicolon, "`;` after for initializer")?;
            Some(Stmt::Expression(expr))
        };

        let condition = if self.check_operator(Operator::Semicolon) {
            Expr::Literal(LiteralValue::True)
        } else {
            self.expression()?
        };
        self.expect_operator(Operator::Semicolon, "`;` after for condition")?;

        let update = if self.check_operator(Operator::CloseParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_operator(Operator::CloseParen, "`)` after for clauses")?;

        let body = self.statement()?;

        let mut loop_body = vec![body];
        if let Some(update) = update {
            loop_body.push(Stmt::Expression(update));
        }
        let while_stmt = Stmt::While {
            condition,
            body: Box::new(Stmt::Block(loop_body)),
        };

        Ok(match initializer {
            Some(init) => Stmt::Block(vec![init, while_stmt]),
            None => while_stmt,
        })
    }

    fn return_stmt(&mut self, keyword: Token) -> Result<Stmt> {
        let value = if self.check_operator(Operator::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_operator(Operator::Semicolon, "`;` after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn proc_decl(&mut self) -> Result<Stmt> {
        let name = self.expect_identifier("procedure name after `proc`")?;
        let params = self.parameters()?;
        self.expect_operator(Operator::OpenCurly, "`{` before procedure body")?;
        let body = self.block()?;

        Ok(Stmt::Proc(Rc::new(ProcDecl {
            name,
            params,
            body,
            is_static: false,
        })))
    }

    fn class_decl(&mut self) -> Result<Stmt> {
        let name = self.expect_identifier("class name after `class`")?;

        let superclass = if self.match_keyword(Keyword::Extends).is_some() {
            let super_name = self.expect_identifier("superclass name after `extends`")?;
            Some(Expr::Variable {
                id: self.next_id(),
                name: super_name,
            })
        } else {
            None
        };

        self.expect_operator(Operator::OpenCurly, "`{` before class body")?;

        let mut methods = Vec::new();
        while !self.check_operator(Operator::CloseCurly) && !self.at_end() {
            methods.push(self.method(&name.text)?);
        }
        self.expect_operator(Operator::CloseCurly, "`}` after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn method(&mut self, class_name: &str) -> Result<Rc<ProcDecl>> {
        let is_static = self.match_keyword(Keyword::Static).is_some();
        let mut name = self.expect_identifier("method name")?;

        // A method named like its class is the constructor; it gets the
        // reserved `$init` name so user code cannot call it directly.
        if name.text == class_name {
            name.text = INIT_METHOD.to_string();
        }

        let params = self.parameters()?;
        self.expect_operator(Operator::OpenCurly, "`{` before method body")?;
        let body = self.block()?;

        Ok(Rc::new(ProcDecl {
            name,
            params,
            body,
            is_static,
        }))
    }

    fn parameters(&mut self) -> Result<Vec<Token>> {
        self.expect_operator(Operator::OpenParen, "`(` before parameters")?;

        let mut params = Vec::new();
        if !self.check_operator(Operator::CloseParen) {
            loop {
                if params.len() >= 255 {
                    // Reported but not raised; parsing continues.
                    let loc = self.peek().loc.clone();
                    let _ = self
                        .ctx
                        .reporter
                        .parse_error(&loc, "Cannot have more than 255 parameters");
                }
                params.push(self.expect_identifier("parameter name")?);
                if self.match_operator(Operator::Comma).is_none() {
                    break;
                }
            }
        }

        self.expect_operator(Operator::CloseParen, "`)` after parameters")?;
        Ok(params)
    }

    /// `include "file";` — splice the parsed statements of the named file
    /// in at this point.
    fn include_decl(&mut self) -> Result<Vec<Stmt>> {
        let path_tok = match self.peek().kind {
            TokenKind::Str(_) => self.advance(),
            _ => return Err(self.error_expected("file name string after `include`")),
        };
        self.expect_operator(Operator::Semicolon, "`;` after include")?;

        let path = match &path_tok.kind {
            TokenKind::Str(s) => s.clone(),
            _ => String::new(),
        };

        let resolved = self.ctx.loader.resolve(&path);
        if !self.ctx.included.insert(resolved) {
            return Err(self
                .ctx
                .reporter
                .parse_error(&path_tok.loc, format!("File `{path}` is already included")));
        }

        let source = match self.ctx.loader.load(&path) {
            Ok(source) => source,
            Err(e) => {
                return Err(self
                    .ctx
                    .reporter
                    .parse_error(&path_tok.loc, format!("Cannot include `{path}`: {e}")))
            }
        };

        info!("including `{path}`");
        let tokens = match Lexer::new(&source, Location::start(&path)).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => {
                // Already a complete diagnostic; report it and raise for
                // recovery without reporting twice.
                self.ctx.reporter.report(&e);
                return Err(e);
            }
        };

        let sub = Parser::new(&mut *self.ctx, tokens);
        Ok(sub.parse())
    }

    // ──────────────────────────── expressions ───────────────────────────

    /// Full expression, including the `,` compound form.
    fn expression(&mut self) -> Result<Expr> {
        let first = self.assignment()?;
        if !self.check_operator(Operator::Comma) {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.match_operator(Operator::Comma).is_some() {
            exprs.push(self.assignment()?);
        }
        Ok(Expr::Compound(exprs))
    }

    const ASSIGN_OPS: &'static [Operator] = &[
        Operator::LeftArrow,
        Operator::PlusEqual,
        Operator::MinusEqual,
        Operator::StarEqual,
        Operator::SlashEqual,
        Operator::PercentEqual,
    ];

    fn assignment(&mut self) -> Result<Expr> {
        let target = self.ternary()?;

        let Some(op_tok) = self.match_operators(Self::ASSIGN_OPS) else {
            return Ok(target);
        };
        let value = self.assignment()?;

        let base = match op_tok.kind {
            TokenKind::Operator(op) => op.compound_base(),
            _ => None,
        };

        // `x += e` desugars to `x <- x + e`; the duplicated target means a
        // `Get` target is evaluated twice, matching one read and one write.
        let rhs = match base {
            Some(base_op) => Expr::Binary {
                left: Box::new(target.clone()),
                operator: Token::new(
                    TokenKind::Operator(base_op),
                    base_op.text(),
                    op_tok.loc.clone(),
                ),
                right: Box::new(value),
            },
            None => value,
        };

        match target {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.next_id(),
                name,
                value: Box::new(rhs),
            }),
            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value: Box::new(rhs),
            }),
            _ => Err(self
                .ctx
                .reporter
                .parse_error(&op_tok.loc, "Invalid assignment target")),
        }
    }

    fn ternary(&mut self) -> Result<Expr> {
        let expr = self.or()?;
        if self.match_operator(Operator::Question).is_none() {
            return Ok(expr);
        }

        let then_expr = self.ternary()?;
        self.expect_operator(Operator::Colon, "`:` in conditional expression")?;
        let else_expr = self.ternary()?;

        Ok(Expr::Ternary {
            condition: Box::new(expr),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;
        while let Some(operator) = self.match_operator(Operator::OrOr) {
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;
        while let Some(operator) = self.match_operator(Operator::AndAnd) {
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;
        while let Some(operator) =
            self.match_operators(&[Operator::EqualEqual, Operator::BangEqual])
        {
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;
        while let Some(operator) = self.match_operators(&[
            Operator::Greater,
            Operator::GreaterEqual,
            Operator::Less,
            Operator::LessEqual,
        ]) {
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;
        while let Some(operator) = self.match_operators(&[Operator::Plus, Operator::Minus]) {
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        while let Some(operator) =
            self.match_operators(&[Operator::Star, Operator::Slash, Operator::Percent])
        {
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(operator) = self.match_operators(&[Operator::Bang, Operator::Minus]) {
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if let Some(paren) = self.match_operator(Operator::OpenParen) {
                expr = self.finish_call(expr, paren)?;
            } else if self.match_operator(Operator::Dot).is_some() {
                let name = self.expect_identifier("property name after `.`")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Arguments parse at assignment level: inside an argument list `,`
    /// separates arguments instead of building a compound expression.
    fn finish_call(&mut self, callee: Expr, paren: Token) -> Result<Expr> {
        let mut args = Vec::new();
        if !self.check_operator(Operator::CloseParen) {
            loop {
                if args.len() >= 255 {
                    let loc = self.peek().loc.clone();
                    let _ = self
                        .ctx
                        .reporter
                        .parse_error(&loc, "Cannot have more than 255 arguments");
                }
                args.push(self.assignment()?);
                if self.match_operator(Operator::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_operator(Operator::CloseParen, "`)` after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Str(s)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::True))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::False))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Nil))
            }
            TokenKind::Keyword(Keyword::This) => {
                let keyword = self.advance();
                Ok(Expr::This {
                    id: self.next_id(),
                    keyword,
                })
            }
            TokenKind::Keyword(Keyword::Super) => {
                let keyword = self.advance();
                self.expect_operator(Operator::Dot, "`.` after `super`")?;
                let method = self.expect_identifier("superclass method name")?;
                Ok(Expr::Super {
                    id: self.next_id(),
                    keyword,
                    method,
                })
            }
            TokenKind::Identifier => {
                let name = self.advance();
                Ok(Expr::Variable {
                    id: self.next_id(),
                    name,
                })
            }
            TokenKind::Operator(Operator::OpenParen) => {
                self.advance();
                let expr = self.expression()?;
                self.expect_operator(Operator::CloseParen, "`)` after expression")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }
            TokenKind::Operator(Operator::Backslash) => self.lambda(),
            _ => Err(self.error_expected("expression")),
        }
    }

    /// `\ (a, b) -> { ... }` — an anonymous proc; the `\` token stands in
    /// for the name.
    fn lambda(&mut self) -> Result<Expr> {
        let name = self.advance();
        let params = self.parameters()?;
        self.expect_operator(Operator::RightArrow, "`->` after lambda parameters")?;
        self.expect_operator(Operator::OpenCurly, "`{` before lambda body")?;
        let body = self.block()?;

        Ok(Expr::Lambda(Rc::new(ProcDecl {
            name,
            params,
            body,
            is_static: false,
        })))
    }
}
