//! Abstract syntax tree for Tryp.
//!
//! Two closed sum types, `Expr` and `Stmt`, walked by exhaustive `match` in
//! the resolver, the interpreter and the printer; adding a variant breaks
//! every pass at compile time, which is the point.
//!
//! Nodes that name a binding (`Variable`, `Assign`, `This`, `Super`) carry an
//! [`ExprId`]: a parser-assigned id, unique for the lifetime of a session,
//! that keys the resolver's depth side-table. Identity lives in the id, not
//! in structural equality — two occurrences of `x` on one line are distinct
//! nodes with distinct ids.

use std::rc::Rc;

use crate::token::Token;

/// Reserved name the parser gives a constructor (a method named like its
/// class). `$` cannot appear in user identifiers, so no user method can
/// collide with it.
pub const INIT_METHOD: &str = "$init";

/// Stable identity of a binding-referencing expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// A literal constant appearing directly in the source. The parser copies
/// the value out of the token so the AST owns its leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

/// An expression node. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Variable read.
    Variable { id: ExprId, name: Token },

    /// `name <- value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix arithmetic/comparison/equality.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting `&&` / `||`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Prefix `!` or `-`.
    Unary { operator: Token, right: Box<Expr> },

    /// Parenthesised sub-expression.
    Grouping(Box<Expr>),

    /// `cond ? then : else`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Call expression; `paren` is the opening `(`, kept for error locations.
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name <- value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `\ (params) -> { body }`; shares the proc declaration shape so the
    /// runtime treats lambdas and named procs identically.
    Lambda(Rc<ProcDecl>),

    /// `this` inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `a, b, c` — evaluates left to right, value is the last expression.
    Compound(Vec<Expr>),
}

/// A statement node. A program is a `Vec<Stmt>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Block(Vec<Stmt>),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Procedure declaration. `Rc` so closures can share the declaration
    /// with the AST instead of cloning the body.
    Proc(Rc<ProcDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present; typed as `Expr` so the
        /// resolver and interpreter evaluate it like any other read.
        superclass: Option<Expr>,
        methods: Vec<Rc<ProcDecl>>,
    },
}

/// Shared declaration shape for named procs, methods and lambdas.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
    pub is_static: bool,
}

impl ProcDecl {
    pub fn is_initializer(&self) -> bool {
        self.name.text == INIT_METHOD
    }
}
