//! Static resolution pass.
//!
//! Walks the AST between parsing and execution, computing for every local
//! binding reference how many environment frames separate the use from the
//! definition, and feeding each verdict into the interpreter's side-table.
//! Globals are deliberately left unresolved so they stay late-bound.
//!
//! The pass also enforces the static rules: no reading a local inside its
//! own initializer, no duplicate declaration in one scope, `return` only
//! inside procedures, `this`/`super` only inside classes, `super` only under
//! a superclass, no self-inheritance, and no local that is never read.
//! Errors go through the [`Reporter`] and never abort the walk, so one pass
//! reports everything it can find.
//!
//! Scope bookkeeping mirrors the interpreter's frame layout exactly: a scope
//! is pushed here iff a frame is created there (block, params, the hidden
//! `this` frame around method bodies, the hidden `super` frame around
//! subclass method tables). The hop counts only line up because the two
//! sides agree on this.

use std::collections::HashMap;
use std::mem;

use log::info;

use crate::ast::{Expr, ExprId, ProcDecl, Stmt};
use crate::diag::Reporter;
use crate::interpreter::Interpreter;
use crate::token::{Location, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcKind {
    None,
    Proc,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// What a scope entry was declared as; decides the unused-binding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Var,
    Param,
    /// Proc/class names and the hidden `this`/`super` bindings; exempt from
    /// the unused check.
    Exempt,
}

#[derive(Debug)]
struct VarState {
    kind: BindingKind,
    loc: Location,
    /// False while the initializer is still being resolved.
    defined: bool,
    used: bool,
}

pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    reporter: &'a mut Reporter,
    scopes: Vec<HashMap<String, VarState>>,
    current_proc: ProcKind,
    current_class: ClassKind,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter, reporter: &'a mut Reporter) -> Self {
        Self {
            interpreter,
            reporter,
            scopes: Vec::new(),
            current_proc: ProcKind::None,
            current_class: ClassKind::None,
        }
    }

    /// Resolve a whole program. Diagnostics accumulate in the reporter; the
    /// caller decides whether to run the program afterwards.
    pub fn resolve(mut self, statements: &[Stmt]) {
        info!("resolving {} top-level statements", statements.len());
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ──────────────────────── scope bookkeeping ─────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop a scope, flagging every `var`/parameter binding that was never
    /// read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for (name, state) in scope {
            if state.used || state.kind == BindingKind::Exempt {
                continue;
            }
            let what = match state.kind {
                BindingKind::Param => "Parameter",
                _ => "Local variable",
            };
            self.reporter
                .resolve_error(&state.loc, format!("{what} `{name}` is never used"));
        }
    }

    fn declare(&mut self, name: &Token, kind: BindingKind) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // global scope is unchecked
        };
        if scope.contains_key(&name.text) {
            self.reporter.resolve_error(
                &name.loc,
                format!("`{}` is already declared in this scope", name.text),
            );
            return;
        }
        scope.insert(
            name.text.clone(),
            VarState {
                kind,
                loc: name.loc.clone(),
                defined: false,
                used: kind == BindingKind::Exempt,
            },
        );
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(state) = scope.get_mut(name) {
                state.defined = true;
            }
        }
    }

    /// Declare-and-define a hidden binding (`this`, `super`) in the current
    /// scope.
    fn define_hidden(&mut self, name: &str, loc: &Location) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                VarState {
                    kind: BindingKind::Exempt,
                    loc: loc.clone(),
                    defined: true,
                    used: true,
                },
            );
        }
    }

    /// Find `name` in the enclosing scopes and record its hop count for the
    /// interpreter. Reads mark the binding used; bare writes do not.
    fn resolve_local(&mut self, id: ExprId, name: &str, is_read: bool) {
        for (hops, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(state) = scope.get_mut(name) {
                if is_read {
                    state.used = true;
                }
                self.interpreter.resolve(id, hops);
                return;
            }
        }
        // Not found: assumed global, resolved dynamically at runtime.
    }

    // ─────────────────────────── statements ─────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),

            Stmt::Block(statements) => {
                self.begin_scope();
                for stmt in statements {
                    self.resolve_stmt(stmt);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name, BindingKind::Var);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(&name.text);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Proc(decl) => {
                self.declare(&decl.name, BindingKind::Exempt);
                self.define(&decl.name.text);
                self.resolve_proc(decl, ProcKind::Proc);
            }

            Stmt::Return { keyword, value } => {
                if self.current_proc == ProcKind::None {
                    self.reporter
                        .resolve_error(&keyword.loc, "Cannot return from top-level code");
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<ProcDecl>],
    ) {
        let enclosing = mem::replace(&mut self.current_class, ClassKind::Class);

        self.declare(name, BindingKind::Exempt);
        self.define(&name.text);

        if let Some(superclass) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass
            {
                if super_name.text == name.text {
                    self.reporter
                        .resolve_error(&super_name.loc, "A class cannot inherit from itself");
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            // Mirrors the runtime frame that holds `super`.
            self.begin_scope();
            self.define_hidden("super", &name.loc);
        }

        // Mirrors the bind frame that holds `this` (the instance for
        // instance methods, the class value for statics).
        self.begin_scope();
        self.define_hidden("this", &name.loc);

        for method in methods {
            self.resolve_proc(method, ProcKind::Method);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing;
    }

    fn resolve_proc(&mut self, decl: &ProcDecl, kind: ProcKind) {
        let enclosing = mem::replace(&mut self.current_proc, kind);

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, BindingKind::Param);
            self.define(&param.text);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_proc = enclosing;
    }

    // ─────────────────────────── expressions ────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if let Some(state) = scope.get(&name.text) {
                        if !state.defined {
                            self.reporter.resolve_error(
                                &name.loc,
                                format!(
                                    "Cannot read local variable `{}` in its own initializer",
                                    name.text
                                ),
                            );
                        }
                    }
                }
                self.resolve_local(*id, &name.text, true);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.text, false);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_expr);
                self.resolve_expr(else_expr);
            }

            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::Lambda(decl) => self.resolve_proc(decl, ProcKind::Proc),

            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    self.reporter
                        .resolve_error(&keyword.loc, "`this` used outside of a class");
                    return;
                }
                self.resolve_local(*id, "this", true);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.reporter
                            .resolve_error(&keyword.loc, "`super` used outside of a class");
                        return;
                    }
                    ClassKind::Class => {
                        self.reporter.resolve_error(
                            &keyword.loc,
                            "`super` used in a class with no superclass",
                        );
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, "super", true);
            }

            Expr::Compound(exprs) => {
                for expr in exprs {
                    self.resolve_expr(expr);
                }
            }
        }
    }
}
