//! Parenthesised AST dump behind the `parse` subcommand.
//!
//! Expressions render in prefix form (`(+ 1 (* x 2))`), statements one per
//! line with two-space indentation for nested bodies. The exact shape is a
//! debugging aid, not a stable interface.

use crate::ast::{Expr, LiteralValue, ProcDecl, Stmt};

pub struct AstPrinter {
    out: String,
    indent: usize,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn print(mut self, statements: &[Stmt]) -> String {
        for stmt in statements {
            self.stmt(stmt);
        }
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.line(header);
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => {
                let text = format!("(expr {})", self.expr(expr));
                self.line(&text);
            }

            Stmt::Var { name, initializer } => {
                let text = match initializer {
                    Some(init) => format!("(var {} {})", name.text, self.expr(init)),
                    None => format!("(var {})", name.text),
                };
                self.line(&text);
            }

            Stmt::Block(statements) => self.nested("(block", |p| {
                for stmt in statements {
                    p.stmt(stmt);
                }
                p.line(")");
            }),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let header = format!("(if {}", self.expr(condition));
                self.nested(&header, |p| {
                    p.stmt(then_branch);
                    if let Some(else_branch) = else_branch {
                        p.line("else");
                        p.stmt(else_branch);
                    }
                    p.line(")");
                });
            }

            Stmt::While { condition, body } => {
                let header = format!("(while {}", self.expr(condition));
                self.nested(&header, |p| {
                    p.stmt(body);
                    p.line(")");
                });
            }

            Stmt::Proc(decl) => self.proc_decl("proc", decl),

            Stmt::Return { value, .. } => {
                let text = match value {
                    Some(value) => format!("(return {})", self.expr(value)),
                    None => "(return)".to_string(),
                };
                self.line(&text);
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let header = match superclass {
                    Some(sup) => format!("(class {} extends {}", name.text, self.expr(sup)),
                    None => format!("(class {}", name.text),
                };
                self.nested(&header, |p| {
                    for method in methods {
                        let label = if method.is_static { "static" } else { "method" };
                        p.proc_decl(label, method);
                    }
                    p.line(")");
                });
            }
        }
    }

    fn proc_decl(&mut self, label: &str, decl: &ProcDecl) {
        let params: Vec<&str> = decl.params.iter().map(|p| p.text.as_str()).collect();
        let header = format!("({label} {} ({})", decl.name.text, params.join(" "));
        self.nested(&header, |p| {
            for stmt in &decl.body {
                p.stmt(stmt);
            }
            p.line(")");
        });
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::Number(n) => format!("{n}"),
                LiteralValue::Str(s) => format!("{s:?}"),
                LiteralValue::True => "true".to_string(),
                LiteralValue::False => "false".to_string(),
                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Variable { name, .. } => name.text.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(<- {} {})", name.text, self.expr(value))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => {
                format!("({} {} {})", operator.text, self.expr(left), self.expr(right))
            }

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.text, self.expr(right))
            }

            Expr::Grouping(inner) => format!("(group {})", self.expr(inner)),

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => format!(
                "(? {} {} {})",
                self.expr(condition),
                self.expr(then_expr),
                self.expr(else_expr)
            ),

            Expr::Call { callee, args, .. } => {
                let mut parts = vec![self.expr(callee)];
                for arg in args {
                    parts.push(self.expr(arg));
                }
                format!("(call {})", parts.join(" "))
            }

            Expr::Get { object, name } => {
                format!("(get {} {})", self.expr(object), name.text)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                self.expr(object),
                name.text,
                self.expr(value)
            ),

            Expr::Lambda(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.text.as_str()).collect();
                format!("(lambda ({}) ...)", params.join(" "))
            }

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.text),

            Expr::Compound(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| self.expr(e)).collect();
                format!("(, {})", parts.join(" "))
            }
        }
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}
