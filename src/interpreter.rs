//! Tree-walking evaluator.
//!
//! The interpreter holds the global frame, the current frame, and the
//! resolver's side-table of binding depths. It is session-long: REPL inputs
//! and successive `run` calls share one instance, so globals and resolved
//! locals accumulate.
//!
//! `return` is ordinary control flow, not an error: statement execution
//! yields a [`Flow`] that either continues or carries the returned value up
//! to the nearest call frame. Errors proper travel as `Result` and abort the
//! whole run.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::{cell::RefCell, mem};

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, ProcDecl, Stmt, INIT_METHOD};
use crate::environment::{self, EnvRef, Environment};
use crate::error::{Result, TrypError};
use crate::native;
use crate::token::{Operator, Token, TokenKind};
use crate::value::{class_get, instance_get, Class, Instance, Procedure, Value};

/// Outcome of executing one statement.
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    env: EnvRef,
    /// Resolved hop counts, keyed by node id. Unlisted nodes are globals.
    locals: HashMap<ExprId, usize>,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    /// An interpreter writing `print`/`println` output to `out` instead of
    /// stdout. Tests pass an `Rc<RefCell<Vec<u8>>>` here.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Environment::root();
        native::register(&globals);

        Self {
            env: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// The sink natives write program output to.
    pub fn out(&self) -> Rc<RefCell<dyn Write>> {
        Rc::clone(&self.out)
    }

    /// Record the resolver's verdict for one binding reference.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Read a global binding; lets tests observe program state without
    /// scraping output.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Execute a resolved program. Returns the value of the final top-level
    /// expression statement, if any, for the REPL to echo.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<Option<Value>> {
        info!("interpreting {} top-level statements", statements.len());

        let mut last = None;
        for stmt in statements {
            match stmt {
                Stmt::Expression(expr) => last = Some(self.evaluate(expr)?),
                other => {
                    self.execute(other)?;
                    last = None;
                }
            }
        }
        Ok(last)
    }

    // ─────────────────────────── statements ─────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.env.borrow_mut().define(name.text.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::child(&self.env);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Proc(decl) => {
                let proc = Procedure::new(Rc::clone(decl), Rc::clone(&self.env));
                self.env
                    .borrow_mut()
                    .define(decl.name.text.clone(), Value::Proc(Rc::new(proc)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` with `env` as the current frame, restoring the
    /// previous frame afterwards even on error.
    fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous = mem::replace(&mut self.env, env);

        let mut flow = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => continue,
                other => {
                    flow = other;
                    break;
                }
            }
        }

        self.env = previous;
        flow
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<ProcDecl>],
    ) -> Result<Flow> {
        let superclass_rc = match superclass {
            Some(expr) => {
                let loc = match expr {
                    Expr::Variable { name, .. } => &name.loc,
                    _ => &name.loc,
                };
                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),
                    other => {
                        return Err(TrypError::runtime(
                            loc,
                            format!("Superclass must be a class, not {}", other.stringify()),
                        ))
                    }
                }
            }
            None => None,
        };

        // Two-step define/assign so methods can close over the class name.
        self.env.borrow_mut().define(name.text.clone(), Value::Nil);

        // Methods of a subclass capture an extra frame holding `super`; the
        // resolver mirrors this frame with an extra scope.
        let method_env = match &superclass_rc {
            Some(sup) => {
                let env = Environment::child(&self.env);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(sup)));
                env
            }
            None => Rc::clone(&self.env),
        };

        let mut instance_methods = HashMap::new();
        let mut static_methods = HashMap::new();
        for decl in methods {
            let proc = Rc::new(Procedure::new(Rc::clone(decl), Rc::clone(&method_env)));
            if decl.is_static {
                static_methods.insert(decl.name.text.clone(), proc);
            } else {
                instance_methods.insert(decl.name.text.clone(), proc);
            }
        }

        // The hidden metaclass holds the statics. It shares the declaring
        // class's superclass, so statics can reach inherited methods.
        let metaclass = Rc::new(Class::new(
            format!("$static${}", name.text),
            superclass_rc.clone(),
            None,
            static_methods,
        ));
        let class = Rc::new(Class::new(
            name.text.clone(),
            superclass_rc,
            Some(metaclass),
            instance_methods,
        ));

        debug!("defined class {}", class.name);
        self.env
            .borrow_mut()
            .assign(&name.text, Value::Class(class));
        Ok(Flow::Normal)
    }

    // ─────────────────────────── expressions ────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                let assigned = match self.locals.get(id) {
                    Some(&depth) => {
                        environment::assign_at(&self.env, depth, &name.text, value.clone())
                    }
                    None => self.globals.borrow_mut().assign(&name.text, value.clone()),
                };
                if !assigned {
                    return Err(TrypError::runtime(
                        &name.loc,
                        format!("Undefined variable `{}`", name.text),
                    ));
                }
                Ok(value)
            }

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator_of(operator)? {
                    Operator::Bang => Ok(Value::Bool(!right.is_truthy())),
                    Operator::Minus => {
                        let n = number_operand(operator, &right)?;
                        Ok(Value::Number(-n))
                    }
                    op => Err(TrypError::runtime(
                        &operator.loc,
                        format!("`{}` is not a unary operator", op.text()),
                    )),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary_op(&left, operator, &right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                // The deciding operand itself is the result, not a bool.
                match operator_of(operator)? {
                    Operator::AndAnd if !left.is_truthy() => Ok(left),
                    Operator::OrOr if left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_expr)
                } else {
                    self.evaluate(else_expr)
                }
            }

            Expr::Compound(exprs) => {
                let mut last = Value::Nil;
                for expr in exprs {
                    last = self.evaluate(expr)?;
                }
                Ok(last)
            }

            Expr::Lambda(decl) => {
                let proc = Procedure::new(Rc::clone(decl), Rc::clone(&self.env));
                Ok(Value::Proc(Rc::new(proc)))
            }

            Expr::Call {
                callee,
                paren,
                args,
            } => {
                let callee = self.evaluate(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_value(callee, arg_values, paren)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => {
                        instance_get(&instance, &name.text).ok_or_else(|| {
                            TrypError::runtime(
                                &name.loc,
                                format!("Undefined property `{}`", name.text),
                            )
                        })
                    }
                    Value::Class(class) => class_get(&class, &name.text).ok_or_else(|| {
                        TrypError::runtime(
                            &name.loc,
                            format!("Undefined property `{}`", name.text),
                        )
                    }),
                    other => Err(TrypError::runtime(
                        &name.loc,
                        format!(
                            "Only instances and classes have properties, not {}",
                            other.stringify()
                        ),
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                // The target is checked before the value is evaluated, so a
                // set on a non-instance never runs the right-hand side.
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance
                            .borrow_mut()
                            .fields
                            .insert(name.text.clone(), value.clone());
                        Ok(value)
                    }
                    Value::Class(class) => {
                        let value = self.evaluate(value)?;
                        class
                            .fields
                            .borrow_mut()
                            .insert(name.text.clone(), value.clone());
                        Ok(value)
                    }
                    other => Err(TrypError::runtime(
                        &name.loc,
                        format!(
                            "Only instances and classes have properties, not {}",
                            other.stringify()
                        ),
                    )),
                }
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        let value = match self.locals.get(&id) {
            Some(&depth) => environment::get_at(&self.env, depth, &name.text),
            None => self.globals.borrow().get(&name.text),
        };
        value.ok_or_else(|| {
            TrypError::runtime(&name.loc, format!("Undefined variable `{}`", name.text))
        })
    }

    fn binary_op(&mut self, left: &Value, operator: &Token, right: &Value) -> Result<Value> {
        let op = operator_of(operator)?;
        match op {
            // `+` concatenates when either side is a string, rendering the
            // other side in raw form.
            Operator::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Ok(Value::Str(format!("{left}{right}")))
                }
                _ => Err(TrypError::runtime(
                    &operator.loc,
                    "Operands for `+` must be numbers or strings",
                )),
            },

            Operator::Minus | Operator::Star | Operator::Slash | Operator::Percent => {
                let a = number_operand(operator, left)?;
                let b = number_operand(operator, right)?;
                Ok(Value::Number(match op {
                    Operator::Minus => a - b,
                    Operator::Star => a * b,
                    // Division by zero follows IEEE 754 (yields infinity).
                    Operator::Slash => a / b,
                    _ => a % b,
                }))
            }

            Operator::Greater | Operator::GreaterEqual | Operator::Less | Operator::LessEqual => {
                let a = number_operand(operator, left)?;
                let b = number_operand(operator, right)?;
                Ok(Value::Bool(match op {
                    Operator::Greater => a > b,
                    Operator::GreaterEqual => a >= b,
                    Operator::Less => a < b,
                    _ => a <= b,
                }))
            }

            Operator::EqualEqual => Ok(Value::Bool(left == right)),
            Operator::BangEqual => Ok(Value::Bool(left != right)),

            other => Err(TrypError::runtime(
                &operator.loc,
                format!("`{}` is not a binary operator", other.text()),
            )),
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> Result<Value> {
        match callee {
            Value::Native(native) => {
                if args.len() != native.arity {
                    return Err(arity_error(paren, native.arity, args.len()));
                }
                (native.func)(self, &args).map_err(|msg| TrypError::runtime(&paren.loc, msg))
            }

            Value::Proc(proc) => self.call_procedure(&proc, args, paren),

            Value::Class(class) => self.call_class(&class, args, paren),

            other => Err(TrypError::runtime(
                &paren.loc,
                format!("Can only call procs and classes, not {}", other.stringify()),
            )),
        }
    }

    fn call_procedure(
        &mut self,
        proc: &Rc<Procedure>,
        args: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        if args.len() != proc.arity() {
            return Err(arity_error(paren, proc.arity(), args.len()));
        }

        let env = Environment::child(&proc.closure);
        {
            let mut frame = env.borrow_mut();
            for (param, arg) in proc.decl.params.iter().zip(args) {
                frame.define(param.text.clone(), arg);
            }
        }

        let flow = self.execute_block(&proc.decl.body, env)?;

        // A constructor evaluates to its instance no matter what the body
        // returns. Its closure is the bind frame, which defines `this`.
        if proc.is_initializer {
            return environment::get_at(&proc.closure, 0, "this").ok_or_else(|| {
                TrypError::runtime(&paren.loc, "Constructor called without an instance")
            });
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }

    /// Calling a class allocates an instance and runs `$init` when the class
    /// hierarchy defines one.
    fn call_class(&mut self, class: &Rc<Class>, args: Vec<Value>, paren: &Token) -> Result<Value> {
        let instance = Instance::new(Rc::clone(class));
        let value = Value::Instance(Rc::clone(&instance));

        match class.find_method(INIT_METHOD) {
            Some(init) => {
                let bound = init.bind(value.clone());
                self.call_procedure(&bound, args, paren)?;
            }
            None => {
                if !args.is_empty() {
                    return Err(arity_error(paren, 0, args.len()));
                }
            }
        }

        Ok(value)
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let depth = match self.locals.get(&id) {
            Some(&depth) => depth,
            None => {
                return Err(TrypError::runtime(
                    &keyword.loc,
                    "`super` used outside of a subclass method",
                ))
            }
        };

        let superclass = match environment::get_at(&self.env, depth, "super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(TrypError::runtime(
                    &keyword.loc,
                    "`super` used outside of a subclass method",
                ))
            }
        };

        // `this` lives one frame below the `super` frame.
        let receiver = environment::get_at(&self.env, depth - 1, "this").ok_or_else(|| {
            TrypError::runtime(&keyword.loc, "`super` used outside of a method")
        })?;

        match superclass.find_method(&method.text) {
            Some(found) => Ok(Value::Proc(found.bind(receiver))),
            None => Err(TrypError::runtime(
                &method.loc,
                format!("Undefined property `{}`", method.text),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn operator_of(token: &Token) -> Result<Operator> {
    match token.kind {
        TokenKind::Operator(op) => Ok(op),
        _ => Err(TrypError::runtime(
            &token.loc,
            format!("Malformed operator token `{}`", token.text),
        )),
    }
}

fn number_operand(operator: &Token, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(TrypError::runtime(
            &operator.loc,
            format!(
                "Operand for `{}` must be a number, not {}",
                operator.text,
                other.stringify()
            ),
        )),
    }
}

fn arity_error(paren: &Token, expected: usize, got: usize) -> TrypError {
    TrypError::runtime(
        &paren.loc,
        format!("Expected {expected} arguments but got {got}"),
    )
}
