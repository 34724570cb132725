//! Runtime values and the object model.
//!
//! [`Value`] is a cheap-to-clone handle: primitives are copied, everything
//! callable or mutable sits behind an `Rc`. Equality on reference values is
//! identity (`Rc::ptr_eq`), matching the language's `==` semantics.
//!
//! Two rendering forms exist on purpose. `Display` is the *raw* form used by
//! `print`/`println` and string concatenation: strings appear without quotes
//! and integral numbers drop the trailing `.0`. [`Value::stringify`] is the
//! inspection form used by the REPL and diagnostics, identical except that
//! strings are quoted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{ProcDecl, INIT_METHOD};
use crate::environment::{EnvRef, Environment};
use crate::native::NativeProc;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Native(Rc<NativeProc>),
    Proc(Rc<Procedure>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// Everything is truthy except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Quoted rendering for inspection output; `Display` is the raw form.
    pub fn stringify(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

/// Integral numbers print without the trailing `.0`; `3.0` is just `3`.
fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 9.0e18 {
        let mut buf = itoa::Buffer::new();
        f.write_str(buf.format(n as i64))
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => fmt_number(f, *n),
            Value::Str(s) => f.write_str(s),
            Value::Native(n) => write!(f, "<native proc {}>", n.name),
            Value::Proc(p) => write!(f, "<proc {}>", p.name()),
            Value::Class(c) => write!(f, "<class {}>", c.name),
            Value::Instance(i) => write!(f, "{} instance", i.borrow().class.name),
        }
    }
}

// Manual impl: a procedure's closure environment can reach back to the value
// itself, so deriving `Debug` would recurse forever.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Native(n) => write!(f, "Native({})", n.name),
            Value::Proc(p) => write!(f, "Proc({})", p.name()),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "Instance({})", i.borrow().class.name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Proc(a), Value::Proc(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A user-defined procedure: shared declaration plus captured environment.
/// Methods and lambdas are the same thing with different provenance.
pub struct Procedure {
    pub decl: Rc<ProcDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl Procedure {
    pub fn new(decl: Rc<ProcDecl>, closure: EnvRef) -> Self {
        let is_initializer = decl.is_initializer();
        Self {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.text
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// A copy of this procedure whose closure defines `this` as `receiver`.
    /// Used for instance methods (receiver is the instance) and static
    /// methods (receiver is the class value).
    pub fn bind(&self, receiver: Value) -> Rc<Procedure> {
        let env = Environment::child(&self.closure);
        env.borrow_mut().define("this", receiver);
        Rc::new(Procedure {
            decl: Rc::clone(&self.decl),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }
}

/// A class: instance-method table, optional superclass, and the hidden
/// metaclass that carries `static` methods. The metaclass itself has no
/// metaclass.
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub metaclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Procedure>>,
    /// Fields written directly onto the class value (`Counter.total <- 3`).
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        metaclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Procedure>>,
    ) -> Self {
        Self {
            name,
            superclass,
            metaclass,
            methods,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Method lookup along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Procedure>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|sup| sup.find_method(name)),
        }
    }

    /// Calling a class takes the constructor's arity, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method(INIT_METHOD)
            .map(|init| init.arity())
            .unwrap_or(0)
    }
}

/// An instance: its class plus an open-ended field map.
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            class,
            fields: HashMap::new(),
        }))
    }
}

/// Property read on an instance: fields shadow methods; a method hit is
/// bound to the instance before being handed out.
pub fn instance_get(instance: &Rc<RefCell<Instance>>, name: &str) -> Option<Value> {
    if let Some(value) = instance.borrow().fields.get(name) {
        return Some(value.clone());
    }

    let class = Rc::clone(&instance.borrow().class);
    class
        .find_method(name)
        .map(|method| Value::Proc(method.bind(Value::Instance(Rc::clone(instance)))))
}

/// Property read on a class value: class fields shadow static methods; a
/// static method is bound with the class itself as `this`.
pub fn class_get(class: &Rc<Class>, name: &str) -> Option<Value> {
    if let Some(value) = class.fields.borrow().get(name) {
        return Some(value.clone());
    }

    class
        .metaclass
        .as_ref()
        .and_then(|meta| meta.find_method(name))
        .map(|method| Value::Proc(method.bind(Value::Class(Rc::clone(class)))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
    }

    #[test]
    fn display_drops_integral_suffix() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-14.0).to_string(), "-14");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn stringify_quotes_strings() {
        assert_eq!(Value::Str("hi".into()), Value::Str("hi".into()));
        assert_eq!(Value::Str("hi".into()).stringify(), "\"hi\"");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        assert_eq!(Value::Nil.stringify(), "nil");
    }

    #[test]
    fn instance_equality_is_identity() {
        let class = Rc::new(Class::new("Point".into(), None, None, HashMap::new()));
        let a = Instance::new(Rc::clone(&class));
        let b = Instance::new(Rc::clone(&class));

        assert_eq!(
            Value::Instance(Rc::clone(&a)),
            Value::Instance(Rc::clone(&a))
        );
        assert_ne!(Value::Instance(a), Value::Instance(b));
    }
}
