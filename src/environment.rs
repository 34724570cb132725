//! Lexical environments for the tree-walking runtime.
//!
//! Environments form a parent-linked chain of `Rc<RefCell<_>>` frames: one
//! global frame per session, one frame per block, per call, plus the hidden
//! `this`/`super` frames the runtime inserts around method bodies. Closures
//! keep their defining frame alive simply by holding the `Rc`.
//!
//! Resolved locals bypass the dynamic chain entirely: the resolver records a
//! hop count per binding reference and the runtime walks exactly that many
//! parents with [`Environment::get_at`] / [`Environment::assign_at`].
//! Unresolved names (globals) fall back to the chain walk in
//! [`Environment::get`] / [`Environment::assign`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// A fresh root frame (the globals).
    pub fn root() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A child frame of `parent`.
    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Define (or redefine) `name` in this frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look `name` up along the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.borrow().get(name)),
        }
    }

    /// Assign to an existing binding along the parent chain. Returns `false`
    /// when no frame defines `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => false,
        }
    }
}

/// Walk exactly `depth` parents up from `env`.
///
/// The resolver guarantees the frame exists and holds the binding; a miss
/// here is an interpreter bug, surfaced as `None` so the caller can turn it
/// into a runtime diagnostic instead of a panic.
fn ancestor(env: &EnvRef, depth: usize) -> Option<EnvRef> {
    let mut current = Rc::clone(env);
    for _ in 0..depth {
        let parent = current.borrow().parent.as_ref().map(Rc::clone)?;
        current = parent;
    }
    Some(current)
}

/// Read `name` from the frame exactly `depth` hops up.
pub fn get_at(env: &EnvRef, depth: usize, name: &str) -> Option<Value> {
    let frame = ancestor(env, depth)?;
    let value = frame.borrow().values.get(name).cloned();
    value
}

/// Assign `name` in the frame exactly `depth` hops up. Returns `false` when
/// the frame or the binding is missing.
pub fn assign_at(env: &EnvRef, depth: usize, name: &str, value: Value) -> bool {
    match ancestor(env, depth) {
        Some(frame) => {
            let mut frame = frame.borrow_mut();
            match frame.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let env = Environment::root();
        env.borrow_mut().define("x", Value::Number(1.0));
        assert_eq!(env.borrow().get("x"), Some(Value::Number(1.0)));
        assert_eq!(env.borrow().get("y"), None);
    }

    #[test]
    fn child_sees_parent_and_shadows() {
        let root = Environment::root();
        root.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::child(&root);
        assert_eq!(inner.borrow().get("x"), Some(Value::Number(1.0)));

        inner.borrow_mut().define("x", Value::Number(2.0));
        assert_eq!(inner.borrow().get("x"), Some(Value::Number(2.0)));
        assert_eq!(root.borrow().get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_walks_the_chain() {
        let root = Environment::root();
        root.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::child(&root);
        assert!(inner.borrow_mut().assign("x", Value::Number(5.0)));
        assert_eq!(root.borrow().get("x"), Some(Value::Number(5.0)));

        assert!(!inner.borrow_mut().assign("missing", Value::Nil));
    }

    #[test]
    fn get_at_is_exact_depth() {
        let root = Environment::root();
        root.borrow_mut().define("x", Value::Number(1.0));

        let mid = Environment::child(&root);
        mid.borrow_mut().define("x", Value::Number(2.0));

        let leaf = Environment::child(&mid);

        assert_eq!(get_at(&leaf, 1, "x"), Some(Value::Number(2.0)));
        assert_eq!(get_at(&leaf, 2, "x"), Some(Value::Number(1.0)));
        // Depth 0 frame exists but has no binding.
        assert_eq!(get_at(&leaf, 0, "x"), None);
    }

    #[test]
    fn assign_at_targets_one_frame() {
        let root = Environment::root();
        root.borrow_mut().define("x", Value::Number(1.0));

        let mid = Environment::child(&root);
        mid.borrow_mut().define("x", Value::Number(2.0));

        let leaf = Environment::child(&mid);
        assert!(assign_at(&leaf, 2, "x", Value::Number(9.0)));
        assert_eq!(root.borrow().get("x"), Some(Value::Number(9.0)));
        assert_eq!(mid.borrow().values.get("x"), Some(&Value::Number(2.0)));
    }
}
