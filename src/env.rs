use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, RillError};
use crate::value::Value;

/// A frame in the scope chain. Frames are shared: a closure and the call
/// that created it may both hold the same frame alive.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<Env>,
    values: HashMap<String, Value>,
}

fn undefined(name: &str, line: u32) -> RillError {
    RillError::runtime(line, format!("undefined variable '{name}'"))
}

impl Environment {
    /// The root frame. It has no parent; depth-addressed lookups that miss
    /// fall through to it.
    pub fn global() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn with_enclosing(enclosing: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            enclosing: Some(Rc::clone(enclosing)),
            values: HashMap::new(),
        }))
    }

    /// Bind or rebind a name in this frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn assign_local(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn ancestor(env: &Env, depth: usize, name: &str, line: u32) -> Result<Env> {
        let mut frame = Rc::clone(env);
        for _ in 0..depth {
            let parent = frame.borrow().enclosing.as_ref().map(Rc::clone);
            match parent {
                Some(parent) => frame = parent,
                None => return Err(undefined(name, line)),
            }
        }
        Ok(frame)
    }

    /// Read `name` from the frame exactly `depth` parents up from `env`.
    pub fn get_at(env: &Env, depth: usize, name: &str, line: u32) -> Result<Value> {
        let frame = Environment::ancestor(env, depth, name, line)?;
        let value = frame.borrow().get_local(name);
        value.ok_or_else(|| undefined(name, line))
    }

    /// Rebind `name` in the frame exactly `depth` parents up from `env`.
    pub fn assign_at(env: &Env, depth: usize, name: &str, value: Value, line: u32) -> Result<()> {
        let frame = Environment::ancestor(env, depth, name, line)?;
        if frame.borrow_mut().assign_local(name, value) {
            Ok(())
        } else {
            Err(undefined(name, line))
        }
    }

    /// Read `name` from the root frame (unresolved references land here).
    pub fn get_global(globals: &Env, name: &str, line: u32) -> Result<Value> {
        globals
            .borrow()
            .get_local(name)
            .ok_or_else(|| undefined(name, line))
    }

    /// Rebind `name` in the root frame.
    pub fn assign_global(globals: &Env, name: &str, value: Value, line: u32) -> Result<()> {
        if globals.borrow_mut().assign_local(name, value) {
            Ok(())
        } else {
            Err(undefined(name, line))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let globals = Environment::global();
        globals.borrow_mut().define("x", Value::Number(1.0));
        let value = Environment::get_global(&globals, "x", 1).unwrap();
        assert_eq!(value, Value::Number(1.0));
    }

    #[test]
    fn get_of_unknown_name_is_an_error() {
        let globals = Environment::global();
        let error = Environment::get_global(&globals, "missing", 3).unwrap_err();
        assert_eq!(
            error.to_string(),
            "[line 3] Runtime error: undefined variable 'missing'"
        );
    }

    #[test]
    fn assign_requires_existing_binding() {
        let globals = Environment::global();
        assert!(Environment::assign_global(&globals, "x", Value::Nil, 1).is_err());
        globals.borrow_mut().define("x", Value::Nil);
        assert!(Environment::assign_global(&globals, "x", Value::Bool(true), 1).is_ok());
    }

    #[test]
    fn depth_addressing_reaches_the_right_frame() {
        let globals = Environment::global();
        let outer = Environment::with_enclosing(&globals);
        let inner = Environment::with_enclosing(&outer);

        outer.borrow_mut().define("x", Value::Number(1.0));
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(
            Environment::get_at(&inner, 0, "x", 1).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 1, "x", 1).unwrap(),
            Value::Number(1.0)
        );

        Environment::assign_at(&inner, 1, "x", Value::Number(9.0), 1).unwrap();
        assert_eq!(
            Environment::get_at(&outer, 0, "x", 1).unwrap(),
            Value::Number(9.0)
        );
        // The inner shadow is untouched.
        assert_eq!(
            Environment::get_at(&inner, 0, "x", 1).unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn walking_past_the_root_is_an_error() {
        let globals = Environment::global();
        assert!(Environment::get_at(&globals, 1, "x", 1).is_err());
    }
}
