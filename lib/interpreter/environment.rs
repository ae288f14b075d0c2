use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::error::{Error, ErrorKind, Result};

use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    value: Value,
    constant: bool,
}

/// One scope in the chain. Lookups and assignments walk `outer` until the
/// name is found.
#[derive(Debug, Default)]
pub struct Environment {
    store: HashMap<String, Binding>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn new_enclosed_environment(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }))
    }

    /// Declares `name` in this scope, replacing any binding it already had here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.insert(name, value, false);
    }

    pub fn define_constant(&mut self, name: &str, value: Value) {
        self.insert(name, value, true);
    }

    fn insert(&mut self, name: &str, value: Value, constant: bool) {
        self.store
            .insert(name.to_string(), Binding { value, constant });
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(binding) => Some(binding.value.clone()),
            None => match &self.outer {
                Some(outer) => outer.borrow().get(name),
                None => None,
            },
        }
    }

    /// Rebinds the nearest declaration of `name`. Never creates a new binding.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        match self.store.get_mut(name) {
            Some(binding) if binding.constant => Err(Error::new(
                ErrorKind::ConstError,
                line,
                format!("cannot assign to constant '{}'", name),
            )),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => match &self.outer {
                Some(outer) => outer.borrow_mut().assign(name, value, line),
                None => Err(Error::new(
                    ErrorKind::NameError,
                    line,
                    format!("cannot assign to undeclared name '{}'", name),
                )),
            },
        }
    }
}
