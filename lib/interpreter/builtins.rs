use std::{
    collections::BTreeMap,
    fmt,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{anyhow, bail, Result};

use super::{environment::Environment, value::Value};

pub type NativeFn = fn(&[Value]) -> Result<Value>;

/// A function implemented by the host. `arity` of `None` accepts any number of
/// arguments.
pub struct NativeFunction {
    pub name: String,
    pub arity: Option<usize>,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// The registry of host functions installed into the global scope.
#[derive(Debug, Default, Clone)]
pub struct Natives {
    functions: BTreeMap<String, Rc<NativeFunction>>,
}

impl Natives {
    pub fn new() -> Self {
        Self::default()
    }

    /// The small set of host functions the command-line tool ships with.
    pub fn prelude() -> Self {
        let mut natives = Self::new();
        natives
            .register("print", None, Self::print_fn)
            .register("len", Some(1), Self::len_fn)
            .register("push", Some(2), Self::push_fn)
            .register("pop", Some(1), Self::pop_fn)
            .register("str", Some(1), Self::str_fn)
            .register("type", Some(1), Self::type_fn)
            .register("clock", Some(0), Self::clock_fn);
        natives
    }

    pub fn register(&mut self, name: &str, arity: Option<usize>, func: NativeFn) -> &mut Self {
        self.functions.insert(
            name.to_string(),
            Rc::new(NativeFunction {
                name: name.to_string(),
                arity,
                func,
            }),
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<Rc<NativeFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn install(&self, env: &mut Environment) {
        for (name, function) in &self.functions {
            env.define(name, Value::NativeFunction(function.clone()));
        }
    }

    fn print_fn(args: &[Value]) -> Result<Value> {
        let line = args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        println!("{}", line);
        Ok(Value::Null)
    }

    fn len_fn(args: &[Value]) -> Result<Value> {
        match args.first() {
            Some(Value::String(value)) => Ok(Value::Number(value.chars().count() as f64)),
            Some(Value::List(elements)) => Ok(Value::Number(elements.borrow().len() as f64)),
            Some(other) => Err(anyhow!(
                "argument to `len` not supported, got {}",
                other.type_name()
            )),
            None => Err(anyhow!("argument to `len` not provided")),
        }
    }

    fn push_fn(args: &[Value]) -> Result<Value> {
        match args {
            [Value::List(elements), value] => {
                elements.borrow_mut().push(value.clone());
                Ok(Value::List(elements.clone()))
            }
            [other, _] => bail!(
                "first argument to `push` must be a list, got {}",
                other.type_name()
            ),
            _ => bail!("wrong number of arguments for push: want=2, got={}", args.len()),
        }
    }

    fn pop_fn(args: &[Value]) -> Result<Value> {
        match args.first() {
            Some(Value::List(elements)) => match elements.borrow_mut().pop() {
                Some(value) => Ok(value),
                None => bail!("cannot pop from an empty list"),
            },
            Some(other) => bail!("argument to `pop` must be a list, got {}", other.type_name()),
            None => bail!("argument to `pop` not provided"),
        }
    }

    fn str_fn(args: &[Value]) -> Result<Value> {
        match args.first() {
            Some(value) => Ok(Value::String(value.to_string())),
            None => bail!("argument to `str` not provided"),
        }
    }

    fn type_fn(args: &[Value]) -> Result<Value> {
        match args.first() {
            Some(value) => Ok(Value::String(value.type_name().to_string())),
            None => bail!("argument to `type` not provided"),
        }
    }

    fn clock_fn(_args: &[Value]) -> Result<Value> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
        Ok(Value::Number(elapsed.as_secs_f64()))
    }
}
