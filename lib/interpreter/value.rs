use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::{ast::FunctionDecl, stack::ensure_sufficient_stack};

use super::{builtins::NativeFunction, environment::Environment};

/// Numbers closer than this compare equal.
pub const EPSILON: f64 = 1e-10;

type ListPtr = *const RefCell<Vec<Value>>;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    NativeFunction(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

impl Value {
    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    /// `null`, `false`, `0`, `""` and `[]` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0,
            Value::String(value) => !value.is_empty(),
            Value::List(elements) => !elements.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl Value {
    /// Structural equality. `visiting` holds the list pairs already being
    /// compared further up; meeting one again means that path can't differ.
    fn equals(&self, other: &Self, visiting: &mut Vec<(ListPtr, ListPtr)>) -> bool {
        match (self, other) {
            (Value::Number(left), Value::Number(right)) => {
                left == right || (left - right).abs() < EPSILON
            }
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Null, Value::Null) => true,
            (Value::List(left), Value::List(right)) => {
                if Rc::ptr_eq(left, right) {
                    return true;
                }
                let pair = (Rc::as_ptr(left), Rc::as_ptr(right));
                if visiting.contains(&pair) {
                    return true;
                }
                let (left, right) = (left.borrow(), right.borrow());
                if left.len() != right.len() {
                    return false;
                }
                visiting.push(pair);
                let equal = ensure_sufficient_stack(|| {
                    left.iter()
                        .zip(right.iter())
                        .all(|(left, right)| left.equals(right, visiting))
                });
                visiting.pop();
                equal
            }
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::NativeFunction(left), Value::NativeFunction(right)) => Rc::ptr_eq(left, right),
            (Value::Class(left), Value::Class(right)) => Rc::ptr_eq(left, right),
            (Value::Instance(left), Value::Instance(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Writes the value, printing a list that contains itself as `[...]`.
    fn write(&self, f: &mut fmt::Formatter, open_lists: &mut Vec<ListPtr>) -> fmt::Result {
        match self {
            Value::Number(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Null => write!(f, "null"),
            Value::List(elements) => {
                let ptr = Rc::as_ptr(elements);
                if open_lists.contains(&ptr) {
                    return write!(f, "[...]");
                }
                open_lists.push(ptr);
                let result = ensure_sufficient_stack(|| {
                    write!(f, "[")?;
                    for (i, element) in elements.borrow().iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        element.write(f, open_lists)?;
                    }
                    write!(f, "]")
                });
                open_lists.pop();
                result
            }
            Value::Function(function) => write!(f, "{}", function),
            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, &mut Vec::new())
    }
}

/// A user function together with the scope it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_deref()
    }

    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    /// Returns a copy of this method whose scope has `this` set to `instance`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let environment = Environment::new_enclosed_environment(self.closure.clone());
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));
        Function::new(self.declaration.clone(), environment, self.is_initializer)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Looks `name` up in this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Constructing an instance takes as many arguments as `init` does.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| &superclass.name),
            )
            .field("methods", &methods)
            .finish()
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Fields shadow methods; methods come back bound to this instance.
    pub fn get(self: &Rc<Self>, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(value.clone());
        }
        self.class
            .find_method(name)
            .map(|method| Value::Function(Rc::new(method.bind(self.clone()))))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
