use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::{debug, trace, warn};

use crate::{
    ast::{
        BinaryOperator, Expression, ExpressionKind, FunctionDecl, LiteralValue, LogicalOperator,
        Program, Statement, StatementKind, UnaryOperator,
    },
    config::Config,
    error::{Error, ErrorKind, Result},
    stack::ensure_sufficient_stack,
};

use super::{
    builtins::Natives,
    environment::Environment,
    value::{Class, Function, Instance, Value},
};

/// How a statement finished. Anything other than `Normal` unwinds to the
/// nearest loop (`Break`, `Continue`) or call (`Return`).
#[derive(Debug, PartialEq, Clone)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Evaluator {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    depth: usize,
    max_depth: usize,
}

impl Evaluator {
    pub fn new(config: Config, natives: &Natives) -> Self {
        let globals = Environment::new();
        natives.install(&mut globals.borrow_mut());
        Self {
            env: globals.clone(),
            globals,
            depth: 0,
            max_depth: config.max_call_depth,
        }
    }

    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        self.globals.clone()
    }

    /// Runs every statement and returns the value of the last expression
    /// statement, or `null`. The first runtime error aborts the run.
    pub fn eval(&mut self, program: &Program) -> Result<Value> {
        let mut result = Value::Null;
        for statement in &program.statements {
            if let Some(value) = self.execute_top_level(statement)? {
                result = value;
            }
        }
        Ok(result)
    }

    /// Runs one top-level statement, returning the value if it was an
    /// expression statement.
    pub fn execute_top_level(&mut self, statement: &Statement) -> Result<Option<Value>> {
        if let StatementKind::Expression(expression) = &statement.kind {
            return self.evaluate(expression).map(Some);
        }
        self.execute(statement)?;
        Ok(None)
    }

    fn execute(&mut self, statement: &Statement) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_statement(statement))
    }

    fn execute_statement(&mut self, statement: &Statement) -> Result<Flow> {
        match &statement.kind {
            StatementKind::Expression(expression) => {
                self.evaluate(expression)?;
            }
            StatementKind::Let {
                name,
                initializer,
                constant,
            } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                let mut env = self.env.borrow_mut();
                if *constant {
                    env.define_constant(name, value);
                } else {
                    env.define(name, value);
                }
            }
            StatementKind::Block(statements) => {
                trace!(line = statement.line, "enter block scope");
                let env = Environment::new_enclosed_environment(self.env.clone());
                return self.execute_block(statements, env);
            }
            StatementKind::If {
                condition,
                consequence,
                alternative,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(consequence);
                }
                if let Some(alternative) = alternative {
                    return self.execute(alternative);
                }
            }
            StatementKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StatementKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let env = Environment::new_enclosed_environment(self.env.clone());
                return self.in_scope(env, |evaluator| {
                    evaluator.execute_for(initializer.as_deref(), condition, increment, body)
                });
            }
            StatementKind::Function(declaration) => {
                let function = Function::new(declaration.clone(), self.env.clone(), false);
                let name = declaration.name.as_deref().unwrap_or_default();
                self.env
                    .borrow_mut()
                    .define(name, Value::Function(Rc::new(function)));
            }
            StatementKind::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, statement.line)?,
            StatementKind::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            StatementKind::Break => return Ok(Flow::Break),
            StatementKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    /// Executes `statements` in `env`, restoring the current scope afterwards
    /// even when a statement fails.
    pub fn execute_block(
        &mut self,
        statements: &[Statement],
        env: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        self.in_scope(env, |evaluator| {
            for statement in statements {
                match evaluator.execute(statement)? {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        })
    }

    fn in_scope<T>(
        &mut self,
        env: Rc<RefCell<Environment>>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }

    fn execute_for(
        &mut self,
        initializer: Option<&Statement>,
        condition: &Option<Expression>,
        increment: &Option<Expression>,
        body: &Statement,
    ) -> Result<Flow> {
        if let Some(initializer) = initializer {
            self.execute(initializer)?;
        }
        loop {
            if let Some(condition) = condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }
            match self.execute(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
            if let Some(increment) = increment {
                self.evaluate(increment)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &str,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
        line: usize,
    ) -> Result<()> {
        let superclass = match superclass {
            Some(expression) => match self.evaluate(expression)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(Error::new(
                        ErrorKind::TypeError,
                        line,
                        format!("superclass must be a class, got {}", other.type_name()),
                    ))
                }
            },
            None => None,
        };

        // Methods of a subclass close over a scope where `super` is the parent.
        let closure = match &superclass {
            Some(superclass) => {
                let env = Environment::new_enclosed_environment(self.env.clone());
                env.borrow_mut()
                    .define("super", Value::Class(superclass.clone()));
                env
            }
            None => self.env.clone(),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|declaration| {
                let method_name = declaration.name.clone().unwrap_or_default();
                let is_initializer = method_name == "init";
                let method = Function::new(declaration.clone(), closure.clone(), is_initializer);
                (method_name, Rc::new(method))
            })
            .collect();

        debug!(
            class = name,
            superclass = superclass.as_ref().map(|class| class.name.as_str()),
            methods = methods.len(),
            "declare class"
        );

        let class = Class {
            name: name.to_string(),
            superclass,
            methods,
        };
        self.env
            .borrow_mut()
            .define(name, Value::Class(Rc::new(class)));
        Ok(())
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expression(expression))
    }

    fn evaluate_expression(&mut self, expression: &Expression) -> Result<Value> {
        let line = expression.line;
        let value = match &expression.kind {
            ExpressionKind::Literal(literal) => match literal {
                LiteralValue::Number(value) => Value::Number(*value),
                LiteralValue::String(value) => Value::String(value.clone()),
                LiteralValue::Boolean(value) => Value::Boolean(*value),
                LiteralValue::Null => Value::Null,
            },
            ExpressionKind::Variable(name) => self.lookup(name, line)?,
            ExpressionKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.borrow_mut().assign(name, value.clone(), line)?;
                value
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_binary_expression(*operator, left, right, line)?
            }
            ExpressionKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                match operator {
                    LogicalOperator::And if !left.is_truthy() => left,
                    LogicalOperator::Or if left.is_truthy() => left,
                    _ => self.evaluate(right)?,
                }
            }
            ExpressionKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                eval_unary_expression(*operator, right, line)?
            }
            ExpressionKind::Call { callee, arguments } => {
                let callee = self.evaluate(callee)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument))
                    .collect::<Result<Vec<Value>>>()?;
                self.call_value(callee, arguments, line)?
            }
            ExpressionKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name).ok_or_else(|| {
                    Error::new(
                        ErrorKind::AttributeError,
                        line,
                        format!(
                            "'{}' instance has no attribute '{}'",
                            instance.class.name, name
                        ),
                    )
                })?,
                other => {
                    return Err(Error::new(
                        ErrorKind::TypeError,
                        line,
                        format!(
                            "only instances have attributes, got {} reading '{}'",
                            other.type_name(),
                            name
                        ),
                    ))
                }
            },
            ExpressionKind::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    value
                }
                other => {
                    return Err(Error::new(
                        ErrorKind::TypeError,
                        line,
                        format!(
                            "only instances have fields, got {} writing '{}'",
                            other.type_name(),
                            name
                        ),
                    ))
                }
            },
            ExpressionKind::Grouping(expression) => self.evaluate(expression)?,
            ExpressionKind::List(elements) => Value::list(
                elements
                    .iter()
                    .map(|element| self.evaluate(element))
                    .collect::<Result<Vec<Value>>>()?,
            ),
            ExpressionKind::Subscript { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                eval_index_expression(&object, &index, line)?
            }
            ExpressionKind::SubscriptSet {
                object,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                eval_index_assignment(&object, &index, value, line)?
            }
            ExpressionKind::Function(declaration) => Value::Function(Rc::new(Function::new(
                declaration.clone(),
                self.env.clone(),
                false,
            ))),
            ExpressionKind::This => self.lookup("this", line)?,
            ExpressionKind::Super { method } => self.eval_super(method, line)?,
        };
        Ok(value)
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value> {
        self.env.borrow().get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::NameError,
                line,
                format!("name '{}' is not defined", name),
            )
        })
    }

    fn eval_super(&self, method: &str, line: usize) -> Result<Value> {
        let (superclass, instance) = match (self.lookup("super", line)?, self.lookup("this", line)?)
        {
            (Value::Class(superclass), Value::Instance(instance)) => (superclass, instance),
            _ => {
                return Err(Error::new(
                    ErrorKind::RuntimeError,
                    line,
                    "'super' used outside of a bound method",
                ))
            }
        };
        match superclass.find_method(method) {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(instance)))),
            None => Err(Error::new(
                ErrorKind::AttributeError,
                line,
                format!(
                    "superclass '{}' has no method '{}'",
                    superclass.name, method
                ),
            )),
        }
    }

    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, line: usize) -> Result<Value> {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), line)?;
                self.call_function(&function, arguments, line)
            }
            Value::NativeFunction(native) => {
                if let Some(arity) = native.arity {
                    check_arity(arity, arguments.len(), line)?;
                }
                (native.func)(&arguments).map_err(|err| {
                    Error::new(
                        ErrorKind::RuntimeError,
                        line,
                        format!("error in native fn '{}': {}", native.name, err),
                    )
                })
            }
            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), line)?;
                let instance = Rc::new(Instance::new(class.clone()));
                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(instance.clone()), arguments, line)?;
                }
                Ok(Value::Instance(instance))
            }
            other => Err(Error::new(
                ErrorKind::TypeError,
                line,
                format!("'{}' value is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        if self.depth >= self.max_depth {
            warn!(depth = self.depth, function = %function, "recursion limit reached");
            return Err(Error::new(
                ErrorKind::RuntimeError,
                line,
                format!(
                    "stack overflow (maximum recursion depth {} exceeded)",
                    self.max_depth
                ),
            ));
        }

        let env = Environment::new_enclosed_environment(function.closure.clone());
        {
            let mut scope = env.borrow_mut();
            for (parameter, argument) in function.declaration.parameters.iter().zip(arguments) {
                scope.define(&parameter.name, argument);
            }
        }

        debug!(function = %function, depth = self.depth, line, "call");
        self.depth += 1;
        let result =
            ensure_sufficient_stack(|| self.execute_block(&function.declaration.body, env));
        self.depth -= 1;
        let flow = result?;

        if function.is_initializer {
            return Ok(function.closure.borrow().get("this").unwrap_or(Value::Null));
        }
        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected == got {
        return Ok(());
    }
    Err(Error::new(
        ErrorKind::RuntimeError,
        line,
        format!("expected {} arguments but got {}", expected, got),
    ))
}

fn eval_unary_expression(operator: UnaryOperator, right: Value, line: usize) -> Result<Value> {
    match (operator, right) {
        (UnaryOperator::Not, right) => Ok(Value::Boolean(!right.is_truthy())),
        (UnaryOperator::Negate, Value::Number(value)) => Ok(Value::Number(-value)),
        (UnaryOperator::Negate, right) => Err(Error::new(
            ErrorKind::TypeError,
            line,
            format!("bad operand type for unary -: '{}'", right.type_name()),
        )),
    }
}

fn eval_binary_expression(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    line: usize,
) -> Result<Value> {
    match (&left, &right) {
        (Value::Number(left), Value::Number(right)) => {
            eval_number_infix_expression(operator, *left, *right, line)
        }
        (Value::String(left), Value::String(right)) => {
            eval_string_infix_expression(operator, left, right, line)
        }
        _ => match operator {
            BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
            _ => Err(unsupported_operands(operator, &left, &right, line)),
        },
    }
}

fn eval_number_infix_expression(
    operator: BinaryOperator,
    left: f64,
    right: f64,
    line: usize,
) -> Result<Value> {
    let value = match operator {
        BinaryOperator::Add => Value::Number(left + right),
        BinaryOperator::Subtract => Value::Number(left - right),
        BinaryOperator::Multiply => Value::Number(left * right),
        BinaryOperator::Divide => {
            if right == 0.0 {
                return Err(Error::new(ErrorKind::ZeroDivisionError, line, "division by zero"));
            }
            Value::Number(left / right)
        }
        BinaryOperator::Modulo => {
            if right == 0.0 {
                return Err(Error::new(ErrorKind::ZeroDivisionError, line, "modulo by zero"));
            }
            let remainder = left % right;
            if remainder != 0.0 && (remainder < 0.0) != (right < 0.0) {
                Value::Number(remainder + right)
            } else {
                Value::Number(remainder)
            }
        }
        BinaryOperator::Power => Value::Number(left.powf(right)),
        BinaryOperator::Less => Value::Boolean(left < right),
        BinaryOperator::LessEqual => Value::Boolean(left <= right),
        BinaryOperator::Greater => Value::Boolean(left > right),
        BinaryOperator::GreaterEqual => Value::Boolean(left >= right),
        BinaryOperator::Equal => Value::Boolean(Value::Number(left) == Value::Number(right)),
        BinaryOperator::NotEqual => Value::Boolean(Value::Number(left) != Value::Number(right)),
    };
    Ok(value)
}

fn eval_string_infix_expression(
    operator: BinaryOperator,
    left: &str,
    right: &str,
    line: usize,
) -> Result<Value> {
    let value = match operator {
        BinaryOperator::Add => Value::String(format!("{}{}", left, right)),
        BinaryOperator::Less => Value::Boolean(left < right),
        BinaryOperator::LessEqual => Value::Boolean(left <= right),
        BinaryOperator::Greater => Value::Boolean(left > right),
        BinaryOperator::GreaterEqual => Value::Boolean(left >= right),
        BinaryOperator::Equal => Value::Boolean(left == right),
        BinaryOperator::NotEqual => Value::Boolean(left != right),
        _ => {
            return Err(unsupported_operands(
                operator,
                &Value::String(left.to_string()),
                &Value::String(right.to_string()),
                line,
            ))
        }
    };
    Ok(value)
}

fn unsupported_operands(operator: BinaryOperator, left: &Value, right: &Value, line: usize) -> Error {
    Error::new(
        ErrorKind::TypeError,
        line,
        format!(
            "unsupported operand types for {}: '{}' and '{}'",
            operator,
            left.type_name(),
            right.type_name()
        ),
    )
}

/// Resolves a possibly negative index against a sequence of `len` items.
fn resolve_index(index: &Value, len: usize, line: usize) -> Result<usize> {
    let index = match index {
        Value::Number(index) => *index,
        other => {
            return Err(Error::new(
                ErrorKind::TypeError,
                line,
                format!("indices must be numbers, got {}", other.type_name()),
            ))
        }
    };
    if index.fract() != 0.0 {
        return Err(Error::new(
            ErrorKind::TypeError,
            line,
            format!("indices must be integers, got {}", index),
        ));
    }
    let position = if index < 0.0 {
        index + len as f64
    } else {
        index
    };
    if position < 0.0 || position >= len as f64 {
        return Err(Error::new(
            ErrorKind::IndexError,
            line,
            format!("index {} out of range for length {}", index, len),
        ));
    }
    Ok(position as usize)
}

fn eval_index_expression(object: &Value, index: &Value, line: usize) -> Result<Value> {
    match object {
        Value::List(elements) => {
            let elements = elements.borrow();
            let position = resolve_index(index, elements.len(), line)?;
            Ok(elements[position].clone())
        }
        Value::String(value) => {
            let chars: Vec<char> = value.chars().collect();
            let position = resolve_index(index, chars.len(), line)?;
            Ok(Value::String(chars[position].to_string()))
        }
        other => Err(Error::new(
            ErrorKind::TypeError,
            line,
            format!("'{}' value is not subscriptable", other.type_name()),
        )),
    }
}

fn eval_index_assignment(object: &Value, index: &Value, value: Value, line: usize) -> Result<Value> {
    match object {
        Value::List(elements) => {
            let mut elements = elements.borrow_mut();
            let position = resolve_index(index, elements.len(), line)?;
            elements[position] = value.clone();
            Ok(value)
        }
        other => Err(Error::new(
            ErrorKind::TypeError,
            line,
            format!("'{}' value does not support item assignment", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{lexer::tokenize, parser::parse};

    fn test_eval(input: &str) -> Result<Value> {
        let program = match parse(tokenize(input)?) {
            Ok(program) => program,
            Err(errors) => panic!("parse errors for {:?}:\n{}", input, errors),
        };
        let mut evaluator = Evaluator::new(Config::default(), &Natives::prelude());
        evaluator.eval(&program)
    }

    fn assert_values(cases: Vec<(&str, Value)>) {
        for (input, expected) in cases {
            match test_eval(input) {
                Ok(value) => assert_eq!(value, expected, "input: {}", input),
                Err(err) => panic!("error evaluating {:?}: {}", input, err),
            }
        }
    }

    fn assert_errors(cases: Vec<(&str, ErrorKind, &str)>) {
        for (input, kind, message) in cases {
            match test_eval(input) {
                Ok(value) => panic!("expected {} for {:?}, got {}", kind, input, value),
                Err(err) => {
                    assert_eq!(err.kind, kind, "input: {}", input);
                    assert_eq!(err.message, message, "input: {}", input);
                }
            }
        }
    }

    fn number(value: f64) -> Value {
        Value::Number(value)
    }

    fn string(value: &str) -> Value {
        Value::String(value.to_string())
    }

    #[test]
    fn arithmetic() {
        assert_values(vec![
            ("5", number(5.0)),
            ("-5", number(-5.0)),
            ("--5", number(5.0)),
            ("2 + 3 * 4", number(14.0)),
            ("(2 + 3) * 4", number(20.0)),
            ("10 / 2", number(5.0)),
            ("7 / 2", number(3.5)),
            ("50 / 2 * 2 + 10 - 5", number(55.0)),
            ("7 % 3", number(1.0)),
            ("-7 % 3", number(2.0)),
            ("7 % -3", number(-2.0)),
            ("2 ** 10", number(1024.0)),
            ("2 ** 3 ** 2", number(512.0)),
            ("-2 ** 2", number(-4.0)),
            ("0.1 + 0.2", number(0.30000000000000004)),
        ]);
    }

    #[test]
    fn comparisons_and_equality() {
        assert_values(vec![
            ("1 < 2", Value::Boolean(true)),
            ("1 >= 2", Value::Boolean(false)),
            ("2 <= 2", Value::Boolean(true)),
            ("0.1 + 0.2 == 0.3", Value::Boolean(true)),
            ("1 == 1.0001", Value::Boolean(false)),
            ("\"abc\" < \"abd\"", Value::Boolean(true)),
            ("\"a\" == \"a\"", Value::Boolean(true)),
            ("null == null", Value::Boolean(true)),
            ("null == false", Value::Boolean(false)),
            ("0 == false", Value::Boolean(false)),
            ("\"1\" != 1", Value::Boolean(true)),
            ("[1, [2]] == [1, [2]]", Value::Boolean(true)),
            ("[1, 2] == [2, 1]", Value::Boolean(false)),
            ("\"a\" != \"b\"", Value::Boolean(true)),
            ("2 != 2.0", Value::Boolean(false)),
            ("[] == null", Value::Boolean(false)),
            ("len == len", Value::Boolean(true)),
            ("!true", Value::Boolean(false)),
            ("!0", Value::Boolean(true)),
            ("!\"\"", Value::Boolean(true)),
            ("![]", Value::Boolean(true)),
        ]);
    }

    #[test]
    fn strings() {
        assert_values(vec![
            ("\"Hello\" + \" \" + \"World!\"", string("Hello World!")),
            ("\"héllo\"[1]", string("é")),
            ("\"abc\"[-1]", string("c")),
            ("len(\"four\")", number(4.0)),
            ("str(12) + \"!\"", string("12!")),
        ]);
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_values(vec![
            ("false && (1 / 0 == 1)", Value::Boolean(false)),
            ("true || (1 / 0 == 1)", Value::Boolean(true)),
            ("null || \"fallback\"", string("fallback")),
            ("0 && 1", number(0.0)),
            ("1 && 2", number(2.0)),
        ]);
    }

    #[test]
    fn let_and_assignment() {
        assert_values(vec![
            ("let a = 5; a;", number(5.0)),
            ("let a = 5 * 5; a;", number(25.0)),
            ("let a = 5; let b = a; let c = a + b + 5; c;", number(15.0)),
            ("let a; a", Value::Null),
            ("let a = 1; a = a + 1; a", number(2.0)),
            ("let a = 1; let b = 2; a = b = 7; a + b", number(14.0)),
            ("const x = 3; x * 2", number(6.0)),
            ("let a = 1; let a = 2; a", number(2.0)),
        ]);
    }

    #[test]
    fn blocks_scope_declarations() {
        assert_values(vec![
            ("let a = 1; { let a = 2; } a", number(1.0)),
            ("let a = 1; { a = 2; } a", number(2.0)),
            ("let a = \"outer\"; { let a = \"inner\"; { a = \"changed\"; } } a", string("outer")),
        ]);
    }

    #[test]
    fn if_statements() {
        assert_values(vec![
            ("let r = 0; if (true) { r = 10; } r", number(10.0)),
            ("let r = 0; if (false) { r = 10; } r", number(0.0)),
            ("let r = 0; if (1) { r = 10; } r", number(10.0)),
            ("let r = 0; if (1 < 2) { r = 1; } else { r = 2; } r", number(1.0)),
            ("let r = 0; if (1 > 2) { r = 1; } else { r = 2; } r", number(2.0)),
            ("let r = 0; if (false) r = 1; else if (true) r = 3; r", number(3.0)),
        ]);
    }

    #[test]
    fn loops() {
        assert_values(vec![
            ("let i = 0; while (i < 10) { i = i + 1; } i", number(10.0)),
            (
                "let sum = 0; for (let i = 1; i <= 4; i = i + 1) { sum = sum + i; } sum",
                number(10.0),
            ),
            (
                "let sum = 0; for (let i = 0; i < 10; i = i + 1) { if (i % 2 == 0) continue; sum = sum + i; } sum",
                number(25.0),
            ),
            (
                "let i = 0; while (true) { i = i + 1; if (i == 5) break; } i",
                number(5.0),
            ),
            (
                "let n = 0; for (;;) { n = n + 1; if (n > 2) { break; } } n",
                number(3.0),
            ),
            (
                "let hits = 0; for (let i = 0; i < 3; i = i + 1) { for (let j = 0; j < 3; j = j + 1) { if (j == 1) break; hits = hits + 1; } } hits",
                number(3.0),
            ),
        ]);
    }

    #[test]
    fn for_initializer_is_scoped_to_the_loop() {
        assert_errors(vec![(
            "for (let i = 0; i < 1; i = i + 1) {} i",
            ErrorKind::NameError,
            "name 'i' is not defined",
        )]);
    }

    #[test]
    fn functions_and_returns() {
        assert_values(vec![
            ("fn identity(x) { return x; } identity(5)", number(5.0)),
            ("fn double(x) { x * 2; } double(5)", Value::Null),
            ("fn add(x, y) { return x + y; } add(5, add(5, 5))", number(15.0)),
            ("let add = fn(x, y) { return x + y; }; add(1, 2)", number(3.0)),
            ("fn(x) { return x; }(7)", number(7.0)),
            (
                "fn early(n) { while (true) { if (n > 3) { return n; } n = n + 1; } } early(0)",
                number(4.0),
            ),
            ("fn nothing() { return; } nothing()", Value::Null),
        ]);
    }

    #[test]
    fn closures() {
        assert_values(vec![
            (
                r#"
                fn makeCounter() {
                    let count = 0;
                    fn increment() {
                        count = count + 1;
                        return count;
                    }
                    return increment;
                }
                let counter = makeCounter();
                counter() + counter() + counter();
                "#,
                number(6.0),
            ),
            (
                r#"
                fn adder(x) { return fn(y) { return x + y; }; }
                let addTwo = adder(2);
                addTwo(3);
                "#,
                number(5.0),
            ),
            (
                r#"
                let a = "global";
                fn show() { return a; }
                let seen;
                {
                    let a = "local";
                    seen = show();
                }
                seen;
                "#,
                string("global"),
            ),
        ]);
    }

    #[test]
    fn recursion() {
        assert_values(vec![(
            r#"
            fn factorial(n) {
                if (n <= 1) { return 1; }
                return n * factorial(n - 1);
            }
            factorial(5);
            "#,
            number(120.0),
        )]);
    }

    #[test]
    fn lists() {
        assert_values(vec![
            ("[1, 2 * 2, 3 + 3]", Value::list(vec![number(1.0), number(4.0), number(6.0)])),
            ("[1, 2, 3][0]", number(1.0)),
            ("[1, 2, 3][2]", number(3.0)),
            ("[1, 2, 3][-1]", number(3.0)),
            ("let a = [1, 2, 3]; a[1] = 9; a", Value::list(vec![number(1.0), number(9.0), number(3.0)])),
            ("let a = [1]; let b = a; push(b, 2); len(a)", number(2.0)),
            ("let a = [1, 2]; pop(a) + len(a)", number(3.0)),
        ]);
    }

    #[test]
    fn classes() {
        assert_values(vec![
            (
                r#"
                class Point {
                    init(x, y) { this.x = x; this.y = y; }
                    sum() { return this.x + this.y; }
                }
                Point(3, 4).sum();
                "#,
                number(7.0),
            ),
            (
                r#"
                class Box { }
                let b = Box();
                b.value = 42;
                b.value;
                "#,
                number(42.0),
            ),
            (
                r#"
                class Greeter {
                    greet() { return "hi " + this.name; }
                }
                let g = Greeter();
                g.name = "Ada";
                let greet = g.greet;
                greet();
                "#,
                string("hi Ada"),
            ),
            (
                r#"
                class Animal {
                    init(name) { this.name = name; }
                    speak() { return this.name + " says"; }
                }
                class Dog : Animal {
                    speak() { return super.speak() + " woof"; }
                }
                Dog("Rex").speak();
                "#,
                string("Rex says woof"),
            ),
            (
                r#"
                class A { method() { return "A"; } }
                class B : A { method() { return "B"; } test() { return super.method(); } }
                class C : B { }
                C().test();
                "#,
                string("A"),
            ),
            (
                r#"
                class Thing {
                    init() { this.size = 1; return; }
                }
                let t = Thing();
                t.init() == t;
                "#,
                Value::Boolean(true),
            ),
            (
                r#"
                class Counted {
                    init(start) { this.count = start; return start * 2; }
                }
                Counted(3).count;
                "#,
                number(3.0),
            ),
            (
                r#"
                class Counted { init() { return "ignored"; } }
                let c = Counted();
                c.init() == c;
                "#,
                Value::Boolean(true),
            ),
            (
                r#"
                class Shadow { name() { return "method"; } }
                let s = Shadow();
                s.name = "field";
                s.name;
                "#,
                string("field"),
            ),
        ]);
    }

    #[test]
    fn runtime_errors() {
        assert_errors(vec![
            ("1 / 0", ErrorKind::ZeroDivisionError, "division by zero"),
            ("5 % 0", ErrorKind::ZeroDivisionError, "modulo by zero"),
            ("foobar", ErrorKind::NameError, "name 'foobar' is not defined"),
            ("x = 1;", ErrorKind::NameError, "cannot assign to undeclared name 'x'"),
            ("const c = 1; c = 2;", ErrorKind::ConstError, "cannot assign to constant 'c'"),
            (
                "5 + true",
                ErrorKind::TypeError,
                "unsupported operand types for +: 'number' and 'boolean'",
            ),
            (
                "\"a\" + 1",
                ErrorKind::TypeError,
                "unsupported operand types for +: 'string' and 'number'",
            ),
            (
                "\"a\" * \"b\"",
                ErrorKind::TypeError,
                "unsupported operand types for *: 'string' and 'string'",
            ),
            ("-\"a\"", ErrorKind::TypeError, "bad operand type for unary -: 'string'"),
            ("1 < \"2\"", ErrorKind::TypeError, "unsupported operand types for <: 'number' and 'string'"),
            ("let x = 1; x();", ErrorKind::TypeError, "'number' value is not callable"),
            ("fn f(a) { return a; } f(1, 2)", ErrorKind::RuntimeError, "expected 1 arguments but got 2"),
            ("class A {} A(1)", ErrorKind::RuntimeError, "expected 0 arguments but got 1"),
            ("class A {} A().missing", ErrorKind::AttributeError, "'A' instance has no attribute 'missing'"),
            ("let n = 1; n.x = 2;", ErrorKind::TypeError, "only instances have fields, got number writing 'x'"),
            ("[1, 2][2]", ErrorKind::IndexError, "index 2 out of range for length 2"),
            ("[1, 2][-3]", ErrorKind::IndexError, "index -3 out of range for length 2"),
            ("[1, 2][0.5]", ErrorKind::TypeError, "indices must be integers, got 0.5"),
            ("[1][\"0\"]", ErrorKind::TypeError, "indices must be numbers, got string"),
            ("5[0]", ErrorKind::TypeError, "'number' value is not subscriptable"),
            ("\"abc\"[0] = \"z\"", ErrorKind::TypeError, "'string' value does not support item assignment"),
            ("let x = 1; class B : x {}", ErrorKind::TypeError, "superclass must be a class, got number"),
            (
                "class A {} class B : A { f() { return super.g(); } } B().f()",
                ErrorKind::AttributeError,
                "superclass 'A' has no method 'g'",
            ),
            ("pop([])", ErrorKind::RuntimeError, "error in native fn 'pop': cannot pop from an empty list"),
            ("len(1, 2)", ErrorKind::RuntimeError, "expected 1 arguments but got 2"),
        ]);
    }

    #[test]
    fn errors_carry_the_line() {
        let err = test_eval("let a = 1;\nlet b = 2;\na + nope;").unwrap_err();
        assert_eq!(err.to_string(), "[line 3] NameError: name 'nope' is not defined");
    }

    #[test]
    fn recursion_limit() {
        let program = parse(tokenize("fn down(n) { return down(n + 1); } down(0);").unwrap()).unwrap();
        let mut evaluator = Evaluator::new(Config::default().with_max_call_depth(50), &Natives::new());
        let err = evaluator.eval(&program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RuntimeError);
        assert_eq!(err.message, "stack overflow (maximum recursion depth 50 exceeded)");
        assert_eq!(evaluator.depth, 0);
    }

    #[test]
    fn default_depth_handles_deep_recursion() {
        assert_values(vec![(
            "fn count(n) { if (n == 0) { return 0; } return 1 + count(n - 1); } count(900)",
            number(900.0),
        )]);
    }

    #[test]
    fn scope_is_restored_after_errors() {
        let program = parse(tokenize("let a = 1; { let a = 2; a / 0; }").unwrap()).unwrap();
        let mut evaluator = Evaluator::new(Config::default(), &Natives::new());
        assert!(evaluator.eval(&program).is_err());
        assert!(Rc::ptr_eq(&evaluator.env, &evaluator.globals));
        assert_eq!(evaluator.globals().borrow().get("a"), Some(number(1.0)));
    }
}
