mod builtins;
mod environment;
mod evaluator;
mod value;

pub use builtins::{NativeFn, NativeFunction, Natives};
pub use environment::Environment;
pub use evaluator::{Evaluator, Flow};
pub use value::{Class, Function, Instance, Value};

use crate::{
    ast::Program,
    config::Config,
    error::Errors,
    lexer::tokenize,
    parser::Parser,
};

/// Runs source text against a global scope that persists between calls.
pub struct Interpreter {
    evaluator: Evaluator,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_natives(config, Natives::prelude())
    }

    pub fn with_natives(config: Config, natives: Natives) -> Self {
        Self {
            evaluator: Evaluator::new(config, &natives),
        }
    }

    /// Lexes, parses and runs `input`, returning the value of the last
    /// expression statement.
    pub fn run(&mut self, input: &str) -> Result<Value, Errors> {
        let program = Self::compile(input)?;
        Ok(self.evaluator.eval(&program)?)
    }

    /// Like [`Interpreter::run`], but hands every non-null top-level expression
    /// value to `on_value` as soon as its statement finishes.
    pub fn run_each(&mut self, input: &str, mut on_value: impl FnMut(&Value)) -> Result<(), Errors> {
        let program = Self::compile(input)?;
        for statement in &program.statements {
            if let Some(value) = self.evaluator.execute_top_level(statement)? {
                if value != Value::Null {
                    on_value(&value);
                }
            }
        }
        Ok(())
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.evaluator.globals().borrow().get(name)
    }

    fn compile(input: &str) -> Result<Program, Errors> {
        let tokens = tokenize(input)?;
        Parser::new(tokens).parse_program()
    }
}
