pub mod ast;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

mod stack;

pub use config::Config;
pub use error::{Error, ErrorKind, Errors};
pub use interpreter::{Interpreter, Natives, Value};
pub use lexer::{tokenize, Lexer};
pub use parser::Parser;
