use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    SyntaxError,
    NameError,
    ConstError,
    TypeError,
    ZeroDivisionError,
    IndexError,
    AttributeError,
    RuntimeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::LexError => "LexError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::NameError => "NameError",
            ErrorKind::ConstError => "ConstError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::RuntimeError => "RuntimeError",
        };
        write!(f, "{}", name)
    }
}

/// A single diagnostic, tagged with the source line it was raised on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] {kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub line: usize,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    /// Lex and syntax errors are reported before anything runs.
    pub fn is_static(&self) -> bool {
        matches!(self.kind, ErrorKind::LexError | ErrorKind::SyntaxError)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Every diagnostic collected by one pass, in source order.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn new(errors: Vec<Error>) -> Self {
        Self(errors)
    }

    pub fn first(&self) -> Option<&Error> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_static(&self) -> bool {
        self.0.iter().all(Error::is_static)
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let lines = self
            .0
            .iter()
            .map(|error| error.to_string())
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{}", lines)
    }
}
