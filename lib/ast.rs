use std::{fmt, rc::Rc};

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum StatementKind {
    Expression(Expression),
    Let {
        name: String,
        initializer: Option<Expression>,
        constant: bool,
    },
    Block(Vec<Statement>),
    If {
        condition: Expression,
        consequence: Box<Statement>,
        alternative: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    For {
        initializer: Option<Box<Statement>>,
        condition: Option<Expression>,
        increment: Option<Expression>,
        body: Box<Statement>,
    },
    Function(Rc<FunctionDecl>),
    Class {
        name: String,
        superclass: Option<Expression>,
        methods: Vec<Rc<FunctionDecl>>,
    },
    Return(Option<Expression>),
    Break,
    Continue,
}

impl Statement {
    pub fn new(kind: StatementKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            StatementKind::Expression(expression) => write!(f, "{}", expression),
            StatementKind::Let {
                name,
                initializer,
                constant,
            } => {
                let keyword = if *constant { "const" } else { "let" };
                match initializer {
                    Some(value) => write!(f, "{} {} = {};", keyword, name, value),
                    None => write!(f, "{} {};", keyword, name),
                }
            }
            StatementKind::Block(statements) => {
                write!(f, "{{ ")?;
                for statement in statements {
                    write!(f, "{} ", statement)?;
                }
                write!(f, "}}")
            }
            StatementKind::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            StatementKind::While { condition, body } => write!(f, "while {} {}", condition, body),
            StatementKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                write!(f, "for (")?;
                match initializer {
                    Some(initializer) => write!(f, "{}", initializer)?,
                    None => write!(f, ";")?,
                }
                if let Some(condition) = condition {
                    write!(f, " {}", condition)?;
                }
                write!(f, ";")?;
                if let Some(increment) = increment {
                    write!(f, " {}", increment)?;
                }
                write!(f, ") {}", body)
            }
            StatementKind::Function(declaration) => write!(f, "{}", declaration),
            StatementKind::Class {
                name,
                superclass,
                methods,
            } => {
                write!(f, "class {}", name)?;
                if let Some(superclass) = superclass {
                    write!(f, " : {}", superclass)?;
                }
                write!(f, " {{ ")?;
                for method in methods {
                    write!(f, "{} ", method)?;
                }
                write!(f, "}}")
            }
            StatementKind::Return(Some(value)) => write!(f, "return {};", value),
            StatementKind::Return(None) => write!(f, "return;"),
            StatementKind::Break => write!(f, "break;"),
            StatementKind::Continue => write!(f, "continue;"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
}

/// A named declaration, class method or anonymous `fn` literal.
///
/// Shared by every function value created from it.
#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub body: Vec<Statement>,
    pub line: usize,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| match &parameter.annotation {
                Some(annotation) => format!("{}: {}", parameter.name, annotation),
                None => parameter.name.clone(),
            })
            .collect::<Vec<String>>()
            .join(", ");
        match &self.name {
            Some(name) => write!(f, "fn {}({})", name, parameters)?,
            None => write!(f, "fn({})", parameters)?,
        }
        if let Some(return_type) = &self.return_type {
            write!(f, " -> {}", return_type)?;
        }
        write!(f, " {{ ")?;
        for statement in &self.body {
            write!(f, "{} ", statement)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub line: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExpressionKind {
    Literal(LiteralValue),
    Variable(String),
    Assign {
        name: String,
        value: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Logical {
        left: Box<Expression>,
        operator: LogicalOperator,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Get {
        object: Box<Expression>,
        name: String,
    },
    Set {
        object: Box<Expression>,
        name: String,
        value: Box<Expression>,
    },
    Grouping(Box<Expression>),
    List(Vec<Expression>),
    Subscript {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    SubscriptSet {
        object: Box<Expression>,
        index: Box<Expression>,
        value: Box<Expression>,
    },
    Function(Rc<FunctionDecl>),
    This,
    Super {
        method: String,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Literal(LiteralValue::Number(value)) => write!(f, "{}", value),
            ExpressionKind::Literal(LiteralValue::String(value)) => write!(f, "{:?}", value),
            ExpressionKind::Literal(LiteralValue::Boolean(value)) => write!(f, "{}", value),
            ExpressionKind::Literal(LiteralValue::Null) => write!(f, "null"),
            ExpressionKind::Variable(name) => write!(f, "{}", name),
            ExpressionKind::Assign { name, value } => write!(f, "({} = {})", name, value),
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ExpressionKind::Logical {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ExpressionKind::Unary { operator, right } => write!(f, "({}{})", operator, right),
            ExpressionKind::Call { callee, arguments } => {
                write!(f, "{}({})", callee, join(arguments))
            }
            ExpressionKind::Get { object, name } => write!(f, "{}.{}", object, name),
            ExpressionKind::Set {
                object,
                name,
                value,
            } => write!(f, "({}.{} = {})", object, name, value),
            ExpressionKind::Grouping(expression) => write!(f, "{}", expression),
            ExpressionKind::List(elements) => write!(f, "[{}]", join(elements)),
            ExpressionKind::Subscript { object, index } => write!(f, "({}[{}])", object, index),
            ExpressionKind::SubscriptSet {
                object,
                index,
                value,
            } => write!(f, "({}[{}] = {})", object, index, value),
            ExpressionKind::Function(declaration) => write!(f, "{}", declaration),
            ExpressionKind::This => write!(f, "this"),
            ExpressionKind::Super { method } => write!(f, "super.{}", method),
        }
    }
}

fn join(expressions: &[Expression]) -> String {
    expressions
        .iter()
        .map(|expression| expression.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
