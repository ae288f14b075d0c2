use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::{
        BinaryOperator, Expression, ExpressionKind, FunctionDecl, LiteralValue, LogicalOperator,
        Parameter, Program, Statement, StatementKind, UnaryOperator,
    },
    error::{Error, ErrorKind, Errors, Result},
    stack::ensure_sufficient_stack,
    token::{Literal, Token, TokenKind},
};

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialOrd, PartialEq, Eq, Ord)]
enum Precedence {
    Lowest,
    Assign,
    Or,
    And,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Power,
    Call,
}

impl Precedence {
    fn from_token(token: &Token) -> Self {
        match token.kind {
            TokenKind::Assign => Precedence::Assign,
            TokenKind::Or => Precedence::Or,
            TokenKind::And => Precedence::And,
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                Precedence::LessGreater
            }
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
            TokenKind::Power => Precedence::Power,
            TokenKind::Lparen | TokenKind::Dot | TokenKind::Lbracket => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassContext {
    None,
    Class,
    Subclass,
}

/// Parses a token stream into a program, collecting every syntax error.
pub fn parse(tokens: Vec<Token>) -> std::result::Result<Program, Errors> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<Error>,
    loop_depth: usize,
    function_depth: usize,
    class_context: ClassContext,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|token| token.is(TokenKind::Eof)) {
            let line = tokens.last().map_or(1, |token| token.line);
            tokens.push(Token::new(TokenKind::Eof, "", line, 1));
        }
        Self {
            tokens,
            position: 0,
            errors: Vec::new(),
            loop_depth: 0,
            function_depth: 0,
            class_context: ClassContext::None,
        }
    }

    /// Parses the whole program. Any syntax error discards the tree and returns
    /// every diagnostic collected along the way.
    pub fn parse_program(&mut self) -> std::result::Result<Program, Errors> {
        let (program, errors) = self.parse_with_recovery();
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(Errors::new(errors))
        }
    }

    /// Parses every statement it can, skipping malformed ones.
    pub fn parse_with_recovery(&mut self) -> (Program, Vec<Error>) {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.cur_token().is(TokenKind::Eof) {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        (Program { statements }, std::mem::take(&mut self.errors))
    }

    fn cur_token(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    fn peek_token(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + 1).min(last)]
    }

    fn next_token(&mut self) -> Token {
        let token = self.cur_token().clone();
        if !token.is(TokenKind::Eof) {
            self.position += 1;
        }
        token
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur_token().is(kind)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.cur_is(kind) {
            Ok(self.next_token())
        } else {
            Err(self.error_at_current(&format!("expected {}", expected)))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        Ok(self.expect(TokenKind::Identifier, expected)?.lexeme)
    }

    fn error_at_current(&self, message: &str) -> Error {
        let token = self.cur_token();
        Error::new(
            ErrorKind::SyntaxError,
            token.line,
            format!("{}, found {}", message, token),
        )
    }

    /// Records an error that does not leave the parser out of step with the
    /// token stream, so no synchronization is needed.
    fn report(&mut self, line: usize, message: impl Into<String>) {
        let error = Error::new(ErrorKind::SyntaxError, line, message);
        debug!(%error, "syntax error");
        self.errors.push(error);
    }

    fn synchronize(&mut self) {
        let mut previous = self.next_token();
        while !self.cur_is(TokenKind::Eof) {
            if previous.is(TokenKind::Semicolon) {
                break;
            }
            let kind = self.cur_token().kind;
            if kind.starts_statement() || kind == TokenKind::Rbrace {
                break;
            }
            previous = self.next_token();
        }
        debug!(line = self.cur_token().line, resume = %self.cur_token(), "synchronized");
    }

    fn declaration(&mut self) -> Option<Statement> {
        ensure_sufficient_stack(|| match self.parse_declaration() {
            Ok(statement) => Some(statement),
            Err(error) => {
                debug!(%error, "syntax error");
                self.errors.push(error);
                self.synchronize();
                None
            }
        })
    }

    fn parse_declaration(&mut self) -> Result<Statement> {
        match self.cur_token().kind {
            TokenKind::Function if self.peek_token().is(TokenKind::Identifier) => {
                self.parse_function_declaration()
            }
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::Let | TokenKind::Const => self.parse_let_statement(),
            _ => self.parse_statement(),
        }
    }

    fn parse_function_declaration(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        let name = self.expect_identifier("function name")?;
        let declaration = self.parse_function(Some(name), line)?;
        Ok(Statement::new(
            StatementKind::Function(Rc::new(declaration)),
            line,
        ))
    }

    fn parse_class_declaration(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        let name = self.expect_identifier("class name")?;

        let superclass = if self.cur_is(TokenKind::Colon) {
            self.next_token();
            let token = self.expect(TokenKind::Identifier, "superclass name")?;
            if token.lexeme == name {
                self.report(token.line, format!("class '{}' can't inherit from itself", name));
            }
            Some(Expression::new(
                ExpressionKind::Variable(token.lexeme),
                token.line,
            ))
        } else {
            None
        };

        self.expect(TokenKind::Lbrace, "'{' before class body")?;

        let enclosing = self.class_context;
        self.class_context = if superclass.is_some() {
            ClassContext::Subclass
        } else {
            ClassContext::Class
        };
        let methods = self.parse_methods();
        self.class_context = enclosing;
        let methods = methods?;

        self.expect(TokenKind::Rbrace, "'}' after class body")?;

        Ok(Statement::new(
            StatementKind::Class {
                name,
                superclass,
                methods,
            },
            line,
        ))
    }

    fn parse_methods(&mut self) -> Result<Vec<Rc<FunctionDecl>>> {
        let mut methods = Vec::new();
        while !self.cur_is(TokenKind::Rbrace) && !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Function) {
                self.next_token();
            }
            let line = self.cur_token().line;
            let name = self.expect_identifier("method name")?;
            methods.push(Rc::new(self.parse_function(Some(name), line)?));
        }
        Ok(methods)
    }

    fn parse_function(&mut self, name: Option<String>, line: usize) -> Result<FunctionDecl> {
        self.expect(TokenKind::Lparen, "'(' before parameters")?;

        let mut parameters = Vec::new();
        if !self.cur_is(TokenKind::Rparen) {
            loop {
                if parameters.len() >= MAX_ARGUMENTS {
                    let line = self.cur_token().line;
                    self.report(
                        line,
                        format!("can't have more than {} parameters", MAX_ARGUMENTS),
                    );
                }
                let name = self.expect_identifier("parameter name")?;
                let annotation = self.parse_annotation()?;
                parameters.push(Parameter { name, annotation });
                if !self.cur_is(TokenKind::Comma) {
                    break;
                }
                self.next_token();
            }
        }
        self.expect(TokenKind::Rparen, "')' after parameters")?;

        let return_type = if self.cur_is(TokenKind::Arrow) {
            self.next_token();
            Some(self.expect_identifier("return type")?)
        } else {
            None
        };

        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;

        Ok(FunctionDecl {
            name,
            parameters,
            return_type,
            body: body?,
            line,
        })
    }

    /// Type annotations are accepted and kept on the tree but never checked.
    fn parse_annotation(&mut self) -> Result<Option<String>> {
        if !self.cur_is(TokenKind::Colon) {
            return Ok(None);
        }
        self.next_token();
        Ok(Some(self.expect_identifier("type name")?))
    }

    fn parse_let_statement(&mut self) -> Result<Statement> {
        let keyword = self.next_token();
        let constant = keyword.is(TokenKind::Const);
        let name = self.expect_identifier("variable name")?;
        self.parse_annotation()?;

        let initializer = if self.cur_is(TokenKind::Assign) {
            self.next_token();
            Some(self.parse_expression(Precedence::Lowest)?)
        } else {
            None
        };

        if constant && initializer.is_none() {
            self.report(
                keyword.line,
                format!("const declaration of '{}' requires an initializer", name),
            );
        }

        self.expect_terminator("variable declaration")?;

        Ok(Statement::new(
            StatementKind::Let {
                name,
                initializer,
                constant,
            },
            keyword.line,
        ))
    }

    /// A statement ends with `;`, which may be left out right before a closing
    /// brace or the end of input.
    fn expect_terminator(&mut self, after: &str) -> Result<()> {
        match self.cur_token().kind {
            TokenKind::Semicolon => {
                self.next_token();
                Ok(())
            }
            TokenKind::Rbrace | TokenKind::Eof => Ok(()),
            _ => Err(self.error_at_current(&format!("expected ';' after {}", after))),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        ensure_sufficient_stack(|| match self.cur_token().kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break | TokenKind::Continue => self.parse_loop_control(),
            TokenKind::Lbrace => {
                let line = self.cur_token().line;
                Ok(Statement::new(StatementKind::Block(self.parse_block()?), line))
            }
            _ => self.parse_expression_statement(),
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>> {
        self.expect(TokenKind::Lbrace, "'{'")?;

        let mut statements: Vec<Statement> = Vec::new();
        while !self.cur_is(TokenKind::Rbrace) && !self.cur_is(TokenKind::Eof) {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.expect(TokenKind::Rbrace, "'}' after block")?;

        Ok(statements)
    }

    fn parse_if_statement(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        self.expect(TokenKind::Lparen, "'(' after 'if'")?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::Rparen, "')' after if condition")?;

        let consequence = Box::new(self.parse_statement()?);

        let alternative = if self.cur_is(TokenKind::Else) {
            self.next_token();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::If {
                condition,
                consequence,
                alternative,
            },
            line,
        ))
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        self.expect(TokenKind::Lparen, "'(' after 'while'")?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::Rparen, "')' after while condition")?;
        let body = self.parse_loop_body()?;

        Ok(Statement::new(StatementKind::While { condition, body }, line))
    }

    fn parse_for_statement(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        self.expect(TokenKind::Lparen, "'(' after 'for'")?;

        let initializer = match self.cur_token().kind {
            TokenKind::Semicolon => {
                self.next_token();
                None
            }
            TokenKind::Let | TokenKind::Const => Some(Box::new(self.parse_let_statement()?)),
            _ => Some(Box::new(self.parse_expression_statement()?)),
        };

        let condition = if self.cur_is(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.expect(TokenKind::Semicolon, "';' after loop condition")?;

        let increment = if self.cur_is(TokenKind::Rparen) {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.expect(TokenKind::Rparen, "')' after for clauses")?;

        let body = self.parse_loop_body()?;

        Ok(Statement::new(
            StatementKind::For {
                initializer,
                condition,
                increment,
                body,
            },
            line,
        ))
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        let line = self.next_token().line;
        if self.function_depth == 0 {
            self.report(line, "can't return from top-level code");
        }

        let value = match self.cur_token().kind {
            TokenKind::Semicolon | TokenKind::Rbrace | TokenKind::Eof => None,
            _ => Some(self.parse_expression(Precedence::Lowest)?),
        };

        self.expect_terminator("return value")?;

        Ok(Statement::new(StatementKind::Return(value), line))
    }

    fn parse_loop_control(&mut self) -> Result<Statement> {
        let token = self.next_token();
        if self.loop_depth == 0 {
            self.report(token.line, format!("'{}' outside of a loop", token.lexeme));
        }
        self.expect_terminator(&format!("'{}'", token.lexeme))?;

        let kind = match token.kind {
            TokenKind::Break => StatementKind::Break,
            _ => StatementKind::Continue,
        };
        Ok(Statement::new(kind, token.line))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let line = self.cur_token().line;
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_terminator("expression")?;
        Ok(Statement::new(StatementKind::Expression(expression), line))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression> {
        ensure_sufficient_stack(|| {
            let mut left_exp = self.parse_prefix()?;

            while precedence < Precedence::from_token(self.cur_token()) {
                let token = self.next_token();
                left_exp = match token.kind {
                    TokenKind::Assign => self.parse_assignment(left_exp, token)?,
                    TokenKind::And | TokenKind::Or => self.parse_logical_expression(left_exp, token)?,
                    TokenKind::Lparen => self.parse_call_expression(left_exp, token)?,
                    TokenKind::Dot => {
                        let name = self.expect_identifier("property name after '.'")?;
                        Expression::new(
                            ExpressionKind::Get {
                                object: Box::new(left_exp),
                                name,
                            },
                            token.line,
                        )
                    }
                    TokenKind::Lbracket => {
                        let index = self.parse_expression(Precedence::Lowest)?;
                        self.expect(TokenKind::Rbracket, "']' after index")?;
                        Expression::new(
                            ExpressionKind::Subscript {
                                object: Box::new(left_exp),
                                index: Box::new(index),
                            },
                            token.line,
                        )
                    }
                    _ => self.parse_infix_expression(left_exp, token)?,
                };
            }

            Ok(left_exp)
        })
    }

    fn parse_prefix(&mut self) -> Result<Expression> {
        let line = self.cur_token().line;
        let kind = match self.cur_token().kind {
            TokenKind::Number | TokenKind::String => {
                let token = self.next_token();
                match token.literal {
                    Some(Literal::Number(value)) => {
                        ExpressionKind::Literal(LiteralValue::Number(value))
                    }
                    Some(Literal::String(value)) => {
                        ExpressionKind::Literal(LiteralValue::String(value))
                    }
                    None => {
                        return Err(Error::new(
                            ErrorKind::SyntaxError,
                            token.line,
                            format!("literal {} carries no value", token),
                        ))
                    }
                }
            }
            TokenKind::True | TokenKind::False => {
                let token = self.next_token();
                ExpressionKind::Literal(LiteralValue::Boolean(token.is(TokenKind::True)))
            }
            TokenKind::Null => {
                self.next_token();
                ExpressionKind::Literal(LiteralValue::Null)
            }
            TokenKind::Identifier => ExpressionKind::Variable(self.next_token().lexeme),
            TokenKind::This => {
                self.next_token();
                if self.class_context == ClassContext::None {
                    self.report(line, "can't use 'this' outside of a class");
                }
                ExpressionKind::This
            }
            TokenKind::Super => {
                self.next_token();
                match self.class_context {
                    ClassContext::None => {
                        self.report(line, "can't use 'super' outside of a class")
                    }
                    ClassContext::Class => {
                        self.report(line, "can't use 'super' in a class with no superclass")
                    }
                    ClassContext::Subclass => {}
                }
                self.expect(TokenKind::Dot, "'.' after 'super'")?;
                let method = self.expect_identifier("superclass method name")?;
                ExpressionKind::Super { method }
            }
            TokenKind::Bang | TokenKind::Minus => {
                let token = self.next_token();
                let operator = if token.is(TokenKind::Bang) {
                    UnaryOperator::Not
                } else {
                    UnaryOperator::Negate
                };
                let right = self.parse_expression(Precedence::Prefix)?;
                ExpressionKind::Unary {
                    operator,
                    right: Box::new(right),
                }
            }
            TokenKind::Lparen => {
                self.next_token();
                let expression = self.parse_expression(Precedence::Lowest)?;
                self.expect(TokenKind::Rparen, "')' after expression")?;
                ExpressionKind::Grouping(Box::new(expression))
            }
            TokenKind::Lbracket => {
                self.next_token();
                ExpressionKind::List(self.parse_expression_list(TokenKind::Rbracket, "']'")?)
            }
            TokenKind::Function => {
                self.next_token();
                ExpressionKind::Function(Rc::new(self.parse_function(None, line)?))
            }
            TokenKind::Async | TokenKind::Await => {
                return Err(self.error_at_current("reserved keyword is not supported"))
            }
            _ => return Err(self.error_at_current("expected expression")),
        };
        Ok(Expression::new(kind, line))
    }

    fn parse_infix_expression(&mut self, left: Expression, token: Token) -> Result<Expression> {
        let operator = match token.kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::Asterisk => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Percent => BinaryOperator::Modulo,
            TokenKind::Power => BinaryOperator::Power,
            TokenKind::Eq => BinaryOperator::Equal,
            TokenKind::NotEq => BinaryOperator::NotEqual,
            TokenKind::Lt => BinaryOperator::Less,
            TokenKind::LtEq => BinaryOperator::LessEqual,
            TokenKind::Gt => BinaryOperator::Greater,
            TokenKind::GtEq => BinaryOperator::GreaterEqual,
            _ => {
                return Err(Error::new(
                    ErrorKind::SyntaxError,
                    token.line,
                    format!("unexpected operator {}", token),
                ))
            }
        };

        // `**` binds to the right: its operand is parsed one level lower.
        let precedence = match operator {
            BinaryOperator::Power => Precedence::Prefix,
            _ => Precedence::from_token(&token),
        };
        let right = self.parse_expression(precedence)?;

        Ok(Expression::new(
            ExpressionKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            token.line,
        ))
    }

    fn parse_logical_expression(&mut self, left: Expression, token: Token) -> Result<Expression> {
        let operator = if token.is(TokenKind::And) {
            LogicalOperator::And
        } else {
            LogicalOperator::Or
        };
        let right = self.parse_expression(Precedence::from_token(&token))?;
        Ok(Expression::new(
            ExpressionKind::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            token.line,
        ))
    }

    fn parse_assignment(&mut self, target: Expression, token: Token) -> Result<Expression> {
        let value = Box::new(self.parse_expression(Precedence::Lowest)?);
        let line = target.line;
        let kind = match target.kind {
            ExpressionKind::Variable(name) => ExpressionKind::Assign { name, value },
            ExpressionKind::Get { object, name } => ExpressionKind::Set {
                object,
                name,
                value,
            },
            ExpressionKind::Subscript { object, index } => ExpressionKind::SubscriptSet {
                object,
                index,
                value,
            },
            other => {
                self.report(token.line, "invalid assignment target");
                return Ok(Expression::new(other, line));
            }
        };
        Ok(Expression::new(kind, line))
    }

    fn parse_call_expression(&mut self, callee: Expression, token: Token) -> Result<Expression> {
        let arguments = self.parse_expression_list(TokenKind::Rparen, "')' after arguments")?;
        if arguments.len() > MAX_ARGUMENTS {
            self.report(
                token.line,
                format!("can't have more than {} arguments", MAX_ARGUMENTS),
            );
        }
        Ok(Expression::new(
            ExpressionKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            token.line,
        ))
    }

    /// Parses comma-separated expressions up to `end`; the opening delimiter
    /// has already been consumed. A trailing comma is allowed.
    fn parse_expression_list(&mut self, end: TokenKind, expected: &str) -> Result<Vec<Expression>> {
        let mut expressions: Vec<Expression> = Vec::new();

        while !self.cur_is(end) {
            expressions.push(self.parse_expression(Precedence::Lowest)?);
            if !self.cur_is(TokenKind::Comma) {
                break;
            }
            self.next_token();
        }

        self.expect(end, expected)?;

        Ok(expressions)
    }
}
