use tracing::trace;

use crate::{
    error::{Error, ErrorKind, Result},
    token::{Literal, Token, TokenKind},
};

/// Tokenizes a whole source text, always ending with a single `Eof` token.
///
/// Lexing stops at the first malformed token.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    char: Option<char>,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let char = chars.first().copied();
        Self {
            chars,
            position: 0,
            char,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let (line, column) = (self.line, self.column);

        let char = match self.char {
            Some(char) => char,
            None => return Ok(Token::new(TokenKind::Eof, "", line, column)),
        };

        let token = match char {
            '=' if self.is_next_char('=') => self.symbol(TokenKind::Eq, 2),
            '=' => self.symbol(TokenKind::Assign, 1),
            '!' if self.is_next_char('=') => self.symbol(TokenKind::NotEq, 2),
            '!' => self.symbol(TokenKind::Bang, 1),
            '<' if self.is_next_char('=') => self.symbol(TokenKind::LtEq, 2),
            '<' => self.symbol(TokenKind::Lt, 1),
            '>' if self.is_next_char('=') => self.symbol(TokenKind::GtEq, 2),
            '>' => self.symbol(TokenKind::Gt, 1),
            '&' if self.is_next_char('&') => self.symbol(TokenKind::And, 2),
            '|' if self.is_next_char('|') => self.symbol(TokenKind::Or, 2),
            '-' if self.is_next_char('>') => self.symbol(TokenKind::Arrow, 2),
            '-' => self.symbol(TokenKind::Minus, 1),
            '*' if self.is_next_char('*') => self.symbol(TokenKind::Power, 2),
            '*' => self.symbol(TokenKind::Asterisk, 1),
            '+' => self.symbol(TokenKind::Plus, 1),
            '/' => self.symbol(TokenKind::Slash, 1),
            '%' => self.symbol(TokenKind::Percent, 1),
            ';' => self.symbol(TokenKind::Semicolon, 1),
            ',' => self.symbol(TokenKind::Comma, 1),
            '.' => self.symbol(TokenKind::Dot, 1),
            ':' => self.symbol(TokenKind::Colon, 1),
            '(' => self.symbol(TokenKind::Lparen, 1),
            ')' => self.symbol(TokenKind::Rparen, 1),
            '{' => self.symbol(TokenKind::Lbrace, 1),
            '}' => self.symbol(TokenKind::Rbrace, 1),
            '[' => self.symbol(TokenKind::Lbracket, 1),
            ']' => self.symbol(TokenKind::Rbracket, 1),
            '"' => self.read_string()?,
            _ if char.is_ascii_digit() => self.read_number()?,
            _ if char.is_ascii_alphabetic() || char == '_' => self.read_identifier(),
            _ => {
                return Err(Error::new(
                    ErrorKind::LexError,
                    line,
                    format!("unexpected character '{}' at column {}", char, column),
                ))
            }
        };

        trace!(kind = ?token.kind, lexeme = %token.lexeme, line, column, "token");

        Ok(token)
    }

    fn read_char(&mut self) {
        if self.char == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
        self.char = self.chars.get(self.position).copied();
    }

    fn is_next_char(&self, ch: char) -> bool {
        self.chars.get(self.position + 1).eq(&Some(&ch))
    }

    fn read_while(&mut self, condition: impl Fn(char) -> bool) -> String {
        let mut literal = String::new();
        while let Some(char) = self.char {
            if !condition(char) {
                break;
            }
            literal.push(char);
            self.read_char();
        }
        literal
    }

    fn symbol(&mut self, kind: TokenKind, width: usize) -> Token {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::with_capacity(width);
        for _ in 0..width {
            if let Some(char) = self.char {
                lexeme.push(char);
            }
            self.read_char();
        }
        Token::new(kind, lexeme, line, column)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(char) = self.char {
            match char {
                ' ' | '\t' | '\r' | '\n' => self.read_char(),
                '/' if self.is_next_char('/') => {
                    self.read_while(|char| char != '\n');
                }
                '/' if self.is_next_char('*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let line = self.line;
        self.read_char();
        self.read_char();
        loop {
            match self.char {
                Some('*') if self.is_next_char('/') => {
                    self.read_char();
                    self.read_char();
                    return Ok(());
                }
                Some(_) => self.read_char(),
                None => {
                    return Err(Error::new(
                        ErrorKind::LexError,
                        line,
                        "unterminated block comment",
                    ))
                }
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let literal = self.read_while(|char| char.is_ascii_alphanumeric() || char == '_');
        let kind = TokenKind::keyword(&literal).unwrap_or(TokenKind::Identifier);
        Token::new(kind, literal, line, column)
    }

    fn read_number(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let mut literal = self.read_while(|char| char.is_ascii_digit());

        if self.char == Some('.')
            && self
                .chars
                .get(self.position + 1)
                .is_some_and(|char| char.is_ascii_digit())
        {
            self.read_char();
            literal.push('.');
            literal.push_str(&self.read_while(|char| char.is_ascii_digit()));
        }

        let value = literal.parse::<f64>().map_err(|err| {
            Error::new(
                ErrorKind::LexError,
                line,
                format!("invalid number literal '{}': {}", literal, err),
            )
        })?;

        Ok(Token::new(TokenKind::Number, literal, line, column).with_literal(Literal::Number(value)))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let start = self.position;
        let unterminated = || Error::new(ErrorKind::LexError, line, "unterminated string");

        self.read_char();

        let mut value = String::new();
        loop {
            match self.char {
                None | Some('\n') => return Err(unterminated()),
                Some('"') => {
                    self.read_char();
                    break;
                }
                Some('\\') => {
                    self.read_char();
                    let escaped = match self.char {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\n') | None => return Err(unterminated()),
                        Some(other) => {
                            return Err(Error::new(
                                ErrorKind::LexError,
                                self.line,
                                format!("invalid escape sequence '\\{}'", other),
                            ))
                        }
                    };
                    value.push(escaped);
                    self.read_char();
                }
                Some(char) => {
                    value.push(char);
                    self.read_char();
                }
            }
        }

        let lexeme: String = self.chars[start..self.position].iter().collect();
        Ok(Token::new(TokenKind::String, lexeme, line, column).with_literal(Literal::String(value)))
    }
}
