use std::{fmt, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::ast::Token;

static UUID_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

const UUID_LEN: usize = 36;

/// Location of a token in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Character offset from the start of the input
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised while splitting query text into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated string starting at {0}")]
    UnterminatedString(Position),

    #[error("Unbalanced parenthesis: unexpected ')' at {0}")]
    UnexpectedCloseParen(Position),

    #[error("Unbalanced parenthesis: '(' at {0} is never closed")]
    UnclosedParen(Position),

    #[error("Unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString(p)
            | LexError::UnexpectedCloseParen(p)
            | LexError::UnclosedParen(p) => *p,
            LexError::UnexpectedCharacter { position, .. } => *position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// Start of the most recently returned token
    token_start: Position,
    /// Previous token, used to tell a sign from a binary minus
    previous: Option<Token>,
    /// Positions of the currently open parentheses
    open_parens: Vec<Position>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            token_start: Position::default(),
            previous: None,
            open_parens: Vec::new(),
        }
    }

    /// Start position of the last token returned by [`Lexer::next_token`].
    pub fn token_position(&self) -> Position {
        self.token_start
    }

    fn here(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_word_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_'
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_word_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Reads a quoted span; a doubled quote stands for the quote itself.
    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            if ch == quote {
                if self.peek_char(1) == Some(quote) {
                    result.push(quote);
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance();
                return Ok(result);
            }
            result.push(ch);
            self.advance();
        }

        Err(LexError::UnterminatedString(start))
    }

    /// Reads an optionally signed number with fraction and exponent. Word
    /// characters glued to the number stay in the span.
    fn read_number(&mut self) -> String {
        let mut number = String::new();

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        self.read_digits(&mut number);

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            number.push('.');
            self.advance();
            self.read_digits(&mut number);
        }

        if let Some(e) = self.current_char().filter(|c| *c == 'e' || *c == 'E') {
            let signed = matches!(self.peek_char(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                number.push(e);
                self.advance();
                if signed {
                    if let Some(sign) = self.current_char() {
                        number.push(sign);
                    }
                    self.advance();
                }
                self.read_digits(&mut number);
            }
        }

        number.push_str(&self.read_identifier());
        number
    }

    fn read_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                out.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a UUID when one starts at the cursor and is not glued to more
    /// word characters.
    fn read_uuid(&mut self) -> Option<String> {
        if self.position + UUID_LEN > self.input.len() {
            return None;
        }
        let candidate: String = self.input[self.position..self.position + UUID_LEN]
            .iter()
            .collect();
        if !UUID_SPAN.is_match(&candidate) {
            return None;
        }
        if self.peek_char(UUID_LEN).is_some_and(Self::is_word_char) {
            return None;
        }
        for _ in 0..UUID_LEN {
            self.advance();
        }
        Some(candidate)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.advance();
        self.advance();
        token
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.here();
        self.token_start = start;

        let sign_allowed = !self.previous.as_ref().is_some_and(Token::ends_operand);

        let token = match self.current_char() {
            None => {
                if let Some(open) = self.open_parens.last() {
                    return Err(LexError::UnclosedParen(*open));
                }
                Token::Eof
            }
            Some('\'') => Token::Quoted(self.read_string('\'')?),
            Some('"') => Token::Quoted(self.read_string('"')?),
            Some('(') => {
                self.open_parens.push(start);
                self.single(Token::LParen)
            }
            Some(')') => {
                if self.open_parens.pop().is_none() {
                    return Err(LexError::UnexpectedCloseParen(start));
                }
                self.single(Token::RParen)
            }
            Some(',') => self.single(Token::Comma),
            Some('.') => self.single(Token::Dot),
            Some('+') => self.single(Token::Plus),
            Some('*') => self.single(Token::Star),
            Some('/') => self.single(Token::Slash),
            Some('?') => self.single(Token::Placeholder),
            Some('=') => self.single(Token::Eq),
            Some('-') => {
                if sign_allowed && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    Token::Span(self.read_number())
                } else {
                    self.single(Token::Minus)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: '!',
                        position: start,
                    });
                }
            }
            Some('<') => match self.peek_char(1) {
                Some('=') => self.double(Token::LtEq),
                Some('>') => self.double(Token::Diamond),
                _ => self.single(Token::Lt),
            },
            Some('>') => match self.peek_char(1) {
                Some('=') => self.double(Token::GtEq),
                _ => self.single(Token::Gt),
            },
            // A segment after '.' is always a name, even when it spells a keyword
            Some(ch) if Self::is_word_char(ch) && matches!(self.previous, Some(Token::Dot)) => {
                Token::Identifier(self.read_identifier())
            }
            Some(ch) if Self::is_word_char(ch) => {
                if let Some(uuid) = self.read_uuid() {
                    Token::Span(uuid)
                } else if ch.is_ascii_digit() {
                    Token::Span(self.read_number())
                } else {
                    let ident = self.read_identifier();
                    Token::keyword(&ident).unwrap_or(Token::Identifier(ident))
                }
            }
            Some(ch) => {
                return Err(LexError::UnexpectedCharacter {
                    ch,
                    position: start,
                });
            }
        };

        self.previous = Some(token.clone());
        Ok(token)
    }
}

/// Splits query text into tokens with their start positions. The final
/// element is always [`Token::Eof`].
///
/// # Errors
///
/// Fails on an unterminated quote, an unbalanced parenthesis or a character
/// outside the grammar.
pub fn tokenize(text: &str) -> Result<Vec<(Token, Position)>, LexError> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push((token, lexer.token_position()));
        if done {
            return Ok(tokens);
        }
    }
}

#[test]
fn test_keywords_case_insensitive() {
    let mut lexer = Lexer::new("select FROM Where and OR");
    assert_eq!(lexer.next_token().unwrap(), Token::Select);
    assert_eq!(lexer.next_token().unwrap(), Token::From);
    assert_eq!(lexer.next_token().unwrap(), Token::Where);
    assert_eq!(lexer.next_token().unwrap(), Token::And);
    assert_eq!(lexer.next_token().unwrap(), Token::Or);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_minus_after_operand_is_operator() {
    let mut lexer = Lexer::new("field1-2");
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier("field1".to_string())
    );
    assert_eq!(lexer.next_token().unwrap(), Token::Minus);
    assert_eq!(lexer.next_token().unwrap(), Token::Span("2".to_string()));
}
