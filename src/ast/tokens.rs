use std::fmt;

/// Lexical token produced by the [`Lexer`](crate::lexer::Lexer).
///
/// Keywords are matched case-insensitively and carry no text. Literal spans
/// keep their raw text so the literal resolver can type them once, at parse
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    From,
    Where,
    Join,
    Inner,
    Left,
    Right,
    On,
    Group,
    Order,
    By,
    Asc,
    Desc,
    Start,
    Limit,
    And,
    Or,
    In,
    Like,
    As,
    Null,

    /// Field, resource, alias or function name
    ///
    /// # Examples
    /// ```text
    /// resource
    /// field_1
    /// log
    /// ```
    Identifier(String),

    /// Unquoted literal span: numbers and UUIDs
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -2.3E-4
    /// 2821c2b9-c485-4550-8dd8-6ec83033fa84
    /// ```
    Span(String),

    /// Quoted literal with the quotes stripped and escapes resolved
    ///
    /// # Examples
    /// ```text
    /// '2017-07-07 22:15:32'
    /// 'it''s'
    /// ```
    Quoted(String),

    /// Runtime parameter placeholder (`?`)
    Placeholder,

    // Comparison
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<>`
    Diamond,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // Punctuation
    Comma,
    LParen,
    RParen,
    Dot,

    /// End of input
    Eof,
}

impl Token {
    /// Maps an identifier to its keyword token, if it is one.
    pub fn keyword(ident: &str) -> Option<Token> {
        let token = match ident.to_ascii_uppercase().as_str() {
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "JOIN" => Token::Join,
            "INNER" => Token::Inner,
            "LEFT" => Token::Left,
            "RIGHT" => Token::Right,
            "ON" => Token::On,
            "GROUP" => Token::Group,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "START" => Token::Start,
            "LIMIT" => Token::Limit,
            "AND" => Token::And,
            "OR" => Token::Or,
            "IN" => Token::In,
            "LIKE" => Token::Like,
            "AS" => Token::As,
            "NULL" => Token::Null,
            _ => return None,
        };
        Some(token)
    }

    /// True for tokens after which a `-` is a binary operator rather than a sign.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Identifier(_)
                | Token::Span(_)
                | Token::Quoted(_)
                | Token::Null
                | Token::Placeholder
                | Token::RParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::Join => "JOIN",
            Token::Inner => "INNER",
            Token::Left => "LEFT",
            Token::Right => "RIGHT",
            Token::On => "ON",
            Token::Group => "GROUP",
            Token::Order => "ORDER",
            Token::By => "BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Start => "START",
            Token::Limit => "LIMIT",
            Token::And => "AND",
            Token::Or => "OR",
            Token::In => "IN",
            Token::Like => "LIKE",
            Token::As => "AS",
            Token::Null => "NULL",
            Token::Identifier(name) => return f.write_str(name),
            Token::Span(raw) => return f.write_str(raw),
            Token::Quoted(text) => return write!(f, "'{}'", text),
            Token::Placeholder => "?",
            Token::Eq => "=",
            Token::NotEq => "!=",
            Token::Diamond => "<>",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Comma => ",",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Dot => ".",
            Token::Eof => "end of input",
        };
        f.write_str(text)
    }
}
