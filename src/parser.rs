use std::mem;

use thiserror::Error;

use crate::{
    ast::{
        ArithOp, CompareOp, Comparator, Evaluator, Expr, FieldRef, Join, JoinKind, LogicOp,
        OrderField, Query, QueryField, Token,
    },
    lexer::{LexError, Lexer, Position},
    literal::{self, Literal},
};

/// Syntax errors. Compilation stops at the first one; no partial query is
/// returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Lex(#[from] LexError),

    #[error("Syntax error: expected {expected}, found '{found}' at {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("Syntax error: empty predicate after {clause} at {position}")]
    EmptyPredicate {
        clause: &'static str,
        position: Position,
    },

    #[error("Syntax error: {clause} expects a {requirement} integer, found '{value}' at {position}")]
    InvalidNumber {
        clause: &'static str,
        requirement: &'static str,
        value: String,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.position(),
            ParseError::UnexpectedToken { position, .. }
            | ParseError::EmptyPredicate { position, .. }
            | ParseError::InvalidNumber { position, .. } => *position,
        }
    }
}

/// Result of parsing inside parentheses in predicate position.
enum Grouped {
    Predicate(Evaluator),
    Expr(Expr),
}

/// Recursive-descent parser with one token of look-ahead.
///
/// # Examples
///
/// ```
/// use strata::{Lexer, Parser};
///
/// let mut parser = Parser::new(Lexer::new("SELECT * FROM resource LIMIT 10")).unwrap();
/// let query = parser.parse_query().unwrap();
/// assert_eq!(query.limit, Some(10));
/// ```
pub struct Parser {
    tokens: Vec<(Token, Position)>,
    index: usize,
    current_token: Token,
    placeholders: usize,
}

impl Parser {
    /// Tokenizes the whole input up front, so quoting and parenthesis errors
    /// surface before any parsing.
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, lexer.token_position()));
            if done {
                break;
            }
        }
        let current_token = tokens[0].0.clone();
        Ok(Parser {
            tokens,
            index: 0,
            current_token,
            placeholders: 0,
        })
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        self.current_token = self.tokens[self.index].0.clone();
    }

    fn position(&self) -> Position {
        self.tokens[self.index].1
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_token.to_string(),
            position: self.position(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(&format!("'{}'", expected)));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            token => {
                self.current_token = token;
                Err(self.unexpected(what))
            }
        }
    }

    /// True when the current token ends a predicate without starting one.
    fn at_clause_boundary(&self) -> bool {
        matches!(
            self.current_token,
            Token::Eof
                | Token::Group
                | Token::Order
                | Token::Start
                | Token::Limit
                | Token::Where
                | Token::Join
                | Token::Inner
                | Token::Left
                | Token::Right
        )
    }

    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.expect(Token::Select)?;
        let fields = self.parse_select_list()?;

        self.expect(Token::From)?;
        let mut resources = vec![self.expect_identifier("resource name")?];
        while self.check(&Token::Comma) {
            self.advance();
            resources.push(self.expect_identifier("resource name")?);
        }

        let mut joins = vec![];
        while let Some(kind) = self.parse_join_kind()? {
            joins.push(self.parse_join(kind, &resources[0])?);
        }

        let mut evaluator = None;
        if self.check(&Token::Where) {
            self.advance();
            evaluator = match self.parse_clause_predicate("WHERE")? {
                Evaluator::True => None,
                predicate => Some(predicate),
            };
        }

        let mut group_by = vec![];
        if self.check(&Token::Group) {
            self.advance();
            self.expect(Token::By)?;
            group_by.push(self.parse_expression()?);
            while self.check(&Token::Comma) {
                self.advance();
                group_by.push(self.parse_expression()?);
            }
        }

        let mut order_by = vec![];
        if self.check(&Token::Order) {
            self.advance();
            self.expect(Token::By)?;
            order_by.push(self.parse_order_field()?);
            while self.check(&Token::Comma) {
                self.advance();
                order_by.push(self.parse_order_field()?);
            }
        }

        let mut start = None;
        if self.check(&Token::Start) {
            self.advance();
            start = Some(self.parse_count("START", false)?);
        }

        let mut limit = None;
        if self.check(&Token::Limit) {
            self.advance();
            limit = Some(self.parse_count("LIMIT", true)?);
        }

        if !self.check(&Token::Eof) {
            return Err(self.unexpected("end of query"));
        }

        Ok(Query {
            fields,
            resources,
            joins,
            evaluator,
            group_by,
            order_by,
            start,
            limit,
            placeholders: self.placeholders,
        })
    }

    /// Parse a standalone predicate, e.g. `field > 5 AND name LIKE 'a%'`.
    pub fn parse_condition(&mut self) -> Result<Evaluator, ParseError> {
        let predicate = self.parse_clause_predicate("condition")?;
        if !self.check(&Token::Eof) {
            return Err(self.unexpected("end of condition"));
        }
        Ok(predicate)
    }

    /// Number of `?` placeholders consumed so far.
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    fn parse_select_list(&mut self) -> Result<Vec<QueryField>, ParseError> {
        let mut fields = vec![self.parse_select_item()?];
        while self.check(&Token::Comma) {
            self.advance();
            fields.push(self.parse_select_item()?);
        }
        Ok(fields)
    }

    fn parse_select_item(&mut self) -> Result<QueryField, ParseError> {
        if self.check(&Token::Star) {
            self.advance();
            return Ok(QueryField::new(Expr::Wildcard));
        }

        let expr = self.parse_expression()?;
        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier("alias after AS")?)
        } else {
            None
        };
        Ok(QueryField { expr, alias })
    }

    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>, ParseError> {
        let kind = match self.current_token {
            Token::Join => {
                self.advance();
                return Ok(Some(JoinKind::Inner));
            }
            Token::Inner => JoinKind::Inner,
            Token::Left => JoinKind::Left,
            Token::Right => JoinKind::Right,
            _ => return Ok(None),
        };
        self.advance();
        self.expect(Token::Join)?;
        Ok(Some(kind))
    }

    fn parse_join(&mut self, kind: JoinKind, from: &str) -> Result<Join, ParseError> {
        let resource = self.expect_identifier("joined resource name")?;
        self.expect(Token::On)?;
        let on = self.parse_clause_predicate("ON")?;

        let mut fields = Vec::new();
        for comparator in on.comparators() {
            comparator.left.fields(&mut fields);
            comparator.right.fields(&mut fields);
        }
        let left = fields
            .iter()
            .find_map(|f| f.resource.clone().filter(|r| *r != resource))
            .unwrap_or_else(|| from.to_string());

        Ok(Join {
            kind,
            left,
            resource,
            on,
        })
    }

    fn parse_order_field(&mut self) -> Result<OrderField, ParseError> {
        let expr = self.parse_expression()?;
        let descending = match self.current_token {
            Token::Desc => {
                self.advance();
                true
            }
            Token::Asc => {
                self.advance();
                false
            }
            _ => false,
        };
        Ok(OrderField { expr, descending })
    }

    fn parse_count(&mut self, clause: &'static str, positive: bool) -> Result<u64, ParseError> {
        let requirement = if positive { "positive" } else { "non-negative" };
        let position = self.position();
        let invalid = |value: String| ParseError::InvalidNumber {
            clause,
            requirement,
            value,
            position,
        };

        let raw = match &self.current_token {
            Token::Span(raw) => raw.clone(),
            other => return Err(invalid(other.to_string())),
        };
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(raw));
        }
        let n = raw.parse::<u64>().map_err(|_| invalid(raw.clone()))?;
        if positive && n == 0 {
            return Err(invalid(raw));
        }
        self.advance();
        Ok(n)
    }

    // ========================================
    // Predicates
    // ========================================

    fn parse_clause_predicate(&mut self, clause: &'static str) -> Result<Evaluator, ParseError> {
        if self.at_clause_boundary() {
            return Err(ParseError::EmptyPredicate {
                clause,
                position: self.position(),
            });
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Evaluator, ParseError> {
        match self.parse_grouped()? {
            Grouped::Predicate(predicate) => Ok(predicate),
            Grouped::Expr(_) => Err(self.unexpected("comparison operator")),
        }
    }

    /// Parses a predicate chain. AND and OR share one precedence and fold
    /// left to right. Inside parentheses the content may turn out to be plain
    /// arithmetic (`(a + b) * 2 > 3`), which is handed back as an expression.
    fn parse_grouped(&mut self) -> Result<Grouped, ParseError> {
        let mut left = match self.parse_term()? {
            Grouped::Predicate(predicate) => predicate,
            expr => return Ok(expr),
        };

        loop {
            let op = match self.current_token {
                Token::And => LogicOp::And,
                Token::Or => LogicOp::Or,
                _ => break,
            };
            self.advance();
            let right = match self.parse_term()? {
                Grouped::Predicate(predicate) => predicate,
                Grouped::Expr(_) => return Err(self.unexpected("comparison operator")),
            };
            left = Evaluator::reduce(op, left, right);
        }
        Ok(Grouped::Predicate(left))
    }

    fn parse_term(&mut self) -> Result<Grouped, ParseError> {
        if self.check(&Token::LParen) {
            self.advance();
            let inner = self.parse_grouped()?;
            self.expect(Token::RParen)?;
            return match inner {
                Grouped::Predicate(predicate) => Ok(Grouped::Predicate(predicate)),
                Grouped::Expr(expr) => {
                    let left = self.continue_expression(expr)?;
                    self.finish_term(left)
                }
            };
        }

        if self.at_clause_boundary() || self.check(&Token::RParen) {
            return Err(self.unexpected("comparison"));
        }
        let left = self.parse_expression()?;
        self.finish_term(left)
    }

    fn finish_term(&mut self, left: Expr) -> Result<Grouped, ParseError> {
        let op = match self.current_token {
            Token::Eq => CompareOp::Equal,
            Token::NotEq => CompareOp::NotEqual,
            Token::Diamond => CompareOp::Distinct,
            Token::Gt => CompareOp::GreaterThan,
            Token::GtEq => CompareOp::GreaterEqual,
            Token::Lt => CompareOp::LessThan,
            Token::LtEq => CompareOp::LessEqual,
            Token::Like => CompareOp::Like,
            Token::In => CompareOp::In,
            _ => return Ok(Grouped::Expr(left)),
        };
        self.advance();

        let right = if op == CompareOp::In && self.check(&Token::LParen) {
            self.parse_list()?
        } else {
            self.parse_expression()?
        };

        let comparator = Comparator::new(left, op, right);
        if comparator.left.is_constant()
            && comparator.right.is_constant()
            && comparator.evaluate_constant() == Some(true)
        {
            return Ok(Grouped::Predicate(Evaluator::True));
        }
        Ok(Grouped::Predicate(Evaluator::Comparator(comparator)))
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        let mut items = vec![];
        while !self.check(&Token::RParen) {
            items.push(self.parse_expression()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expr::List(items))
    }

    // ========================================
    // Expressions
    // ========================================

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    /// Continues an expression whose first operand was already parsed.
    fn continue_expression(&mut self, first: Expr) -> Result<Expr, ParseError> {
        let term = self.continue_multiplicative(first)?;
        self.continue_additive(term)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_multiplicative()?;
        self.continue_additive(first)
    }

    fn continue_additive(&mut self, first: Expr) -> Result<Expr, ParseError> {
        let mut left = first;

        loop {
            let op = match self.current_token {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_unary()?;
        self.continue_multiplicative(first)
    }

    fn continue_multiplicative(&mut self, first: Expr) -> Result<Expr, ParseError> {
        let mut left = first;

        loop {
            let op = match self.current_token {
                Token::Star => ArithOp::Multiply,
                Token::Slash => ArithOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            // Represent as 0 - operand
            return Ok(Expr::BinaryOp {
                op: ArithOp::Subtract,
                left: Box::new(Expr::Literal(Literal::Integer(0))),
                right: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Span(raw) => {
                self.advance();
                Ok(Expr::Literal(literal::resolve(&raw)))
            }
            Token::Quoted(text) => {
                self.advance();
                Ok(Expr::Literal(literal::resolve_quoted(&text)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Placeholder => {
                self.advance();
                let index = self.placeholders;
                self.placeholders += 1;
                Ok(Expr::Placeholder(index))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Identifier(name) => {
                self.advance();
                if self.check(&Token::LParen) {
                    if name.eq_ignore_ascii_case("point") {
                        return self.parse_point();
                    }
                    return self.parse_function_call(name);
                }
                self.parse_field_ref(name)
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("expression"))
            }
        }
    }

    fn parse_field_ref(&mut self, first: String) -> Result<Expr, ParseError> {
        let mut segments = vec![first];
        while self.check(&Token::Dot) {
            self.advance();
            segments.push(self.expect_identifier("field name after '.'")?);
        }

        let field = if segments.len() == 1 {
            FieldRef::new(segments.remove(0))
        } else {
            let resource = segments.remove(0);
            FieldRef::qualified(resource, segments.join("."))
        };
        Ok(Expr::Field(field))
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = vec![];
        while !self.check(&Token::RParen) {
            if self.check(&Token::Star) {
                self.advance();
                args.push(Expr::Wildcard);
            } else {
                args.push(self.parse_expression()?);
            }
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expr::Function {
            name: name.to_ascii_lowercase(),
            args,
        })
    }

    /// `POINT (x y)` written without quotes.
    fn parse_point(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        self.expect(Token::LParen)?;
        let x = self.parse_coordinate()?;
        let y = self.parse_coordinate()?;
        self.expect(Token::RParen)?;

        match literal::resolve(&format!("POINT ({} {})", x, y)) {
            point @ Literal::Point(_) => Ok(Expr::Literal(point)),
            _ => Err(ParseError::UnexpectedToken {
                expected: "numeric point coordinates".to_string(),
                found: format!("{} {}", x, y),
                position,
            }),
        }
    }

    fn parse_coordinate(&mut self) -> Result<String, ParseError> {
        let negative = self.check(&Token::Minus);
        if negative {
            self.advance();
        }
        match &self.current_token {
            Token::Span(raw) => {
                let raw = raw.clone();
                self.advance();
                Ok(if negative { format!("-{}", raw) } else { raw })
            }
            _ => Err(self.unexpected("point coordinate")),
        }
    }
}
