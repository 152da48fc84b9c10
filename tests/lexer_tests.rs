// tests/lexer_tests.rs

use strata::ast::Token;
use strata::lexer::{LexError, Lexer, tokenize};

fn tokens(input: &str) -> Vec<Token> {
    tokenize(input)
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

// ============================================================================
// Keywords and identifiers
// ============================================================================

#[test]
fn test_keyword_after_dot_is_identifier() {
    assert_eq!(
        tokens("r.desc IN x"),
        vec![
            Token::Identifier("r".to_string()),
            Token::Dot,
            Token::Identifier("desc".to_string()),
            Token::In,
            Token::Identifier("x".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_select_statement() {
    assert_eq!(
        tokens("SELECT * FROM resource"),
        vec![
            Token::Select,
            Token::Star,
            Token::From,
            Token::Identifier("resource".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_mixed_case_keywords() {
    assert_eq!(
        tokens("Select a From b wHeRe c lIkE d LIMIT 1"),
        vec![
            Token::Select,
            Token::Identifier("a".to_string()),
            Token::From,
            Token::Identifier("b".to_string()),
            Token::Where,
            Token::Identifier("c".to_string()),
            Token::Like,
            Token::Identifier("d".to_string()),
            Token::Limit,
            Token::Span("1".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_qualified_field() {
    assert_eq!(
        tokens("resource.field"),
        vec![
            Token::Identifier("resource".to_string()),
            Token::Dot,
            Token::Identifier("field".to_string()),
            Token::Eof,
        ]
    );
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_comparison_operators() {
    assert_eq!(
        tokens("= != <> > >= < <="),
        vec![
            Token::Eq,
            Token::NotEq,
            Token::Diamond,
            Token::Gt,
            Token::GtEq,
            Token::Lt,
            Token::LtEq,
            Token::Eof,
        ]
    );
}

#[test]
fn test_placeholder_and_punctuation() {
    assert_eq!(
        tokens("(?, ?)"),
        vec![
            Token::LParen,
            Token::Placeholder,
            Token::Comma,
            Token::Placeholder,
            Token::RParen,
            Token::Eof,
        ]
    );
}

// ============================================================================
// Numbers and signs
// ============================================================================

#[test]
fn test_signed_numbers() {
    for number in ["-0.00023", "-2.3E-4", "-2.3E4", "2.3E4", "5"] {
        assert_eq!(
            tokens(number),
            vec![Token::Span(number.to_string()), Token::Eof]
        );
    }
    assert_eq!(
        tokens("a IN (-1, -2)"),
        vec![
            Token::Identifier("a".to_string()),
            Token::In,
            Token::LParen,
            Token::Span("-1".to_string()),
            Token::Comma,
            Token::Span("-2".to_string()),
            Token::RParen,
            Token::Eof,
        ]
    );
}

#[test]
fn test_minus_between_operands() {
    assert_eq!(
        tokens("a - 2"),
        vec![
            Token::Identifier("a".to_string()),
            Token::Minus,
            Token::Span("2".to_string()),
            Token::Eof,
        ]
    );
    assert_eq!(
        tokens("2*-3"),
        vec![
            Token::Span("2".to_string()),
            Token::Star,
            Token::Span("-3".to_string()),
            Token::Eof,
        ]
    );
    assert_eq!(
        tokens("(1)-2"),
        vec![
            Token::LParen,
            Token::Span("1".to_string()),
            Token::RParen,
            Token::Minus,
            Token::Span("2".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_uuid_span() {
    assert_eq!(
        tokens("id = 2821c2b9-c485-4550-8dd8-6ec83033fa84"),
        vec![
            Token::Identifier("id".to_string()),
            Token::Eq,
            Token::Span("2821c2b9-c485-4550-8dd8-6ec83033fa84".to_string()),
            Token::Eof,
        ]
    );
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_quoted_strings_keep_content() {
    assert_eq!(
        tokens("'a, b  (c)' \"it\"\"s\""),
        vec![
            Token::Quoted("a, b  (c)".to_string()),
            Token::Quoted("it\"s".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_unterminated_string() {
    let err = tokenize("name = 'abc").unwrap_err();
    assert!(matches!(err, LexError::UnterminatedString(p) if p.column == 8));
}

// ============================================================================
// Parentheses
// ============================================================================

#[test]
fn test_unexpected_close_paren() {
    let err = tokenize("a = 1)").unwrap_err();
    assert!(matches!(err, LexError::UnexpectedCloseParen(p) if p.column == 6));
}

#[test]
fn test_unclosed_paren() {
    let err = tokenize("(a = 1 AND (b = 2)").unwrap_err();
    assert!(matches!(err, LexError::UnclosedParen(p) if p.column == 1));
}

#[test]
fn test_unexpected_character() {
    let err = tokenize("a # b").unwrap_err();
    assert!(matches!(err, LexError::UnexpectedCharacter { ch: '#', .. }));
}

#[test]
fn test_positions() {
    let mut lexer = Lexer::new("SELECT\n  field");
    assert_eq!(lexer.next_token().unwrap(), Token::Select);
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier("field".to_string())
    );
    let position = lexer.token_position();
    assert_eq!(position.line, 2);
    assert_eq!(position.column, 3);
    assert_eq!(position.offset, 9);
}
