// tests/parser_tests.rs

use strata::ast::{
    ArithOp, CompareOp, Evaluator, Expr, FieldRef, JoinKind, LogicOp, Query,
};
use strata::lexer::Lexer;
use strata::literal::Literal;
use strata::parser::{ParseError, Parser};
use strata::{compile, compile_predicate};

fn parse(input: &str) -> Query {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer).unwrap();
    parser.parse_query().unwrap()
}

fn comparator(evaluator: &Evaluator) -> (&Expr, CompareOp, &Expr) {
    match evaluator {
        Evaluator::Comparator(c) => (&c.left, c.op, &c.right),
        other => panic!("Expected comparator, got {:?}", other),
    }
}

// ============================================================================
// Clauses
// ============================================================================

#[test]
fn test_select_star() {
    let query = parse("SELECT * FROM resource");
    assert_eq!(query.fields.len(), 1);
    assert_eq!(query.fields[0].expr, Expr::Wildcard);
    assert_eq!(query.resources, vec!["resource".to_string()]);
    assert!(query.evaluator.is_none());
    assert!(query.start.is_none());
    assert!(query.limit.is_none());
}

#[test]
fn test_clause_extraction() {
    let query = parse(
        "SELECT * FROM resource JOIN resource1 ON resource.id = resource1.id \
         WHERE resource.field != 5 AND resource.field = 6 OR resource.field <> 7 \
         GROUP BY field2 START 50 LIMIT 10",
    );
    assert_eq!(query.joins.len(), 1);
    assert_eq!(query.group_by.len(), 1);
    assert_eq!(query.start, Some(50));
    assert_eq!(query.limit, Some(10));
}

#[test]
fn test_lowercase_keywords() {
    let query = parse(
        "SELECT * FROM dataaccumulator where perioddate >= '2017-08-01 00:00:00' \
         and dataaccumulatorid = 'lastOdometerByDay' limit 100",
    );
    assert_eq!(query.limit, Some(100));

    let Some(Evaluator::Logical { op, left, right }) = &query.evaluator else {
        panic!("Expected logical evaluator");
    };
    assert_eq!(*op, LogicOp::And);
    let (_, op, value) = comparator(left);
    assert_eq!(op, CompareOp::GreaterEqual);
    assert!(matches!(value, Expr::Literal(Literal::Date(_))));
    let (_, _, value) = comparator(right);
    assert_eq!(
        *value,
        Expr::Literal(Literal::String("lastOdometerByDay".to_string()))
    );
}

#[test]
fn test_cross_product_resources() {
    let query = parse("SELECT * FROM a, b, c");
    assert_eq!(query.resources, vec!["a", "b", "c"]);
    assert_eq!(query.all_resources(), vec!["a", "b", "c"]);
}

#[test]
fn test_order_by() {
    let query = parse("SELECT * FROM r ORDER BY a DESC, b ASC, c");
    let directions: Vec<bool> = query.order_by.iter().map(|o| o.descending).collect();
    assert_eq!(directions, vec![true, false, false]);
}

// ============================================================================
// Select list
// ============================================================================

#[test]
fn test_select_arithmetic_with_alias() {
    let query = parse("SELECT 2+2*field1 as suma FROM resource");
    let field = &query.fields[0];
    assert_eq!(field.alias.as_deref(), Some("suma"));

    // Should be: Add(2, Multiply(2, field1))
    match &field.expr {
        Expr::BinaryOp {
            op: ArithOp::Add,
            left,
            right,
        } => {
            assert_eq!(**left, Expr::Literal(Literal::Integer(2)));
            assert!(matches!(
                **right,
                Expr::BinaryOp {
                    op: ArithOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_functions() {
    let query = parse("SELECT COUNT(*) AS total, upper(name) FROM r GROUP BY name");
    assert_eq!(
        query.fields[0].expr,
        Expr::Function {
            name: "count".to_string(),
            args: vec![Expr::Wildcard],
        }
    );
    assert!(matches!(&query.fields[1].expr, Expr::Function { name, .. } if name == "upper"));
    assert!(query.is_grouped());
}

#[test]
fn test_unary_minus() {
    let query = parse("SELECT -a FROM r");
    assert_eq!(
        query.fields[0].expr,
        Expr::BinaryOp {
            op: ArithOp::Subtract,
            left: Box::new(Expr::Literal(Literal::Integer(0))),
            right: Box::new(Expr::field("a")),
        }
    );
}

#[test]
fn test_keyword_named_fields() {
    let query = parse("SELECT r.desc, r.start FROM r WHERE r.order = 1 ORDER BY r.group DESC");
    assert_eq!(query.fields[0].expr, Expr::Field(FieldRef::qualified("r", "desc")));
    assert_eq!(query.fields[1].expr, Expr::Field(FieldRef::qualified("r", "start")));
    let (left, _, _) = comparator(query.evaluator.as_ref().unwrap());
    assert_eq!(*left, Expr::Field(FieldRef::qualified("r", "order")));
    assert_eq!(query.order_by[0].expr, Expr::Field(FieldRef::qualified("r", "group")));
    assert!(query.order_by[0].descending);
}

#[test]
fn test_nested_field_path() {
    let query = parse("SELECT r.address.city FROM r");
    assert_eq!(
        query.fields[0].expr,
        Expr::Field(FieldRef::qualified("r", "address.city"))
    );
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_and_then_or_folds_left() {
    // a AND b OR c => (a AND b) OR c
    let evaluator = compile_predicate("a = 1 AND b = 2 OR c = 3").unwrap();
    match evaluator {
        Evaluator::Logical {
            op: LogicOp::Or,
            left,
            ..
        } => assert!(matches!(
            *left,
            Evaluator::Logical {
                op: LogicOp::And,
                ..
            }
        )),
        other => panic!("Expected OR at the root, got {:?}", other),
    }
}

#[test]
fn test_or_then_and_folds_left() {
    // a OR b AND c => (a OR b) AND c
    let evaluator = compile_predicate("a = 1 OR b = 2 AND c = 3").unwrap();
    match evaluator {
        Evaluator::Logical {
            op: LogicOp::And,
            left,
            right,
        } => {
            assert!(matches!(*left, Evaluator::Logical { op: LogicOp::Or, .. }));
            assert!(matches!(*right, Evaluator::Comparator(_)));
        }
        other => panic!("Expected AND at the root, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_group() {
    let evaluator = compile_predicate("a = 1 AND (b = 2 OR c = 3)").unwrap();
    match evaluator {
        Evaluator::Logical {
            op: LogicOp::And,
            left,
            right,
        } => {
            assert!(matches!(*left, Evaluator::Comparator(_)));
            assert!(matches!(*right, Evaluator::Logical { op: LogicOp::Or, .. }));
        }
        other => panic!("Expected AND at the root, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_arithmetic_in_predicate() {
    let evaluator = compile_predicate("(a + b) * 2 > 3").unwrap();
    let (left, op, right) = comparator(&evaluator);
    assert_eq!(op, CompareOp::GreaterThan);
    assert!(matches!(
        left,
        Expr::BinaryOp {
            op: ArithOp::Multiply,
            ..
        }
    ));
    assert_eq!(*right, Expr::Literal(Literal::Integer(3)));
}

#[test]
fn test_redundant_parentheses() {
    let query = parse("SELECT * FROM cliente WHERE (  cliente.clienteid = 309 )");
    let (left, op, right) = comparator(query.evaluator.as_ref().unwrap());
    assert_eq!(*left, Expr::Field(FieldRef::qualified("cliente", "clienteid")));
    assert_eq!(op, CompareOp::Equal);
    assert_eq!(*right, Expr::Literal(Literal::Integer(309)));
}

#[test]
fn test_all_comparison_operators() {
    let cases = [
        ("a = 1", CompareOp::Equal),
        ("a != 1", CompareOp::NotEqual),
        ("a <> 1", CompareOp::Distinct),
        ("a > 1", CompareOp::GreaterThan),
        ("a >= 1", CompareOp::GreaterEqual),
        ("a < 1", CompareOp::LessThan),
        ("a <= 1", CompareOp::LessEqual),
        ("a LIKE 'x%'", CompareOp::Like),
        ("a IN (1, 2)", CompareOp::In),
    ];
    for (text, expected) in cases {
        let evaluator = compile_predicate(text).unwrap();
        assert_eq!(comparator(&evaluator).1, expected, "{}", text);
    }
}

#[test]
fn test_in_list() {
    let evaluator = compile_predicate("holderid IN (92928, 124291, 'x', ?)").unwrap();
    let (_, _, right) = comparator(&evaluator);
    assert_eq!(
        *right,
        Expr::List(vec![
            Expr::Literal(Literal::Integer(92928)),
            Expr::Literal(Literal::Integer(124291)),
            Expr::Literal(Literal::String("x".to_string())),
            Expr::Placeholder(0),
        ])
    );
}

#[test]
fn test_in_field() {
    let evaluator = compile_predicate("role IN user.roles").unwrap();
    let (_, _, right) = comparator(&evaluator);
    assert_eq!(*right, Expr::Field(FieldRef::qualified("user", "roles")));
}

#[test]
fn test_like_pattern_compiled_once() {
    let evaluator = compile_predicate("nombre LIKE '%MKR%'").unwrap();
    match evaluator {
        Evaluator::Comparator(c) => {
            let pattern = c.pattern.expect("pattern should be compiled");
            assert_eq!(pattern.source(), "%MKR%");
            assert!(pattern.is_match("el mkr azul"));
        }
        other => panic!("Expected comparator, got {:?}", other),
    }
}

#[test]
fn test_placeholders_are_numbered() {
    let query = parse("SELECT * FROM r WHERE a = ? AND b IN (?, ?)");
    assert_eq!(query.placeholders(), 3);
    let comparators = query.predicate().comparators();
    assert_eq!(comparators[0].right, Expr::Placeholder(0));
    assert_eq!(
        comparators[1].right,
        Expr::List(vec![Expr::Placeholder(1), Expr::Placeholder(2)])
    );
}

#[test]
fn test_unquoted_point() {
    let evaluator = compile_predicate("location = POINT (23.34 34.98)").unwrap();
    let (_, _, right) = comparator(&evaluator);
    assert!(matches!(right, Expr::Literal(Literal::Point(_))));
}

// ============================================================================
// Constant reduction
// ============================================================================

#[test]
fn test_true_where_is_dropped() {
    let query = parse("SELECT * FROM r WHERE 1 = 1");
    assert!(query.evaluator.is_none());
    assert_eq!(*query.predicate(), Evaluator::True);
}

#[test]
fn test_true_and_x_reduces_to_x() {
    let query = parse("SELECT * FROM r WHERE 1 = 1 AND a = 2");
    let (left, _, _) = comparator(query.evaluator.as_ref().unwrap());
    assert_eq!(*left, Expr::field("a"));
}

#[test]
fn test_x_or_true_reduces_to_true() {
    let query = parse("SELECT * FROM r WHERE a = 2 OR 2 > 1");
    assert!(query.evaluator.is_none());
}

#[test]
fn test_true_keeps_placeholder_operand() {
    let query = parse("SELECT * FROM r WHERE a = ? OR 1 = 1");
    assert_eq!(query.placeholders, 1);
    assert!(matches!(
        query.evaluator,
        Some(Evaluator::Logical { op: LogicOp::Or, .. })
    ));
}

#[test]
fn test_false_constant_is_kept() {
    let query = parse("SELECT * FROM r WHERE 1 = 2");
    assert!(matches!(query.evaluator, Some(Evaluator::Comparator(_))));
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_join_kinds() {
    let query = parse(
        "SELECT * FROM a JOIN b ON a.id = b.aid INNER JOIN c ON c.aid = a.id \
         LEFT JOIN d ON d.aid = a.id RIGHT JOIN e ON e.aid = a.id",
    );
    let kinds: Vec<JoinKind> = query.joins.iter().map(|j| j.kind).collect();
    assert_eq!(
        kinds,
        vec![JoinKind::Inner, JoinKind::Inner, JoinKind::Left, JoinKind::Right]
    );
    assert_eq!(query.all_resources(), vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn test_many_joins_with_parenthesized_conditions() {
    let query = parse(
        "SELECT  cliente.clienteid as clienteid ,  cliente.nombre as nombre ,  pais.desc_es as pais\n \
         FROM cliente\n \
         LEFT JOIN direccion  ON (direccion.direccionid=cliente.direccionid)\n \
         LEFT JOIN pais  ON (pais.paisid=direccion.paisid)\n \
         INNER JOIN clienteestado  ON (clienteestado.clienteestadoid=cliente.clienteestadoid)\n \
         INNER JOIN rubro  ON (rubro.rubroid=cliente.rubroid)\n \
         WHERE (  cliente.clienteid = 309 )",
    );
    assert_eq!(query.fields.len(), 3);
    assert_eq!(query.fields[2].alias.as_deref(), Some("pais"));
    assert_eq!(query.joins.len(), 4);
    assert_eq!(query.joins[0].kind, JoinKind::Left);
    assert_eq!(query.joins[0].left, "cliente");
    assert_eq!(query.joins[0].resource, "direccion");
    assert_eq!(query.joins[1].left, "direccion");
    assert_eq!(query.joins[3].kind, JoinKind::Inner);
}

#[test]
fn test_join_left_defaults_to_from() {
    let query = parse("SELECT * FROM a JOIN b ON b.flag = 1");
    assert_eq!(query.joins[0].left, "a");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_limit_zero_rejected() {
    let err = compile("SELECT * FROM r LIMIT 0").unwrap_err();
    assert!(matches!(err, ParseError::InvalidNumber { clause: "LIMIT", .. }));
}

#[test]
fn test_invalid_start() {
    for text in [
        "SELECT * FROM r START -1",
        "SELECT * FROM r START 1.5",
        "SELECT * FROM r START abc",
        "SELECT * FROM r START 99999999999999999999999",
    ] {
        let err = compile(text).unwrap_err();
        assert!(
            matches!(err, ParseError::InvalidNumber { clause: "START", .. }),
            "{}: {:?}",
            text,
            err
        );
    }
}

#[test]
fn test_start_zero_allowed() {
    assert_eq!(parse("SELECT * FROM r START 0").start, Some(0));
}

#[test]
fn test_empty_where() {
    for text in ["SELECT * FROM r WHERE", "SELECT * FROM r WHERE LIMIT 5"] {
        let err = compile(text).unwrap_err();
        assert!(matches!(err, ParseError::EmptyPredicate { clause: "WHERE", .. }));
    }
}

#[test]
fn test_trailing_input() {
    let err = compile("SELECT * FROM r extra").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn test_missing_from() {
    let err = compile("SELECT a WHERE a = 1").unwrap_err();
    match err {
        ParseError::UnexpectedToken { found, position, .. } => {
            assert_eq!(found, "WHERE");
            assert_eq!(position.column, 10);
        }
        other => panic!("Expected unexpected token, got {:?}", other),
    }
}

#[test]
fn test_missing_comparison_operator() {
    assert!(compile("SELECT * FROM r WHERE a").is_err());
    assert!(compile("SELECT * FROM r WHERE a = 1 AND b").is_err());
}

#[test]
fn test_lexer_errors_surface_as_syntax_errors() {
    let err = compile("SELECT * FROM r WHERE name = 'abc").unwrap_err();
    assert!(matches!(err, ParseError::Lex(_)));
    let err = compile("SELECT * FROM r WHERE (a = 1").unwrap_err();
    assert!(matches!(err, ParseError::Lex(_)));
}
