//! # strata
//!
//! A SQL-like query compiler and evaluation engine for in-memory records.
//!
//! Query text is compiled once into an immutable [`Query`]. A compiled query
//! can be serialized back to canonical text ([`serialize`]) or executed
//! against any record type through a [`FieldAccessor`] ([`Executor`]).
//!
//! # Examples
//!
//! ```
//! use strata::{compile, serialize};
//!
//! let query = compile(
//!     "select 2+2*field1 as suma from resource where resource.field != log(5)+2",
//! )
//! .unwrap();
//! assert_eq!(query.resource(), "resource");
//! assert_eq!(
//!     serialize(&query),
//!     "SELECT 2 + 2 * field1 AS suma FROM resource WHERE resource.field != log(5) + 2"
//! );
//! ```
pub mod accessor;
pub mod ast;
pub mod cli;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod serializer;
pub mod value;

pub use accessor::{Accessors, FieldAccessor, FnAccessor, Record, RecordAccessor, ValueAccessor};
pub use ast::{Comparator, Evaluator, Expr, FieldRef, Join, JoinKind, Query, QueryField, Token};
pub use error::{EvalError, QueryError, QueryResult};
pub use evaluator::{EvalContext, ValuesMap};
pub use executor::{
    ErrorPolicy, Executor, ExecutorConfig, FieldResolution, RecordSource, Row,
};
pub use lexer::{LexError, Lexer, Position, tokenize};
pub use literal::{Literal, Point};
pub use parser::{ParseError, Parser};
pub use serializer::serialize;
pub use value::Value;

/// Compiles query text into a [`Query`].
///
/// # Errors
///
/// Returns the first syntax error; no partial query is produced.
pub fn compile(text: &str) -> Result<Query, ParseError> {
    let mut parser = Parser::new(Lexer::new(text))?;
    let query = parser.parse_query()?;
    tracing::debug!(
        resources = ?query.all_resources(),
        joins = query.joins.len(),
        placeholders = query.placeholders,
        "Compiled query"
    );
    Ok(query)
}

/// Compiles a standalone predicate such as `age > 18 AND name LIKE 'a%'`.
pub fn compile_predicate(text: &str) -> Result<Evaluator, ParseError> {
    let mut parser = Parser::new(Lexer::new(text))?;
    parser.parse_condition()
}
