//! Error types shared across compilation and execution.
//!
//! Syntax errors live next to the code that raises them
//! ([`LexError`](crate::lexer::LexError), [`ParseError`](crate::parser::ParseError));
//! this module holds evaluation errors and the umbrella [`QueryError`].

use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while evaluating a predicate or expression against a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The field accessor failed to read a field
    #[error("Access error on field '{field}': {message}")]
    Access { field: String, message: String },

    /// An unqualified field was found in more than one joined resource
    #[error("Ambiguous field '{field}': present in {}", .resources.join(", "))]
    AmbiguousField {
        field: String,
        resources: Vec<String>,
    },

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A `?` placeholder had no matching runtime parameter
    #[error("Missing runtime parameter #{0}")]
    MissingParameter(usize),

    #[error("Division by zero")]
    DivisionByZero,
}

impl EvalError {
    pub fn access(field: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::Access {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Any failure surfaced by the public API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    /// The record source has no records for a resource the query names
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
