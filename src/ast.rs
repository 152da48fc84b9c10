//! # Abstract Syntax Tree
//!
//! Compiled form of a query. The AST is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Value expressions, field references, select and order entries
//! - **[operators]** - Comparison, arithmetic, logical operators and join kinds
//! - **[evaluator]** - The boolean predicate tree
//! - **[query]** - The query root and joins
//!
//! ## Grammar
//!
//! ```text
//! SELECT <fields> FROM <resource>[, <resource>]*
//!   ([INNER|LEFT|RIGHT] JOIN <resource> ON <predicate>)*
//!   (WHERE <predicate>)?
//!   (GROUP BY <expr>[, <expr>]*)?
//!   (ORDER BY <expr> [ASC|DESC][, ...]*)?
//!   (START <int>)?
//!   (LIMIT <int>)?
//! ```
//!
//! ## Predicate chains
//!
//! AND and OR share one precedence and fold left to right:
//!
//! ```text
//! a AND b OR c    =>  (a AND b) OR c
//! a OR b AND c    =>  (a OR b) AND c
//! a AND (b OR c)  =>  a AND (b OR c)
//! ```
//!
//! ## Examples
//!
//! ```text
//! SELECT 2+2*field1 AS suma FROM resource WHERE resource.field != log(5)+2
//! SELECT * FROM holder WHERE nombre LIKE '%MKR%' AND holderid IN (1, 2, 3) LIMIT 20
//! SELECT * FROM cliente LEFT JOIN pais ON pais.paisid = cliente.paisid
//! ```
pub mod evaluator;
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use evaluator::{Comparator, Evaluator, LikePattern};
pub use expressions::{Expr, FieldRef, OrderField, QueryField};
pub use operators::{ArithOp, CompareOp, JoinKind, LogicOp};
pub use query::{Join, Query};
pub use tokens::Token;
