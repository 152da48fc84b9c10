use crate::ast::{Evaluator, Expr, JoinKind, OrderField, QueryField};

/// A compiled query.
///
/// Immutable once built; compiling its [`Display`](std::fmt::Display) text
/// yields an equal value.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Select list, in written order
    pub fields: Vec<QueryField>,

    /// FROM resources; more than one means a cross product
    pub resources: Vec<String>,

    /// Joins, in written order
    pub joins: Vec<Join>,

    /// WHERE predicate; `None` matches every record
    pub evaluator: Option<Evaluator>,

    /// GROUP BY expressions
    pub group_by: Vec<Expr>,

    /// ORDER BY expressions
    pub order_by: Vec<OrderField>,

    /// START: rows to skip
    pub start: Option<u64>,

    /// LIMIT: maximum rows returned (positive)
    pub limit: Option<u64>,

    /// Number of `?` placeholders
    pub placeholders: usize,
}

impl Query {
    /// Compiles query text. Shorthand for [`crate::compile`].
    pub fn compile(text: &str) -> Result<Query, crate::ParseError> {
        crate::compile(text)
    }

    /// The first FROM resource.
    pub fn resource(&self) -> &str {
        self.resources.first().map(String::as_str).unwrap_or_default()
    }

    /// Every resource the query reads, in FROM then JOIN order.
    pub fn all_resources(&self) -> Vec<&str> {
        self.resources
            .iter()
            .map(String::as_str)
            .chain(self.joins.iter().map(|j| j.resource.as_str()))
            .collect()
    }

    /// The WHERE predicate, or [`Evaluator::True`] when there is none.
    pub fn predicate(&self) -> &Evaluator {
        self.evaluator.as_ref().unwrap_or(&Evaluator::True)
    }

    /// Number of `?` runtime parameters the query expects.
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// True when the select list or ORDER BY calls an aggregate.
    pub fn has_aggregates(&self) -> bool {
        self.fields.iter().any(|field| field.expr.has_aggregate())
            || self.order_by.iter().any(|field| field.expr.has_aggregate())
    }
}

/// `[INNER|LEFT|RIGHT] JOIN resource ON condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    /// Resource the condition pairs against
    pub left: String,
    /// Joined resource
    pub resource: String,
    pub on: Evaluator,
}
