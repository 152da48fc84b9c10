use crate::{ast::ArithOp, literal::Literal};

/// A field reference, optionally qualified by its resource.
///
/// # Examples
/// ```text
/// field
/// resource.field
/// resource.address.city
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Qualifying resource, when written
    pub resource: Option<String>,
    /// Field name; may itself be a dotted path
    pub name: String,
}

impl FieldRef {
    pub fn new(name: impl Into<String>) -> Self {
        FieldRef {
            resource: None,
            name: name.into(),
        }
    }

    pub fn qualified(resource: impl Into<String>, name: impl Into<String>) -> Self {
        FieldRef {
            resource: Some(resource.into()),
            name: name.into(),
        }
    }

    /// Name handed to the field accessor: `resource.field` or `field`.
    pub fn qualified_name(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{}.{}", resource, self.name),
            None => self.name.clone(),
        }
    }
}

/// Value-producing expression node.
///
/// Appears on both sides of a comparator, in the select list and in the
/// GROUP BY / ORDER BY lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal typed at compile time
    ///
    /// # Example
    /// ```text
    /// 5.3
    /// '2017-07-07 22:15:32'
    /// ```
    Literal(Literal),

    /// Field read through the field accessor
    Field(FieldRef),

    /// Runtime parameter (`?`), numbered from 0 in order of appearance
    Placeholder(usize),

    /// Parenthesized list, right side of `IN`
    ///
    /// # Example
    /// ```text
    /// (1, 2, 'three')
    /// ```
    List(Vec<Expr>),

    /// `*`, in the select list or as `count(*)`
    Wildcard,

    /// Function call
    ///
    /// # Examples
    /// ```text
    /// log(5)
    /// count(*)
    /// ```
    Function { name: String, args: Vec<Expr> },

    /// Arithmetic
    ///
    /// # Example
    /// ```text
    /// 2 + 2 * field1
    /// ```
    BinaryOp {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(FieldRef::new(name))
    }

    pub fn literal(literal: Literal) -> Self {
        Expr::Literal(literal)
    }

    /// True when the expression reads neither records nor parameters, so it
    /// can be evaluated at compile time.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Field(_) | Expr::Placeholder(_) | Expr::Wildcard => false,
            Expr::List(items) => items.iter().all(Expr::is_constant),
            Expr::Function { name, args } => {
                !crate::functions::is_aggregate(name) && args.iter().all(Expr::is_constant)
            }
            Expr::BinaryOp { left, right, .. } => left.is_constant() && right.is_constant(),
        }
    }

    pub fn has_placeholder(&self) -> bool {
        match self {
            Expr::Placeholder(_) => true,
            Expr::Literal(_) | Expr::Field(_) | Expr::Wildcard => false,
            Expr::List(items) | Expr::Function { args: items, .. } => {
                items.iter().any(Expr::has_placeholder)
            }
            Expr::BinaryOp { left, right, .. } => left.has_placeholder() || right.has_placeholder(),
        }
    }

    /// True when the expression calls an aggregate function anywhere.
    pub fn has_aggregate(&self) -> bool {
        match self {
            Expr::Function { name, args } => {
                crate::functions::is_aggregate(name) || args.iter().any(Expr::has_aggregate)
            }
            Expr::List(items) => items.iter().any(Expr::has_aggregate),
            Expr::BinaryOp { left, right, .. } => left.has_aggregate() || right.has_aggregate(),
            Expr::Literal(_) | Expr::Field(_) | Expr::Placeholder(_) | Expr::Wildcard => false,
        }
    }

    /// True for nodes whose value is worth caching per record.
    pub fn is_computed(&self) -> bool {
        matches!(self, Expr::Function { .. } | Expr::BinaryOp { .. })
    }

    /// Collects every field referenced by the expression.
    pub fn fields<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Field(field) => out.push(field),
            Expr::List(items) | Expr::Function { args: items, .. } => {
                for item in items {
                    item.fields(out);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.fields(out);
                right.fields(out);
            }
            Expr::Literal(_) | Expr::Placeholder(_) | Expr::Wildcard => {}
        }
    }
}

/// Entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryField {
    pub expr: Expr,
    /// Output column name given with `AS`
    pub alias: Option<String>,
}

impl QueryField {
    pub fn new(expr: Expr) -> Self {
        QueryField { expr, alias: None }
    }

    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> Self {
        QueryField {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Entry of the ORDER BY list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderField {
    pub expr: Expr,
    pub descending: bool,
}
