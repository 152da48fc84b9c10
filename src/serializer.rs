//! Canonical query text.
//!
//! Every AST node implements [`Display`](fmt::Display). The output uses
//! upper-case keywords, keeps the written order of fields, joins and
//! operators, and adds only the parentheses the parser needs to rebuild the
//! same tree:
//!
//! - a logical node on the right of AND/OR (chains fold left to right)
//! - an arithmetic child that binds looser than its parent, or equally loose
//!   on the right side
//!
//! # Examples
//!
//! ```
//! use strata::{compile, serialize};
//!
//! let query = compile("select * from resource where a=1 and (b=2 or c=3) limit 5").unwrap();
//! assert_eq!(
//!     serialize(&query),
//!     "SELECT * FROM resource WHERE a = 1 AND (b = 2 OR c = 3) LIMIT 5"
//! );
//! ```

use std::fmt;

use crate::{
    ast::{Comparator, Evaluator, Expr, Join, OrderField, Query, QueryField},
    literal::{self, Literal},
};

/// Renders a query as canonical text. Compiling the result yields an equal
/// query.
pub fn serialize(query: &Query) -> String {
    query.to_string()
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Decimal(d) => {
                if d.scale() == 0 {
                    write!(f, "{}.0", d)
                } else {
                    write!(f, "{}", d)
                }
            }
            Literal::Float(x) if x.is_infinite() => {
                // Reads back as the same infinity
                f.write_str(if *x < 0.0 { "-1E999" } else { "1E999" })
            }
            Literal::Float(x) => write!(f, "{:E}", x),
            Literal::Uuid(u) => write!(f, "{}", u.hyphenated()),
            Literal::Date(d) => write!(f, "'{}'", literal::format_date(d)),
            Literal::Point(p) => write!(f, "'POINT ({} {})'", p.x, p.y),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Field(field) => f.write_str(&field.qualified_name()),
            Expr::Placeholder(_) => f.write_str("?"),
            Expr::List(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Expr::Wildcard => f.write_str("*"),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::BinaryOp { op, left, right } => {
                let precedence = op.precedence();
                match left.as_ref() {
                    Expr::BinaryOp { op: child, .. } if child.precedence() < precedence => {
                        write!(f, "({})", left)?
                    }
                    _ => write!(f, "{}", left)?,
                }
                write!(f, " {} ", op.as_str())?;
                match right.as_ref() {
                    Expr::BinaryOp { op: child, .. } if child.precedence() <= precedence => {
                        write!(f, "({})", right)
                    }
                    _ => write!(f, "{}", right),
                }
            }
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

impl fmt::Display for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluator::True => f.write_str("1 = 1"),
            Evaluator::Comparator(comparator) => write!(f, "{}", comparator),
            Evaluator::Logical { op, left, right } => {
                write!(f, "{} {} ", left, op.as_str())?;
                match right.as_ref() {
                    Evaluator::Logical { .. } => write!(f, "({})", right),
                    _ => write!(f, "{}", right),
                }
            }
        }
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.descending {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {} ON {}", self.kind.as_str(), self.resource, self.on)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        write_list(f, &self.fields)?;

        f.write_str(" FROM ")?;
        write_list(f, &self.resources)?;

        for join in &self.joins {
            write!(f, " {}", join)?;
        }

        if let Some(evaluator) = &self.evaluator
            && *evaluator != Evaluator::True
        {
            write!(f, " WHERE {}", evaluator)?;
        }

        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }

        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_list(f, &self.order_by)?;
        }

        if let Some(start) = self.start {
            write!(f, " START {}", start)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}
