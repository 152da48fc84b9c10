use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::ast::{CompareOp, Expr, LogicOp};

/// Boolean-producing predicate node.
///
/// The tree is a closed sum type; evaluation lives in
/// [`crate::evaluator`] and serialization in [`crate::serializer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluator {
    /// Leaf comparison
    ///
    /// # Examples
    /// ```text
    /// resource.field != 5
    /// name LIKE '%MKR%'
    /// id IN (1, 2, 3)
    /// ```
    Comparator(Comparator),

    /// `left AND right` / `left OR right`
    Logical {
        op: LogicOp,
        left: Box<Evaluator>,
        right: Box<Evaluator>,
    },

    /// Always satisfied
    ///
    /// Produced when a constant predicate reduces away and used in place of
    /// an absent WHERE clause.
    True,
}

impl Evaluator {
    pub fn and(left: Evaluator, right: Evaluator) -> Self {
        Evaluator::Logical {
            op: LogicOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Evaluator, right: Evaluator) -> Self {
        Evaluator::Logical {
            op: LogicOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Combines two evaluators, folding away `True` operands.
    ///
    /// A subtree holding `?` placeholders is never dropped, so parameters keep
    /// their positions when the tree is serialized and compiled again.
    pub fn reduce(op: LogicOp, left: Evaluator, right: Evaluator) -> Self {
        match (op, left, right) {
            (LogicOp::And, Evaluator::True, other) | (LogicOp::And, other, Evaluator::True) => {
                other
            }
            (LogicOp::Or, Evaluator::True, other) | (LogicOp::Or, other, Evaluator::True)
                if !other.has_placeholders() =>
            {
                Evaluator::True
            }
            (op, left, right) => Evaluator::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    pub fn has_placeholders(&self) -> bool {
        self.comparators()
            .iter()
            .any(|c| c.left.has_placeholder() || c.right.has_placeholder())
    }

    /// Visits every comparator, left to right.
    pub fn comparators(&self) -> Vec<&Comparator> {
        let mut out = Vec::new();
        self.collect_comparators(&mut out);
        out
    }

    fn collect_comparators<'a>(&'a self, out: &mut Vec<&'a Comparator>) {
        match self {
            Evaluator::Comparator(c) => out.push(c),
            Evaluator::Logical { left, right, .. } => {
                left.collect_comparators(out);
                right.collect_comparators(out);
            }
            Evaluator::True => {}
        }
    }
}

/// `left op right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparator {
    pub left: Expr,
    pub op: CompareOp,
    pub right: Expr,
    /// LIKE matcher compiled at parse time when the pattern is a literal
    pub pattern: Option<LikePattern>,
}

impl Comparator {
    pub fn new(left: Expr, op: CompareOp, right: Expr) -> Self {
        let pattern = match (&op, &right) {
            (CompareOp::Like, Expr::Literal(lit)) => {
                LikePattern::new(&crate::Value::from(lit).as_string())
            }
            _ => None,
        };
        Comparator {
            left,
            op,
            right,
            pattern,
        }
    }
}

/// SQL LIKE pattern: `%` matches any substring, `_` one character.
/// Matching is anchored and case-insensitive.
#[derive(Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a pattern; `None` when the translated regex is rejected.
    pub fn new(pattern: &str) -> Option<Self> {
        let mut regex_pattern = String::from("^");
        for c in pattern.chars() {
            match c {
                '%' => regex_pattern.push_str(".*"),
                '_' => regex_pattern.push('.'),
                c => regex_pattern.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex_pattern.push('$');

        let regex = RegexBuilder::new(&regex_pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .size_limit(1 << 20)
            .build()
            .ok()?;
        Some(LikePattern {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LikePattern").field(&self.source).finish()
    }
}
