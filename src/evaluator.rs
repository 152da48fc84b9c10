use std::{collections::HashMap, slice};

use crate::{
    accessor::FieldAccessor,
    ast::{CompareOp, Comparator, Evaluator, Expr, LikePattern, LogicOp},
    error::EvalError,
    functions,
    value::Value,
};

/// Per-evaluation cache of computed expression values, keyed by the address
/// of the expression node.
///
/// Valid for one evaluation of one record (or one group); a fresh map must be
/// used for the next record.
pub type ValuesMap = HashMap<usize, Value>;

/// Everything an expression needs to produce a value.
///
/// `rows` holds the record under evaluation, or the whole group when
/// aggregates are evaluated during projection. Plain field references read
/// the first row.
pub struct EvalContext<'a, R, A: ?Sized> {
    pub rows: &'a [R],
    pub accessor: &'a A,
    pub params: &'a [Value],
}

impl<'a, R, A> EvalContext<'a, R, A>
where
    A: FieldAccessor<R> + ?Sized,
{
    pub fn new(rows: &'a [R], accessor: &'a A, params: &'a [Value]) -> Self {
        EvalContext {
            rows,
            accessor,
            params,
        }
    }

    /// Narrows the context to a single row of the current group.
    pub fn for_row(&self, row: &'a R) -> Self {
        EvalContext {
            rows: slice::from_ref(row),
            accessor: self.accessor,
            params: self.params,
        }
    }

    /// Evaluates an expression. Function calls and arithmetic are computed
    /// once per `values` map.
    pub fn eval_expr(&self, expr: &Expr, values: &mut ValuesMap) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Field(field) => match self.rows.first() {
                Some(row) => self.accessor.get(row, &field.qualified_name()),
                None => Ok(Value::Null),
            },

            Expr::Placeholder(index) => self
                .params
                .get(*index)
                .cloned()
                .ok_or(EvalError::MissingParameter(*index)),

            Expr::List(items) => items
                .iter()
                .map(|item| self.eval_expr(item, values))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expr::Wildcard => Err(EvalError::TypeError(
                "'*' is only valid in the select list or inside count(*)".to_string(),
            )),

            Expr::Function { name, args } => {
                self.cached(expr, values, |ctx, values| functions::call(name, args, ctx, values))
            }

            Expr::BinaryOp { op, left, right } => self.cached(expr, values, |ctx, values| {
                let left = ctx.eval_expr(left, values)?;
                let right = ctx.eval_expr(right, values)?;
                functions::arithmetic(*op, &left, &right)
            }),
        }
    }

    fn cached<F>(&self, expr: &Expr, values: &mut ValuesMap, compute: F) -> Result<Value, EvalError>
    where
        F: FnOnce(&Self, &mut ValuesMap) -> Result<Value, EvalError>,
    {
        let key = expr as *const Expr as usize;
        if let Some(value) = values.get(&key) {
            return Ok(value.clone());
        }
        let value = compute(self, values)?;
        values.insert(key, value.clone());
        Ok(value)
    }
}

impl Evaluator {
    /// Decides whether a record satisfies the predicate.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use strata::{compile_predicate, convert::json_to_value, ValueAccessor};
    ///
    /// let predicate = compile_predicate("age >= 18 AND name LIKE 'a%'").unwrap();
    /// let record = json_to_value(json!({"name": "Alice", "age": 30}));
    /// assert!(predicate.evaluate(&record, &ValueAccessor, &[]).unwrap());
    /// ```
    pub fn evaluate<R, A>(&self, record: &R, accessor: &A, params: &[Value]) -> Result<bool, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        self.evaluate_with(record, accessor, params, &mut ValuesMap::new())
    }

    /// Like [`Evaluator::evaluate`], with a caller-owned value cache.
    pub fn evaluate_with<R, A>(
        &self,
        record: &R,
        accessor: &A,
        params: &[Value],
        values: &mut ValuesMap,
    ) -> Result<bool, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let ctx = EvalContext::new(slice::from_ref(record), accessor, params);
        self.eval_in(&ctx, values)
    }

    /// Evaluates against an existing context.
    pub fn eval_in<R, A>(&self, ctx: &EvalContext<'_, R, A>, values: &mut ValuesMap) -> Result<bool, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        match self {
            Evaluator::True => Ok(true),
            Evaluator::Comparator(comparator) => comparator.eval_in(ctx, values),
            Evaluator::Logical { op, left, right } => {
                let left = left.eval_in(ctx, values)?;
                match op {
                    LogicOp::And if !left => Ok(false),
                    LogicOp::Or if left => Ok(true),
                    _ => right.eval_in(ctx, values),
                }
            }
        }
    }

    /// Keeps the records that satisfy the predicate, in input order.
    pub fn filter<'r, R, A>(
        &self,
        records: &'r [R],
        accessor: &A,
        params: &[Value],
    ) -> Result<Vec<&'r R>, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let mut matched = Vec::new();
        for record in records {
            if self.evaluate(record, accessor, params)? {
                matched.push(record);
            }
        }
        Ok(matched)
    }
}

impl Comparator {
    pub fn eval_in<R, A>(&self, ctx: &EvalContext<'_, R, A>, values: &mut ValuesMap) -> Result<bool, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let left = ctx.eval_expr(&self.left, values)?;

        if self.op == CompareOp::Like {
            if left.is_null() {
                return Ok(false);
            }
            if let Some(pattern) = &self.pattern {
                return Ok(pattern.is_match(&left.as_string()));
            }
            let right = ctx.eval_expr(&self.right, values)?;
            if right.is_null() {
                return Ok(false);
            }
            let source = right.as_string();
            let pattern = LikePattern::new(&source)
                .ok_or_else(|| EvalError::TypeError(format!("Invalid LIKE pattern '{}'", source)))?;
            return Ok(pattern.is_match(&left.as_string()));
        }

        let right = ctx.eval_expr(&self.right, values)?;
        Ok(compare(self.op, &left, &right))
    }

    /// Evaluates a comparator that reads no fields or parameters. `None` when
    /// evaluation fails.
    pub fn evaluate_constant(&self) -> Option<bool> {
        let ctx = EvalContext::<(), NoFields>::new(&[], &NoFields, &[]);
        self.eval_in(&ctx, &mut ValuesMap::new()).ok()
    }
}

/// Accessor for constant folding; there are no records to read.
struct NoFields;

impl FieldAccessor<()> for NoFields {
    fn get(&self, _record: &(), _field: &str) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
}

/// Applies a comparison operator other than LIKE.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Equal => {
            if left.is_null() || right.is_null() {
                left.is_null() && right.is_null()
            } else {
                left.loose_eq(right)
            }
        }
        CompareOp::NotEqual | CompareOp::Distinct => {
            !left.is_null() && (right.is_null() || !left.loose_eq(right))
        }
        CompareOp::GreaterThan
        | CompareOp::GreaterEqual
        | CompareOp::LessThan
        | CompareOp::LessEqual => {
            if left.is_null() || right.is_null() {
                return false;
            }
            let Some(ordering) = left.loose_cmp(right) else {
                return false;
            };
            match op {
                CompareOp::GreaterThan => ordering.is_gt(),
                CompareOp::GreaterEqual => ordering.is_ge(),
                CompareOp::LessThan => ordering.is_lt(),
                _ => ordering.is_le(),
            }
        }
        CompareOp::In => contains(left, right),
        CompareOp::Like => match LikePattern::new(&right.as_string()) {
            Some(pattern) if !left.is_null() && !right.is_null() => {
                pattern.is_match(&left.as_string())
            }
            _ => false,
        },
    }
}

/// `IN` semantics. A collection-valued field is searched for the right side;
/// otherwise the right side is searched for the field value.
fn contains(field: &Value, target: &Value) -> bool {
    match field {
        Value::Null => false,
        Value::Object(map) => match target {
            Value::Array(keys) => keys.iter().any(|k| map.contains_key(&k.as_string())),
            key => map.contains_key(&key.as_string()),
        },
        Value::Array(items) => match target {
            Value::Array(wanted) => wanted.iter().any(|w| items.iter().any(|i| i.loose_eq(w))),
            single => items.iter().any(|i| i.loose_eq(single)),
        },
        scalar => match target {
            Value::Array(items) => items.iter().any(|i| i.loose_eq(scalar)),
            Value::Object(map) => map.contains_key(&scalar.as_string()),
            single => scalar.loose_eq(single),
        },
    }
}
