//! Built-in functions and arithmetic.
//!
//! Scalar functions see their evaluated arguments; a `NULL` argument yields
//! `NULL` (except for `coalesce`). Aggregates see the raw argument expression
//! and evaluate it once per row of the current group.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    accessor::FieldAccessor,
    ast::{ArithOp, Expr},
    error::EvalError,
    evaluator::{EvalContext, ValuesMap},
    value::Value,
};

const AGGREGATES: &[&str] = &["count", "sum", "avg", "min", "max"];

/// True for functions that consume a whole group.
pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.contains(&name)
}

/// Calls a function by its lower-case name.
pub fn call<R, A>(
    name: &str,
    args: &[Expr],
    ctx: &EvalContext<'_, R, A>,
    values: &mut ValuesMap,
) -> Result<Value, EvalError>
where
    A: FieldAccessor<R> + ?Sized,
{
    if is_aggregate(name) {
        return aggregate(name, args, ctx);
    }
    let args = args
        .iter()
        .map(|arg| ctx.eval_expr(arg, values))
        .collect::<Result<Vec<_>, _>>()?;
    scalar(name, &args)
}

fn expect_arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(EvalError::TypeError(format!(
            "{}() expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn number(name: &str, value: &Value) -> Result<Decimal, EvalError> {
    value.as_decimal().ok_or_else(|| {
        EvalError::TypeError(format!("{}() expects a number, got {}", name, value.type_name()))
    })
}

fn float(name: &str, value: &Value) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| {
        EvalError::TypeError(format!("{}() expects a number, got {}", name, value.type_name()))
    })
}

fn scalar(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    if name == "coalesce" {
        return Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or_default());
    }
    check_signature(name, args)?;
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }

    match name {
        "abs" => Ok(match &args[0] {
            Value::Integer(n) => n
                .checked_abs()
                .map(Value::Integer)
                .unwrap_or_else(|| Value::Decimal(Decimal::from(*n).abs())),
            Value::Float(x) => Value::Float(x.abs()),
            other => Value::from_decimal(number(name, other)?.abs()),
        }),
        "ceil" => match &args[0] {
            Value::Float(x) => Ok(Value::from_f64(x.ceil())),
            other => Ok(Value::from_decimal(number(name, other)?.ceil())),
        },
        "floor" => match &args[0] {
            Value::Float(x) => Ok(Value::from_f64(x.floor())),
            other => Ok(Value::from_decimal(number(name, other)?.floor())),
        },
        "round" => {
            let digits = match args.get(1) {
                None => 0,
                Some(value) => match value {
                    Value::Integer(d) => u32::try_from(*d).ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    EvalError::TypeError(format!(
                        "round() expects a digit count between 0 and {}, got {}",
                        u32::MAX,
                        value
                    ))
                })?,
            };
            if let Value::Float(x) = &args[0] {
                // Huge floats have no fraction left; tiny ones round to zero
                return Ok(if x.abs() >= 1.0 {
                    Value::Float(*x)
                } else {
                    Value::Integer(0)
                });
            }
            let x = number(name, &args[0])?;
            let rounded = x.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
            Ok(if digits == 0 {
                Value::from_decimal(rounded)
            } else {
                Value::Decimal(rounded)
            })
        }
        "sqrt" => Ok(Value::from_f64(float(name, &args[0])?.sqrt())),
        "log" => Ok(Value::from_f64(float(name, &args[0])?.ln())),
        "log10" => Ok(Value::from_f64(float(name, &args[0])?.log10())),
        "exp" => Ok(Value::from_f64(float(name, &args[0])?.exp())),
        "pow" => match (&args[0], &args[1]) {
            (Value::Integer(base), Value::Integer(exp)) if *exp >= 0 => {
                let exact = u32::try_from(*exp).ok().and_then(|e| base.checked_pow(e));
                match exact {
                    Some(n) => Ok(Value::Integer(n)),
                    None => Ok(Value::from_f64((*base as f64).powf(*exp as f64))),
                }
            }
            (base, exp) => Ok(Value::from_f64(float(name, base)?.powf(float(name, exp)?))),
        },
        "upper" => Ok(Value::String(args[0].as_string().to_uppercase())),
        "lower" => Ok(Value::String(args[0].as_string().to_lowercase())),
        "length" => match &args[0] {
            Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
            Value::Array(items) => Ok(Value::Integer(items.len() as i64)),
            Value::Object(map) => Ok(Value::Integer(map.len() as i64)),
            other => Err(EvalError::TypeError(format!(
                "length() expects a string, array or object, got {}",
                other.type_name()
            ))),
        },
        "concat" => Ok(Value::String(args.iter().map(Value::as_string).collect())),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn check_signature(name: &str, args: &[Value]) -> Result<(), EvalError> {
    match name {
        "abs" | "ceil" | "floor" | "sqrt" | "log" | "log10" | "exp" | "upper" | "lower"
        | "length" => expect_arity(name, args, 1, 1),
        "round" => expect_arity(name, args, 1, 2),
        "pow" => expect_arity(name, args, 2, 2),
        "concat" => expect_arity(name, args, 1, usize::MAX),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn aggregate<R, A>(name: &str, args: &[Expr], ctx: &EvalContext<'_, R, A>) -> Result<Value, EvalError>
where
    A: FieldAccessor<R> + ?Sized,
{
    let [arg] = args else {
        return Err(EvalError::TypeError(format!(
            "{}() expects 1 argument, got {}",
            name,
            args.len()
        )));
    };

    if matches!(arg, Expr::Wildcard) {
        if name != "count" {
            return Err(EvalError::TypeError(format!("{}(*) is not supported", name)));
        }
        return Ok(Value::Integer(ctx.rows.len() as i64));
    }

    let mut collected = Vec::with_capacity(ctx.rows.len());
    for row in ctx.rows {
        let value = ctx.for_row(row).eval_expr(arg, &mut ValuesMap::new())?;
        if !value.is_null() {
            collected.push(value);
        }
    }

    match name {
        "count" => Ok(Value::Integer(collected.len() as i64)),
        "min" => Ok(collected.into_iter().min_by(|a, b| a.sort_cmp(b)).unwrap_or_default()),
        "max" => Ok(collected.into_iter().max_by(|a, b| a.sort_cmp(b)).unwrap_or_default()),
        "sum" | "avg" => {
            if collected.is_empty() {
                return Ok(Value::Null);
            }
            let count = collected.len() as i64;
            let mut total = Value::Integer(0);
            for value in &collected {
                float(name, value)?;
                total = arithmetic(ArithOp::Add, &total, value)?;
            }
            if name == "sum" {
                Ok(total)
            } else {
                arithmetic(ArithOp::Divide, &total, &Value::Integer(count))
            }
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

/// Applies an arithmetic operator.
///
/// Integer results are exact and widen to decimal on overflow, then to a
/// float past the decimal range. Division of exact numbers produces a
/// decimal. `+` concatenates two strings. A `NULL` operand yields `NULL`.
pub fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if let (ArithOp::Add, Value::String(a), Value::String(b)) = (op, left, right) {
        return Ok(Value::String(format!("{}{}", a, b)));
    }

    let (Some(x), Some(y)) = (left.as_f64(), right.as_f64()) else {
        return Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.as_str(),
            left.type_name(),
            right.type_name()
        )));
    };

    if let Some(exact) = exact_arithmetic(op, left, right)? {
        return Ok(exact);
    }

    if op == ArithOp::Divide && y == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => x + y,
        ArithOp::Subtract => x - y,
        ArithOp::Multiply => x * y,
        ArithOp::Divide => x / y,
    };
    if !result.is_finite() {
        return Err(EvalError::TypeError(format!(
            "Numeric overflow in '{}'",
            op.as_str()
        )));
    }
    Ok(Value::from_f64(result))
}

/// Integer and decimal arithmetic. `None` when an operand is a float or the
/// result leaves the decimal range.
fn exact_arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Option<Value>, EvalError> {
    if let (Value::Integer(x), Value::Integer(y)) = (left, right) {
        let exact = match op {
            ArithOp::Add => x.checked_add(*y),
            ArithOp::Subtract => x.checked_sub(*y),
            ArithOp::Multiply => x.checked_mul(*y),
            ArithOp::Divide => None,
        };
        if let Some(n) = exact {
            return Ok(Some(Value::Integer(n)));
        }
    }

    let (Some(a), Some(b)) = (left.as_decimal(), right.as_decimal()) else {
        return Ok(None);
    };
    Ok(match op {
        ArithOp::Add => a.checked_add(b).map(Value::from_decimal),
        ArithOp::Subtract => a.checked_sub(b).map(Value::from_decimal),
        ArithOp::Multiply => a.checked_mul(b).map(Value::from_decimal),
        ArithOp::Divide => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b).map(|d| Value::Decimal(d.normalize()))
        }
    })
}
