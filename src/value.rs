use std::{cmp::Ordering, collections::HashMap, fmt};

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use uuid::Uuid;

use crate::literal::{self, Literal, Point};

/// A runtime value read off a record or produced by an expression.
///
/// Covers every literal type plus the shapes records carry (booleans,
/// arrays, objects).
///
/// # Examples
///
/// ```
/// use strata::Value;
/// use std::collections::HashMap;
///
/// let integer = Value::Integer(42);
/// let string = Value::String("hello".to_string());
/// let array = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
///
/// let mut obj = HashMap::new();
/// obj.insert("key".to_string(), Value::String("value".to_string()));
/// let object = Value::Object(obj);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    /// Number outside the decimal range
    Float(f64),
    Uuid(Uuid),
    Date(NaiveDateTime),
    Point(Point),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "float",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Point(_) => "point",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Exact numeric view shared by integers and decimals; `None` for floats.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            other => other.as_decimal().and_then(|d| d.to_f64()),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_) | Value::Float(_))
    }

    /// Builds a number from an `f64`, preferring an integer when the value is
    /// whole. Magnitudes outside the decimal range stay floats; NaN and the
    /// infinities become `Null`.
    pub fn from_f64(n: f64) -> Value {
        if !n.is_finite() {
            return Value::Null;
        }
        if literal::exceeds_decimal(n) {
            return Value::Float(n);
        }
        match Decimal::from_f64(n) {
            Some(d) => Value::from_decimal(d),
            None => Value::Float(n),
        }
    }

    /// Narrows whole decimals that fit an `i64` back to integers.
    pub fn from_decimal(d: Decimal) -> Value {
        if d.is_integer()
            && let Some(n) = d.to_i64()
        {
            Value::Integer(n)
        } else {
            Value::Decimal(d)
        }
    }

    /// Equality with numeric coercion between integers and decimals, and
    /// string coercion towards the typed side (uuid, date, point, boolean).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match self.loose_cmp(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => match (self, other) {
                (Value::Array(a), Value::Array(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
                }
                (Value::Object(a), Value::Object(b)) => {
                    a.len() == b.len()
                        && a.iter()
                            .all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
                }
                (Value::Point(a), Value::Point(b)) => a == b,
                (Value::Point(p), Value::String(s)) | (Value::String(s), Value::Point(p)) => {
                    literal::parse_point(s).is_some_and(|q| q == *p)
                }
                _ => false,
            },
        }
    }

    /// Ordering between comparable values. Returns `None` for mixed types that
    /// have no meaningful order (and for points, which only support equality).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(_), _) | (_, Value::Float(_)) if self.is_number() && other.is_number() => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::Integer(_) | Value::Decimal(_), Value::Integer(_) | Value::Decimal(_)) => {
                Some(self.as_decimal()?.cmp(&other.as_decimal()?))
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::String(s), Value::Uuid(u)) => Some(Uuid::parse_str(s).ok()?.cmp(u)),
            (Value::Uuid(u), Value::String(s)) => Some(u.cmp(&Uuid::parse_str(s).ok()?)),
            (Value::String(s), Value::Date(d)) => Some(literal::parse_date(s)?.cmp(d)),
            (Value::Date(d), Value::String(s)) => Some(d.cmp(&literal::parse_date(s)?)),
            (Value::Boolean(b), Value::String(s)) => {
                Some(b.to_string().as_str().cmp(s.to_ascii_lowercase().as_str()))
            }
            (Value::String(s), Value::Boolean(b)) => {
                Some(s.to_ascii_lowercase().as_str().cmp(b.to_string().as_str()))
            }
            _ => None,
        }
    }

    /// Total order used for sorting: nulls first, then by type rank, then by
    /// value within comparable types.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.loose_cmp(other)
            .unwrap_or_else(|| self.sort_rank().cmp(&other.sort_rank()))
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Decimal(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Uuid(_) => 4,
            Value::Date(_) => 5,
            Value::Point(_) => 6,
            Value::Array(_) => 7,
            Value::Object(_) => 8,
        }
    }

    /// Canonical text used to bucket rows by value; equal numbers of different
    /// tags share a key.
    pub fn group_key(&self) -> String {
        match self {
            Value::Integer(_) | Value::Decimal(_) => match self.as_decimal() {
                Some(d) => format!("n:{}", d.normalize()),
                None => "n:?".to_string(),
            },
            Value::Float(x) => format!("n:{:E}", x),
            Value::Array(items) => {
                let keys: Vec<String> = items.iter().map(Value::group_key).collect();
                format!("a:[{}]", keys.join(","))
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let pairs: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}={}", k, map[k].group_key()))
                    .collect();
                format!("o:{{{}}}", pairs.join(","))
            }
            other => format!("{}:{}", other.type_name(), other),
        }
    }

    /// Converts to string for concatenation and case functions.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(x) => write!(f, "{:E}", x),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Date(d) => f.write_str(&literal::format_date(d)),
            Value::Point(p) => write!(f, "POINT ({} {})", p.x, p.y),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}: {}", k, map[k]))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Decimal(d) => Value::Decimal(*d),
            Literal::Float(x) => Value::Float(*x),
            Literal::Uuid(u) => Value::Uuid(*u),
            Literal::Date(d) => Value::Date(*d),
            Literal::Point(p) => Value::Point(*p),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
