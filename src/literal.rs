//! Literal typing.
//!
//! Every literal span in a query is typed exactly once, when the query is
//! compiled. The resolver tries the stricter surface forms first because
//! numbers and UUIDs overlap with plain identifier text:
//!
//! | order | form                                   | result            |
//! |-------|----------------------------------------|-------------------|
//! | 0     | `NULL`                                 | [`Literal::Null`] |
//! | 1     | `2821c2b9-c485-4550-8dd8-6ec83033fa84` | [`Literal::Uuid`] |
//! | 2     | `-42`                                  | [`Literal::Integer`] |
//! | 3     | `-2.3E-4`, `5.3`, `1e3`                | [`Literal::Decimal`] |
//! | 3     | `1E40`, `1E-30`                        | [`Literal::Float`] |
//! | 4     | `POINT (23.34 34.98)`                  | [`Literal::Point`] |
//! | 5     | `2017-07-07 22:15:32`, `2017-07-07`    | [`Literal::Date`] |
//! | 6     | `'quoted'` (only 4 and 5 retried)      | [`Literal::String`] |
//! | 7     | anything else                          | [`Literal::String`] |
//!
//! # Examples
//!
//! ```
//! use strata::literal::{resolve, Literal};
//!
//! assert_eq!(resolve("5"), Literal::Integer(5));
//! assert!(matches!(resolve("-2.3E-4"), Literal::Decimal(_)));
//! assert_eq!(resolve("'5'"), Literal::String("5".to_string()));
//! assert_eq!(resolve("1E40"), Literal::Float(1e40));
//! ```
//!
//! Numbers the decimal type cannot hold (magnitude from 7.9E28 up, or non-zero
//! below 1E-28) are kept as `f64` so they still order against other numbers.

use std::{str::FromStr, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Bounds of the magnitudes a [`Decimal`] holds without losing the value.
const DECIMAL_MAX: f64 = 7.9e28;
const DECIMAL_MIN: f64 = 1e-28;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());

static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d+(\.\d+([eE][+-]?\d+)?|[eE][+-]?\d+)$").unwrap()
});

static POINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^POINT\s*\(\s*(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)\s*\)$").unwrap()
});

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}( \d{2}:\d{2}:\d{2})?$").unwrap()
});

/// A geometric point with decimal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: Decimal,
    pub y: Decimal,
}

impl Point {
    pub fn new(x: Decimal, y: Decimal) -> Self {
        Point { x, y }
    }
}

/// A typed literal, as written in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Integer(i64),
    /// Arbitrary precision decimal; scientific and plain notation of the same
    /// value compare equal.
    Decimal(Decimal),
    /// Number outside the decimal range
    Float(f64),
    Uuid(Uuid),
    /// Timestamp; date-only literals resolve to midnight.
    Date(NaiveDateTime),
    Point(Point),
    String(String),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Integer(_) => "integer",
            Literal::Decimal(_) => "decimal",
            Literal::Float(_) => "float",
            Literal::Uuid(_) => "uuid",
            Literal::Date(_) => "date",
            Literal::Point(_) => "point",
            Literal::String(_) => "string",
        }
    }
}

/// Types a raw, unquoted literal span. Never fails: text that matches no
/// stricter form becomes a [`Literal::String`].
///
/// A span wrapped in single or double quotes is unquoted first and then only
/// tried as a point or a date; quoted digits stay strings.
pub fn resolve(raw: &str) -> Literal {
    let trimmed = raw.trim();
    if let Some(inner) = unquote(trimmed) {
        return resolve_quoted(&inner);
    }

    if trimmed.eq_ignore_ascii_case("null") {
        return Literal::Null;
    }
    if UUID_PATTERN.is_match(trimmed)
        && let Ok(uuid) = Uuid::parse_str(trimmed)
    {
        return Literal::Uuid(uuid);
    }
    if INTEGER_PATTERN.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Literal::Integer(n);
        }
        return resolve_number(trimmed);
    }
    if DECIMAL_PATTERN.is_match(trimmed) {
        return resolve_number(trimmed);
    }
    if let Some(point) = parse_point(trimmed) {
        return Literal::Point(point);
    }
    if let Some(date) = parse_date(trimmed) {
        return Literal::Date(date);
    }
    Literal::String(trimmed.to_string())
}

/// Types the content of a quoted span (quotes already removed).
pub fn resolve_quoted(text: &str) -> Literal {
    if let Some(point) = parse_point(text) {
        return Literal::Point(point);
    }
    if let Some(date) = parse_date(text) {
        return Literal::Date(date);
    }
    Literal::String(text.to_string())
}

/// Types a numeral that is not an `i64`: a decimal when the value fits,
/// otherwise a float.
fn resolve_number(text: &str) -> Literal {
    let Ok(float) = text.parse::<f64>() else {
        return Literal::String(text.to_string());
    };
    if exceeds_decimal(float) {
        return Literal::Float(float);
    }
    match parse_decimal(text) {
        Some(d) => Literal::Decimal(d),
        None => Literal::Float(float),
    }
}

/// True when a [`Decimal`] cannot represent the magnitude of `n`.
pub fn exceeds_decimal(n: f64) -> bool {
    let magnitude = n.abs();
    !magnitude.is_finite()
        || magnitude >= DECIMAL_MAX
        || (magnitude != 0.0 && magnitude < DECIMAL_MIN)
}

/// Parses a plain or scientific decimal. Returns `None` when the value does
/// not fit the decimal range.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

/// Parses `POINT (x y)`.
pub fn parse_point(text: &str) -> Option<Point> {
    let captures = POINT_PATTERN.captures(text.trim())?;
    let x = Decimal::from_str(&captures[1]).ok()?;
    let y = Decimal::from_str(&captures[2]).ok()?;
    Some(Point::new(x, y))
}

/// Parses `yyyy-MM-dd HH:mm:ss` or `yyyy-MM-dd`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if !DATE_PATTERN.is_match(text) {
        return None;
    }
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Formats a timestamp the way the resolver reads it back.
pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_TIME_FORMAT).to_string()
}

fn unquote(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let doubled = format!("{quote}{quote}");
    Some(inner.replace(&doubled, &quote.to_string()))
}
