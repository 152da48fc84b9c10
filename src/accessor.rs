//! Field access.
//!
//! The engine never looks inside records itself. Everything it reads goes
//! through a [`FieldAccessor`], which maps a field name (possibly qualified
//! as `resource.field`, possibly a dotted path) to a [`Value`].

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use crate::{error::EvalError, value::Value};

/// Reads named fields off records of type `R`.
///
/// An absent field reads as [`Value::Null`]; an `Err` is reserved for
/// accessors that genuinely fail.
pub trait FieldAccessor<R> {
    fn get(&self, record: &R, field: &str) -> Result<Value, EvalError>;

    /// Field names of a record, used to expand `SELECT *`.
    fn field_names(&self, _record: &R) -> Vec<String> {
        Vec::new()
    }
}

/// Adapts a closure into a [`FieldAccessor`].
///
/// # Examples
///
/// ```
/// use strata::{FieldAccessor, FnAccessor, Value};
///
/// let accessor = FnAccessor::new(|record: &(i64, i64), field: &str| {
///     Ok(match field {
///         "x" => Value::Integer(record.0),
///         "y" => Value::Integer(record.1),
///         _ => Value::Null,
///     })
/// });
/// assert_eq!(accessor.get(&(1, 2), "y").unwrap(), Value::Integer(2));
/// ```
pub struct FnAccessor<F, R> {
    getter: F,
    _record: PhantomData<fn(&R)>,
}

impl<F, R> FnAccessor<F, R>
where
    F: Fn(&R, &str) -> Result<Value, EvalError>,
{
    pub fn new(getter: F) -> Self {
        FnAccessor {
            getter,
            _record: PhantomData,
        }
    }
}

impl<F, R> FieldAccessor<R> for FnAccessor<F, R>
where
    F: Fn(&R, &str) -> Result<Value, EvalError>,
{
    fn get(&self, record: &R, field: &str) -> Result<Value, EvalError> {
        (self.getter)(record, field)
    }
}

/// Accessor for [`Value`] records, typically decoded from JSON.
///
/// Lookup order: the exact key, then the name as a dotted path, then the
/// name without its leading qualifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueAccessor;

impl ValueAccessor {
    fn lookup(record: &Value, field: &str) -> Option<Value> {
        let Value::Object(map) = record else {
            return None;
        };
        if let Some(value) = map.get(field) {
            return Some(value.clone());
        }
        if field.contains('.') {
            return Self::walk(record, field);
        }
        None
    }

    fn walk(record: &Value, path: &str) -> Option<Value> {
        let mut current = record;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

impl FieldAccessor<Value> for ValueAccessor {
    fn get(&self, record: &Value, field: &str) -> Result<Value, EvalError> {
        if let Some(value) = Self::lookup(record, field) {
            return Ok(value);
        }
        if let Some((_, rest)) = field.split_once('.')
            && let Some(value) = Self::lookup(record, rest)
        {
            return Ok(value);
        }
        Ok(Value::Null)
    }

    fn field_names(&self, record: &Value) -> Vec<String> {
        match record {
            Value::Object(map) => {
                let mut names: Vec<String> = map.keys().cloned().collect();
                names.sort();
                names
            }
            _ => Vec::new(),
        }
    }
}

/// Reads one field off a record.
pub type Getter<R> = fn(&R) -> Value;

/// Named getters of a record type, in declaration order.
pub struct Accessors<R> {
    getters: Vec<(String, Getter<R>)>,
}

impl<R> Default for Accessors<R> {
    fn default() -> Self {
        Accessors {
            getters: Vec::new(),
        }
    }
}

impl<R> Accessors<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, getter: Getter<R>) -> Self {
        self.getters.push((name.into(), getter));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.getters.iter().map(|(name, _)| name.clone()).collect()
    }

    fn find(&self, name: &str) -> Option<Getter<R>> {
        self.getters
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.getters.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, getter)| *getter)
    }
}

/// A record type that publishes its fields as named getters.
///
/// # Examples
///
/// ```
/// use strata::{Accessors, FieldAccessor, Record, RecordAccessor, Value};
///
/// struct Vehicle {
///     plate: String,
///     odometer: i64,
/// }
///
/// impl Record for Vehicle {
///     fn accessors() -> Accessors<Self> {
///         Accessors::new()
///             .field("plate", |v: &Vehicle| Value::from(v.plate.as_str()))
///             .field("odometer", |v: &Vehicle| Value::Integer(v.odometer))
///     }
/// }
///
/// let truck = Vehicle { plate: "MKR-001".to_string(), odometer: 1200 };
/// assert_eq!(RecordAccessor.get(&truck, "odometer").unwrap(), Value::Integer(1200));
/// ```
pub trait Record: Sized + 'static {
    fn accessors() -> Accessors<Self>;
}

type CacheKey = (TypeId, String);
type CachedGetter = Option<Arc<dyn Any + Send + Sync>>;

/// Process-wide getter cache. Entries are only ever inserted.
static GETTER_CACHE: LazyLock<RwLock<HashMap<CacheKey, CachedGetter>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn cached_getter<R: Record>(field: &str) -> Option<Getter<R>> {
    let key = (TypeId::of::<R>(), field.to_string());

    let cached = GETTER_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();

    let entry = match cached {
        Some(entry) => entry,
        None => {
            let resolved: CachedGetter = R::accessors()
                .find(field)
                .map(|getter| Arc::new(getter) as Arc<dyn Any + Send + Sync>);
            GETTER_CACHE
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(resolved)
                .clone()
        }
    };

    entry.and_then(|getter| getter.downcast_ref::<Getter<R>>().copied())
}

/// Accessor for any [`Record`] type.
///
/// A qualified name whose field is unknown falls back to the name without
/// its qualifier; unknown fields read as `NULL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAccessor;

impl<R: Record> FieldAccessor<R> for RecordAccessor {
    fn get(&self, record: &R, field: &str) -> Result<Value, EvalError> {
        if let Some(getter) = cached_getter::<R>(field) {
            return Ok(getter(record));
        }
        if let Some((_, rest)) = field.split_once('.')
            && let Some(getter) = cached_getter::<R>(rest)
        {
            return Ok(getter(record));
        }
        Ok(Value::Null)
    }

    fn field_names(&self, _record: &R) -> Vec<String> {
        R::accessors().names()
    }
}
