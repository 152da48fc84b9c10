//! Query execution over in-memory records.
//!
//! The pipeline runs in a fixed order: FROM (cross product), JOIN, WHERE,
//! GROUP BY, ORDER BY, START / LIMIT, and finally the select list.
//!
//! Without GROUP BY, a query whose select list or ORDER BY calls an aggregate
//! treats all remaining rows as one group; otherwise every row stands alone.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::{
    accessor::FieldAccessor,
    ast::{Evaluator, Expr, JoinKind, Query},
    error::{EvalError, QueryError, QueryResult},
    evaluator::{EvalContext, ValuesMap},
    value::Value,
};

/// Supplies the records of each resource a query names.
pub trait RecordSource<R> {
    fn records(&self, resource: &str) -> Option<&[R]>;
}

impl<R> RecordSource<R> for HashMap<String, Vec<R>> {
    fn records(&self, resource: &str) -> Option<&[R]> {
        self.get(resource).map(Vec::as_slice)
    }
}

/// How an unqualified field name is resolved when a row spans several
/// resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldResolution {
    /// Fail with [`EvalError::AmbiguousField`] when more than one resource
    /// holds a non-null value
    #[default]
    Reject,
    /// Take the first resource, in FROM then JOIN order, holding a non-null
    /// value
    FirstResource,
}

/// What happens when evaluating a predicate against a record fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop and return the error
    #[default]
    Abort,
    /// Log the error and treat the record as not matching
    SkipRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutorConfig {
    pub resolution: FieldResolution,
    pub on_error: ErrorPolicy,
}

impl ExecutorConfig {
    pub fn with_resolution(mut self, resolution: FieldResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }
}

/// A row pairing one record (or none) per resource, in FROM then JOIN order.
pub struct CompositeRecord<'a, R> {
    slots: Vec<(&'a str, Option<&'a R>)>,
}

impl<R> Clone for CompositeRecord<'_, R> {
    fn clone(&self) -> Self {
        CompositeRecord {
            slots: self.slots.clone(),
        }
    }
}

impl<'a, R> CompositeRecord<'a, R> {
    fn empty() -> Self {
        CompositeRecord { slots: Vec::new() }
    }

    fn with(&self, resource: &'a str, record: Option<&'a R>) -> Self {
        let mut slots = Vec::with_capacity(self.slots.len() + 1);
        slots.extend_from_slice(&self.slots);
        slots.push((resource, record));
        CompositeRecord { slots }
    }

    /// The record of a resource; `None` when the resource is unknown or its
    /// side of an outer join is absent.
    pub fn record(&self, resource: &str) -> Option<&'a R> {
        self.slot(resource).and_then(|(_, record)| *record)
    }

    pub fn resources(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.slots.iter().map(|(resource, _)| *resource)
    }

    fn slot(&self, resource: &str) -> Option<&(&'a str, Option<&'a R>)> {
        self.slots
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(resource))
    }
}

/// Resolves field names against a [`CompositeRecord`] by delegating to the
/// accessor of the underlying records.
pub struct CompositeAccessor<'a, A: ?Sized> {
    inner: &'a A,
    resolution: FieldResolution,
}

impl<'a, A: ?Sized> CompositeAccessor<'a, A> {
    pub fn new(inner: &'a A, resolution: FieldResolution) -> Self {
        CompositeAccessor { inner, resolution }
    }
}

impl<R, A> FieldAccessor<CompositeRecord<'_, R>> for CompositeAccessor<'_, A>
where
    A: FieldAccessor<R> + ?Sized,
{
    fn get(&self, row: &CompositeRecord<'_, R>, field: &str) -> Result<Value, EvalError> {
        if let Some((qualifier, rest)) = field.split_once('.')
            && let Some((_, record)) = row.slot(qualifier)
        {
            return match record {
                Some(record) => self.inner.get(record, rest),
                None => Ok(Value::Null),
            };
        }

        if let [(_, record)] = row.slots.as_slice() {
            return match record {
                Some(record) => self.inner.get(record, field),
                None => Ok(Value::Null),
            };
        }

        let mut found: Vec<(&str, Value)> = Vec::new();
        for (resource, record) in &row.slots {
            let Some(record) = record else {
                continue;
            };
            let value = self.inner.get(record, field)?;
            if value.is_null() {
                continue;
            }
            if self.resolution == FieldResolution::FirstResource {
                return Ok(value);
            }
            found.push((*resource, value));
        }

        match found.len() {
            0 => Ok(Value::Null),
            1 => Ok(found.remove(0).1),
            _ => Err(EvalError::AmbiguousField {
                field: field.to_string(),
                resources: found.into_iter().map(|(r, _)| r.to_string()).collect(),
            }),
        }
    }

    fn field_names(&self, row: &CompositeRecord<'_, R>) -> Vec<String> {
        if let [(_, record)] = row.slots.as_slice() {
            return record
                .map(|record| self.inner.field_names(record))
                .unwrap_or_default();
        }
        let mut names = Vec::new();
        for (resource, record) in &row.slots {
            if let Some(record) = record {
                for name in self.inner.field_names(record) {
                    names.push(format!("{}.{}", resource, name));
                }
            }
        }
        names
    }
}

/// One output row: column names with their values, in select-list order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, value)| value)
    }
}

/// Runs compiled queries against a [`RecordSource`].
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use serde_json::json;
/// use strata::{compile, convert::json_to_value, Executor, Value, ValueAccessor};
///
/// let mut source = HashMap::new();
/// source.insert(
///     "vehicle".to_string(),
///     vec![
///         json_to_value(json!({"plate": "A-1", "speed": 80})),
///         json_to_value(json!({"plate": "B-2", "speed": 120})),
///     ],
/// );
///
/// let query = compile("SELECT plate FROM vehicle WHERE speed > 100").unwrap();
/// let rows = Executor::default().execute(&query, &source, &ValueAccessor, &[]).unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get("plate"), Some(&Value::from("B-2")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Executor { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes a query.
    ///
    /// # Errors
    ///
    /// - [`QueryError::UnknownResource`] when the source lacks a resource
    /// - [`QueryError::Evaluation`] when fewer parameters than placeholders are
    ///   given, or an evaluation fails under [`ErrorPolicy::Abort`]; grouping,
    ///   ordering and projection errors always abort
    pub fn execute<'a, R, S, A>(
        &self,
        query: &'a Query,
        source: &'a S,
        accessor: &'a A,
        params: &'a [Value],
    ) -> QueryResult<Vec<Row>>
    where
        S: RecordSource<R> + ?Sized,
        A: FieldAccessor<R> + ?Sized,
    {
        debug!(
            resources = ?query.all_resources(),
            placeholders = query.placeholders,
            "Executing query"
        );

        if params.len() < query.placeholders {
            return Err(EvalError::MissingParameter(params.len()).into());
        }

        let accessor = CompositeAccessor::new(accessor, self.config.resolution);

        let mut rows = vec![CompositeRecord::empty()];
        for resource in &query.resources {
            let records = Self::records(source, resource)?;
            rows = rows
                .iter()
                .flat_map(|row| records.iter().map(move |r| row.with(resource, Some(r))))
                .collect();
        }
        trace!(rows = rows.len(), "FROM produced rows");

        let mut joined: Vec<&str> = query.resources.iter().map(String::as_str).collect();
        for join in &query.joins {
            let records = Self::records(source, &join.resource)?;
            rows = self.join(rows, &joined, join.kind, &join.resource, records, &join.on, &accessor, params)?;
            joined.push(&join.resource);
            trace!(resource = %join.resource, kind = join.kind.as_str(), rows = rows.len(), "Joined");
        }

        if let Some(predicate) = &query.evaluator {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if self.matches(predicate, &row, &accessor, params)? {
                    kept.push(row);
                }
            }
            rows = kept;
            trace!(rows = rows.len(), "Filtered");
        }

        let mut groups = if query.is_grouped() {
            Self::group(rows, &query.group_by, &accessor, params)?
        } else if query.has_aggregates() {
            vec![rows]
        } else {
            rows.into_iter().map(|row| vec![row]).collect()
        };
        trace!(groups = groups.len(), "Grouped");

        if !query.order_by.is_empty() {
            let mut keyed = Vec::with_capacity(groups.len());
            for group in groups {
                let ctx = EvalContext::new(&group, &accessor, params);
                let mut values = ValuesMap::new();
                let keys = query
                    .order_by
                    .iter()
                    .map(|field| ctx.eval_expr(&field.expr, &mut values))
                    .collect::<Result<Vec<_>, _>>()?;
                keyed.push((keys, group));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                for ((x, y), field) in a.iter().zip(b).zip(&query.order_by) {
                    let ordering = x.sort_cmp(y);
                    let ordering = if field.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering.is_ne() {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
            groups = keyed.into_iter().map(|(_, group)| group).collect();
        }

        let start = query.start.map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let limit = query.limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let mut output = Vec::new();
        for group in groups.iter().skip(start).take(limit) {
            output.push(Self::project(query, group, &accessor, params)?);
        }

        debug!(rows = output.len(), "Query executed");
        Ok(output)
    }

    fn records<'a, R, S>(source: &'a S, resource: &str) -> QueryResult<&'a [R]>
    where
        S: RecordSource<R> + ?Sized,
    {
        source
            .records(resource)
            .ok_or_else(|| QueryError::UnknownResource(resource.to_string()))
    }

    /// Evaluates a predicate, applying the configured error policy.
    fn matches<R, A>(
        &self,
        predicate: &Evaluator,
        row: &CompositeRecord<'_, R>,
        accessor: &CompositeAccessor<'_, A>,
        params: &[Value],
    ) -> Result<bool, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        match predicate.evaluate(row, accessor, params) {
            Ok(matched) => Ok(matched),
            Err(err) if self.config.on_error == ErrorPolicy::SkipRecord => {
                warn!(error = %err, "Skipping record");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn join<'a, R, A>(
        &self,
        rows: Vec<CompositeRecord<'a, R>>,
        joined: &[&'a str],
        kind: JoinKind,
        resource: &'a str,
        records: &'a [R],
        on: &Evaluator,
        accessor: &CompositeAccessor<'_, A>,
        params: &[Value],
    ) -> Result<Vec<CompositeRecord<'a, R>>, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let mut output = Vec::new();
        let mut right_matched = vec![false; records.len()];

        for row in &rows {
            let mut matched = false;
            for (index, record) in records.iter().enumerate() {
                let candidate = row.with(resource, Some(record));
                if self.matches(on, &candidate, accessor, params)? {
                    matched = true;
                    right_matched[index] = true;
                    output.push(candidate);
                }
            }
            if !matched && kind == JoinKind::Left {
                output.push(row.with(resource, None));
            }
        }

        if kind == JoinKind::Right {
            for (record, _) in records.iter().zip(&right_matched).filter(|(_, m)| !**m) {
                let mut row = CompositeRecord::empty();
                for &name in joined {
                    row = row.with(name, None);
                }
                output.push(row.with(resource, Some(record)));
            }
        }

        Ok(output)
    }

    /// Partitions rows by their group values, keeping first-occurrence order.
    fn group<'a, R, A>(
        rows: Vec<CompositeRecord<'a, R>>,
        group_by: &[Expr],
        accessor: &CompositeAccessor<'_, A>,
        params: &[Value],
    ) -> Result<Vec<Vec<CompositeRecord<'a, R>>>, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let mut groups: Vec<Vec<CompositeRecord<'a, R>>> = Vec::new();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        for row in rows {
            let ctx = EvalContext::new(std::slice::from_ref(&row), accessor, params);
            let mut values = ValuesMap::new();
            let mut key = Vec::with_capacity(group_by.len());
            for expr in group_by {
                key.push(ctx.eval_expr(expr, &mut values)?.group_key());
            }

            match index.get(&key) {
                Some(&position) => groups[position].push(row),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        Ok(groups)
    }

    fn project<R, A>(
        query: &Query,
        group: &[CompositeRecord<'_, R>],
        accessor: &CompositeAccessor<'_, A>,
        params: &[Value],
    ) -> Result<Row, EvalError>
    where
        A: FieldAccessor<R> + ?Sized,
    {
        let ctx = EvalContext::new(group, accessor, params);
        let mut values = ValuesMap::new();
        let mut columns = Vec::with_capacity(query.fields.len());

        for field in &query.fields {
            if matches!(field.expr, Expr::Wildcard) {
                if let Some(first) = group.first() {
                    for name in accessor.field_names(first) {
                        let value = accessor.get(first, &name)?;
                        columns.push((name, value));
                    }
                }
                continue;
            }

            let value = ctx.eval_expr(&field.expr, &mut values)?;
            let name = field
                .alias
                .clone()
                .unwrap_or_else(|| field.expr.to_string());
            columns.push((name, value));
        }

        Ok(Row { columns })
    }
}
