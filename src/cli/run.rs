//! Execute queries against JSON input

use std::collections::HashMap;

use super::CliError;
use crate::{
    ErrorPolicy, Executor, ExecutorConfig, FieldResolution, Value, ValueAccessor, compile,
    convert::{json_to_value, rows_to_json},
};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The query text
    pub query: String,
    /// JSON object mapping resource names to arrays of records
    pub input: Option<String>,
    /// JSON array of runtime parameters, bound to `?` in order
    pub params: Option<String>,
    pub resolution: FieldResolution,
    /// Skip records whose predicate evaluation fails
    pub skip_errors: bool,
}

/// Runs the query and returns the result rows as JSON.
pub fn execute_run(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let query = compile(&options.query)?;

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let source = parse_source(serde_json::from_str(json_str)?)?;

    let params = match &options.params {
        Some(text) => parse_params(serde_json::from_str(text)?)?,
        None => Vec::new(),
    };

    let on_error = if options.skip_errors {
        ErrorPolicy::SkipRecord
    } else {
        ErrorPolicy::Abort
    };
    let config = ExecutorConfig::default()
        .with_resolution(options.resolution)
        .with_error_policy(on_error);

    let rows = Executor::new(config).execute(&query, &source, &ValueAccessor, &params)?;
    Ok(rows_to_json(rows))
}

fn parse_source(json: serde_json::Value) -> Result<HashMap<String, Vec<Value>>, CliError> {
    let serde_json::Value::Object(resources) = json else {
        return Err(CliError::InvalidInput(
            "expected an object mapping resource names to arrays of records".to_string(),
        ));
    };

    let mut source = HashMap::new();
    for (name, records) in resources {
        let serde_json::Value::Array(records) = records else {
            return Err(CliError::InvalidInput(format!(
                "resource '{}' must be an array of records",
                name
            )));
        };
        source.insert(name, records.into_iter().map(json_to_value).collect());
    }
    Ok(source)
}

fn parse_params(json: serde_json::Value) -> Result<Vec<Value>, CliError> {
    match json {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(json_to_value).collect()),
        _ => Err(CliError::InvalidInput(
            "parameters must be a JSON array".to_string(),
        )),
    }
}
