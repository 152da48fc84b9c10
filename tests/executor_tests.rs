// tests/executor_tests.rs

use std::collections::HashMap;

use serde_json::json;
use strata::convert::{json_to_value, rows_to_json};
use strata::{
    ErrorPolicy, EvalError, Executor, ExecutorConfig, FieldResolution, QueryError, Row, Value,
    ValueAccessor, compile,
};

fn source(data: serde_json::Value) -> HashMap<String, Vec<Value>> {
    let serde_json::Value::Object(resources) = data else {
        panic!("fixture must be an object");
    };
    resources
        .into_iter()
        .map(|(name, records)| {
            let serde_json::Value::Array(records) = records else {
                panic!("resource must be an array");
            };
            (name, records.into_iter().map(json_to_value).collect())
        })
        .collect()
}

fn run_with(
    executor: &Executor,
    query: &str,
    data: &HashMap<String, Vec<Value>>,
    params: &[Value],
) -> Result<Vec<Row>, QueryError> {
    let query = compile(query).unwrap();
    executor.execute(&query, data, &ValueAccessor, params)
}

fn run(query: &str, data: &HashMap<String, Vec<Value>>) -> serde_json::Value {
    rows_to_json(run_with(&Executor::default(), query, data, &[]).unwrap())
}

fn vehicles() -> HashMap<String, Vec<Value>> {
    source(json!({
        "vehicle": [
            {"id": 1, "plate": "AAA", "brand": "ford", "speed": 80, "ownerid": 10},
            {"id": 2, "plate": "BBB", "brand": "fiat", "speed": 120, "ownerid": 11},
            {"id": 3, "plate": "CCC", "brand": "ford", "speed": 95, "ownerid": 10},
            {"id": 4, "plate": "DDD", "brand": "audi", "speed": null, "ownerid": 99}
        ],
        "owner": [
            {"ownerid": 10, "name": "Ana"},
            {"ownerid": 11, "name": "Beto"},
            {"ownerid": 12, "name": "Caro"}
        ]
    }))
}

// ============================================================================
// Filtering and projection
// ============================================================================

#[test]
fn test_where_and_projection() {
    let rows = run(
        "SELECT plate, speed * 2 AS doubled FROM vehicle WHERE speed > 90",
        &vehicles(),
    );
    assert_eq!(
        rows,
        json!([
            {"plate": "BBB", "doubled": 240},
            {"plate": "CCC", "doubled": 190}
        ])
    );
}

#[test]
fn test_unaliased_column_uses_canonical_text() {
    let rows = run_with(
        &Executor::default(),
        "SELECT speed+1 FROM vehicle WHERE id = 1",
        &vehicles(),
        &[],
    )
    .unwrap();
    assert_eq!(rows[0].names().collect::<Vec<_>>(), vec!["speed + 1"]);
    assert_eq!(rows[0].get("speed + 1"), Some(&Value::Integer(81)));
}

#[test]
fn test_wildcard_single_resource() {
    let data = source(json!({"r": [{"b": 2, "a": 1}]}));
    assert_eq!(run("SELECT * FROM r", &data), json!([{"a": 1, "b": 2}]));
}

#[test]
fn test_no_where_keeps_all() {
    assert_eq!(run("SELECT id FROM vehicle", &vehicles()).as_array().unwrap().len(), 4);
}

#[test]
fn test_placeholders() {
    let rows = run_with(
        &Executor::default(),
        "SELECT plate FROM vehicle WHERE brand = ? AND speed > ?",
        &vehicles(),
        &[Value::from("ford"), Value::Integer(90)],
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("plate"), Some(&Value::from("CCC")));
}

#[test]
fn test_missing_parameters() {
    let err = run_with(
        &Executor::default(),
        "SELECT plate FROM vehicle WHERE brand = ?",
        &vehicles(),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, QueryError::Evaluation(EvalError::MissingParameter(0)));
}

#[test]
fn test_unknown_resource() {
    let err = run_with(&Executor::default(), "SELECT * FROM nothing", &vehicles(), &[]).unwrap_err();
    assert_eq!(err, QueryError::UnknownResource("nothing".to_string()));
}

// ============================================================================
// Ordering and window
// ============================================================================

#[test]
fn test_order_by_with_nulls_first() {
    let rows = run("SELECT id FROM vehicle ORDER BY speed", &vehicles());
    assert_eq!(rows, json!([{"id": 4}, {"id": 1}, {"id": 3}, {"id": 2}]));

    let rows = run("SELECT id FROM vehicle ORDER BY speed DESC", &vehicles());
    assert_eq!(rows, json!([{"id": 2}, {"id": 3}, {"id": 1}, {"id": 4}]));
}

#[test]
fn test_order_by_is_stable() {
    let rows = run("SELECT id FROM vehicle ORDER BY brand DESC", &vehicles());
    assert_eq!(rows, json!([{"id": 1}, {"id": 3}, {"id": 2}, {"id": 4}]));
}

#[test]
fn test_start_and_limit() {
    let rows = run("SELECT id FROM vehicle ORDER BY id START 1 LIMIT 2", &vehicles());
    assert_eq!(rows, json!([{"id": 2}, {"id": 3}]));
}

#[test]
fn test_start_beyond_rows_is_empty() {
    let rows = run("SELECT id FROM vehicle START 50 LIMIT 10", &vehicles());
    assert_eq!(rows, json!([]));
}

// ============================================================================
// Grouping and aggregates
// ============================================================================

#[test]
fn test_group_by_with_aggregates() {
    let rows = run(
        "SELECT brand, count(*) AS total, max(speed) AS top, sum(speed) AS speeds \
         FROM vehicle GROUP BY brand",
        &vehicles(),
    );
    assert_eq!(
        rows,
        json!([
            {"brand": "ford", "total": 2, "top": 95, "speeds": 175},
            {"brand": "fiat", "total": 1, "top": 120, "speeds": 120},
            {"brand": "audi", "total": 1, "top": null, "speeds": null}
        ])
    );
}

#[test]
fn test_group_then_order_by_aggregate() {
    let rows = run(
        "SELECT brand, count(*) AS total FROM vehicle GROUP BY brand ORDER BY count(*) DESC, brand",
        &vehicles(),
    );
    assert_eq!(
        rows,
        json!([
            {"brand": "ford", "total": 2},
            {"brand": "audi", "total": 1},
            {"brand": "fiat", "total": 1}
        ])
    );
}

#[test]
fn test_integer_and_decimal_keys_group_together() {
    let data = source(json!({"r": [{"k": 1}, {"k": 1.0}, {"k": 2}]}));
    let rows = run("SELECT k, count(*) AS n FROM r GROUP BY k", &data);
    assert_eq!(rows, json!([{"k": 1, "n": 2}, {"k": 2, "n": 1}]));
}

#[test]
fn test_aggregate_without_group_by_is_one_group() {
    let rows = run(
        "SELECT count(*) AS n, sum(speed) AS total FROM vehicle WHERE brand != 'audi'",
        &vehicles(),
    );
    assert_eq!(rows, json!([{"n": 3, "total": 295}]));
}

#[test]
fn test_aggregate_over_no_rows() {
    let rows = run("SELECT count(*) AS n, max(speed) AS top FROM vehicle WHERE speed > 500", &vehicles());
    assert_eq!(rows, json!([{"n": 0, "top": null}]));
}

#[test]
fn test_avg() {
    let rows = run("SELECT avg(speed) AS mean FROM vehicle GROUP BY brand", &vehicles());
    assert_eq!(rows[0]["mean"], json!(87.5));
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_inner_join() {
    let rows = run(
        "SELECT vehicle.plate, owner.name FROM vehicle \
         JOIN owner ON owner.ownerid = vehicle.ownerid ORDER BY vehicle.id",
        &vehicles(),
    );
    assert_eq!(
        rows,
        json!([
            {"vehicle.plate": "AAA", "owner.name": "Ana"},
            {"vehicle.plate": "BBB", "owner.name": "Beto"},
            {"vehicle.plate": "CCC", "owner.name": "Ana"}
        ])
    );
}

#[test]
fn test_left_join_keeps_unmatched_left() {
    let rows = run(
        "SELECT vehicle.id, owner.name FROM vehicle \
         LEFT JOIN owner ON owner.ownerid = vehicle.ownerid WHERE vehicle.id = 4",
        &vehicles(),
    );
    assert_eq!(rows, json!([{"vehicle.id": 4, "owner.name": null}]));
}

#[test]
fn test_right_join_keeps_unmatched_right() {
    let rows = run(
        "SELECT owner.name, vehicle.plate FROM vehicle \
         RIGHT JOIN owner ON owner.ownerid = vehicle.ownerid ORDER BY owner.name",
        &vehicles(),
    );
    assert_eq!(
        rows,
        json!([
            {"owner.name": "Ana", "vehicle.plate": "AAA"},
            {"owner.name": "Ana", "vehicle.plate": "CCC"},
            {"owner.name": "Beto", "vehicle.plate": "BBB"},
            {"owner.name": "Caro", "vehicle.plate": null}
        ])
    );
}

#[test]
fn test_cross_product() {
    let data = source(json!({"a": [{"x": 1}, {"x": 2}], "b": [{"y": 1}, {"y": 2}, {"y": 3}]}));
    let rows = run("SELECT a.x, b.y FROM a, b WHERE a.x = b.y", &data);
    assert_eq!(rows, json!([{"a.x": 1, "b.y": 1}, {"a.x": 2, "b.y": 2}]));
    assert_eq!(run("SELECT a.x FROM a, b", &data).as_array().unwrap().len(), 6);
}

#[test]
fn test_wildcard_over_join_is_qualified() {
    let data = source(json!({"a": [{"id": 1}], "b": [{"aid": 1}]}));
    let rows = run("SELECT * FROM a JOIN b ON b.aid = a.id", &data);
    assert_eq!(rows, json!([{"a.id": 1, "b.aid": 1}]));
}

#[test]
fn test_ambiguous_field_rejected() {
    let err = run_with(
        &Executor::default(),
        "SELECT name FROM vehicle JOIN owner ON owner.ownerid = vehicle.ownerid WHERE ownerid = 10",
        &vehicles(),
        &[],
    )
    .unwrap_err();
    assert_eq!(
        err,
        QueryError::Evaluation(EvalError::AmbiguousField {
            field: "ownerid".to_string(),
            resources: vec!["vehicle".to_string(), "owner".to_string()],
        })
    );
}

#[test]
fn test_unambiguous_unqualified_field_in_join() {
    let rows = run(
        "SELECT plate, name FROM vehicle JOIN owner ON owner.ownerid = vehicle.ownerid WHERE name = 'Beto'",
        &vehicles(),
    );
    assert_eq!(rows, json!([{"plate": "BBB", "name": "Beto"}]));
}

#[test]
fn test_first_resource_resolution() {
    let executor = Executor::new(
        ExecutorConfig::default().with_resolution(FieldResolution::FirstResource),
    );
    let rows = run_with(
        &executor,
        "SELECT plate FROM vehicle JOIN owner ON owner.ownerid = vehicle.ownerid WHERE ownerid = 11",
        &vehicles(),
        &[],
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("plate"), Some(&Value::from("BBB")));
}

// ============================================================================
// Error policy
// ============================================================================

#[test]
fn test_errors_abort_by_default() {
    let err = run_with(
        &Executor::default(),
        "SELECT id FROM vehicle WHERE 100 / (speed - 80) > 1",
        &vehicles(),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, QueryError::Evaluation(EvalError::DivisionByZero));
}

#[test]
fn test_skip_record_policy() {
    let executor = Executor::new(ExecutorConfig::default().with_error_policy(ErrorPolicy::SkipRecord));
    let rows = run_with(
        &executor,
        "SELECT id FROM vehicle WHERE 100 / (speed - 80) > 1",
        &vehicles(),
        &[],
    )
    .unwrap();
    // id 1 divides by zero, id 4 has a null speed
    let ids: Vec<&Value> = rows.iter().filter_map(|row| row.get("id")).collect();
    assert_eq!(ids, vec![&Value::Integer(2), &Value::Integer(3)]);
}
