//! Query result adapter driving a pipeline

mod common;

use common::MemoryResult;
use lazyseq::{ColumnType, DataSource, Error, LazyCollection, QueryResultSource, Row};
use serde_json::{json, Value};

fn accounts() -> MemoryResult {
    MemoryResult::new(
        &[
            ("id", "int4"),
            ("balance", "float8"),
            ("code", "bpchar"),
            ("active", "bool"),
            ("meta", "json"),
            ("note", "text"),
        ],
        vec![
            vec![
                Some("1"),
                Some("10.5"),
                Some("AB  "),
                Some("t"),
                Some(r#"{"tier": 1}"#),
                Some("first"),
            ],
            vec![Some("2"), Some("0"), Some("CD  "), Some("f"), None, None],
            vec![
                Some("3"),
                Some("99.25"),
                Some("EF  "),
                Some("maybe"),
                Some("[1, 2]"),
                Some(" spaced "),
            ],
        ],
    )
}

#[test]
fn test_rows_are_coerced() {
    let source = QueryResultSource::new(accounts()).unwrap();
    let rows = LazyCollection::new(source).execute().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(
        Value::Object(rows[0].clone()),
        json!({
            "id": 1,
            "balance": 10.5,
            "code": "AB",
            "active": true,
            "meta": {"tier": 1},
            "note": "first",
        })
    );
    assert_eq!(rows[1]["active"], json!(false));
    assert_eq!(rows[1]["meta"], Value::Null);
    assert_eq!(rows[1]["note"], Value::Null);
    assert_eq!(rows[2]["active"], Value::Null);
    assert_eq!(rows[2]["note"], json!(" spaced "));
}

#[test]
fn test_columns_keep_driver_order() {
    let source = QueryResultSource::new(accounts()).unwrap();
    assert_eq!(source.row_count(), 3);

    let layout: Vec<(&str, ColumnType)> = source
        .columns()
        .iter()
        .map(|(name, ty)| (name.as_str(), ty.clone()))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("id", ColumnType::Int4),
            ("balance", ColumnType::Float8),
            ("code", ColumnType::Bpchar),
            ("active", ColumnType::Bool),
            ("meta", ColumnType::Json),
            ("note", ColumnType::Other("text".to_string())),
        ]
    );

    let row = source.row(0).unwrap();

    let names: Vec<&str> = row.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "balance", "code", "active", "meta", "note"]);
}

#[test]
fn test_wrong_handle_kind_is_rejected() {
    let mut handle = accounts();
    handle.resource_type = "mysql result".to_string();

    let err = QueryResultSource::new(handle).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidSource { ref expected, ref found }
            if expected == "pgsql result" && found == "mysql result"
    ));
}

#[test]
fn test_pipeline_over_rows_fetches_lazily() {
    let handle = accounts();
    let fetches = handle.fetches.clone();
    let source = QueryResultSource::new(handle).unwrap();

    let first_active = LazyCollection::new(source)
        .filter(|row: &Row| row["active"] == json!(true))
        .map_into(|row| row["id"].as_i64().unwrap_or_default())
        .first()
        .unwrap();

    assert_eq!(first_active, Some(1));
    assert_eq!(fetches.get(), 1);
}

#[test]
fn test_source_replays_and_reports_count() {
    let source = QueryResultSource::new(accounts()).unwrap();
    assert_eq!(source.known_len(), Some(3));

    let coll = LazyCollection::new(source);
    let ids = coll.map_into(|row: Row| row["id"].clone());

    assert_eq!(ids.execute().unwrap(), vec![json!(1), json!(2), json!(3)]);
    assert_eq!(ids.execute().unwrap().len(), 3);
    assert_eq!(coll.source_len(), Some(3));
    let funded = coll.filter(|row| row["balance"].as_f64() > Some(5.0));
    assert_eq!(funded.count().unwrap(), 2);
}

#[test]
fn test_nested_iteration_is_refused() {
    let coll = LazyCollection::new(QueryResultSource::new(accounts()).unwrap());
    let inner = coll.clone();

    let nested = coll
        .map_into(move |row: Row| (row["id"].clone(), inner.count()))
        .execute()
        .unwrap();

    assert!(matches!(nested[0].1, Err(Error::SourceBusy)));
    // Released once the outer execution finished
    assert_eq!(coll.count().unwrap(), 3);
}

#[test]
fn test_bad_json_fails_execution() {
    let handle = MemoryResult::new(
        &[("doc", "json")],
        vec![vec![Some("{}")], vec![Some("{oops")]],
    );
    let coll = LazyCollection::new(QueryResultSource::new(handle).unwrap());

    assert_eq!(coll.take(1).count().unwrap(), 1);
    assert!(matches!(
        coll.execute(),
        Err(Error::Coercion { ref column, .. }) if column == "doc"
    ));
}
