use cql_middleware::prelude::*;
use cql_middleware::test_utils::MemoryDriver;
use serde_json::json;

fn handle() -> ConnectionHandle<MemoryDriver> {
    ConnectionHandle::with_options(MemoryDriver::new(), ConnectionOptions::new(["127.0.0.1"]))
}

fn count_of(statements: &[String], wanted: &str) -> usize {
    statements.iter().filter(|s| s.as_str() == wanted).count()
}

#[tokio::test]
async fn create_keyspace_twice_switches_both_times() -> Result<(), CqlMiddlewareError> {
    let db = handle();
    db.create_keyspace_if_missing("testspace", KeyspaceOptions::default())
        .await?;
    db.create_keyspace_if_missing("testspace", KeyspaceOptions::default())
        .await?;

    let statements = db.driver().executed_statements();
    assert_eq!(
        count_of(&statements, &create_keyspace_statement("testspace", &KeyspaceOptions::default())),
        2
    );
    assert_eq!(count_of(&statements, "USE testspace"), 2);
    assert_eq!(
        db.driver().keyspace_settings("testspace"),
        Some((
            "{'class': 'SimpleStrategy', 'replication_factor': 1}".to_string(),
            false
        ))
    );

    let current = db.forward("current_keyspace", Vec::new()).await?;
    assert_eq!(
        current.first().and_then(|row| row.get("keyspace_name")),
        Some(&RowValues::Text("testspace".into()))
    );
    Ok(())
}

#[tokio::test]
async fn keyspace_use_is_skipped_when_create_fails() {
    let db = handle();
    let err = db
        .create_keyspace_if_missing("bad-name", KeyspaceOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CqlMiddlewareError::ExecutionError(_)));

    let statements = db.driver().executed_statements();
    assert_eq!(statements.len(), 1);
    assert!(!statements.iter().any(|s| s.starts_with("USE")));
}

#[tokio::test]
async fn keyspace_settings_through_dispatch() -> Result<(), CqlMiddlewareError> {
    let db = handle();
    let outcome = db
        .invoke(
            "create_keyspace",
            vec![
                "regional".into(),
                RowValues::JSON(json!({"class": "NetworkTopologyStrategy", "dc1": 3})),
                RowValues::Bool(true),
            ],
        )
        .await?;
    assert!(outcome.is_done());
    assert_eq!(
        db.driver().keyspace_settings("regional"),
        Some((
            "{'class': 'NetworkTopologyStrategy', 'dc1': 3}".to_string(),
            true
        ))
    );
    Ok(())
}

#[tokio::test]
async fn replication_entries_reach_the_statement_unchanged() -> Result<(), CqlMiddlewareError> {
    let db = handle();
    db.invoke(
        "create_keyspace",
        vec![
            "ks1".into(),
            RowValues::JSON(json!({"class": "SimpleStrategy", "replication_factor": 1, "dc1": 3})),
        ],
    )
    .await?;
    assert_eq!(
        db.driver().keyspace_settings("ks1"),
        Some((
            "{'class': 'SimpleStrategy', 'replication_factor': 1, 'dc1': 3}".to_string(),
            false
        ))
    );
    Ok(())
}

#[tokio::test]
async fn unknown_replication_class_is_left_to_the_driver() {
    let db = handle();
    let err = db
        .invoke(
            "create_keyspace",
            vec![
                "ks1".into(),
                RowValues::JSON(json!({"class": "EverywhereStrategy"})),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CqlMiddlewareError::ExecutionError(_)));
    assert!(db.is_connection_started());

    let statements = db.driver().executed_statements();
    assert_eq!(
        statements,
        vec![
            "CREATE KEYSPACE IF NOT EXISTS ks1 WITH replication = \
             {'class': 'EverywhereStrategy'} AND durable_writes = false"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn create_table_is_idempotent_but_rejects_conflicts() -> Result<(), CqlMiddlewareError> {
    let db = handle();
    db.create_keyspace_if_missing("testspace", KeyspaceOptions::default())
        .await?;

    let columns = TableColumns::from([("key", "uuid primary key"), ("value", "text")]);
    db.create_table_if_missing("testtable", &columns).await?;
    db.create_table_if_missing("testtable", &columns).await?;
    assert!(db.driver().executed_statements().contains(
        &"CREATE TABLE IF NOT EXISTS testtable (key uuid primary key, value text)".to_string()
    ));

    let conflicting = TableColumns::new()
        .column("key", "uuid primary key")
        .column("value", "int")
        .column("extra", "text");
    let err = db
        .create_table_if_missing("testtable", &conflicting)
        .await
        .unwrap_err();
    assert!(matches!(err, CqlMiddlewareError::ExecutionError(_)));

    // the failed statement leaves the connection usable
    let rows = db.execute("select key, value from testtable", &[]).await?;
    assert_eq!(rows.row_length(), 0);
    Ok(())
}

#[tokio::test]
async fn create_table_through_dispatch_keeps_column_order() -> Result<(), CqlMiddlewareError> {
    let db = handle();
    db.invoke("create_keyspace_if_missing", vec!["testspace".into()])
        .await?;
    db.invoke(
        "create_table",
        vec![
            "testtable".into(),
            RowValues::JSON(json!({"value": "text", "key": "uuid primary key"})),
        ],
    )
    .await?;

    let rows = db.execute("select * from testtable", &[]).await?;
    assert_eq!(
        rows.get_column_names().map(|names| names.as_slice().to_vec()),
        Some(vec!["value".to_string(), "key".to_string()])
    );
    Ok(())
}

#[tokio::test]
async fn invalid_column_type_surfaces_driver_error() {
    let db = handle();
    db.create_keyspace_if_missing("testspace", KeyspaceOptions::default())
        .await
        .unwrap();
    let err = db
        .create_table_if_missing("broken", &TableColumns::from([("key", "notatype primary key")]))
        .await
        .unwrap_err();
    assert!(matches!(err, CqlMiddlewareError::ExecutionError(_)));
}

#[tokio::test]
async fn malformed_dispatch_arguments() {
    let db = handle();
    let err = db
        .invoke("create_table", vec!["testtable".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, CqlMiddlewareError::ParameterError(_)));
    assert!(!db.is_connection_started());
}
