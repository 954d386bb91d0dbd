#![cfg(feature = "scylla")]

use cql_middleware::config::CONTACT_POINTS_ENV;
use cql_middleware::prelude::*;

/// Runs against a live cluster named by `CASSANDRA_CONTACT_POINTS`; skipped otherwise.
#[tokio::test]
async fn scylla_bootstrap_and_pass_through() -> Result<(), CqlMiddlewareError> {
    if std::env::var(CONTACT_POINTS_ENV).is_err() {
        eprintln!("skipping: {CONTACT_POINTS_ENV} is not set");
        return Ok(());
    }

    let db = ConnectionHandle::new(ScyllaDriver);
    db.create_keyspace_if_missing("cql_middleware_test", KeyspaceOptions::default())
        .await?;
    db.create_table_if_missing(
        "testtable",
        &TableColumns::from([("key", "bigint primary key"), ("value", "text")]),
    )
    .await?;

    db.execute(
        "INSERT INTO testtable (key, value) VALUES (?, ?)",
        &[RowValues::Int(42), RowValues::from("answer")],
    )
    .await?;
    let stored = db
        .execute("SELECT value FROM testtable WHERE key = ?", &[RowValues::Int(42)])
        .await?;
    assert_eq!(
        stored.first().and_then(|row| row.get("value")),
        Some(&RowValues::Text("answer".into()))
    );

    let rows = db
        .invoke("execute", vec!["select key from system.local".into()])
        .await?
        .into_result_set()
        .expect("execute yields rows");
    assert_eq!(
        rows.first().and_then(|row| row.get("key")),
        Some(&RowValues::Text("local".into()))
    );

    let mut length = 0;
    let summary = db
        .each_row("select key from system.local", &[], |_, row| {
            assert!(row.get("key").is_some());
            length += 1;
        })
        .await?;
    assert!(length >= 1);
    assert_eq!(length, summary.row_length);
    Ok(())
}
