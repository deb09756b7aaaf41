use super::*;

async fn db_with_people() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE dim_person (person_key BIGINT PRIMARY KEY, nconst VARCHAR(12), primary_name VARCHAR);
         CREATE TABLE bridge_title_director (title_key BIGINT, person_key BIGINT REFERENCES dim_person(person_key));",
    )
    .await
    .unwrap();
    db
}

fn person(key: i64, nconst: &str, name: Option<&str>) -> Row {
    vec![Value::Int(key), Value::text(Some(nconst)), Value::text(name)]
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_relation_exists() {
    let db = db_with_people().await;
    assert!(db.relation_exists("dim_person").await.unwrap());
    assert!(db.relation_exists("main.dim_person").await.unwrap());
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_insert_batch_and_read_back() {
    let db = db_with_people().await;
    let columns = ["person_key", "nconst", "primary_name"];
    let rows = vec![
        person(1, "nm0000001", Some("Fred Astaire")),
        person(2, "nm0000002", None),
    ];

    let inserted = db.insert_batch("dim_person", &columns, &rows).await.unwrap();
    assert_eq!(inserted, 2);

    let back = db
        .query_rows(
            "SELECT person_key, nconst, primary_name FROM dim_person ORDER BY person_key",
            3,
        )
        .await
        .unwrap();
    assert_eq!(back, rows);
}

#[tokio::test]
async fn test_insert_batch_is_atomic() {
    let db = db_with_people().await;
    let columns = ["person_key", "nconst", "primary_name"];
    // Second row repeats the primary key
    let rows = vec![
        person(1, "nm0000001", Some("Fred Astaire")),
        person(1, "nm0000002", Some("Lauren Bacall")),
    ];

    let err = db
        .insert_batch("dim_person", &columns, &rows)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InsertError { .. }));
    assert_eq!(
        db.query_count("SELECT * FROM dim_person").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_insert_batch_rejects_wrong_width() {
    let db = db_with_people().await;
    let err = db
        .insert_batch(
            "dim_person",
            &["person_key", "nconst", "primary_name"],
            &[vec![Value::Int(1)]],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::RowWidth {
            expected: 3,
            actual: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_insert_empty_batch() {
    let db = db_with_people().await;
    let inserted = db
        .insert_batch("dim_person", &["person_key"], &[])
        .await
        .unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn test_truncate_children_first() {
    let db = db_with_people().await;
    db.execute_batch(
        "INSERT INTO dim_person VALUES (1, 'nm1', 'A');
         INSERT INTO bridge_title_director VALUES (10, 1);",
    )
    .await
    .unwrap();

    db.truncate("bridge_title_director").await.unwrap();
    db.truncate("dim_person").await.unwrap();

    assert_eq!(db.query_count("SELECT * FROM dim_person").await.unwrap(), 0);
    assert_eq!(
        db.query_count("SELECT * FROM bridge_title_director")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_truncate_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(matches!(
        db.truncate("dim_missing").await.unwrap_err(),
        DbError::TableNotFound(_)
    ));
}

#[tokio::test]
async fn test_constraint_toggle_unsupported() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(
        db.set_constraint_checks(false).await.unwrap(),
        ConstraintToggle::Unsupported
    );
    assert_eq!(
        db.set_constraint_checks(true).await.unwrap(),
        ConstraintToggle::Unsupported
    );
}

#[tokio::test]
async fn test_count_dangling() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE dim_title (title_key BIGINT);
         CREATE TABLE fact_title_ratings (title_key BIGINT, time_key BIGINT);
         INSERT INTO dim_title VALUES (1), (2);
         INSERT INTO fact_title_ratings VALUES (1, NULL), (2, NULL), (3, NULL);",
    )
    .await
    .unwrap();

    let dangling = db
        .count_dangling("fact_title_ratings", "title_key", "dim_title", "title_key")
        .await
        .unwrap();
    assert_eq!(dangling, 1);
}

#[tokio::test]
async fn test_checkpoint_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = DuckDbBackend::from_path(&dir.path().join("warehouse.duckdb")).unwrap();
    db.execute_batch("CREATE TABLE t (id BIGINT); INSERT INTO t VALUES (1);")
        .await
        .unwrap();
    db.checkpoint().await.unwrap();
    assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 1);
}
