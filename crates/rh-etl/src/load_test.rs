use super::*;
use crate::error::EtlError;
use rh_core::Value;
use rh_db::DuckDbBackend;

const WAREHOUSE_SQL: &str = include_str!("../tests/fixtures/warehouse.sql");

/// The warehouse schema with foreign-key clauses removed
fn unconstrained_sql() -> String {
    WAREHOUSE_SQL
        .lines()
        .map(|line| match line.find(" REFERENCES ") {
            Some(pos) if line.trim_end().ends_with(',') => format!("{},", &line[..pos]),
            Some(pos) => line[..pos].to_string(),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn warehouse(sql: &str) -> Arc<dyn Database> {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(sql).await.unwrap();
    Arc::new(db)
}

fn genre(key: i64, name: &str) -> Row {
    vec![Value::Int(key), Value::text(Some(name))]
}

fn contract() -> WarehouseContract {
    WarehouseContract::catalog().unwrap()
}

#[test]
fn test_phase_sequence() {
    use LoadPhase::*;
    let full = [
        Idle,
        Truncate,
        DisableConstraints,
        LoadDimensions,
        LoadBridges,
        LoadFacts,
        EnableConstraints,
        Report,
    ];
    for pair in full.windows(2) {
        assert!(pair[0].can_move_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
    assert!(Truncate.can_move_to(Report));

    assert!(!Idle.can_move_to(LoadDimensions));
    assert!(!LoadBridges.can_move_to(LoadDimensions));
    assert!(!LoadDimensions.can_move_to(LoadFacts));
    assert!(!Report.can_move_to(Truncate));
}

#[test]
fn test_failed_is_reachable_from_non_terminal_phases() {
    use LoadPhase::*;
    for phase in [Idle, Truncate, LoadDimensions, LoadFacts, EnableConstraints] {
        assert!(phase.can_move_to(Failed), "{}", phase);
    }
    assert!(!Report.can_move_to(Failed));
    assert!(!Failed.can_move_to(Failed));
}

#[test]
fn test_phase_for_kind() {
    assert_eq!(
        LoadPhase::for_kind(TableKind::TimeDimension),
        LoadPhase::LoadDimensions
    );
    assert_eq!(
        LoadPhase::for_kind(TableKind::Dimension),
        LoadPhase::LoadDimensions
    );
    assert_eq!(LoadPhase::for_kind(TableKind::Bridge), LoadPhase::LoadBridges);
    assert_eq!(LoadPhase::for_kind(TableKind::Fact), LoadPhase::LoadFacts);
}

#[tokio::test]
async fn test_illegal_transition_is_an_error() {
    let db = warehouse(WAREHOUSE_SQL).await;
    let mut loader = Loader::new(db, LoadOptions::default());

    let err = loader.transition(LoadPhase::LoadFacts).unwrap_err();
    assert!(matches!(
        err,
        EtlError::Load(LoadError::IllegalTransition {
            from: LoadPhase::Idle,
            to: LoadPhase::LoadFacts,
        })
    ));
    assert_eq!(loader.phase(), LoadPhase::Idle);
}

#[tokio::test]
async fn test_open_table_before_truncate_is_rejected() {
    let db = warehouse(WAREHOUSE_SQL).await;
    let contract = contract();
    let mut loader = Loader::new(db, LoadOptions::default());

    let spec = contract.table("dim_genre").unwrap();
    assert!(loader.open_table(spec).is_err());
}

#[tokio::test]
async fn test_batches_are_committed_in_order() {
    let db = warehouse(WAREHOUSE_SQL).await;
    let contract = contract();
    let options = LoadOptions {
        batch_rows: 2,
        checkpoint_rows: 0,
    };
    let mut loader = Loader::new(db.clone(), options);
    loader
        .truncate_all(&contract.truncate_order().unwrap())
        .await
        .unwrap();
    loader.disable_constraints(true).await.unwrap();

    let spec = contract.table("dim_genre").unwrap();
    let mut sink = loader.open_table(spec).unwrap();
    assert_eq!(loader.phase(), LoadPhase::LoadDimensions);

    for (i, name) in ["Drama", "Comedy", "Short", "Western", "News"]
        .iter()
        .enumerate()
    {
        loader.push(&mut sink, genre(i as i64 + 1, name)).await.unwrap();
    }
    assert_eq!(sink.batches_committed(), 2);
    assert_eq!(sink.pending(), 1);

    let inserted = loader.close_table(sink).await.unwrap();
    assert_eq!(inserted, 5);
    assert_eq!(
        db.query_count("SELECT * FROM dim_genre").await.unwrap(),
        5
    );
}

#[tokio::test]
async fn test_open_table_advances_through_phases() {
    let db = warehouse(WAREHOUSE_SQL).await;
    let contract = contract();
    let mut loader = Loader::new(db, LoadOptions::default());
    loader
        .truncate_all(&contract.truncate_order().unwrap())
        .await
        .unwrap();
    loader.disable_constraints(false).await.unwrap();

    let fact = contract.table("fact_title_ratings").unwrap();
    let sink = loader.open_table(fact).unwrap();
    assert_eq!(loader.phase(), LoadPhase::LoadFacts);
    assert_eq!(loader.close_table(sink).await.unwrap(), 0);

    let dim = contract.table("dim_genre").unwrap();
    assert!(loader.open_table(dim).is_err());
}

#[tokio::test]
async fn test_destination_failure_reports_last_committed_batch() {
    let db = warehouse(WAREHOUSE_SQL).await;
    let contract = contract();
    let options = LoadOptions {
        batch_rows: 2,
        checkpoint_rows: 0,
    };
    let mut loader = Loader::new(db.clone(), options);
    loader
        .truncate_all(&contract.truncate_order().unwrap())
        .await
        .unwrap();
    loader.disable_constraints(true).await.unwrap();

    let spec = contract.table("dim_genre").unwrap();
    let mut sink = loader.open_table(spec).unwrap();
    loader.push(&mut sink, genre(1, "Drama")).await.unwrap();
    loader.push(&mut sink, genre(2, "Comedy")).await.unwrap();
    loader.push(&mut sink, genre(3, "Short")).await.unwrap();
    let err = loader.push(&mut sink, genre(1, "Duplicate")).await.unwrap_err();

    assert_eq!(err.last_committed_batch(), Some(1));
    assert!(matches!(
        err,
        EtlError::Load(LoadError::Destination { ref table, .. }) if table == "dim_genre"
    ));
    // The failed batch rolled back as a whole
    assert_eq!(
        db.query_count("SELECT * FROM dim_genre").await.unwrap(),
        2
    );

    loader.fail().await;
    assert_eq!(loader.phase(), LoadPhase::Failed);
}

#[tokio::test]
async fn test_truncate_all_children_first() {
    let db = warehouse(WAREHOUSE_SQL).await;
    db.execute_batch(
        "INSERT INTO dim_title_type VALUES (1, 'movie');
         INSERT INTO dim_title VALUES (1, 'tt0000001', 1, 'A', 'A', 0, 1994, NULL, 90);
         INSERT INTO dim_genre VALUES (1, 'Drama');
         INSERT INTO bridge_title_genre VALUES (1, 1);",
    )
    .await
    .unwrap();

    let contract = contract();
    let mut loader = Loader::new(db.clone(), LoadOptions::default());
    loader
        .truncate_all(&contract.truncate_order().unwrap())
        .await
        .unwrap();

    for table in ["bridge_title_genre", "dim_title", "dim_title_type", "dim_genre"] {
        assert_eq!(
            db.query_count(&format!("SELECT * FROM {}", table))
                .await
                .unwrap(),
            0,
            "{}",
            table
        );
    }
    loader.transition(LoadPhase::Report).unwrap();
}

#[tokio::test]
async fn test_truncate_missing_table_fails() {
    let db = warehouse("CREATE TABLE dim_genre (genre_key BIGINT, genre_name VARCHAR);").await;
    let contract = contract();
    let mut loader = Loader::new(db, LoadOptions::default());

    let err = loader
        .truncate_all(&contract.truncate_order().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::Load(LoadError::Truncate { .. })));
}

#[tokio::test]
async fn test_probe_integrity_counts_dangling_values() {
    let db = warehouse(&unconstrained_sql()).await;
    db.execute_batch(
        "INSERT INTO dim_title_type VALUES (1, 'movie');
         INSERT INTO dim_title VALUES (1, 'tt0000001', 1, 'A', 'A', 0, 1994, NULL, 90);
         INSERT INTO dim_genre VALUES (1, 'Drama');
         INSERT INTO bridge_title_genre VALUES (1, 1), (1, 7), (9, 1);
         INSERT INTO fact_title_ratings VALUES (1, 'tt0000001', 1, NULL, 1, 7.5, 10);",
    )
    .await
    .unwrap();

    let contract = contract();
    let loader = Loader::new(db, LoadOptions::default());
    let checks = loader.probe_integrity(&contract).await.unwrap();

    let declared: usize = contract.tables().iter().map(|t| t.foreign_keys.len()).sum();
    assert_eq!(checks.len(), declared);

    let dangling: Vec<_> = checks.iter().filter(|c| c.dangling > 0).collect();
    assert_eq!(dangling.len(), 2);
    assert!(dangling
        .iter()
        .all(|c| c.table.as_str() == "bridge_title_genre" && c.dangling == 1));

    let err = check_integrity(&checks).unwrap_err();
    assert!(matches!(
        err,
        EtlError::Load(LoadError::DanglingReferences { count: 2, .. })
    ));
}

#[test]
fn test_check_integrity_passes_when_clean() {
    let checks = vec![IntegrityCheck {
        table: TableName::new("bridge_title_genre"),
        column: "genre_key".to_string(),
        references: TableName::new("dim_genre"),
        dangling: 0,
    }];
    assert!(check_integrity(&checks).is_ok());
    assert!(check_integrity(&[]).is_ok());
}
