//! Integration tests for the reelhouse binary
//!
//! Each test builds a throwaway project with one gzip snapshot per source and
//! a file-backed warehouse created from the fixture DDL.

use flate2::write::GzEncoder;
use flate2::Compression;
use rh_core::SourceId;
use rh_db::{Database, DuckDbBackend};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const WAREHOUSE_SQL: &str = include_str!("../../rh-etl/tests/fixtures/warehouse.sql");

fn reelhouse_bin() -> String {
    env!("CARGO_BIN_EXE_reelhouse").to_string()
}

/// Run a `reelhouse` command and return (stdout, stderr, exit code).
fn run_reelhouse(project: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(reelhouse_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("REELHOUSE_DB")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute reelhouse with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn row_for(source: SourceId) -> &'static str {
    match source {
        SourceId::NameBasics => "nm0000001\tAnn\t1950\t\\N\tactress\ttt0000001",
        SourceId::TitleBasics => "tt0000001\tmovie\tA\tA\t0\t1994\t\\N\t90\tDrama",
        SourceId::TitleEpisode => "tt0000009\ttt0000001\t1\t1",
        SourceId::TitleAkas => "tt0000001\t1\tA\tUS\ten\t\\N\t\\N\t1",
        SourceId::TitleCrew => "tt0000001\tnm0000001\tnm0000001",
        SourceId::TitlePrincipals => "tt0000001\t1\tnm0000001\tactress\t\\N\t\\N",
        SourceId::TitleRatings => "tt0000001\t7.1\t42",
    }
}

fn write_source(data: &Path, source: SourceId) {
    let header: Vec<String> = source.columns().into_iter().map(|c| c.name).collect();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    write!(encoder, "{}\n{}\n", header.join("\t"), row_for(source)).unwrap();
    std::fs::write(data.join(source.default_file()), encoder.finish().unwrap()).unwrap();
}

/// Project with every source present and an empty warehouse file
async fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("reelhouse.yml"),
        "name: cli_project\ndatabase:\n  path: warehouse.duckdb\ntime:\n  min_year: 1990\n  max_year: 1999\n",
    )
    .unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    for source in SourceId::ALL {
        write_source(&data, source);
    }

    let db = DuckDbBackend::new(&dir.path().join("warehouse.duckdb").display().to_string())
        .unwrap();
    db.execute_batch(WAREHOUSE_SQL).await.unwrap();
    drop(db);
    dir
}

#[tokio::test]
async fn test_load_then_status() {
    let dir = project().await;

    let (stdout, stderr, code) = run_reelhouse(dir.path(), &["load", "--quiet"]);
    assert_eq!(code, 0, "stdout:\n{}\nstderr:\n{}", stdout, stderr);
    assert!(stdout.contains("fact_title_ratings"), "{}", stdout);
    assert!(stdout.contains("INSERTED"), "{}", stdout);

    let (stdout, _, code) = run_reelhouse(dir.path(), &["status"]);
    assert_eq!(code, 0, "{}", stdout);
    assert!(stdout.contains("completed"), "{}", stdout);
    assert!(stdout.contains("dim_title"), "{}", stdout);
}

#[tokio::test]
async fn test_report_json_written() {
    let dir = project().await;
    let report = dir.path().join("out").join("report.json");

    let (_, stderr, code) = run_reelhouse(
        dir.path(),
        &[
            "load",
            "-q",
            "--mode",
            "test",
            "--limit",
            "1",
            "--report-json",
            report.to_str().unwrap(),
        ],
    );
    assert_eq!(code, 0, "{}", stderr);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["mode"], "test");
    assert_eq!(json["tables"].as_array().unwrap().len(), 13);
}

#[tokio::test]
async fn test_missing_source_fails_and_status_is_clean() {
    let dir = project().await;
    std::fs::remove_file(dir.path().join("data").join("title.crew.tsv.gz")).unwrap();

    let (_, stderr, code) = run_reelhouse(dir.path(), &["load", "-q"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("title.crew"), "{}", stderr);

    // Preflight failures never write a marker
    let (stdout, _, code) = run_reelhouse(dir.path(), &["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No load has been recorded"), "{}", stdout);
}

#[tokio::test]
async fn test_truncate_leaves_warehouse_untrusted() {
    let dir = project().await;
    let (_, stderr, code) = run_reelhouse(dir.path(), &["load", "-q"]);
    assert_eq!(code, 0, "{}", stderr);

    let (stdout, stderr, code) = run_reelhouse(dir.path(), &["truncate"]);
    assert_eq!(code, 0, "{}", stderr);
    assert!(stdout.contains("truncated"), "{}", stdout);

    let (stdout, _, code) = run_reelhouse(dir.path(), &["status", "--output", "json"]);
    assert_eq!(code, 1);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["trusted"], false);
    assert_eq!(json["state"]["mode"], "truncate-only");
}

#[tokio::test]
async fn test_plan_lists_load_order() {
    let dir = project().await;
    let (stdout, stderr, code) = run_reelhouse(dir.path(), &["plan"]);
    assert_eq!(code, 0, "{}", stderr);

    let time = stdout.find("dim_time").unwrap();
    let ratings = stdout.rfind("fact_title_ratings").unwrap();
    assert!(time < ratings);
    assert!(stdout.contains("Truncate order:"));
    assert!(!stdout.contains("MISSING"), "{}", stdout);
}
