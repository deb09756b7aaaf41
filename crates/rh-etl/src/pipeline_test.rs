use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use rh_db::DuckDbBackend;
use std::io::Write;
use tempfile::TempDir;

const WAREHOUSE_SQL: &str = include_str!("../tests/fixtures/warehouse.sql");

/// One row per source; every reference resolves
fn tiny_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("reelhouse.yml"),
        "name: tiny\ntime:\n  min_year: 1990\n  max_year: 1999\n",
    )
    .unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();

    for source in SourceId::ALL {
        let header: Vec<String> = source.columns().into_iter().map(|c| c.name).collect();
        let row = match source {
            SourceId::NameBasics => "nm0000001\tAnn\t1950\t\\N\tactress\ttt0000001",
            SourceId::TitleBasics => "tt0000001\tmovie\tA\tA\t0\t1994\t\\N\t90\tDrama",
            SourceId::TitleEpisode => "tt0000009\ttt0000001\t1\t1",
            SourceId::TitleAkas => "tt0000001\t1\tA\tUS\ten\t\\N\t\\N\t1",
            SourceId::TitleCrew => "tt0000001\tnm0000001\tnm0000001",
            SourceId::TitlePrincipals => "tt0000001\t1\tnm0000001\tactress\t\\N\t\\N",
            SourceId::TitleRatings => "tt0000001\t7.1\t42",
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        write!(encoder, "{}\n{}\n", header.join("\t"), row).unwrap();
        std::fs::write(data.join(source.default_file()), encoder.finish().unwrap()).unwrap();
    }
    dir
}

async fn pipeline(dir: &TempDir) -> Pipeline {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(WAREHOUSE_SQL).await.unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    Pipeline::new(config, dir.path(), Arc::new(db)).unwrap()
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl PipelineObserver for Recorder {
    fn phase_started(&mut self, phase: LoadPhase) {
        self.events.push(format!("phase {}", phase));
    }

    fn table_started(&mut self, table: &TableName, source: &str) {
        self.events.push(format!("start {} <- {}", table, source));
    }

    fn table_finished(&mut self, stats: &TableStats) {
        self.events
            .push(format!("done {} {}", stats.table, stats.inserted));
    }
}

#[tokio::test]
async fn test_observer_sees_phases_in_order() {
    let dir = tiny_project();
    let pipeline = pipeline(&dir).await;
    let mut recorder = Recorder::default();

    let outcome = pipeline.run(RunMode::Full, &mut recorder).await;
    assert!(outcome.succeeded(), "{:?}", outcome.result);

    let phases: Vec<&str> = recorder
        .events
        .iter()
        .filter(|e| e.starts_with("phase "))
        .map(String::as_str)
        .collect();
    assert_eq!(
        phases,
        vec![
            "phase truncate",
            "phase disable constraints",
            "phase load dimensions",
            "phase load bridges",
            "phase load facts",
            "phase enable constraints",
            "phase report",
        ]
    );

    assert_eq!(recorder.events[2], "phase load dimensions");
    assert_eq!(recorder.events[3], "start dim_time <- year window");
    assert!(recorder
        .events
        .contains(&"done fact_title_ratings 1".to_string()));
    assert!(recorder
        .events
        .contains(&"done dim_time 10".to_string()));
}

#[tokio::test]
async fn test_plan_matches_load_order() {
    let dir = tiny_project();
    let pipeline = pipeline(&dir).await;
    let plan = pipeline.plan(RunMode::Full).unwrap();

    let jobs: Vec<&str> = plan.jobs.iter().map(|j| j.spec.name.as_str()).collect();
    let order: Vec<&str> = pipeline
        .contract()
        .load_order()
        .unwrap()
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(jobs, order);
}

#[tokio::test]
async fn test_strict_run_loads_clean_data() {
    let dir = tiny_project();
    std::fs::write(
        dir.path().join("reelhouse.yml"),
        "name: tiny\nstrictness: strict\ntime:\n  min_year: 1990\n  max_year: 1999\n",
    )
    .unwrap();
    let pipeline = pipeline(&dir).await;

    let outcome = pipeline.run(RunMode::Full, &mut NoopObserver).await;
    assert!(outcome.succeeded(), "{:?}", outcome.result);
    assert_eq!(outcome.report.total_skipped(), 0);
    assert_eq!(
        outcome
            .report
            .table("fact_title_ratings")
            .unwrap()
            .inserted,
        1
    );
}
