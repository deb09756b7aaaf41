use super::*;
use rh_core::SourceId;
use rh_etl::RunMode;

fn project(yaml: &str) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reelhouse.yml"), yaml).unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    (dir, config)
}

#[test]
fn test_source_file_for_each_input() {
    let (dir, config) = project(
        "name: plan_cli\ndata_dir: snapshots\nsources:\n  title_ratings: ratings-2024.tsv.gz\ntime:\n  min_year: 1900\n  max_year: 1910\n  extra_years: [1888, 2020]\n",
    );
    let contract = WarehouseContract::catalog().unwrap();
    let plan = LoadPlan::build(&contract, &config, RunMode::Full).unwrap();

    let time = &plan.jobs[0];
    assert_eq!(
        source_file(time, &config, dir.path()),
        "1900..=1910 (+2 extra)"
    );

    let ratings = plan
        .jobs
        .iter()
        .find(|job| job.input == JobInput::Source(SourceId::TitleRatings))
        .unwrap();
    assert_eq!(
        source_file(ratings, &config, dir.path()),
        dir.path()
            .join("snapshots")
            .join("ratings-2024.tsv.gz")
            .display()
            .to_string()
    );
}

#[tokio::test]
async fn test_plan_runs_without_database() {
    let (dir, _config) = project("name: plan_cli\ndatabase:\n  path: /nonexistent/dir/wh.duckdb\n");
    let global = GlobalArgs {
        verbose: false,
        project_dir: dir.path().display().to_string(),
        config: None,
        database: None,
    };
    let args = PlanArgs {
        mode: crate::cli::LoadMode::Full,
        output: OutputFormat::Json,
    };
    execute(&args, &global).await.unwrap();
}
