use super::*;

fn config(yaml: &str) -> Config {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reelhouse.yml"), yaml).unwrap();
    Config::load_from_dir(dir.path()).unwrap()
}

#[test]
fn test_mode_names_and_limits() {
    assert_eq!(RunMode::Full.name(), "full");
    assert_eq!(RunMode::Test { limit: 10 }.name(), "test");
    assert_eq!(RunMode::TruncateOnly.name(), "truncate-only");
    assert_eq!(RunMode::Validated.name(), "validated");

    assert_eq!(RunMode::Test { limit: 10 }.row_limit(), Some(10));
    assert_eq!(RunMode::Full.row_limit(), None);
    assert!(!RunMode::TruncateOnly.loads());
    assert!(!RunMode::Validated.disables_constraints());
    assert!(RunMode::Full.disables_constraints());
    assert_eq!(RunMode::Test { limit: 5 }.to_string(), "test (limit 5)");
}

#[test]
fn test_full_plan() {
    let contract = WarehouseContract::catalog().unwrap();
    let config = config(
        "name: plan_test\ntime:\n  min_year: 1990\n  max_year: 1992\n  extra_years: [1888]\n",
    );
    let plan = LoadPlan::build(&contract, &config, RunMode::Full).unwrap();

    assert_eq!(plan.jobs.len(), contract.tables().len());
    assert_eq!(plan.truncate.len(), contract.tables().len());
    assert_eq!(plan.truncate[0], "fact_title_ratings");
    assert_eq!(plan.jobs[0].spec.name, "dim_time");
    assert_eq!(plan.jobs[0].input.label(), "year window");
    assert_eq!(plan.jobs[0].input.years(), vec![1990, 1991, 1992, 1888]);

    let ratings = plan.jobs.last().unwrap();
    assert_eq!(ratings.input, JobInput::Source(SourceId::TitleRatings));
    assert_eq!(ratings.input.label(), "title.ratings");
    assert!(ratings.input.years().is_empty());

    assert_eq!(
        plan.sources(),
        vec![
            SourceId::TitleBasics,
            SourceId::NameBasics,
            SourceId::TitleEpisode,
            SourceId::TitleAkas,
            SourceId::TitleCrew,
            SourceId::TitlePrincipals,
            SourceId::TitleRatings,
        ]
    );
}

#[test]
fn test_truncate_only_plan_has_no_jobs() {
    let contract = WarehouseContract::catalog().unwrap();
    let config = config("name: plan_test\n");
    let plan = LoadPlan::build(&contract, &config, RunMode::TruncateOnly).unwrap();

    assert!(plan.jobs.is_empty());
    assert!(plan.sources().is_empty());
    assert_eq!(plan.truncate.len(), contract.tables().len());
    assert_eq!(plan.truncate.last().unwrap(), "dim_time");
}
