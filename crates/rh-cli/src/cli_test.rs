use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_load_defaults_to_full() {
    let cli = Cli::try_parse_from(["reelhouse", "load"]).unwrap();
    match cli.command {
        Commands::Load(args) => {
            assert_eq!(args.mode, LoadMode::Full);
            assert!(args.limit.is_none());
            assert!(args.report_json.is_none());
        }
        other => panic!("unexpected command {:?}", other),
    }
    assert_eq!(cli.global.project_dir, ".");
}

#[test]
fn test_load_test_mode_with_limit() {
    let cli = Cli::try_parse_from([
        "reelhouse",
        "load",
        "--mode",
        "test",
        "--limit",
        "25",
        "--report-json",
        "out/report.json",
    ])
    .unwrap();
    match cli.command {
        Commands::Load(args) => {
            assert_eq!(args.mode, LoadMode::Test);
            assert_eq!(args.limit, Some(25));
            assert_eq!(args.report_json.as_deref(), Some("out/report.json"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_kebab_case_modes() {
    let cli = Cli::try_parse_from(["reelhouse", "load", "-m", "truncate-only"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Load(LoadArgs {
            mode: LoadMode::TruncateOnly,
            ..
        })
    ));
    assert!(Cli::try_parse_from(["reelhouse", "load", "--mode", "partial"]).is_err());
}

#[test]
fn test_global_args_after_subcommand() {
    let cli = Cli::try_parse_from([
        "reelhouse",
        "status",
        "-p",
        "/srv/imdb",
        "--database",
        ":memory:",
        "-v",
    ])
    .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, "/srv/imdb");
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
}
