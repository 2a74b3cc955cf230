use super::*;

#[test]
fn test_run_args_parse() {
    let cli = Cli::parse_from([
        "lea",
        "run",
        "--select",
        "+core.users+",
        "--select",
        "staging/",
        "--unselect",
        "staging.payments",
        "--restart",
        "--fail-fast",
        "--concurrency",
        "4",
        "--incremental",
        "account",
        "demo",
    ]);
    let Commands::Run(args) = &cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.select, vec!["+core.users+", "staging/"]);
    assert_eq!(args.unselect, vec!["staging.payments"]);
    assert!(args.restart);
    assert!(args.fail_fast);
    assert_eq!(args.concurrency, 4);
    assert_eq!(args.incremental, vec!["account", "demo"]);
}

#[test]
fn test_defaults() {
    let cli = Cli::parse_from(["lea", "run"]);
    assert_eq!(cli.global.database, "warehouse.duckdb");
    assert_eq!(cli.global.dialect, "duckdb");
    assert!(!cli.global.production);
    let Commands::Run(args) = &cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.concurrency, lea_core::RunConfig::DEFAULT_CONCURRENCY);
    assert_eq!(args.output, OutputFormat::Text);
    assert!(!args.dry);
}

#[test]
fn test_global_args_are_global() {
    let cli = Cli::parse_from(["lea", "ls", "--scripts", "models", "--production"]);
    assert_eq!(cli.global.scripts, std::path::PathBuf::from("models"));
    assert!(cli.global.production);
}
