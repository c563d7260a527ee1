use std::path::PathBuf;

use clap::Parser;
use specweave::cli::{Cli, Commands};

#[test]
fn test_parse_check_with_multiple_impl_paths() {
    let cli = Cli::try_parse_from([
        "specweave",
        "check",
        "--spec",
        "spec.yaml",
        "--impl",
        "src/Chart.tsx",
        "src/components",
        "--schema",
        "schema.yaml",
    ])
    .unwrap();

    match cli.command {
        Commands::Check(args) => {
            assert_eq!(args.spec, PathBuf::from("spec.yaml"));
            assert_eq!(
                args.implementation,
                vec![PathBuf::from("src/Chart.tsx"), PathBuf::from("src/components")]
            );
            assert_eq!(args.schema, Some(PathBuf::from("schema.yaml")));
            assert!(args.knowledge.is_none());
        }
        Commands::Replay(_) => panic!("Wrong command"),
    }
    assert!(!cli.json);
}

#[test]
fn test_parse_check_requires_impl() {
    let result = Cli::try_parse_from(["specweave", "check", "--spec", "spec.yaml"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_replay_with_overrides() {
    let cli = Cli::try_parse_from([
        "specweave",
        "replay",
        "--session",
        "session.yaml",
        "--max-rounds",
        "7",
        "--ceiling",
        "2",
    ])
    .unwrap();

    match cli.command {
        Commands::Replay(args) => {
            assert_eq!(args.session, PathBuf::from("session.yaml"));
            assert_eq!(args.max_rounds, Some(7));
            assert_eq!(args.ceiling, Some(2));
        }
        Commands::Check(_) => panic!("Wrong command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "specweave",
        "replay",
        "--session",
        "s.json",
        "--json",
        "--config",
        "ci.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
}

#[test]
fn test_parse_invalid_round_budget() {
    let result = Cli::try_parse_from([
        "specweave",
        "replay",
        "--session",
        "s.yaml",
        "--max-rounds",
        "many",
    ]);
    assert!(result.is_err());
}
