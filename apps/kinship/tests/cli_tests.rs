//! Unit tests for argument parsing and end-to-end command runs.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, Utc};
use clap::Parser;
use kinship::cli::{
    Cli, Commands, Context, GroupCommand, ProfileCommand, SnapshotFormat, cmd_audit, cmd_export,
    cmd_group, cmd_import, cmd_link, cmd_profile_add, cmd_transplant, execute,
};
use kinship_core::{
    EngineConfig, Gender, KinshipEngine, KinshipError, ProfileId, RelationshipRecord,
    RelationshipStore, RelationshipType, TransplantMode, UnitOfWork,
};
use std::path::{Path, PathBuf};

// =============================================================================
// ARGUMENT PARSING TESTS
// =============================================================================

#[test]
fn test_no_subcommand() {
    let cli = Cli::try_parse_from(["kinship"]).unwrap();
    assert!(cli.command.is_none());
    assert!(cli.database.is_none());
    assert!(!cli.json);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["kinship", "status", "-D", "x.redb", "--json", "-q"]).unwrap();
    assert_eq!(cli.database, Some(PathBuf::from("x.redb")));
    assert!(cli.json);
    assert!(cli.quiet);
    assert!(matches!(cli.command, Some(Commands::Status)));
}

#[test]
fn test_link_with_scenarios() {
    let cli = Cli::try_parse_from([
        "kinship",
        "link",
        "dad",
        "father",
        "kid",
        "--scenario",
        "siblings,mother",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Link {
            a,
            relationship,
            b,
            scenario,
        }) => {
            assert_eq!(a, "dad");
            assert_eq!(relationship, RelationshipType::Father);
            assert_eq!(b, "kid");
            assert_eq!(scenario, vec!["siblings", "mother"]);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_unknown_relationship_rejected() {
    assert!(Cli::try_parse_from(["kinship", "link", "a", "uncle", "b"]).is_err());
}

#[test]
fn test_profile_add_parses_date_and_gender() {
    let cli = Cli::try_parse_from([
        "kinship",
        "profile",
        "add",
        "ann",
        "--gender",
        "female",
        "--born",
        "1950-04-02",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Profile(ProfileCommand::Add {
            id, gender, born, ..
        })) => {
            assert_eq!(id, "ann");
            assert_eq!(gender, Gender::Female);
            assert_eq!(born.unwrap().to_string(), "1950-04-02");
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_transplant_modes() {
    let cli = Cli::try_parse_from(["kinship", "transplant", "a", "b"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Transplant {
            mode: TransplantMode::Replace,
            ..
        })
    ));

    let cli =
        Cli::try_parse_from(["kinship", "transplant", "a", "b", "-m", "append-as-brother"])
            .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Transplant {
            mode: TransplantMode::AppendAs(RelationshipType::Brother),
            ..
        })
    ));

    assert!(Cli::try_parse_from(["kinship", "transplant", "a", "b", "-m", "merge"]).is_err());
}

#[test]
fn test_group_remove_suggestion() {
    let cli =
        Cli::try_parse_from(["kinship", "group", "remove-suggestion", "smiths", "ann"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Group(GroupCommand::RemoveSuggestion { .. }))
    ));
}

#[test]
fn test_snapshot_format_from_extension() {
    assert_eq!(
        SnapshotFormat::for_path(Path::new("out.json")),
        SnapshotFormat::Json
    );
    assert_eq!(
        SnapshotFormat::for_path(Path::new("out.JSON")),
        SnapshotFormat::Json
    );
    assert_eq!(
        SnapshotFormat::for_path(Path::new("out.kins")),
        SnapshotFormat::Binary
    );
}

// =============================================================================
// COMMAND RUN TESTS
// =============================================================================

fn context(dir: &Path, name: &str) -> Context {
    Context {
        database: dir.join(name),
        engine: EngineConfig::default(),
        json: true,
    }
}

#[test]
fn test_commands_round_trip_through_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), "a.redb");

    cmd_profile_add(&ctx, "dad", Gender::Male, "Tom", "Lane", None).unwrap();
    cmd_profile_add(&ctx, "kid", Gender::Female, "Sue", "Lane", None).unwrap();
    cmd_profile_add(&ctx, "dup", Gender::Male, "Tom", "Lane", None).unwrap();
    cmd_link(&ctx, "dad", RelationshipType::Father, "kid", &[]).unwrap();
    cmd_group(
        &ctx,
        GroupCommand::Create {
            group: "lanes".to_string(),
        },
    )
    .unwrap();
    cmd_group(
        &ctx,
        GroupCommand::Add {
            group: "lanes".to_string(),
            profile: "dad".to_string(),
        },
    )
    .unwrap();
    cmd_transplant(&ctx, "dad", "dup", TransplantMode::Replace).unwrap();

    for file in ["snap.json", "snap.kins"] {
        let out = dir.path().join(file);
        cmd_export(&ctx, &out).unwrap();

        let copy = context(dir.path(), &format!("{file}.redb"));
        cmd_import(&copy, &out).unwrap();

        let source = KinshipEngine::with_redb(&ctx.database).unwrap();
        let restored = KinshipEngine::with_redb(&copy.database).unwrap();
        assert_eq!(
            source.snapshot().unwrap(),
            restored.snapshot().unwrap()
        );
        let tree = restored.family_tree(&ProfileId::from("kid")).unwrap();
        assert_eq!(tree.parents[0].id, ProfileId::from("dup"));
    }
}

#[test]
fn test_execute_reports_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("e.redb");
    let config = dir.path().join("kinship.toml");
    std::fs::write(&config, "").unwrap();
    let args = |rest: &[&str]| {
        let mut argv = vec![
            "kinship".to_string(),
            "-D".to_string(),
            db.display().to_string(),
            "-C".to_string(),
            config.display().to_string(),
            "--json".to_string(),
        ];
        argv.extend(rest.iter().map(ToString::to_string));
        Cli::try_parse_from(argv).unwrap()
    };

    execute(args(&["profile", "add", "ann", "-g", "female"])).unwrap();
    let err = execute(args(&["link", "ann", "father", "ann"])).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_audit_reports_violation_count() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), "audit.redb");

    cmd_profile_add(&ctx, "dad", Gender::Male, "", "", None).unwrap();
    cmd_profile_add(&ctx, "kid", Gender::Female, "", "", None).unwrap();
    cmd_audit(&ctx).unwrap();

    {
        let engine = KinshipEngine::with_redb(&ctx.database).unwrap();
        let mut unit = engine.store().begin().unwrap();
        let mut record = RelationshipRecord::new(ProfileId::from("kid"));
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        record.push(ProfileId::from("dad"), RelationshipType::Father, true, at);
        unit.put_record(record).unwrap();
        unit.commit().unwrap();
    }

    let err = cmd_audit(&ctx).unwrap_err();
    assert!(matches!(err, KinshipError::IntegrityViolations(1)));
    assert!(!err.is_validation());
}
