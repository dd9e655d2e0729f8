//! Command line parsing and one-shot command tests

use clap::Parser;
use std::path::PathBuf;
use tasktree_cli::{run_command, Cli, Commands};
use tasktree_core::test_utils::{create_test_database_and_connect, seed_project, seed_task};

async fn run(db: &tasktree_core::TaskTreeDatabase, command: Commands) -> String {
    let mut output = Vec::new();
    run_command(db, &command, &mut output).await.unwrap();
    String::from_utf8(output).unwrap()
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_serve_with_overrides() {
    let cli = Cli::try_parse_from([
        "tasktree", "--database", "/tmp/t.db", "serve", "--host", "0.0.0.0", "--port", "9000",
    ])
    .unwrap();

    assert_eq!(cli.database, Some(PathBuf::from("/tmp/t.db")));
    assert_eq!(
        cli.command,
        Commands::Serve {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
        }
    );
}

#[test]
fn test_parse_batch_requires_ids() {
    assert!(Cli::try_parse_from(["tasktree", "batch", "complete"]).is_err());

    let cli = Cli::try_parse_from(["tasktree", "-v", "batch", "delete", "t1", "t2"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(
        cli.command,
        Commands::Batch {
            operation: "delete".to_string(),
            task_ids: vec!["t1".to_string(), "t2".to_string()],
        }
    );
}

#[test]
fn test_parse_tasks_project_filter() {
    let cli = Cli::try_parse_from(["tasktree", "tasks", "--project", "p1"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Tasks {
            project: Some("p1".to_string())
        }
    );
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["tasktree"]).is_err());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_projects_command() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    assert_eq!(run(&db, Commands::Projects).await, "No projects found\n");

    let project = seed_project(&db, "Garden").await;
    let output = run(&db, Commands::Projects).await;
    assert!(output.starts_with("Found 1 projects:"));
    assert!(output.contains(&project.id));
    assert!(output.contains("Garden"));
}

#[tokio::test]
async fn test_tasks_command_prints_tree() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    let project = seed_project(&db, "Garden").await;
    let root = seed_task(&db, &project.id, None, "Plant", "2024-03-05").await;
    seed_task(&db, &project.id, Some(&root.id), "Water", "2024-03-06").await;

    let output = run(
        &db,
        Commands::Tasks {
            project: Some(project.id.clone()),
        },
    )
    .await;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "Found 2 tasks:");
    assert!(lines[1].starts_with("  [ ] Plant"));
    assert!(lines[2].starts_with("    [ ] Water"));
}

#[tokio::test]
async fn test_batch_command() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    let project = seed_project(&db, "Garden").await;
    let root = seed_task(&db, &project.id, None, "Plant", "2024-03-05").await;
    seed_task(&db, &project.id, Some(&root.id), "Water", "2024-03-06").await;

    let output = run(
        &db,
        Commands::Batch {
            operation: "complete".to_string(),
            task_ids: vec![root.id.clone()],
        },
    )
    .await;
    assert_eq!(output, "complete: 2 tasks affected (1 requested)\n");

    let output = run(&db, Commands::Tasks { project: None }).await;
    assert!(output.contains("[x] Plant"));
    assert!(output.contains("[x] Water"));
}

#[tokio::test]
async fn test_unknown_batch_operation_fails() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    let mut output = Vec::new();
    let result = run_command(
        &db,
        &Commands::Batch {
            operation: "archive".to_string(),
            task_ids: vec!["t1".to_string()],
        },
        &mut output,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_init_and_health_commands() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    assert_eq!(
        run(&db, Commands::Init).await,
        "Database schema is up to date\n"
    );
    assert!(run(&db, Commands::Health)
        .await
        .contains("Database connection successful"));
}

#[tokio::test]
async fn test_serve_is_not_a_one_shot_command() {
    let (db, _temp_file) = create_test_database_and_connect().await;
    let mut output = Vec::new();
    let command = Commands::Serve {
        host: None,
        port: None,
    };
    assert!(run_command(&db, &command, &mut output).await.is_err());
}
