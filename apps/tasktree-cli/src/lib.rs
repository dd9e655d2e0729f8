//! TaskTree CLI library
//!
//! Command line parsing, the REST server and plain-text rendering of projects
//! and task trees.

pub mod api_error;
pub mod logging;
pub mod server;

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tasktree_common::truncate_string;
use tasktree_core::{BatchResult, Project, Result, Task, TaskTreeDatabase, TaskTreeError};

/// Longest task name shown in tree output
const TASK_NAME_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "tasktree")]
#[command(about = "Hierarchical task manager with a REST API")]
#[command(version)]
pub struct Cli {
    /// Database path (overrides the configuration file and environment)
    #[arg(long, short)]
    pub database: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(long, short, env = "TASKTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the REST API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Create the database and apply the schema
    Init,
    /// List projects
    Projects,
    /// List tasks as an indented tree
    Tasks {
        /// Only tasks of this project
        #[arg(long, short)]
        project: Option<String>,
    },
    /// Apply a batch operation (complete, incomplete or delete)
    Batch {
        /// Operation to apply
        operation: String,
        /// Task IDs
        #[arg(required = true)]
        task_ids: Vec<String>,
    },
    /// Health check
    Health,
}

/// Run a one-shot command against the database, writing its output
///
/// `serve` is not handled here.
///
/// # Errors
/// Returns an error if the database operation or writing fails
pub async fn run_command<W: Write>(
    db: &TaskTreeDatabase,
    command: &Commands,
    writer: &mut W,
) -> Result<()> {
    match command {
        Commands::Init => {
            db.migrate().await?;
            writeln!(writer, "Database schema is up to date")?;
        }
        Commands::Projects => {
            let projects = db.get_projects().await?;
            print_projects(&projects, writer)?;
        }
        Commands::Tasks { project } => {
            let tasks = db.get_tasks(project.as_deref()).await?;
            print_tasks(&tasks, writer)?;
        }
        Commands::Batch {
            operation,
            task_ids,
        } => {
            let result = db.apply_batch(operation, task_ids).await?;
            print_batch_result(&result, writer)?;
        }
        Commands::Health => health_check(db, writer).await?,
        Commands::Serve { .. } => {
            return Err(TaskTreeError::unknown(
                "serve must be started from the binary entry point",
            ))
        }
    }
    Ok(())
}

/// Print projects to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_projects<W: Write>(projects: &[Project], writer: &mut W) -> Result<()> {
    if projects.is_empty() {
        writeln!(writer, "No projects found")?;
        return Ok(());
    }

    writeln!(writer, "Found {} projects:", projects.len())?;
    for project in projects {
        let marker = if project.collapsed { " (collapsed)" } else { "" };
        writeln!(
            writer,
            "  • {} [{}] {}{marker}",
            project.name, project.id, project.color
        )?;
    }
    Ok(())
}

/// Print tasks in the order given, indented by their depth in the tree
///
/// Tasks whose parent is not listed before them are printed at the top level.
///
/// # Errors
/// Returns an error if writing fails
pub fn print_tasks<W: Write>(tasks: &[Task], writer: &mut W) -> Result<()> {
    if tasks.is_empty() {
        writeln!(writer, "No tasks found")?;
        return Ok(());
    }

    writeln!(writer, "Found {} tasks:", tasks.len())?;
    let mut depths: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for task in tasks {
        let depth = task
            .parent()
            .and_then(|parent| depths.get(parent))
            .map_or(0, |d| d + 1);
        depths.insert(task.id.as_str(), depth);

        let check = if task.completed { "x" } else { " " };
        writeln!(
            writer,
            "{}  [{check}] {} ({}) due {}",
            "  ".repeat(depth),
            truncate_string(&task.name, TASK_NAME_WIDTH),
            task.id,
            task.due_date
        )?;
    }
    Ok(())
}

/// # Errors
/// Returns an error if writing fails
pub fn print_batch_result<W: Write>(result: &BatchResult, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{}: {} tasks affected ({} requested)",
        result.operation,
        result.affected_count,
        result.task_ids.len()
    )?;
    Ok(())
}

/// Perform a health check on the database
///
/// # Errors
/// Returns an error if the database is not accessible
pub async fn health_check<W: Write>(db: &TaskTreeDatabase, writer: &mut W) -> Result<()> {
    writeln!(writer, "🔍 Checking database connection...")?;

    if !db.is_connected().await {
        return Err(TaskTreeError::unknown("Database is not connected"));
    }

    let stats = db.get_stats().await?;
    writeln!(writer, "✅ Database connection successful!")?;
    writeln!(
        writer,
        "   Found {} projects, {} tasks ({} completed)",
        stats.project_count, stats.task_count, stats.completed_count
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasktree_core::test_utils::{create_mock_tasks, create_test_database_and_connect};

    #[test]
    fn test_print_tasks_indents_by_depth() {
        let tasks = tasktree_core::sort_hierarchically(create_mock_tasks());
        let mut output = Vec::new();
        print_tasks(&tasks, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Found 4 tasks:");
        assert!(lines[1].starts_with("  [ ] Task t-root-a"));
        assert!(lines[2].starts_with("    [ ] Task t-child"));
        assert!(lines[3].starts_with("      [ ] Task t-grandchild"));
        assert!(lines[4].starts_with("  [ ] Task t-root-b"));
    }

    #[test]
    fn test_print_empty_lists() {
        let mut output = Vec::new();
        print_projects(&[], &mut output).unwrap();
        print_tasks(&[], &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "No projects found\nNo tasks found\n"
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let (db, _temp_file) = create_test_database_and_connect().await;
        let mut output = Vec::new();
        health_check(&db, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Found 0 projects, 0 tasks (0 completed)"));
    }
}
