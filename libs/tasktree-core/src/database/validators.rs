//! Validation utilities for database operations
//!
//! Existence checks for referenced entities plus field-level checks shared by
//! the create and update paths.

use crate::{
    database::{date_utils, fetch_on, SqlValue},
    error::{Result as TaskTreeResult, TaskTreeError},
};
use sqlx::{Executor, Sqlite};
use tasktree_common::{
    char_len, is_valid_hex_color, MAX_ASSIGNEE_LEN, MAX_NOTES_LEN, MAX_PROJECT_NAME_LEN,
    MAX_TASK_LEVEL, MAX_TASK_NAME_LEN,
};
use tracing::instrument;

/// Validate that a task exists
///
/// # Errors
///
/// Returns `TaskNotFound` if the task does not exist, or a database error
#[instrument(skip(executor))]
pub async fn validate_task_exists<'c, E>(executor: E, id: &str) -> TaskTreeResult<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = fetch_on(executor, "SELECT 1 AS found FROM tasks WHERE id = ?", &[id.into()]).await?;
    if rows.is_empty() {
        return Err(TaskTreeError::task_not_found(id));
    }
    Ok(())
}

/// Validate that a project exists
///
/// # Errors
///
/// Returns `ProjectNotFound` if the project does not exist, or a database error
#[instrument(skip(executor))]
pub async fn validate_project_exists<'c, E>(executor: E, id: &str) -> TaskTreeResult<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = fetch_on(
        executor,
        "SELECT 1 AS found FROM projects WHERE id = ?",
        &[SqlValue::from(id)],
    )
    .await?;
    if rows.is_empty() {
        return Err(TaskTreeError::project_not_found(id));
    }
    Ok(())
}

/// Trim a name and check it is non-empty and at most `max` characters
fn validate_name(kind: &str, name: &str, max: usize) -> TaskTreeResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskTreeError::validation(format!("{kind} name is required")));
    }
    if char_len(trimmed) > max {
        return Err(TaskTreeError::validation(format!(
            "{kind} name must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a task name, returning it trimmed
///
/// # Errors
///
/// Returns a validation error if the name is blank or too long
pub fn validate_task_name(name: &str) -> TaskTreeResult<String> {
    validate_name("Task", name, MAX_TASK_NAME_LEN)
}

/// Validate a project name, returning it trimmed
///
/// # Errors
///
/// Returns a validation error if the name is blank or too long
pub fn validate_project_name(name: &str) -> TaskTreeResult<String> {
    validate_name("Project", name, MAX_PROJECT_NAME_LEN)
}

/// Validate a `#RRGGBB` project color
///
/// # Errors
///
/// Returns a validation error for any other format
pub fn validate_color(color: &str) -> TaskTreeResult<()> {
    if is_valid_hex_color(color) {
        Ok(())
    } else {
        Err(TaskTreeError::validation(format!(
            "Invalid color {color}: expected #RRGGBB"
        )))
    }
}

/// # Errors
///
/// Returns a validation error if the notes are too long
pub fn validate_notes(notes: &str) -> TaskTreeResult<()> {
    if char_len(notes) > MAX_NOTES_LEN {
        return Err(TaskTreeError::validation(format!(
            "Notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(())
}

/// # Errors
///
/// Returns a validation error if the assignee is too long
pub fn validate_assignee(assignee: &str) -> TaskTreeResult<()> {
    if char_len(assignee) > MAX_ASSIGNEE_LEN {
        return Err(TaskTreeError::validation(format!(
            "Assignee must be at most {MAX_ASSIGNEE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a hierarchy level hint
///
/// # Errors
///
/// Returns a validation error outside `0..=10`
pub fn validate_level(level: i64) -> TaskTreeResult<u32> {
    u32::try_from(level)
        .ok()
        .filter(|l| *l <= MAX_TASK_LEVEL)
        .ok_or_else(|| {
            TaskTreeError::validation(format!(
                "Level must be between 0 and {MAX_TASK_LEVEL}, got {level}"
            ))
        })
}

/// Validate that the due date is not before the start date
///
/// # Errors
///
/// Returns a validation error if `due_date < start_date`
pub fn validate_date_order(start_date: &str, due_date: &str) -> TaskTreeResult<()> {
    date_utils::validate_date_order(start_date, due_date)
        .map_err(|e| TaskTreeError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_database_and_connect, seed_project};

    #[tokio::test]
    async fn test_validate_nonexistent_task() {
        let (db, _temp_file) = create_test_database_and_connect().await;

        let err = validate_task_exists(db.pool(), "t-missing").await.unwrap_err();
        assert!(matches!(err, TaskTreeError::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn test_validate_project_exists() {
        let (db, _temp_file) = create_test_database_and_connect().await;
        let project = seed_project(&db, "Work").await;

        assert!(validate_project_exists(db.pool(), &project.id).await.is_ok());
        let err = validate_project_exists(db.pool(), "p-missing")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskTreeError::ProjectNotFound { .. }));
    }

    #[test]
    fn test_names_are_trimmed_and_bounded() {
        assert_eq!(validate_task_name("  Buy milk ").unwrap(), "Buy milk");
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name(&"x".repeat(201)).is_err());
        assert!(validate_task_name(&"x".repeat(200)).is_ok());

        assert!(validate_project_name(&"あ".repeat(100)).is_ok());
        assert!(validate_project_name(&"あ".repeat(101)).is_err());
    }

    #[test]
    fn test_field_limits() {
        assert!(validate_color("#1A2b3C").is_ok());
        assert!(validate_color("red").is_err());
        assert!(validate_notes(&"n".repeat(1000)).is_ok());
        assert!(validate_notes(&"n".repeat(1001)).is_err());
        assert!(validate_assignee(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_level_bounds() {
        assert_eq!(validate_level(0).unwrap(), 0);
        assert_eq!(validate_level(10).unwrap(), 10);
        assert!(validate_level(11).is_err());
        assert!(validate_level(-1).is_err());
    }

    #[test]
    fn test_date_order() {
        assert!(validate_date_order("2024-03-01", "2024-03-02").is_ok());
        let err = validate_date_order("2024-03-02", "2024-03-01").unwrap_err();
        assert!(matches!(err, TaskTreeError::Validation { .. }));
    }
}
