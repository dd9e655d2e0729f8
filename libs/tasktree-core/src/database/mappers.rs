//! Row mapping utilities for converting database rows to domain models

use crate::{
    database::DbRow,
    error::Result as TaskTreeResult,
    models::{Project, Task},
};

/// Column list matching [`map_task_row`]
pub const TASK_COLUMNS: &str = "id, name, project_id, parent_id, completed, start_date, due_date, \
     completion_date, notes, assignee, level, collapsed, created_at, updated_at";

/// Column list matching [`map_project_row`]
pub const PROJECT_COLUMNS: &str = "id, name, color, collapsed, created_at, updated_at";

/// Map a database row to a Task struct
///
/// A negative or oversized stored `level` reads as 0.
///
/// # Errors
///
/// Returns an error if a required text column is missing
pub fn map_task_row(row: &DbRow) -> TaskTreeResult<Task> {
    Ok(Task {
        id: row.get_str("id")?,
        name: row.get_str("name")?,
        project_id: row.get_str("project_id")?,
        parent_id: row.get_opt_str("parent_id"),
        completed: row.get_bool("completed"),
        start_date: row.get_str("start_date")?,
        due_date: row.get_str("due_date")?,
        completion_date: row.get_opt_str("completion_date"),
        notes: row.get_opt_str("notes").unwrap_or_default(),
        assignee: row.get_opt_str("assignee").unwrap_or_default(),
        level: row
            .get_i64("level")
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(0),
        collapsed: row.get_bool("collapsed"),
        created_at: row.get_str("created_at")?,
        updated_at: row.get_str("updated_at")?,
    })
}

/// Map a database row to a Project struct
///
/// # Errors
///
/// Returns an error if a required text column is missing
pub fn map_project_row(row: &DbRow) -> TaskTreeResult<Project> {
    Ok(Project {
        id: row.get_str("id")?,
        name: row.get_str("name")?,
        color: row.get_str("color")?,
        collapsed: row.get_bool("collapsed"),
        created_at: row.get_str("created_at")?,
        updated_at: row.get_str("updated_at")?,
    })
}
