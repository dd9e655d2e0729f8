//! Test utilities and mock data for task tree tests

use crate::database::TaskTreeDatabase;
use crate::models::{CreateProjectRequest, CreateTaskRequest, Project, Task};
use crate::observability::{OperationEvent, OperationRecorder};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Timestamp used for mock rows
pub const MOCK_TIMESTAMP: &str = "2024-03-01T09:00:00+00:00";

/// Create a file-backed test database with the schema applied
///
/// The returned temp file must be kept alive for as long as the database is used.
///
/// # Panics
/// Panics if the temp file or the database cannot be created
pub async fn create_test_database_and_connect() -> (TaskTreeDatabase, NamedTempFile) {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let db = TaskTreeDatabase::new(temp_file.path())
        .await
        .expect("Failed to open test database");
    (db, temp_file)
}

/// Build an in-memory task in project `p1`
///
/// `due` doubles as the start date so the date order always holds.
#[must_use]
pub fn task(id: &str, parent: Option<&str>, due: &str) -> Task {
    Task {
        id: id.to_string(),
        name: format!("Task {id}"),
        project_id: "p1".to_string(),
        parent_id: parent.map(str::to_string),
        completed: false,
        start_date: due.to_string(),
        due_date: due.to_string(),
        completion_date: None,
        notes: String::new(),
        assignee: tasktree_common::DEFAULT_ASSIGNEE.to_string(),
        level: 0,
        collapsed: false,
        created_at: MOCK_TIMESTAMP.to_string(),
        updated_at: MOCK_TIMESTAMP.to_string(),
    }
}

/// Create mock tasks: two roots, a child and a grandchild
#[must_use]
pub fn create_mock_tasks() -> Vec<Task> {
    vec![
        task("t-root-b", None, "2024-03-10"),
        task("t-child", Some("t-root-a"), "2024-03-04"),
        task("t-root-a", None, "2024-03-05"),
        task("t-grandchild", Some("t-child"), "2024-03-03"),
    ]
}

/// Insert a project through the public API
///
/// # Panics
/// Panics if the insert fails
pub async fn seed_project(db: &TaskTreeDatabase, name: &str) -> Project {
    db.create_project(CreateProjectRequest {
        name: name.to_string(),
        color: "#3366FF".to_string(),
        collapsed: false,
    })
    .await
    .expect("Failed to seed project")
}

/// Insert a task through the public API
///
/// # Panics
/// Panics if the insert fails
pub async fn seed_task(
    db: &TaskTreeDatabase,
    project_id: &str,
    parent_id: Option<&str>,
    name: &str,
    due: &str,
) -> Task {
    db.create_task(CreateTaskRequest {
        name: name.to_string(),
        project_id: project_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        start_date: Some("2024-03-01".into()),
        due_date: Some(due.into()),
        ..CreateTaskRequest::default()
    })
    .await
    .expect("Failed to seed task")
}

/// Recorder that keeps every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<OperationEvent>>,
}

impl RecordingRecorder {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of recorded events
    #[must_use]
    pub fn events(&self) -> Vec<OperationEvent> {
        self.events.lock().clone()
    }
}

impl OperationRecorder for RecordingRecorder {
    fn record(&self, event: &OperationEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tasks_share_a_project() {
        let tasks = create_mock_tasks();
        assert_eq!(tasks.len(), 4);
        assert!(tasks.iter().all(|t| t.project_id == "p1"));
        assert_eq!(tasks.iter().filter(|t| t.is_root()).count(), 2);
    }

    #[tokio::test]
    async fn test_seeded_rows_are_readable() {
        let (db, _temp_file) = create_test_database_and_connect().await;
        let project = seed_project(&db, "Home").await;
        let task = seed_task(&db, &project.id, None, "Laundry", "2024-03-02").await;

        assert_eq!(db.get_task(&task.id).await.unwrap().name, "Laundry");
    }
}
