//! Data models for projects, tasks and batch operations

use crate::database::date_utils::DateValue;
use crate::error::TaskTreeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A project groups tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (prefix `p`)
    pub id: String,
    /// Display name
    pub name: String,
    /// `#RRGGBB` color
    pub color: String,
    /// Whether the project is collapsed in the UI
    pub collapsed: bool,
    /// Creation timestamp (ISO-8601)
    pub created_at: String,
    /// Last modification timestamp (ISO-8601)
    pub updated_at: String,
}

/// Main task entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (prefix `t`)
    pub id: String,
    /// Task name
    pub name: String,
    /// Owning project
    pub project_id: String,
    /// Parent task, if this task is nested
    pub parent_id: Option<String>,
    /// Completion flag
    pub completed: bool,
    /// Start date (ISO-8601)
    pub start_date: String,
    /// Due date (ISO-8601)
    pub due_date: String,
    /// When the task was completed (ISO-8601)
    pub completion_date: Option<String>,
    /// Free-form notes
    pub notes: String,
    /// Person responsible for the task
    pub assignee: String,
    /// Advisory depth hint
    pub level: u32,
    /// Whether the task's children are collapsed in the UI
    pub collapsed: bool,
    /// Creation timestamp (ISO-8601)
    pub created_at: String,
    /// Last modification timestamp (ISO-8601)
    pub updated_at: String,
}

impl Task {
    /// The parent id, treating an empty string as no parent
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether this task sits at the top of its project
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

/// A task together with its nested descendants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    /// Number of tasks in this subtree, including the root
    #[must_use]
    pub fn task_count(&self) -> usize {
        1 + self.children.iter().map(TaskNode::task_count).sum::<usize>()
    }
}

/// Request to create a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
}

/// Request to update an existing project; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

/// Request to create a new task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub start_date: Option<DateValue>,
    #[serde(default)]
    pub due_date: Option<DateValue>,
    #[serde(default)]
    pub completion_date: Option<DateValue>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub collapsed: bool,
}

/// Request to update a task
///
/// `parent_id` and `completion_date` distinguish "absent" (`None`) from an
/// explicit JSON `null` (`Some(None)`), which clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub start_date: Option<DateValue>,
    #[serde(default)]
    pub due_date: Option<DateValue>,
    #[serde(default, deserialize_with = "double_option")]
    pub completion_date: Option<Option<DateValue>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub collapsed: Option<bool>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Mutation applied by a batch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Complete,
    Incomplete,
    Delete,
}

impl BatchOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchOperation {
    type Err = TaskTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "incomplete" => Ok(Self::Incomplete),
            "delete" => Ok(Self::Delete),
            other => Err(TaskTreeError::validation(format!(
                "Unsupported batch operation: {other} (expected complete, incomplete or delete)"
            ))),
        }
    }
}

/// Body of `POST /tasks/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operation: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// Outcome of a batch mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    pub operation: String,
    pub affected_count: u64,
    pub task_ids: Vec<String>,
}
