//! Error types for the tasktree core library

use thiserror::Error;

/// Result type alias for tasktree operations
pub type Result<T> = std::result::Result<T, TaskTreeError>;

/// Main error type for tasktree operations
#[derive(Error, Debug)]
pub enum TaskTreeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid date in {field}: {message}")]
    DateConversion { field: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl TaskTreeError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Create a task-not-found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    /// Create a project-not-found error
    pub fn project_not_found(id: impl Into<String>) -> Self {
        Self::ProjectNotFound { id: id.into() }
    }

    /// Create a date conversion error for a named field
    pub fn date_conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DateConversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::TaskNotFound { .. } | Self::ProjectNotFound { .. } => "not_found",
            Self::DateConversion { .. } => "date_conversion_error",
            Self::Database(_) => "database_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Serialization(_) | Self::Io(_) | Self::Unknown { .. } => "internal_error",
        }
    }

    /// Whether the error was caused by the caller's input
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::TaskNotFound { .. }
                | Self::ProjectNotFound { .. }
                | Self::DateConversion { .. }
        )
    }

    /// Whether the error reports a missing entity
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. } | Self::ProjectNotFound { .. })
    }
}

impl From<sqlx::Error> for TaskTreeError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.to_string())
    }
}
