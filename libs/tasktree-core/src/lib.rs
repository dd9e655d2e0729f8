//! TaskTree Core - storage, ordering and batch mutation for hierarchical tasks
//!
//! This library keeps projects and their nested tasks in SQLite and returns
//! them in a stable depth-first order suitable for rendering as a tree or a
//! Gantt chart.
//!
//! # Features
//!
//! - **Async Database Access**: Built on SQLx with a pooled SQLite connection
//! - **Hierarchical Ordering**: Cycle-safe depth-first sort that never loses a task
//! - **Date Normalization**: Native timestamps and ISO-8601 strings stored uniformly
//! - **Batch Operations**: Transactional complete/incomplete/delete over task sets
//! - **Observability**: Structured `tracing` events and optional metrics per operation
//!
//! # Quick Start
//!
//! ```no_run
//! use tasktree_core::{CreateProjectRequest, TaskTreeDatabase, TaskTreeError};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), TaskTreeError> {
//! let db = TaskTreeDatabase::new(Path::new("tasktree.db")).await?;
//!
//! let project = db
//!     .create_project(CreateProjectRequest {
//!         name: "Launch".to_string(),
//!         color: "#FF8800".to_string(),
//!         collapsed: false,
//!     })
//!     .await?;
//!
//! // Tasks come back parents-first, siblings by due date
//! let tasks = db.get_tasks(Some(&project.id)).await?;
//! println!("Found {} tasks", tasks.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `observability`: Emit `metrics` counters and histograms for every mutation
//! - `test-utils`: Enable test utilities (for testing only)

pub mod config;
pub mod config_loader;
pub mod database;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod observability;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    LoggingConfig, PoolSettings, ServerConfig, TaskTreeConfig, ValidationSettings, CONFIG_ENV,
};
pub use config_loader::{load_config, ConfigLoader};
pub use database::{
    get_default_database_path, DatabasePoolConfig, DatabaseStats, DateValue, DbRow,
    NormalizedDate, SqlValue, SqliteOptimizations, TaskTreeDatabase,
};
pub use error::{Result, TaskTreeError};
pub use hierarchy::{build_task_tree, sort_hierarchically, sort_with_report, HierarchySort, SortReport};
pub use models::*;
pub use observability::{OperationEvent, OperationRecorder, TracingRecorder};

/// Re-export commonly used types
pub use chrono::{DateTime, Utc};
