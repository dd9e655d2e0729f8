//! Database module - organized submodules for better maintainability

mod batch;
mod core;
pub mod date_utils;
pub mod mappers;
mod projects;
pub mod query_builders;
mod tasks;
pub mod validators;

// Re-export everything from core for backward compatibility
pub use core::*;

pub use date_utils::{normalize_date, now_iso, try_normalize_date, DateValue, NormalizedDate};
pub use mappers::{map_project_row, map_task_row};
pub use query_builders::UpdateBuilder;
