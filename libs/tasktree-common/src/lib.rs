//! tasktree Common - Shared utilities and constants
//!
//! # Examples
//!
//! ```
//! use tasktree_common::{generate_task_id, is_valid_hex_color, MAX_TASK_NAME_LEN};
//!
//! assert_eq!(MAX_TASK_NAME_LEN, 200);
//! assert!(generate_task_id().starts_with('t'));
//! assert!(is_valid_hex_color("#3B82F6"));
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;
