//! Constants shared across the tasktree crates

/// Default database filename
pub const DATABASE_FILENAME: &str = "tasktree.db";

/// Default HTTP host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Maximum length of a project name (characters)
pub const MAX_PROJECT_NAME_LEN: usize = 100;

/// Maximum length of a task name (characters)
pub const MAX_TASK_NAME_LEN: usize = 200;

/// Maximum length of task notes (characters)
pub const MAX_NOTES_LEN: usize = 1000;

/// Maximum length of an assignee (characters)
pub const MAX_ASSIGNEE_LEN: usize = 50;

/// Highest accepted hierarchy level hint
pub const MAX_TASK_LEVEL: u32 = 10;

/// Assignee used when a task is created without one
pub const DEFAULT_ASSIGNEE: &str = "me";

/// Prefix of generated project identifiers
pub const PROJECT_ID_PREFIX: &str = "p";

/// Prefix of generated task identifiers
pub const TASK_ID_PREFIX: &str = "t";

/// Date-only formats accepted as ISO-8601
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

/// Zone-less datetime formats accepted as ISO-8601
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Datetime formats with an explicit UTC offset
pub const DATETIME_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];
