use crate::{
    config::ValidationSettings,
    error::{Result as TaskTreeResult, TaskTreeError},
    observability::{OperationRecorder, TracingRecorder},
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::{
    pool::PoolOptions,
    query::Query,
    sqlite::{
        SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqliteRow, SqliteSynchronous,
    },
    Column, Executor, Row, Sqlite, SqlitePool, Transaction, TypeInfo, ValueRef,
};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tasktree_common::DATABASE_FILENAME;
use tracing::{debug, error, info, instrument};

/// Schema statements, applied idempotently on every connect
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        color TEXT NOT NULL,
        collapsed BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        parent_id TEXT REFERENCES tasks(id) ON DELETE CASCADE,
        completed BOOLEAN NOT NULL DEFAULT 0,
        start_date TEXT NOT NULL,
        due_date TEXT NOT NULL,
        completion_date TEXT,
        notes TEXT NOT NULL DEFAULT '',
        assignee TEXT NOT NULL DEFAULT 'me',
        level INTEGER NOT NULL DEFAULT 0,
        collapsed BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_parent_id ON tasks(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date)",
];

/// A bind parameter for [`TaskTreeDatabase::query`] and [`TaskTreeDatabase::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A result row as an ordered list of column names and JSON values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbRow {
    columns: Vec<(String, Value)>,
}

impl DbRow {
    /// Build a row from column/value pairs
    #[must_use]
    pub fn from_pairs(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    fn from_sqlite_row(row: &SqliteRow) -> TaskTreeResult<Self> {
        let mut columns = Vec::with_capacity(row.columns().len());
        for (index, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = raw.type_info().name().to_ascii_uppercase();
                match type_name.as_str() {
                    "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                        Value::from(row.try_get_unchecked::<i64, _>(index)?)
                    }
                    "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                        Value::from(row.try_get_unchecked::<f64, _>(index)?)
                    }
                    "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                    _ => Value::from(row.try_get_unchecked::<String, _>(index)?),
                }
            };
            columns.push((column.name().to_string(), value));
        }
        Ok(Self { columns })
    }

    /// Value of a column, if the row has it
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in result order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Required text column
    ///
    /// # Errors
    /// Returns an error if the column is missing or not text
    pub fn get_str(&self, column: &str) -> TaskTreeResult<String> {
        self.get_opt_str(column).ok_or_else(|| {
            TaskTreeError::Database(format!("Column {column} is missing or not text"))
        })
    }

    /// Nullable text column
    #[must_use]
    pub fn get_opt_str(&self, column: &str) -> Option<String> {
        match self.get(column) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Integer column
    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::Bool(b)) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Boolean column stored as 0/1; missing or NULL reads as `false`
    #[must_use]
    pub fn get_bool(&self, column: &str) -> bool {
        match self.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
            _ => false,
        }
    }
}

impl Serialize for DbRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Real(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Blob(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Run a parameterized statement and return the number of affected rows
///
/// Works with the pool or with an open transaction (`&mut *tx`).
///
/// # Errors
/// Returns `TaskTreeError::Database` if the statement fails
pub async fn execute_on<'c, E>(executor: E, sql: &str, params: &[SqlValue]) -> TaskTreeResult<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = bind_params(sqlx::query(sql), params)
        .execute(executor)
        .await
        .map_err(|e| {
            error!(error = %e, sql, "Statement failed");
            TaskTreeError::from(e)
        })?;
    Ok(result.rows_affected())
}

/// Run a parameterized query and return its rows
///
/// # Errors
/// Returns `TaskTreeError::Database` if the query fails
pub async fn fetch_on<'c, E>(
    executor: E,
    sql: &str,
    params: &[SqlValue],
) -> TaskTreeResult<Vec<DbRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = bind_params(sqlx::query(sql), params)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            error!(error = %e, sql, "Query failed");
            TaskTreeError::from(e)
        })?;
    rows.iter().map(DbRow::from_sqlite_row).collect()
}

/// `?, ?, ?` for an IN list of `n` parameters
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Database connection pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Idle timeout for connections
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime of a connection
    pub max_lifetime: Option<Duration>,
    /// SQLite-specific settings
    pub sqlite_optimizations: SqliteOptimizations,
}

/// SQLite-specific connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteOptimizations {
    /// Enable WAL journal mode
    pub enable_wal_mode: bool,
    /// Synchronous mode (OFF, NORMAL, FULL, EXTRA)
    pub synchronous_mode: String,
    /// Cache size in pages (negative = KiB)
    pub cache_size: i32,
    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            sqlite_optimizations: SqliteOptimizations::default(),
        }
    }
}

impl Default for SqliteOptimizations {
    fn default() -> Self {
        Self {
            enable_wal_mode: true,
            synchronous_mode: "NORMAL".to_string(),
            cache_size: -20000,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Row counts reported by health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub project_count: u64,
    pub task_count: u64,
    pub completed_count: u64,
}

/// SQLx-backed store for projects and tasks
///
/// Cloning is cheap; clones share the pool and the recorder.
#[derive(Debug, Clone)]
pub struct TaskTreeDatabase {
    pub(crate) pool: SqlitePool,
    config: DatabasePoolConfig,
    pub(crate) validation: ValidationSettings,
    pub(crate) recorder: Arc<dyn OperationRecorder>,
}

impl TaskTreeDatabase {
    /// Open (creating if needed) a database file with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema setup fails
    #[instrument]
    pub async fn new(database_path: &Path) -> TaskTreeResult<Self> {
        Self::new_with_config(database_path, DatabasePoolConfig::default()).await
    }

    /// Open (creating if needed) a database file with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema setup fails
    #[instrument]
    pub async fn new_with_config(
        database_path: &Path,
        config: DatabasePoolConfig,
    ) -> TaskTreeResult<Self> {
        info!("Connecting to SQLite database at: {}", database_path.display());
        let options = SqliteConnectOptions::new().filename(database_path);
        Self::connect(options, config).await
    }

    /// Connect using a `sqlite:` URL with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails
    #[instrument]
    pub async fn from_connection_string(database_url: &str) -> TaskTreeResult<Self> {
        Self::from_connection_string_with_config(database_url, DatabasePoolConfig::default()).await
    }

    /// Connect using a `sqlite:` URL with custom configuration
    ///
    /// In-memory databases are private to a connection, so the pool is
    /// limited to a single long-lived connection for them.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails
    #[instrument]
    pub async fn from_connection_string_with_config(
        database_url: &str,
        mut config: DatabasePoolConfig,
    ) -> TaskTreeResult<Self> {
        info!("Connecting to SQLite database: {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?;
        if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            config.max_connections = 1;
            config.min_connections = 1;
            config.idle_timeout = None;
            config.max_lifetime = None;
        }
        Self::connect(options, config).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        config: DatabasePoolConfig,
    ) -> TaskTreeResult<Self> {
        let sqlite = &config.sqlite_optimizations;
        let synchronous =
            SqliteSynchronous::from_str(&sqlite.synchronous_mode).map_err(|e| {
                TaskTreeError::configuration(format!(
                    "Invalid synchronous mode {}: {e}",
                    sqlite.synchronous_mode
                ))
            })?;
        let journal_mode = if sqlite.enable_wal_mode {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        // Per-connection settings; a PRAGMA issued through the pool would
        // only reach one connection.
        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(journal_mode)
            .synchronous(synchronous)
            .busy_timeout(sqlite.busy_timeout)
            .pragma("cache_size", Cow::Owned(sqlite.cache_size.to_string()));

        let pool = PoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {e}");
                TaskTreeError::from(e)
            })?;

        let db = Self {
            pool,
            config,
            validation: ValidationSettings::default(),
            recorder: Arc::new(TracingRecorder),
        };
        db.migrate().await?;

        info!(
            "Database connection pool established with {} max connections",
            db.config.max_connections
        );
        Ok(db)
    }

    /// Apply the schema; safe to run repeatedly
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> TaskTreeResult<()> {
        for statement in SCHEMA {
            execute_on(&self.pool, statement, &[]).await?;
        }
        debug!("Schema applied");
        Ok(())
    }

    /// Replace the operation recorder
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn OperationRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Replace the validation settings
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = validation;
        self
    }

    /// Get the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Pool configuration in use
    #[must_use]
    pub fn pool_config(&self) -> &DatabasePoolConfig {
        &self.config
    }

    /// Validation settings in use
    #[must_use]
    pub fn validation(&self) -> ValidationSettings {
        self.validation
    }

    /// Run a parameterized query on a pooled connection
    ///
    /// # Errors
    ///
    /// Returns `TaskTreeError::Database` if the query fails
    #[instrument(skip(self, params))]
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> TaskTreeResult<Vec<DbRow>> {
        fetch_on(&self.pool, sql, params).await
    }

    /// Run a parameterized statement on a pooled connection
    ///
    /// # Errors
    ///
    /// Returns `TaskTreeError::Database` if the statement fails
    #[instrument(skip(self, params))]
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> TaskTreeResult<u64> {
        execute_on(&self.pool, sql, params).await
    }

    /// Start a transaction; it rolls back unless committed
    ///
    /// # Errors
    ///
    /// Returns `TaskTreeError::Database` if no connection can be acquired
    pub async fn begin(&self) -> TaskTreeResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Check if the database is connected
    #[instrument(skip(self))]
    pub async fn is_connected(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                debug!("Database connection is healthy");
                true
            }
            Err(e) => {
                error!("Database connection check failed: {}", e);
                false
            }
        }
    }

    /// Get database statistics
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> TaskTreeResult<DatabaseStats> {
        let project_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;

        let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;

        let completed_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE completed = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(DatabaseStats {
            project_count: project_count.try_into().unwrap_or(0),
            task_count: task_count.try_into().unwrap_or(0),
            completed_count: completed_count.try_into().unwrap_or(0),
        })
    }
}

/// Default database location: `tasktree.db` in the working directory
///
/// # Examples
///
/// ```
/// use tasktree_core::get_default_database_path;
///
/// assert!(get_default_database_path().ends_with("tasktree.db"));
/// ```
#[must_use]
pub fn get_default_database_path() -> PathBuf {
    PathBuf::from(DATABASE_FILENAME)
}
