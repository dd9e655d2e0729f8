//! Task operations

use crate::{
    database::{
        date_utils::{normalize_date, now_iso, try_normalize_date, DateValue},
        execute_on, fetch_on,
        mappers::{map_task_row, TASK_COLUMNS},
        query_builders::UpdateBuilder,
        validators::{
            validate_assignee, validate_date_order, validate_level, validate_notes,
            validate_project_exists, validate_task_exists, validate_task_name,
        },
        TaskTreeDatabase,
    },
    error::{Result as TaskTreeResult, TaskTreeError},
    hierarchy::{build_task_tree, sort_hierarchically},
    models::{CreateTaskRequest, Task, TaskNode, UpdateTaskRequest},
    observability::OperationTimer,
};
use sqlx::{Executor, Sqlite};
use std::collections::HashMap;
use tasktree_common::{generate_task_id, DEFAULT_ASSIGNEE};
use tracing::{debug, info, instrument};

/// Walks up from the candidate parent; `UNION` stops on cycles already stored
const ANCESTOR_CHECK: &str = r"
    WITH RECURSIVE ancestors(id, parent_id) AS (
        SELECT id, parent_id FROM tasks WHERE id = ?
        UNION
        SELECT t.id, t.parent_id FROM tasks t JOIN ancestors a ON t.id = a.parent_id
    )
    SELECT 1 AS found FROM ancestors WHERE id = ? LIMIT 1
";

/// Re-homes every descendant of a task into another project
const MOVE_SUBTREE: &str = r"
    WITH RECURSIVE subtree(id) AS (
        SELECT id FROM tasks WHERE parent_id = ?
        UNION
        SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
    )
    UPDATE tasks SET project_id = ?, updated_at = ?
    WHERE id IN (SELECT id FROM subtree)
";

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn fetch_task_on<'c, E>(executor: E, id: &str) -> TaskTreeResult<Task>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = fetch_on(
        executor,
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
        &[id.into()],
    )
    .await?;
    rows.first()
        .map(map_task_row)
        .transpose()?
        .ok_or_else(|| TaskTreeError::task_not_found(id))
}

/// The parent must exist and live in `project_id`
async fn check_parent_project<'c, E>(
    executor: E,
    parent_id: &str,
    project_id: &str,
) -> TaskTreeResult<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let parent = fetch_task_on(executor, parent_id).await?;
    if parent.project_id != project_id {
        return Err(TaskTreeError::validation(format!(
            "Parent task {parent_id} belongs to a different project"
        )));
    }
    Ok(())
}

/// Whether `ancestor` appears on the parent chain of `task_id` (or is it)
async fn is_ancestor_or_self<'c, E>(
    executor: E,
    ancestor: &str,
    task_id: &str,
) -> TaskTreeResult<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = fetch_on(executor, ANCESTOR_CHECK, &[task_id.into(), ancestor.into()]).await?;
    Ok(!rows.is_empty())
}

impl TaskTreeDatabase {
    /// Get tasks in hierarchical order
    ///
    /// With a project id, only that project's tasks are returned (an unknown
    /// project yields an empty list). Without one, every project's tasks are
    /// returned as consecutive blocks in project creation order, each block
    /// sorted on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn get_tasks(&self, project_id: Option<&str>) -> TaskTreeResult<Vec<Task>> {
        if let Some(project_id) = project_id {
            let tasks = self.fetch_project_tasks(project_id).await?;
            debug!("Fetched {} tasks for project {}", tasks.len(), project_id);
            return Ok(sort_hierarchically(tasks));
        }

        let rows = self
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY due_date, created_at, id"
                ),
                &[],
            )
            .await?;
        let mut by_project: HashMap<String, Vec<Task>> = HashMap::new();
        for row in &rows {
            let task = map_task_row(row)?;
            by_project
                .entry(task.project_id.clone())
                .or_default()
                .push(task);
        }

        let mut sorted = Vec::with_capacity(rows.len());
        for project in self.get_projects().await? {
            if let Some(tasks) = by_project.remove(&project.id) {
                sorted.extend(sort_hierarchically(tasks));
            }
        }
        // Rows whose project vanished between the two reads
        let mut leftovers: Vec<_> = by_project.into_iter().collect();
        leftovers.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (_, tasks) in leftovers {
            sorted.extend(sort_hierarchically(tasks));
        }

        debug!("Fetched {} tasks across all projects", sorted.len());
        Ok(sorted)
    }

    async fn fetch_project_tasks(&self, project_id: &str) -> TaskTreeResult<Vec<Task>> {
        let rows = self
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? \
                     ORDER BY due_date, created_at, id"
                ),
                &[project_id.into()],
            )
            .await?;
        rows.iter().map(map_task_row).collect()
    }

    /// Get a single task by id
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if no task has this id
    #[instrument(skip(self))]
    pub async fn get_task(&self, id: &str) -> TaskTreeResult<Task> {
        fetch_task_on(&self.pool, id).await
    }

    /// Get a task with all of its descendants nested beneath it
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task does not exist
    #[instrument(skip(self))]
    pub async fn get_task_hierarchy(&self, id: &str) -> TaskTreeResult<TaskNode> {
        let task = self.get_task(id).await?;
        let tasks = self.fetch_project_tasks(&task.project_id).await?;
        let tree = build_task_tree(id, &tasks).ok_or_else(|| TaskTreeError::task_not_found(id))?;
        debug!("Hierarchy of {} holds {} tasks", id, tree.task_count());
        Ok(tree)
    }

    /// Create a new task
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid fields or a misplaced parent,
    /// `ProjectNotFound`/`TaskNotFound` for missing references, or
    /// `DateConversion` for an unusable date when strict dates are enabled
    #[instrument(skip(self, request), fields(name = %request.name, project_id = %request.project_id))]
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskTreeResult<Task> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "create_task");
        let result = self.insert_task(request).await;
        timer.finish(result, |_| 1)
    }

    async fn insert_task(&self, request: CreateTaskRequest) -> TaskTreeResult<Task> {
        let name = validate_task_name(&request.name)?;
        let notes = request.notes.unwrap_or_default();
        validate_notes(&notes)?;
        let assignee = request
            .assignee
            .unwrap_or_else(|| DEFAULT_ASSIGNEE.to_string());
        validate_assignee(&assignee)?;
        let level = validate_level(request.level.unwrap_or(0))?;

        let start_date = self.creation_date("start_date", request.start_date.as_ref())?;
        let due_date = self.creation_date("due_date", request.due_date.as_ref())?;
        let completion_date = request
            .completion_date
            .as_ref()
            .map(|value| self.normalize_strict("completion_date", value))
            .transpose()?;
        if self.validation.enforce_date_order {
            validate_date_order(&start_date, &due_date)?;
        }

        validate_project_exists(&self.pool, &request.project_id).await?;
        let parent_id = blank_to_none(request.parent_id);
        if let Some(parent_id) = &parent_id {
            check_parent_project(&self.pool, parent_id, &request.project_id).await?;
        }

        let id = generate_task_id();
        let now = now_iso();
        self.execute(
            "INSERT INTO tasks (id, name, project_id, parent_id, completed, start_date, due_date, \
             completion_date, notes, assignee, level, collapsed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            &[
                (&id).into(),
                name.into(),
                request.project_id.into(),
                parent_id.into(),
                request.completed.into(),
                start_date.into(),
                due_date.into(),
                completion_date.into(),
                notes.into(),
                assignee.into(),
                level.into(),
                request.collapsed.into(),
                (&now).into(),
                now.into(),
            ],
        )
        .await?;

        info!("Created task with id: {}", id);
        self.get_task(&id).await
    }

    fn creation_date(&self, field: &str, value: Option<&DateValue>) -> TaskTreeResult<String> {
        let value =
            value.ok_or_else(|| TaskTreeError::validation(format!("{field} is required")))?;
        self.normalize_strict(field, value)
    }

    /// Strict normalization when enabled, lenient fallback otherwise
    fn normalize_strict(&self, field: &str, value: &DateValue) -> TaskTreeResult<String> {
        if self.validation.strict_dates {
            try_normalize_date(value).map_err(|e| TaskTreeError::date_conversion(field, e.to_string()))
        } else {
            Ok(normalize_date(field, value).value)
        }
    }

    /// Update a task; absent fields are left untouched
    ///
    /// Dates are normalized leniently. An explicit `null` for `parent_id` or
    /// `completion_date` clears the column. Moving a task to another project
    /// moves all of its descendants with it. Checks and writes share one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task does not exist, or a validation
    /// error for invalid fields, a parent in another project, or a parent
    /// that would create a cycle
    #[instrument(skip(self, request))]
    pub async fn update_task(&self, id: &str, request: UpdateTaskRequest) -> TaskTreeResult<Task> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "update_task");
        let result = self.apply_task_update(id, request).await;
        timer.finish(result, |_| 1)
    }

    async fn apply_task_update(
        &self,
        id: &str,
        request: UpdateTaskRequest,
    ) -> TaskTreeResult<Task> {
        let name = request
            .name
            .as_deref()
            .map(validate_task_name)
            .transpose()?;
        if let Some(notes) = &request.notes {
            validate_notes(notes)?;
        }
        if let Some(assignee) = &request.assignee {
            validate_assignee(assignee)?;
        }
        let level = request.level.map(validate_level).transpose()?;

        let start_date = request
            .start_date
            .as_ref()
            .map(|value| normalize_date("start_date", value).value);
        let due_date = request
            .due_date
            .as_ref()
            .map(|value| normalize_date("due_date", value).value);
        let completion_date = request.completion_date.as_ref().map(|value| {
            value
                .as_ref()
                .map(|v| normalize_date("completion_date", v).value)
        });

        let mut tx = self.begin().await?;
        let existing = fetch_task_on(&mut *tx, id).await?;

        if let Some(project_id) = &request.project_id {
            validate_project_exists(&mut *tx, project_id).await?;
        }
        let project_id = request
            .project_id
            .as_deref()
            .unwrap_or(&existing.project_id);

        // None = untouched, Some(None) = cleared
        let parent_id = request.parent_id.clone().map(blank_to_none);
        let effective_parent = match &parent_id {
            Some(parent) => parent.clone(),
            None => existing.parent().map(str::to_string),
        };
        if let Some(parent) = &effective_parent {
            if parent == id {
                return Err(TaskTreeError::validation("A task cannot be its own parent"));
            }
            check_parent_project(&mut *tx, parent, project_id).await?;
            if parent_id.is_some() && is_ancestor_or_self(&mut *tx, id, parent).await? {
                return Err(TaskTreeError::validation(format!(
                    "Task {parent} is a descendant of {id} and cannot become its parent"
                )));
            }
        }

        if self.validation.enforce_date_order && (start_date.is_some() || due_date.is_some()) {
            validate_date_order(
                start_date.as_deref().unwrap_or(&existing.start_date),
                due_date.as_deref().unwrap_or(&existing.due_date),
            )?;
        }

        let moved_project = request
            .project_id
            .clone()
            .filter(|project| *project != existing.project_id);
        let now = now_iso();
        let builder = UpdateBuilder::tasks()
            .set_opt("name", name)
            .set_opt("project_id", request.project_id.clone())
            .set_opt("parent_id", parent_id)
            .set_opt("completed", request.completed)
            .set_opt("start_date", start_date)
            .set_opt("due_date", due_date)
            .set_opt("completion_date", completion_date)
            .set_opt("notes", request.notes)
            .set_opt("assignee", request.assignee)
            .set_opt("level", level)
            .set_opt("collapsed", request.collapsed);
        let (sql, params) = builder.build(id, &now);
        execute_on(&mut *tx, &sql, &params).await?;

        if let Some(project) = moved_project {
            let moved = execute_on(
                &mut *tx,
                MOVE_SUBTREE,
                &[id.into(), (&project).into(), (&now).into()],
            )
            .await?;
            info!("Moved {} descendants of {} to project {}", moved, id, project);
        }

        let updated = fetch_task_on(&mut *tx, id).await?;
        tx.commit().await?;

        info!("Updated task {} fields: {:?}", id, builder.fields());
        Ok(updated)
    }

    /// Delete a task; its descendants go with it
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task does not exist
    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> TaskTreeResult<()> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "delete_task");
        let result = match validate_task_exists(&self.pool, id).await {
            Ok(()) => self.execute("DELETE FROM tasks WHERE id = ?", &[id.into()]).await,
            Err(e) => Err(e),
        };
        if result.is_ok() {
            info!("Deleted task {}", id);
        }
        timer.finish(result, |n| *n).map(|_| ())
    }
}
