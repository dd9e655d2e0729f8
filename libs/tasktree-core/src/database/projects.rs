//! Project operations

use crate::{
    database::{
        date_utils::now_iso,
        mappers::{map_project_row, PROJECT_COLUMNS},
        query_builders::UpdateBuilder,
        validators::{validate_color, validate_project_exists, validate_project_name},
        TaskTreeDatabase,
    },
    error::{Result as TaskTreeResult, TaskTreeError},
    models::{CreateProjectRequest, Project, UpdateProjectRequest},
    observability::OperationTimer,
};
use tasktree_common::generate_project_id;
use tracing::{debug, info, instrument};

impl TaskTreeDatabase {
    /// Get all projects in creation order
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn get_projects(&self) -> TaskTreeResult<Vec<Project>> {
        let rows = self
            .query(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, rowid"),
                &[],
            )
            .await?;
        let projects = rows
            .iter()
            .map(map_project_row)
            .collect::<TaskTreeResult<Vec<_>>>()?;

        debug!("Fetched {} projects", projects.len());
        Ok(projects)
    }

    /// Get a single project by id
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if no project has this id
    #[instrument(skip(self))]
    pub async fn get_project(&self, id: &str) -> TaskTreeResult<Project> {
        let rows = self
            .query(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
                &[id.into()],
            )
            .await?;
        rows.first()
            .map(map_project_row)
            .transpose()?
            .ok_or_else(|| TaskTreeError::project_not_found(id))
    }

    /// Create a new project
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank or overlong name or a malformed
    /// color, or a database error if the insert fails
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_project(&self, request: CreateProjectRequest) -> TaskTreeResult<Project> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "create_project");
        let result = self.insert_project(request).await;
        timer.finish(result, |_| 1)
    }

    async fn insert_project(&self, request: CreateProjectRequest) -> TaskTreeResult<Project> {
        let name = validate_project_name(&request.name)?;
        validate_color(&request.color)?;

        let id = generate_project_id();
        let now = now_iso();
        self.execute(
            "INSERT INTO projects (id, name, color, collapsed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            &[
                (&id).into(),
                name.into(),
                request.color.into(),
                request.collapsed.into(),
                (&now).into(),
                now.into(),
            ],
        )
        .await?;

        info!("Created project with id: {}", id);
        self.get_project(&id).await
    }

    /// Update a project; absent fields are left untouched
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project does not exist, or a
    /// validation error for invalid fields
    #[instrument(skip(self, request))]
    pub async fn update_project(
        &self,
        id: &str,
        request: UpdateProjectRequest,
    ) -> TaskTreeResult<Project> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "update_project");
        let result = self.apply_project_update(id, request).await;
        timer.finish(result, |_| 1)
    }

    async fn apply_project_update(
        &self,
        id: &str,
        request: UpdateProjectRequest,
    ) -> TaskTreeResult<Project> {
        validate_project_exists(&self.pool, id).await?;

        let name = request
            .name
            .as_deref()
            .map(validate_project_name)
            .transpose()?;
        if let Some(color) = &request.color {
            validate_color(color)?;
        }

        let builder = UpdateBuilder::projects()
            .set_opt("name", name)
            .set_opt("color", request.color)
            .set_opt("collapsed", request.collapsed);
        let (sql, params) = builder.build(id, &now_iso());
        self.execute(&sql, &params).await?;

        info!("Updated project {} fields: {:?}", id, builder.fields());
        self.get_project(id).await
    }

    /// Delete a project together with all of its tasks
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project does not exist
    #[instrument(skip(self))]
    pub async fn delete_project(&self, id: &str) -> TaskTreeResult<()> {
        let timer = OperationTimer::start(self.recorder.as_ref(), "delete_project");
        let result = self
            .execute("DELETE FROM projects WHERE id = ?", &[id.into()])
            .await
            .and_then(|affected| {
                if affected == 0 {
                    Err(TaskTreeError::project_not_found(id))
                } else {
                    info!("Deleted project {}", id);
                    Ok(affected)
                }
            });
        timer.finish(result, |n| *n).map(|_| ())
    }
}
