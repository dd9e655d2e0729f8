//! REST API over the task tree database

use crate::api_error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tasktree_core::{
    BatchRequest, BatchResult, CreateProjectRequest, CreateTaskRequest, DatabaseStats, Project,
    Task, TaskNode, TaskTreeDatabase, UpdateProjectRequest, UpdateTaskRequest,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

#[cfg(feature = "observability")]
use metrics_exporter_prometheus::PrometheusHandle;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<TaskTreeDatabase>,
    #[cfg(feature = "observability")]
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(db: Arc<TaskTreeDatabase>) -> Self {
        Self {
            db,
            #[cfg(feature = "observability")]
            metrics: None,
        }
    }

    /// Serve `/metrics` from this Prometheus recorder
    #[cfg(feature = "observability")]
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Query string of `GET /tasks`
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub stats: Option<DatabaseStats>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let router = Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/batch", post(batch_tasks))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/hierarchy", get(task_hierarchy))
        .route("/health", get(health));

    #[cfg(feature = "observability")]
    let router = router.route("/metrics", get(metrics));

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `address` and serve until Ctrl-C
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails
#[instrument(skip(state))]
pub async fn serve(state: AppState, address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!("TaskTree API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn deleted(what: &str) -> Json<Value> {
    Json(json!({ "message": format!("{what} deleted successfully") }))
}

// ============================================================================
// Projects
// ============================================================================

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.db.get_projects().await?))
}

async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let Json(request) = payload?;
    Ok(Json(state.db.create_project(request).await?))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.db.get_project(&id).await?))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let Json(request) = payload?;
    Ok(Json(state.db.update_project(&id, request).await?))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.delete_project(&id).await?;
    Ok(deleted("Project"))
}

// ============================================================================
// Tasks
// ============================================================================

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let project_id = query.project_id.as_deref().filter(|p| !p.is_empty());
    Ok(Json(state.db.get_tasks(project_id).await?))
}

async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(request) = payload?;
    Ok(Json(state.db.create_task(request).await?))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Task>> {
    Ok(Json(state.db.get_task(&id).await?))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(request) = payload?;
    Ok(Json(state.db.update_task(&id, request).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.delete_task(&id).await?;
    Ok(deleted("Task"))
}

async fn batch_tasks(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<BatchResult>> {
    let Json(request) = payload?;
    let result = state
        .db
        .apply_batch(&request.operation, &request.task_ids)
        .await?;
    Ok(Json(result))
}

async fn task_hierarchy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskNode>> {
    Ok(Json(state.db.get_task_hierarchy(&id).await?))
}

// ============================================================================
// Health / Metrics
// ============================================================================

async fn health(State(state): State<AppState>) -> Response {
    let version = env!("CARGO_PKG_VERSION").to_string();
    if !state.db.is_connected().await {
        let body = HealthResponse {
            status: "unhealthy".to_string(),
            version,
            database: "disconnected".to_string(),
            stats: None,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }

    match state.db.get_stats().await {
        Ok(stats) => Json(HealthResponse {
            status: "healthy".to_string(),
            version,
            database: "connected".to_string(),
            stats: Some(stats),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[cfg(feature = "observability")]
async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
