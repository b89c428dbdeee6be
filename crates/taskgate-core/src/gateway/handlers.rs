use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::GatewayState;
use crate::domain::{
    ApiError, Area, AreaDetail, CreateProjectRequest, CreateTaskRequest, HealthResponse,
    HealthStatus, Project, Task, TaskId, TaskList, ValidationError,
};

type ApiResult<T> = Result<T, ApiError>;

/// GET /api/health
pub async fn health(State(state): State<GatewayState>) -> Response {
    match state.api.health().await {
        Ok(health) => Json(health).into_response(),
        Err(err) => {
            warn!(error = %err, "upstream health check failed");
            let body = HealthResponse {
                status: HealthStatus::Error,
                timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                version: None,
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<GatewayState>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.api.create_task(request).await?;
    info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /api/tasks/search?q=
pub async fn search_tasks(
    State(state): State<GatewayState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ValidationError::new("q", "Query parameter \"q\" is required"))?;
    Ok(Json(state.api.search_tasks(&query).await?))
}

/// PUT /api/tasks/:id/complete
pub async fn complete_task(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state.api.complete_task(&TaskId::new(id)).await?;
    info!(task_id = %task.id, "task completed");
    Ok(Json(task))
}

async fn list(state: GatewayState, list: TaskList) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.api.list_tasks(list).await?))
}

/// GET /api/tasks/inbox
pub async fn inbox(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Task>>> {
    list(state, TaskList::Inbox).await
}

/// GET /api/tasks/today
pub async fn today(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Task>>> {
    list(state, TaskList::Today).await
}

/// GET /api/tasks/upcoming
pub async fn upcoming(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Task>>> {
    list(state, TaskList::Upcoming).await
}

/// GET /api/projects
pub async fn list_projects(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.api.list_projects().await?))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<GatewayState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.api.create_project(request).await?;
    info!(project_id = %project.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:project_name/tasks
pub async fn project_tasks(
    State(state): State<GatewayState>,
    Path(project_name): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.api.project_tasks(&project_name).await?))
}

/// GET /api/areas
pub async fn list_areas(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Area>>> {
    Ok(Json(state.api.list_areas().await?))
}

/// GET /api/areas/:area_name
pub async fn area_detail(
    State(state): State<GatewayState>,
    Path(area_name): Path<String>,
) -> ApiResult<Json<AreaDetail>> {
    Ok(Json(state.api.area_detail(&area_name).await?))
}
