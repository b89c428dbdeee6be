//! TaskApi - upstream のタスク / プロジェクト / エリアのエンドポイント
//!
//! すべての呼び出しは JSON helpers → ResilientClient を経由します。
//! 入力検証はネットワークに出る前に行い、`ApiError::Validation` で短絡します。

use std::time::Duration;

use reqwest::Url;
use tracing::warn;

use super::resilient::ResilientClient;
use crate::domain::validation::{
    prepare_create_request, validate_area_name, validate_create_project, validate_project_name,
    validate_search_query, validate_task_id,
};
use crate::domain::{
    ApiError, Area, AreaDetail, CompleteTaskRequest, CreateProjectRequest, CreateTaskRequest,
    HealthResponse, ListBody, Project, Task, TaskId, TaskList, TaskStatus, TransportError,
    ValidationError,
};

/// Health checks use a shorter per-attempt deadline than regular calls.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TaskApi {
    client: ResilientClient,
    base_url: String,
}

impl TaskApi {
    pub fn new(client: ResilientClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute upstream URL for a path such as `/todos/inbox`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Upstream URL built from raw path segments, each percent-encoded.
    fn segment_url(&self, segments: &[&str]) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::new(format!("invalid upstream URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::new("upstream URL cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// `PUT /todos/{id}/complete`
    pub async fn complete_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        validate_task_id(id.as_str())?;
        let body = CompleteTaskRequest {
            status: TaskStatus::Completed,
        };
        self.client
            .put_json(&self.url(&format!("/todos/{id}/complete")), &body)
            .await
    }

    /// `POST /todos` after sanitizing and validating the request.
    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<Task, ApiError> {
        let request = prepare_create_request(request)?;
        self.client.post_json(&self.url("/todos"), &request).await
    }

    /// `GET /todos/{inbox|today|upcoming}`
    pub async fn list_tasks(&self, list: TaskList) -> Result<Vec<Task>, ApiError> {
        self.get_tasks(&format!("/todos/{}", list.as_str())).await
    }

    /// `GET /todos/search?q=...`
    pub async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, ApiError> {
        validate_search_query(query)?;
        let url = Url::parse_with_params(&self.url("/todos/search"), [("q", query)])
            .map_err(|e| ValidationError::new("q", format!("invalid search URL: {e}")))?;
        self.get_list(url.as_str()).await
    }

    /// GET a collection path such as `/todos/inbox`.
    pub async fn get_tasks(&self, path: &str) -> Result<Vec<Task>, ApiError> {
        self.get_list(&self.url(path)).await
    }

    async fn get_list<T>(&self, url: &str) -> Result<Vec<T>, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let body: ListBody<T> = self.client.get_json(url).await?;
        Ok(body.into_items())
    }

    /// `GET /projects`
    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get_list(&self.url("/projects")).await
    }

    /// `POST /projects`
    pub async fn create_project(&self, request: CreateProjectRequest) -> Result<Project, ApiError> {
        validate_create_project(&request)?;
        self.client.post_json(&self.url("/projects"), &request).await
    }

    /// `GET /projects/{name}/todos`
    pub async fn project_tasks(&self, name: &str) -> Result<Vec<Task>, ApiError> {
        validate_project_name(name)?;
        let url = self.segment_url(&["projects", name, "todos"])?;
        self.get_list(&url).await
    }

    /// `GET /areas`
    pub async fn list_areas(&self) -> Result<Vec<Area>, ApiError> {
        self.get_list(&self.url("/areas")).await
    }

    /// Projects of `name` plus its standalone tasks.
    ///
    /// The upstream has no area detail endpoint: projects are filtered from
    /// `GET /projects`, tasks come from [`TaskApi::area_tasks`].
    pub async fn area_detail(&self, name: &str) -> Result<AreaDetail, ApiError> {
        validate_area_name(name)?;
        let projects = self
            .list_projects()
            .await?
            .into_iter()
            .filter(|p| p.belongs_to(name))
            .collect();
        let standalone_tasks = self.area_tasks(name).await;
        Ok(AreaDetail {
            projects,
            standalone_tasks,
        })
    }

    /// `GET /areas/{name}/todos`, then `GET /todos?area={name}`; empty when
    /// neither answers.
    pub async fn area_tasks(&self, name: &str) -> Vec<Task> {
        let err = match self.area_todos(name).await {
            Ok(tasks) => return tasks,
            Err(e) => e,
        };
        warn!(area = name, error = %err, "area todos endpoint failed, trying filter");

        self.todos_filtered_by_area(name)
            .await
            .unwrap_or_else(|err| {
                warn!(area = name, error = %err, "no standalone tasks for area");
                Vec::new()
            })
    }

    async fn area_todos(&self, name: &str) -> Result<Vec<Task>, ApiError> {
        let url = self.segment_url(&["areas", name, "todos"])?;
        self.get_list(&url).await
    }

    async fn todos_filtered_by_area(&self, name: &str) -> Result<Vec<Task>, ApiError> {
        let url = Url::parse_with_params(&self.url("/todos"), [("area", name)])
            .map_err(|e| TransportError::new(format!("invalid area URL: {e}")))?;
        self.get_list(url.as_str()).await
    }

    /// `GET /health` with [`HEALTH_TIMEOUT`] per attempt.
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let policy = self.client.policy().with_timeout(HEALTH_TIMEOUT);
        self.client
            .with_policy(policy)
            .get_json(&self.url("/health"))
            .await
    }
}
