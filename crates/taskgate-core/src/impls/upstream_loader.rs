use async_trait::async_trait;

use crate::client::TaskApi;
use crate::domain::{ApiError, Task};
use crate::ports::TaskLoader;

/// Treats a cache key as a path under the upstream base URL
/// (e.g. `/todos/inbox`) and GETs it through the JSON helpers.
/// Both the wrapped `{"tasks": [...]}` body and a bare array are accepted.
#[derive(Clone)]
pub struct UpstreamLoader {
    api: TaskApi,
}

impl UpstreamLoader {
    pub fn new(api: TaskApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TaskLoader for UpstreamLoader {
    async fn load(&self, key: &str) -> Result<Vec<Task>, ApiError> {
        self.api.get_tasks(key).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::{ResilientClient, RetryPolicy};
    use crate::domain::TaskStatus;
    use crate::testing::{ScriptedTransport, Step};

    #[tokio::test]
    async fn loads_key_as_upstream_path() {
        let transport = ScriptedTransport::new([Step::Respond(
            200,
            r#"{"tasks":[{"id":"t1","title":"A","status":"completed"}],"count":1}"#.into(),
        )]);
        let client = ResilientClient::new(
            transport.clone(),
            RetryPolicy::new(Duration::from_millis(100), 1, Duration::from_millis(10)),
        );
        let loader = UpstreamLoader::new(TaskApi::new(client, "http://upstream:8000"));

        let tasks = loader.load("/todos/today").await.unwrap();

        assert_eq!(tasks, vec![Task::new("t1", "A", TaskStatus::Completed)]);
        assert_eq!(transport.calls()[0].url, "http://upstream:8000/todos/today");
    }
}
