use crate::domain::{Task, TaskId, TaskStatus};

/// One optimistic status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub entity_id: TaskId,
    pub previous_status: TaskStatus,
    pub target_status: TaskStatus,
    pub cache_key: String,
}

impl MutationRecord {
    pub fn toggle(entity_id: TaskId, current: TaskStatus, cache_key: impl Into<String>) -> Self {
        Self {
            entity_id,
            previous_status: current,
            target_status: current.toggled(),
            cache_key: cache_key.into(),
        }
    }

    /// Only `open -> completed` has an upstream endpoint; reopening is cache-only.
    pub fn requires_remote(&self) -> bool {
        self.target_status == TaskStatus::Completed
    }
}

/// Rewrite the status of the task matching `id`; every other record is kept as is.
pub fn apply_status(tasks: Vec<Task>, id: &TaskId, status: TaskStatus) -> Vec<Task> {
    tasks
        .into_iter()
        .map(|t| if &t.id == id { t.with_status(status) } else { t })
        .collect()
}
