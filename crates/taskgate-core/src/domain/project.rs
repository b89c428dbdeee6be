//! Project / Area - タスクをまとめる upstream のモデル

use serde::{Deserialize, Serialize};

use super::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub task_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,

    /// Area name; the upstream sends this instead of `area_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            task_count: 0,
            area_id: None,
            area: None,
        }
    }

    /// Matches either the area name or the area id.
    pub fn belongs_to(&self, area: &str) -> bool {
        self.area.as_deref() == Some(area) || self.area_id.as_deref() == Some(area)
    }
}

/// Payload for `POST /projects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// ISO date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub project_count: u32,
}

/// Projects of one area plus the tasks filed directly under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDetail {
    pub projects: Vec<Project>,
    pub standalone_tasks: Vec<Task>,
}
