//! ListBody - upstream のコレクション応答
//!
//! upstream は `{"tasks": [...], "count": n}` のように結果を包んで返します
//! （キーは `tasks` / `projects` / `areas`）。素の配列もそのまま受け付けます。
//! `count` は読みません。

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "tasks", alias = "projects", alias = "areas")]
        items: Vec<T>,
    },
}

impl<T> ListBody<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) | ListBody::Wrapped { items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Area, Task, TaskStatus};

    #[test]
    fn accepts_wrapped_and_bare_tasks() {
        let wrapped: ListBody<Task> = serde_json::from_str(
            r#"{"tasks":[{"id":"a","title":"A","status":"open"}],"count":1}"#,
        )
        .unwrap();
        let bare: ListBody<Task> =
            serde_json::from_str(r#"[{"id":"a","title":"A","status":"open"}]"#).unwrap();

        let expected = vec![Task::new("a", "A", TaskStatus::Open)];
        assert_eq!(wrapped.into_items(), expected);
        assert_eq!(bare.into_items(), expected);
    }

    #[test]
    fn areas_key_is_recognized() {
        let body: ListBody<Area> = serde_json::from_str(
            r#"{"areas":[{"id":"ar1","name":"Work","project_count":2}],"count":1}"#,
        )
        .unwrap();
        let areas = body.into_items();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].name, "Work");
    }

    #[test]
    fn object_without_collection_is_rejected() {
        assert!(serde_json::from_str::<ListBody<Task>>(r#"{"count":0}"#).is_err());
    }
}
