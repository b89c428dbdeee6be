//! InMemoryTaskCache - プロセス内の task cache
//!
//! # 実装詳細
//! - `RwLock<HashMap<key, Vec<Task>>>` で entry を保持
//! - `write` は同期的（ロック内で updater を適用）
//! - `revalidate` は loader から真値を取り直して置き換える
//!
//! ロックを保持したまま await することはありません（load 完了後に書き込む）。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{ApiError, Task};
use crate::ports::{CacheUpdater, TaskCache, TaskLoader};

pub struct InMemoryTaskCache {
    entries: RwLock<HashMap<String, Vec<Task>>>,
    loader: Arc<dyn TaskLoader>,
}

impl InMemoryTaskCache {
    pub fn new(loader: Arc<dyn TaskLoader>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            loader,
        }
    }

    /// Put a value without going through the loader.
    pub fn seed(&self, key: &str, tasks: Vec<Task>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), tasks);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl TaskCache for InMemoryTaskCache {
    fn read(&self, key: &str) -> Option<Vec<Task>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, updater: CacheUpdater<'_>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let old = entries.remove(key);
        if let Some(new) = updater(old) {
            entries.insert(key.to_string(), new);
        }
    }

    async fn revalidate(&self, key: &str) -> Result<(), ApiError> {
        let fresh = self.loader.load(key).await?;
        debug!(cache_key = key, tasks = fresh.len(), "cache entry revalidated");
        self.seed(key, fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::testing::MapLoader;

    #[test]
    fn write_applies_updater_synchronously() {
        let cache = InMemoryTaskCache::new(MapLoader::new());
        cache.seed("inbox", vec![Task::new("a", "A", TaskStatus::Open)]);

        cache.write(
            "inbox",
            Box::new(|old| {
                old.map(|mut tasks| {
                    tasks.push(Task::new("b", "B", TaskStatus::Open));
                    tasks
                })
            }),
        );

        assert_eq!(cache.read("inbox").map(|t| t.len()), Some(2));
    }

    #[test]
    fn updater_returning_none_removes_entry() {
        let cache = InMemoryTaskCache::new(MapLoader::new());
        cache.seed("inbox", Vec::new());

        cache.write("inbox", Box::new(|_| None));

        assert!(cache.read("inbox").is_none());
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn revalidate_replaces_with_loader_value() {
        let loader = MapLoader::new();
        loader.set("today", vec![Task::new("t", "Truth", TaskStatus::Completed)]);
        let cache = InMemoryTaskCache::new(loader.clone());
        cache.seed("today", vec![Task::new("t", "Stale", TaskStatus::Open)]);

        cache.revalidate("today").await.unwrap();

        assert_eq!(
            cache.read("today"),
            Some(vec![Task::new("t", "Truth", TaskStatus::Completed)])
        );
        assert_eq!(loader.loads(), vec!["today".to_string()]);
    }

    #[tokio::test]
    async fn failed_revalidate_keeps_current_value() {
        let loader = MapLoader::new();
        loader.fail_loads(true);
        let cache = InMemoryTaskCache::new(loader);
        cache.seed("today", vec![Task::new("t", "Kept", TaskStatus::Open)]);

        assert!(cache.revalidate("today").await.is_err());
        assert_eq!(cache.read("today").map(|t| t[0].title.clone()), Some("Kept".into()));
    }
}
