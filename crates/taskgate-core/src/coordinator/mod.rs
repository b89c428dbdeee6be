//! OptimisticCoordinator - 楽観的ステータス切り替え
//!
//! # フロー
//! 1. `target = !current` を計算
//! 2. cache entry を同期的に書き換え（ネットワーク呼び出しより前に見える）
//! 3. `open → completed` のときだけ upstream の complete を呼ぶ
//! 4. 成功 → revalidate → `on_success(target)`
//! 5. 失敗 → revalidate（= rollback）→ `on_error(&err)` → エラーを返す
//!
//! rollback は「逆パッチ」ではなく upstream の真値を取り直すことで行います。
//! 同じ entity への同時 toggle は直列化しません。先に終わった revalidate が
//! 後の楽観値を上書きすることがあります。

mod mutation;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::TaskApi;
use crate::domain::{ApiError, TaskId, TaskStatus};
use crate::ports::TaskCache;

pub use self::mutation::{MutationRecord, apply_status};

pub type OnSuccess = Box<dyn FnOnce(TaskStatus) + Send>;
pub type OnError = Box<dyn FnOnce(&ApiError) + Send>;

#[derive(Clone)]
pub struct OptimisticCoordinator {
    cache: Arc<dyn TaskCache>,
    api: TaskApi,
}

impl OptimisticCoordinator {
    pub fn new(cache: Arc<dyn TaskCache>, api: TaskApi) -> Self {
        Self { cache, api }
    }

    pub fn cache(&self) -> &Arc<dyn TaskCache> {
        &self.cache
    }

    /// Optimistic phase only. The cache entry already shows the target status
    /// when this returns; the returned toggle must be settled.
    pub fn begin_toggle(
        &self,
        entity_id: TaskId,
        current: TaskStatus,
        cache_key: &str,
    ) -> PendingToggle<'_> {
        let record = MutationRecord::toggle(entity_id, current, cache_key);

        let id = record.entity_id.clone();
        let target = record.target_status;
        // absent keys stay absent
        self.cache.write(
            cache_key,
            Box::new(move |old| old.map(|tasks| apply_status(tasks, &id, target))),
        );

        debug!(
            entity_id = %record.entity_id,
            from = %record.previous_status,
            to = %record.target_status,
            cache_key,
            "optimistic status applied"
        );

        PendingToggle {
            coordinator: self,
            record,
        }
    }

    /// Both phases of a toggle.
    pub async fn toggle_status(
        &self,
        entity_id: TaskId,
        current: TaskStatus,
        cache_key: &str,
        on_success: Option<OnSuccess>,
        on_error: Option<OnError>,
    ) -> Result<(), ApiError> {
        self.begin_toggle(entity_id, current, cache_key)
            .settle(on_success, on_error)
            .await
    }
}

/// A toggle whose optimistic write is in the cache but not yet confirmed.
#[must_use = "an unsettled toggle leaves the optimistic value in the cache"]
pub struct PendingToggle<'a> {
    coordinator: &'a OptimisticCoordinator,
    record: MutationRecord,
}

impl PendingToggle<'_> {
    pub fn record(&self) -> &MutationRecord {
        &self.record
    }

    /// Remote call (when needed) plus revalidation. Any failure rolls the
    /// cache back by revalidating before the error is returned.
    pub async fn settle(
        self,
        on_success: Option<OnSuccess>,
        on_error: Option<OnError>,
    ) -> Result<(), ApiError> {
        let record = &self.record;
        let cache = &self.coordinator.cache;

        match self.commit().await {
            Ok(()) => {
                info!(
                    entity_id = %record.entity_id,
                    status = %record.target_status,
                    "status change confirmed"
                );
                if let Some(f) = on_success {
                    f(record.target_status);
                }
                Ok(())
            }
            Err(err) => {
                warn!(
                    entity_id = %record.entity_id,
                    cache_key = %record.cache_key,
                    error = %err,
                    "status change failed, rolling back"
                );
                if let Err(reval) = cache.revalidate(&record.cache_key).await {
                    warn!(
                        cache_key = %record.cache_key,
                        error = %reval,
                        "rollback revalidation failed"
                    );
                }
                if let Some(f) = on_error {
                    f(&err);
                }
                Err(err)
            }
        }
    }

    async fn commit(&self) -> Result<(), ApiError> {
        if self.record.requires_remote() {
            self.coordinator
                .api
                .complete_task(&self.record.entity_id)
                .await?;
        }
        self.coordinator
            .cache
            .revalidate(&self.record.cache_key)
            .await
    }
}
