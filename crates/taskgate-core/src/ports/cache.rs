//! Cache port - 外部キャッシュ（reactive store）との契約
//!
//! coordinator はストレージを持たず、この trait 越しに
//! read / write(updater) / revalidate だけを使います。
//! key は呼び出し側が決める不透明な文字列です（新しい key を作ることはない）。

use async_trait::async_trait;

use crate::domain::{ApiError, Task};

/// Pure `old -> new` function applied by [`TaskCache::write`].
pub type CacheUpdater<'a> = Box<dyn FnOnce(Option<Vec<Task>>) -> Option<Vec<Task>> + Send + 'a>;

#[async_trait]
pub trait TaskCache: Send + Sync {
    /// Current value for `key`, if any.
    fn read(&self, key: &str) -> Option<Vec<Task>>;

    /// Synchronously replace the value for `key` with `updater(old)`.
    /// The new value must be visible to `read` as soon as this returns.
    fn write(&self, key: &str, updater: CacheUpdater<'_>);

    /// Refetch authoritative data for `key` and replace the cached value.
    async fn revalidate(&self, key: &str) -> Result<(), ApiError>;
}

/// Loads the authoritative value of a cache key.
#[async_trait]
pub trait TaskLoader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<Task>, ApiError>;
}
