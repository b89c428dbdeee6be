//! RateLimiter - fixed window のリクエスト制限
//!
//! identifier（クライアント IP など）ごとに bucket を持ち、
//! window 内のリクエスト数を数えます。
//!
//! # フロー
//! 1. bucket が無い / `now > window_reset_at` → 新しい window（count=1）
//! 2. それ以外は count += 1
//! 3. `count > max` なら拒否（remaining=0）
//!
//! 期限切れ bucket は `start()` で起動する sweep task が定期的に削除します。
//! map は mutex で守られ、ロックを保持したまま await することはありません。

mod middleware;
mod identity;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ports::Clock;
use crate::ports::clock::add_duration;

pub use self::middleware::{RouteLimit, enforce, rejection_response};
pub use self::identity::{UNKNOWN_CLIENT, client_identifier};

/// Default sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per window.
    pub max: u32,
}

impl RateLimitConfig {
    pub fn new(window_ms: u64, max: u32) -> Self {
        Self { window_ms, max }
    }

    pub fn per_minute(max: u32) -> Self {
        Self::new(60_000, max)
    }

    /// Task creation: 10 per minute.
    pub fn creation() -> Self {
        Self::per_minute(10)
    }

    /// Completion toggles: 20 per minute.
    pub fn completion() -> Self {
        Self::per_minute(20)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(900_000, 100)
    }
}

/// Per-identifier counter. Removed by the sweep once `window_reset_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub identifier: String,
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Handle of the running sweep task.
struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, RateLimitBucket>>,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            buckets: Mutex::new(HashMap::new()),
            clock,
            sweeper: Mutex::new(None),
        })
    }

    fn buckets(&self) -> MutexGuard<'_, HashMap<String, RateLimitBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request for `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now();
        let mut buckets = self.buckets();

        match buckets.get_mut(identifier) {
            Some(bucket) if now <= bucket.window_reset_at => {
                bucket.count = bucket.count.saturating_add(1);
                if bucket.count > config.max {
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: bucket.window_reset_at,
                    }
                } else {
                    RateLimitDecision {
                        allowed: true,
                        remaining: config.max - bucket.count,
                        reset_at: bucket.window_reset_at,
                    }
                }
            }
            _ => {
                let reset_at = add_duration(now, config.window());
                buckets.insert(
                    identifier.to_string(),
                    RateLimitBucket {
                        identifier: identifier.to_string(),
                        count: 1,
                        window_reset_at: reset_at,
                    },
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: config.max.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }

    /// Remove buckets whose window has ended. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut buckets = self.buckets();
        let before = buckets.len();
        buckets.retain(|_, b| now <= b.window_reset_at);
        before - buckets.len()
    }

    pub fn bucket(&self, identifier: &str) -> Option<RateLimitBucket> {
        self.buckets().get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.buckets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets().is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawn the periodic sweep. Calling it while already running is a no-op.
    pub fn start(self: &Arc<Self>, interval: Duration) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let limiter = Arc::downgrade(self);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let Some(limiter) = limiter.upgrade() else { break };
                        let removed = limiter.sweep_expired();
                        if removed > 0 {
                            debug!(removed, remaining = limiter.len(), "swept expired rate-limit buckets");
                        }
                    }
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "rate-limit sweep started");
        *slot = Some(Sweeper { shutdown_tx, join });
    }

    /// Stop the sweep task and wait for it to exit.
    pub async fn stop(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sweeper) = sweeper else { return };

        // receiver may already be gone
        let _ = sweeper.shutdown_tx.send(true);
        let _ = sweeper.join.await;
        info!("rate-limit sweep stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;

    fn start_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn limiter() -> (Arc<FixedClock>, Arc<RateLimiter>) {
        let clock = Arc::new(FixedClock::new(start_time()));
        let limiter = RateLimiter::new(clock.clone());
        (clock, limiter)
    }

    #[test]
    fn fixed_window_counts_down_then_rejects_then_resets() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::per_minute(20);

        for i in 1..=20u32 {
            let d = limiter.check("10.0.0.1", &config);
            assert!(d.allowed, "call {i}");
            assert_eq!(d.remaining, 20 - i);
        }

        let rejected = limiter.check("10.0.0.1", &config);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        let first_reset = rejected.reset_at;
        assert_eq!(first_reset, start_time() + chrono::TimeDelta::seconds(60));

        clock.advance(Duration::from_millis(60_001));
        let fresh = limiter.check("10.0.0.1", &config);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 19);
        assert!(fresh.reset_at > first_reset);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::new(1_000, 1);

        assert!(limiter.check("a", &config).allowed);
        clock.advance(Duration::from_millis(1_000));
        // now == window_reset_at: still the same window
        assert!(!limiter.check("a", &config).allowed);
    }

    #[test]
    fn identifiers_are_independent() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::new(60_000, 1);

        assert!(limiter.check("a", &config).allowed);
        assert!(!limiter.check("a", &config).allowed);
        assert!(limiter.check("b", &config).allowed);
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn sweep_removes_only_expired_buckets() {
        let (clock, limiter) = limiter();

        limiter.check("short", &RateLimitConfig::new(1_000, 5));
        limiter.check("long", &RateLimitConfig::new(120_000, 5));
        clock.advance(Duration::from_secs(2));

        assert_eq!(limiter.sweep_expired(), 1);
        assert!(limiter.bucket("short").is_none());
        assert_eq!(limiter.bucket("long").map(|b| b.count), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn start_sweeps_periodically_and_stop_joins() {
        let (clock, limiter) = limiter();
        limiter.check("x", &RateLimitConfig::new(1_000, 5));
        clock.advance(Duration::from_secs(5));

        limiter.start(Duration::from_secs(60));
        limiter.start(Duration::from_secs(60));
        assert!(limiter.is_running());
        assert_eq!(limiter.len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(limiter.is_empty());

        limiter.stop().await;
        assert!(!limiter.is_running());

        // stopping twice is harmless
        limiter.stop().await;
    }

    #[test]
    fn route_presets() {
        assert_eq!(RateLimitConfig::default(), RateLimitConfig::new(900_000, 100));
        assert_eq!(RateLimitConfig::creation(), RateLimitConfig::new(60_000, 10));
        assert_eq!(RateLimitConfig::completion(), RateLimitConfig::new(60_000, 20));
    }
}
