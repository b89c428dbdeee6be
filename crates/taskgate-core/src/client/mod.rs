//! Client - upstream への resilient な HTTP 呼び出し
//!
//! - **retry**: RetryPolicy（deadline, 試行回数, backoff）
//! - **outcome**: 試行結果の tagged variant
//! - **resilient**: ResilientClient（retry loop 本体）
//! - **json**: verb ごとの JSON helpers
//! - **tasks**: upstream のタスクエンドポイント

mod json;
pub mod outcome;
mod resilient;
pub mod retry;
mod tasks;

pub use outcome::{AttemptOutcome, FailureCause, StatusClass, classify_status};
pub use resilient::ResilientClient;
pub use retry::RetryPolicy;
pub use tasks::{HEALTH_TIMEOUT, TaskApi};
