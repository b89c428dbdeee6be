//! taskgate-core
//!
//! Client-side resilience for a task-management upstream API.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Task, エラー分類, 入力検証）
//! - **ports**: 抽象化レイヤー（Transport, TaskCache, TaskLoader, Clock）
//! - **client**: ResilientClient（timeout, retry, backoff）と JSON helpers, TaskApi
//! - **rate_limit**: fixed window の RateLimiter と axum middleware
//! - **coordinator**: 楽観的ステータス切り替え
//! - **impls**: ports の実装（reqwest, in-memory cache, upstream loader）
//! - **gateway**: upstream の前に立つ axum の HTTP 層
//! - **config**: 環境変数からの設定

pub mod client;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod gateway;
pub mod impls;
pub mod ports;
pub mod rate_limit;

#[cfg(test)]
mod testing;
