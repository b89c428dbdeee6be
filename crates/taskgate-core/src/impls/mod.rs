//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ReqwestTransport**: 本番用の HTTP transport
//! - **InMemoryTaskCache**: プロセス内の task cache（revalidate は loader 経由）
//! - **UpstreamLoader**: cache key を upstream のパスとして GET する loader

pub mod inmem_cache;
pub mod reqwest_transport;
pub mod upstream_loader;

pub use self::inmem_cache::InMemoryTaskCache;
pub use self::reqwest_transport::ReqwestTransport;
pub use self::upstream_loader::UpstreamLoader;
