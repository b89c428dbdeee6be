//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（upstream HTTP, reactive cache, 時刻）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//! 実装は `impls` に、テストでは差し替え用の fake を使います。

pub mod cache;
pub mod clock;
pub mod transport;

pub use self::cache::{CacheUpdater, TaskCache, TaskLoader};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::transport::{HttpRequest, HttpResponse, Transport};
