//! Ports - 抽象化レイヤー
//!
//! ドメインと外部（時刻、出力ログ、状態ストア）の境界です。
//! 実装は `impls` にあり、テストでは差し替えて使います。

pub mod clock;
pub mod event_sink;
pub mod state_store;

pub use self::clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use self::event_sink::{EventSink, EventSinkError};
pub use self::state_store::KeyValueStore;
