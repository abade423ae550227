//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: キー付きストア（changelog の replay で再構築可能）
//! - **InMemoryEventLog**: 出力イベントを溜めるだけのログ（テスト・開発用）
//! - **ChannelEventSink**: mpsc でイベントを別タスクへ渡す（CLI の stdout 出力用）

pub mod event_log;
pub mod inmem_store;

pub use self::event_log::{ChannelEventSink, InMemoryEventLog, OutboundRecord};
pub use self::inmem_store::{ChangelogEntry, InMemoryStore};
