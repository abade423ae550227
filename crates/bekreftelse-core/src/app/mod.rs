//! App - アプリケーション層
//!
//! domain と ports を組み合わせて、パーティション化されたランタイムを作ります。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 構築とワイヤリング（fail-fast）
//! - **PartitionGroup**: パーティションタスク群と punctuator
//! - **handlers**: 入力メッセージの処理
//! - **punctuator**: 壁時計駆動の sweep
//! - **codec**: JSON レコードの decode / encode

pub mod builder;
pub mod codec;
pub mod handlers;
pub mod handling;
pub mod partition;
pub mod punctuator;
pub mod state;
pub mod status;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::codec::{CodecError, InboundMessage, InboundRecord, decode_inbound, encode_outbound};
pub use self::handling::Handling;
pub use self::partition::{PartitionCommand, PartitionGroup, SubmitError, partition_for};
pub use self::punctuator::sweep;
pub use self::state::{PartitionChangelog, PartitionState};
pub use self::status::{StatusCounts, SweepReport};
