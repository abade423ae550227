//! EventSink port - 出力ログへの送信
//!
//! 各イベントはピリオドの routing key と一緒に送られます。同じキーの
//! イベントは下流で同じパーティションに入り、送信順が保たれます。

use async_trait::async_trait;

use crate::domain::ConfirmationEvent;

#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    #[error("event sink closed")]
    Closed,

    #[error("event sink failure: {0}")]
    Other(String),
}

/// EventSink は出力イベントを受け取る
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, key: i64, event: ConfirmationEvent) -> Result<(), EventSinkError>;
}
