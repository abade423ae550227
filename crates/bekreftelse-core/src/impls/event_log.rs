//! Outbound event sinks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify, mpsc};

use crate::domain::{ConfirmationEvent, PeriodId};
use crate::ports::{EventSink, EventSinkError};

/// One produced record: routing key plus event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRecord {
    pub key: i64,
    #[serde(rename = "value")]
    pub event: ConfirmationEvent,
}

/// Collects everything emitted, in order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    records: Arc<Mutex<Vec<OutboundRecord>>>,
    notify: Arc<Notify>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<OutboundRecord> {
        self.records.lock().await.clone()
    }

    pub async fn events_for(&self, period_id: PeriodId) -> Vec<ConfirmationEvent> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.event.period_id == period_id)
            .map(|r| r.event.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove and return everything collected so far.
    pub async fn drain(&self) -> Vec<OutboundRecord> {
        std::mem::take(&mut *self.records.lock().await)
    }

    /// Wait until at least `count` records are collected. Returns false on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.len().await >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn emit(&self, key: i64, event: ConfirmationEvent) -> Result<(), EventSinkError> {
        self.records.lock().await.push(OutboundRecord { key, event });
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Forwards records to an mpsc receiver (e.g. a stdout writer task).
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<OutboundRecord>,
}

impl ChannelEventSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, key: i64, event: ConfirmationEvent) -> Result<(), EventSinkError> {
        self.tx
            .send(OutboundRecord { key, event })
            .await
            .map_err(|_| EventSinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, EventKind, PeriodInfo};
    use chrono::{TimeZone, Utc};

    fn event(period_id: PeriodId) -> ConfirmationEvent {
        let period = PeriodInfo {
            period_id,
            identity_number: "1".into(),
            arbeidssoeker_id: 1,
            record_key: 1,
            started: Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap(),
            closed: None,
        };
        ConfirmationEvent::new(&period, EventId::random(), period.started, EventKind::PeriodClosed)
    }

    #[tokio::test]
    async fn event_log_collects_in_order() {
        let log = InMemoryEventLog::new();
        let a = PeriodId::random();
        let b = PeriodId::random();

        log.emit(1, event(a)).await.unwrap();
        log.emit(2, event(b)).await.unwrap();
        log.emit(1, event(a)).await.unwrap();

        assert_eq!(log.len().await, 3);
        assert_eq!(log.events_for(a).await.len(), 2);
        assert_eq!(log.records().await[1].key, 2);

        assert_eq!(log.drain().await.len(), 3);
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn wait_for_sees_later_emits() {
        let log = InMemoryEventLog::new();
        let writer = log.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.emit(1, event(PeriodId::random())).await.unwrap();
        });
        assert!(log.wait_for(1, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelEventSink::new(4);
        drop(rx);
        let err = sink.emit(1, event(PeriodId::random())).await.unwrap_err();
        assert!(matches!(err, EventSinkError::Closed));
    }
}
