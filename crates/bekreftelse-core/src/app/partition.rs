//! Partition runtime
//!
//! Design:
//! - 1 パーティション = 1 tokio タスク。状態（2 つのストア）はタスクが排他的に所有
//! - 入力はすべて mpsc のコマンド（メッセージ、sweep、状態問い合わせ）で、1 件ずつ処理
//! - 失敗は tracing でログに出して次のコマンドへ進む（パーティションは止めない）
//! - 1 単位（1 メッセージ / sweep の 1 ピリオド）ごとに、イベント送信 → 書き込みの順。
//!   送信がリトライ後も失敗したら書き込みは捨てる（次の sweep で同じイベントを再送）
//! - shutdown: punctuator を止め、送信側を drop → キューを処理し切ってから状態を返す

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::ConfirmationConfig;
use crate::domain::{ConfirmationEvent, CoreError, ErrorKind, ReconcileContext, StaggerMap};
use crate::ports::{Clock, EventSink, EventSinkError};

use super::codec::{InboundMessage, InboundRecord};
use super::handlers::{handle_delegation, handle_period, handle_submission};
use super::handling::Handling;
use super::punctuator::{spawn_punctuator, sweep};
use super::state::PartitionState;
use super::status::{StatusCounts, SweepReport};

pub enum PartitionCommand {
    Inbound(InboundRecord),
    Sweep {
        reply: Option<oneshot::Sender<SweepReport>>,
    },
    /// Answered after every earlier command has been processed.
    Status(oneshot::Sender<StatusCounts>),
}

/// Partition index for a record key.
pub fn partition_for(key: i64, partitions: usize) -> usize {
    // partitions >= 1 is validated at build time.
    key.rem_euclid(partitions.max(1) as i64) as usize
}

/// Attempts per event before the unit of work is given up.
const EMIT_ATTEMPTS: u32 = 3;
const EMIT_BACKOFF: Duration = Duration::from_millis(50);

/// Everything one partition task needs.
pub(crate) struct Partition {
    pub id: usize,
    pub state: PartitionState,
    pub config: Arc<ConfirmationConfig>,
    pub stagger: Arc<StaggerMap>,
    pub clock: Arc<dyn Clock>,
    pub sink: Arc<dyn EventSink>,
}

impl Partition {
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<PartitionCommand>) -> PartitionState {
        tracing::debug!(partition = self.id, "partition started");
        while let Some(command) = rx.recv().await {
            self.process(command).await;
        }
        tracing::debug!(partition = self.id, "partition drained");
        self.state
    }

    async fn process(&mut self, command: PartitionCommand) {
        match command {
            PartitionCommand::Inbound(record) => self.handle_record(record).await,
            PartitionCommand::Sweep { reply } => {
                let report = self.run_sweep().await;
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            PartitionCommand::Status(reply) => {
                let _ = reply.send(self.state.counts());
            }
        }
    }

    async fn handle_record(&mut self, record: InboundRecord) {
        let now = self.clock.now();
        let ctx = ReconcileContext {
            config: &self.config,
            stagger: &self.stagger,
            now,
        };

        let result = match &record.message {
            InboundMessage::Period(msg) => Ok(handle_period(&self.state, record.key, msg)),
            InboundMessage::Delegation(msg) => handle_delegation(&self.state, msg, &ctx),
            InboundMessage::Submission(msg) => handle_submission(&self.state, msg, &ctx),
        };

        let topic = record.message.topic();
        let applied = match result {
            Ok(handlings) => self.apply(handlings).await,
            Err(e) => Err(e),
        };
        if let Err(e) = applied {
            log_failure(self.id, topic, &e);
        }
    }

    async fn run_sweep(&mut self) -> SweepReport {
        let ctx = ReconcileContext {
            config: &self.config,
            stagger: &self.stagger,
            now: self.clock.now(),
        };
        let (mut report, units) = sweep(&self.state, &ctx);
        for unit in units {
            if let Err(e) = self.apply(unit).await {
                report.failed += 1;
                log_failure(self.id, "sweep", &e);
            }
        }
        tracing::debug!(
            partition = self.id,
            visited = report.visited,
            reconciled = report.reconciled,
            skipped_delegated = report.skipped_delegated,
            failed = report.failed,
            events = report.events,
            "sweep finished"
        );
        report
    }

    /// Events first, in order, then the writes. When an event cannot be
    /// delivered the writes are dropped, so the next sweep derives and sends
    /// it again.
    async fn apply(&mut self, handlings: Vec<Handling>) -> Result<(), CoreError> {
        for handling in &handlings {
            if let Handling::Emit { key, event } = handling {
                self.emit(*key, event).await?;
            }
        }
        self.state.apply_writes(&handlings);
        Ok(())
    }

    async fn emit(&self, key: i64, event: &ConfirmationEvent) -> Result<(), CoreError> {
        let hendelse = event.kind.name();
        let mut attempt = 1;
        loop {
            let error = match self.sink.emit(key, event.clone()).await {
                Ok(()) => return Ok(()),
                Err(e @ EventSinkError::Closed) => return Err(CoreError::Emit(e.to_string())),
                Err(e) => e,
            };
            if attempt >= EMIT_ATTEMPTS {
                return Err(CoreError::Emit(error.to_string()));
            }
            tracing::warn!(
                partition = self.id,
                periode_id = %event.period_id,
                hendelse,
                attempt,
                error = %error,
                "emit failed, retrying"
            );
            tokio::time::sleep(EMIT_BACKOFF * attempt).await;
            attempt += 1;
        }
    }
}

fn log_failure(partition: usize, topic: &str, error: &CoreError) {
    match error.kind() {
        ErrorKind::Invariant | ErrorKind::Infrastructure => {
            tracing::error!(partition, topic, error = %error, "record failed");
        }
        ErrorKind::UnknownKey | ErrorKind::Responsibility | ErrorKind::Malformed => {
            tracing::warn!(partition, topic, error = %error, "record dropped");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("partition {0} is not accepting records")]
    Closed(usize),
}

/// Running partitions plus the punctuator.
/// - `request_shutdown()` stops the punctuator
/// - `shutdown_and_join()` drains every queue and returns the partition states
pub struct PartitionGroup {
    senders: Vec<mpsc::Sender<PartitionCommand>>,
    shutdown_tx: watch::Sender<bool>,
    punctuator: JoinHandle<()>,
    joins: Vec<JoinHandle<PartitionState>>,
}

impl PartitionGroup {
    pub(crate) fn spawn(
        partitions: Vec<Partition>,
        queue_capacity: usize,
        punctuation_interval: std::time::Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut senders = Vec::with_capacity(partitions.len());
        let mut joins = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let (tx, rx) = mpsc::channel(queue_capacity);
            senders.push(tx);
            joins.push(tokio::spawn(partition.run(rx)));
        }

        let punctuator = spawn_punctuator(senders.clone(), punctuation_interval, shutdown_rx);
        tracing::info!(partitions = senders.len(), "partitions started");

        Self {
            senders,
            shutdown_tx,
            punctuator,
            joins,
        }
    }

    pub fn partitions(&self) -> usize {
        self.senders.len()
    }

    /// Route a record to its partition by key.
    pub async fn submit(&self, record: InboundRecord) -> Result<(), SubmitError> {
        let partition = partition_for(record.key, self.senders.len());
        self.senders[partition]
            .send(PartitionCommand::Inbound(record))
            .await
            .map_err(|_| SubmitError::Closed(partition))
    }

    /// Sweep every partition now and wait for the result.
    pub async fn sweep_now(&self) -> Result<SweepReport, SubmitError> {
        let mut replies = Vec::with_capacity(self.senders.len());
        for (partition, tx) in self.senders.iter().enumerate() {
            let (reply, rx) = oneshot::channel();
            tx.send(PartitionCommand::Sweep { reply: Some(reply) })
                .await
                .map_err(|_| SubmitError::Closed(partition))?;
            replies.push((partition, rx));
        }

        let mut total = SweepReport::default();
        for (partition, rx) in replies {
            let report = rx.await.map_err(|_| SubmitError::Closed(partition))?;
            total = total.merge(report);
        }
        Ok(total)
    }

    /// Counts over all partitions, after everything submitted so far is processed.
    pub async fn status(&self) -> Result<StatusCounts, SubmitError> {
        let mut total = StatusCounts::default();
        for (partition, tx) in self.senders.iter().enumerate() {
            let (reply, rx) = oneshot::channel();
            tx.send(PartitionCommand::Status(reply))
                .await
                .map_err(|_| SubmitError::Closed(partition))?;
            let counts = rx.await.map_err(|_| SubmitError::Closed(partition))?;
            total = total.merge(counts);
        }
        Ok(total)
    }

    /// Stop the punctuator. Partitions keep processing what is queued.
    pub fn request_shutdown(&self) {
        // ignore send error: the punctuator may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the punctuator, drain all partitions and return their states
    /// in partition order.
    pub async fn shutdown_and_join(self) -> Vec<PartitionState> {
        self.request_shutdown();
        if let Err(e) = self.punctuator.await {
            tracing::error!(error = %e, "punctuator task failed");
        }
        drop(self.senders);

        let mut states = Vec::with_capacity(self.joins.len());
        for (partition, join) in self.joins.into_iter().enumerate() {
            match join.await {
                Ok(state) => states.push(state),
                Err(e) => {
                    tracing::error!(partition, error = %e, "partition task failed");
                    states.push(PartitionState::in_memory());
                }
            }
        }
        tracing::info!("partitions stopped");
        states
    }
}
