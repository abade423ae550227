//! Punctuator - 壁時計駆動の sweep
//!
//! # 2 つの部分
//! - `sweep`: 1 パーティションのストア全体を走査する純粋な処理
//!   （delegation 中のピリオドは触らない）
//! - `spawn_punctuator`: 一定間隔で全パーティションに `Sweep` コマンドを送るタスク
//!
//! sweep はメッセージ処理を横取りしません。コマンドとしてキューに並びます。

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{ReconcileContext, reconcile};

use super::handling::Handling;
use super::partition::PartitionCommand;
use super::state::PartitionState;
use super::status::SweepReport;

/// Reconcile every stored period against `ctx.now`.
///
/// Returns one unit of work per changed period. A failing key is logged and
/// counted; the sweep goes on with the next key.
pub fn sweep(
    state: &PartitionState,
    ctx: &ReconcileContext<'_>,
) -> (SweepReport, Vec<Vec<Handling>>) {
    let mut report = SweepReport::default();
    let mut units = Vec::new();

    for period_id in state.confirmations.keys() {
        let Some(set) = state.confirmations.get(&period_id) else {
            continue;
        };
        report.visited += 1;

        if state.delegations.get(&period_id).is_some() {
            report.skipped_delegated += 1;
            continue;
        }

        match reconcile(set.clone(), ctx) {
            Ok(reconciled) => {
                let key = reconciled.set.period.record_key;
                report.events += reconciled.events.len();
                let mut unit = Vec::new();
                if reconciled.set != set {
                    report.reconciled += 1;
                    unit.push(Handling::WriteConfirmationSet(reconciled.set));
                }
                unit.extend(
                    reconciled
                        .events
                        .into_iter()
                        .map(|event| Handling::emit(key, event)),
                );
                if !unit.is_empty() {
                    units.push(unit);
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(periode_id = %period_id, error = %e, "reconcile failed");
            }
        }
    }

    (report, units)
}

/// Send `Sweep` to every partition every `every`, until shutdown.
///
/// The first sweep happens one interval after start.
pub fn spawn_punctuator(
    partitions: Vec<mpsc::Sender<PartitionCommand>>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    for (partition, tx) in partitions.iter().enumerate() {
                        if tx.send(PartitionCommand::Sweep { reply: None }).await.is_err() {
                            tracing::debug!(partition, "partition gone, sweep not delivered");
                        }
                    }
                }
            }
        }
        tracing::debug!("punctuator stopped");
    })
}
