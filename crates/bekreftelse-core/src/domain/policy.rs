//! Confirmation-set policy
//!
//! `reconcile` は名前付きステップを順に適用します。順序には意味があります
//! （ensure-first で作った確認は同じパスの advance-all で開かれる）。
//!
//! 1. `ensure_first` - 空なら最初のサイクルを作る
//! 2. `roll_forward` - 最新サイクルの期限を過ぎていて、待ちが上限未満なら次を作る
//! 3. `advance_all`  - 全サイクルに `advance` を同じ `now` で適用
//! 4. `apply_retention` - ステータスごとの保持上限

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfirmationConfig, RetentionPolicy};

use super::confirmation::{Confirmation, advance};
use super::errors::CoreError;
use super::events::ConfirmationEvent;
use super::ids::ConfirmationId;
use super::period::PeriodInfo;
use super::stagger::{StaggerMap, earliest_cycle_start};
use super::status::StatusKind;

/// All confirmations of one period, sorted ascending by `valid_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSet {
    pub period: PeriodInfo,
    confirmations: Vec<Confirmation>,
}

impl ConfirmationSet {
    pub fn new(period: PeriodInfo) -> Self {
        Self {
            period,
            confirmations: Vec::new(),
        }
    }

    pub fn with_confirmations(period: PeriodInfo, mut confirmations: Vec<Confirmation>) -> Self {
        confirmations.sort_by_key(|c| c.valid_to);
        Self {
            period,
            confirmations,
        }
    }

    pub fn confirmations(&self) -> &[Confirmation] {
        &self.confirmations
    }

    pub fn is_empty(&self) -> bool {
        self.confirmations.is_empty()
    }

    pub fn find(&self, id: ConfirmationId) -> Option<&Confirmation> {
        self.confirmations.iter().find(|c| c.id == id)
    }

    /// Confirmation with the greatest `valid_to`.
    pub fn latest(&self) -> Option<&Confirmation> {
        self.confirmations.iter().max_by_key(|c| c.valid_to)
    }

    pub fn earliest(&self) -> Option<&Confirmation> {
        self.confirmations.iter().min_by_key(|c| c.valid_from)
    }

    /// Deadline passed, still unanswered.
    pub fn pending_count(&self) -> usize {
        self.confirmations
            .iter()
            .filter(|c| c.kind().is_pending_answer())
            .count()
    }

    /// Replace the confirmation with the same id, or insert it.
    pub fn upsert(mut self, confirmation: Confirmation) -> Self {
        self.confirmations.retain(|c| c.id != confirmation.id);
        self.confirmations.push(confirmation);
        self.confirmations.sort_by_key(|c| c.valid_to);
        self
    }

    pub fn map_confirmations<F>(mut self, f: F) -> Result<Self, CoreError>
    where
        F: FnMut(Confirmation) -> Result<Confirmation, CoreError>,
    {
        self.confirmations = self
            .confirmations
            .into_iter()
            .map(f)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

/// Inputs shared by every step of one reconcile.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub config: &'a ConfirmationConfig,
    pub stagger: &'a StaggerMap,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub set: ConfirmationSet,
    pub events: Vec<ConfirmationEvent>,
}

pub fn reconcile(set: ConfirmationSet, ctx: &ReconcileContext<'_>) -> Result<Reconciled, CoreError> {
    let set = ensure_first(set, ctx)?;
    let set = roll_forward(set, ctx)?;
    let Reconciled { set, events } = advance_all(set, ctx)?;
    let set = apply_retention(set, &ctx.config.retention);
    Ok(Reconciled { set, events })
}

/// Create the first cycle of an empty set.
pub fn ensure_first(
    set: ConfirmationSet,
    ctx: &ReconcileContext<'_>,
) -> Result<ConfirmationSet, CoreError> {
    if !set.is_empty() {
        return Ok(set);
    }
    let staggered = earliest_cycle_start(&set.period, ctx.config, ctx.stagger);
    let valid_from = set.period.started.max(staggered);
    let first = Confirmation::scheduled(
        set.period.period_id,
        valid_from,
        cycle_end(valid_from, ctx.config.interval)?,
        ctx.now,
    );
    Ok(set.upsert(first))
}

/// Open the next cycle once the latest has ended, unless too many are
/// already waiting for an answer.
pub fn roll_forward(
    set: ConfirmationSet,
    ctx: &ReconcileContext<'_>,
) -> Result<ConfirmationSet, CoreError> {
    let latest_end = set
        .latest()
        .map(|c| c.valid_to)
        .ok_or(CoreError::EmptyConfirmationSet(set.period.period_id))?;

    if ctx.now < latest_end || set.pending_count() >= ctx.config.max_pending_confirmations {
        return Ok(set);
    }

    let next = Confirmation::scheduled(
        set.period.period_id,
        latest_end,
        cycle_end(latest_end, ctx.config.interval)?,
        ctx.now,
    );
    Ok(set.upsert(next))
}

fn cycle_end(valid_from: DateTime<Utc>, interval: TimeDelta) -> Result<DateTime<Utc>, CoreError> {
    valid_from
        .checked_add_signed(interval)
        .ok_or_else(|| CoreError::Malformed(format!("cycle starting {valid_from} ends out of range")))
}

/// Run the lifecycle once per confirmation; events in list order.
pub fn advance_all(
    set: ConfirmationSet,
    ctx: &ReconcileContext<'_>,
) -> Result<Reconciled, CoreError> {
    let mut events = Vec::new();
    let period = set.period.clone();
    let set = set.map_confirmations(|confirmation| {
        let (confirmation, transition) = advance(confirmation, ctx.now, ctx.config)?;
        if let Some(transition) = transition {
            events.push(transition.to_event(&period, &confirmation, ctx.now));
        }
        Ok(confirmation)
    })?;
    Ok(Reconciled { set, events })
}

/// Keep the newest `cap` confirmations (by `valid_to`) of every capped status.
pub fn apply_retention(mut set: ConfirmationSet, policy: &RetentionPolicy) -> ConfirmationSet {
    let mut seen: HashMap<StatusKind, usize> = HashMap::new();
    set.confirmations
        .sort_by(|a, b| b.valid_to.cmp(&a.valid_to));
    set.confirmations.retain(|c| {
        let kind = c.kind();
        match policy.cap(kind) {
            None => true,
            Some(cap) => {
                let count = seen.entry(kind).or_insert(0);
                *count += 1;
                *count <= cap
            }
        }
    });
    set.confirmations.sort_by_key(|c| c.valid_to);
    set
}
