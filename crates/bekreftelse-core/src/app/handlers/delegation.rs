//! Delegation start/stop ("paa vegne av").

use chrono::TimeDelta;

use crate::domain::delegation::{self, has_responsibility};
use crate::domain::events::period_event_id;
use crate::domain::policy::apply_retention;
use crate::domain::stagger::earliest_cycle_start;
use crate::domain::{
    ConfirmationEvent, ConfirmationSet, ConfirmationSolution, ConfirmationStatus, CoreError,
    DelegationAction, DelegationEntry, DelegationMessage, EventKind, PeriodId, ReconcileContext,
    StatusKind,
};

use crate::app::handling::Handling;
use crate::app::state::PartitionState;

pub fn handle_delegation(
    state: &PartitionState,
    msg: &DelegationMessage,
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<Handling>, CoreError> {
    match msg.action {
        DelegationAction::Start {
            interval_ms,
            grace_ms,
        } => start(state, msg, interval_ms, grace_ms, ctx),
        DelegationAction::Stop => Ok(stop(state, msg, ctx)),
    }
}

fn start(
    state: &PartitionState,
    msg: &DelegationMessage,
    interval_ms: i64,
    grace_ms: i64,
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<Handling>, CoreError> {
    let period_id = msg.period_id;
    let loesning = msg.solution;

    let set = state
        .confirmations
        .get(&period_id)
        .ok_or(CoreError::UnknownPeriod(period_id))?;
    if loesning.is_builtin() {
        tracing::warn!(periode_id = %period_id, ?loesning, "built-in solution cannot be delegated to");
        return Ok(Vec::new());
    }

    let entry = DelegationEntry {
        solution: loesning,
        interval: positive_millis(interval_ms, "intervalMS")?,
        grace: non_negative_millis(grace_ms, "graceMS")?,
    };

    let before = state.delegations.get(&period_id);
    let after = delegation::start(before.clone(), period_id, entry);
    if before.as_ref() == Some(&after) {
        tracing::debug!(periode_id = %period_id, ?loesning, "delegation already active");
        return Ok(Vec::new());
    }

    let marked = mark_in_flight(set.clone(), ctx)?;
    let mut handlings = vec![Handling::WriteDelegation(after)];
    if marked != set {
        handlings.push(Handling::WriteConfirmationSet(marked));
    }

    let event = ConfirmationEvent::new(
        &set.period,
        period_event_id(period_id, &format!("paa_vegne_av_startet/{loesning:?}"), ctx.now),
        ctx.now,
        EventKind::DelegationStarted { solution: loesning },
    );
    handlings.push(Handling::emit(set.period.record_key, event));

    tracing::info!(periode_id = %period_id, ?loesning, "delegation started");
    Ok(handlings)
}

/// Append the `DelegationStarted` marker to every in-flight confirmation.
fn mark_in_flight(
    set: ConfirmationSet,
    ctx: &ReconcileContext<'_>,
) -> Result<ConfirmationSet, CoreError> {
    let set = set.map_confirmations(|confirmation| {
        if confirmation.kind().is_in_flight() {
            Ok(confirmation.with_status(ConfirmationStatus::DelegationStarted(ctx.now))?)
        } else {
            Ok(confirmation)
        }
    })?;
    Ok(apply_retention(set, &ctx.config.retention))
}

fn stop(state: &PartitionState, msg: &DelegationMessage, ctx: &ReconcileContext<'_>) -> Vec<Handling> {
    let period_id = msg.period_id;
    let loesning = msg.solution;

    let outcome = delegation::stop(state.delegations.get(&period_id), loesning);
    let Some(removed) = outcome.removed else {
        tracing::debug!(periode_id = %period_id, ?loesning, "no active delegation to stop");
        return Vec::new();
    };

    let mut handlings = Vec::new();
    match outcome.state {
        Some(remaining) => {
            handlings.push(Handling::WriteDelegation(remaining));
            tracing::info!(periode_id = %period_id, ?loesning, "delegation stopped");
            return handlings;
        }
        None => handlings.push(Handling::DeleteDelegation(period_id)),
    }
    tracing::info!(periode_id = %period_id, ?loesning, "delegation stopped, responsibility reverts");

    let Some(set) = state.confirmations.get(&period_id) else {
        return handlings;
    };
    if let Some(event) = grace_expired_while_delegated(&set, &removed, ctx) {
        tracing::info!(periode_id = %period_id, ?loesning, "grace period expired while delegated");
        handlings.push(Handling::emit(set.period.record_key, event));
    }
    handlings
}

/// Reference point for "has the delegated grace period already run out":
/// end of the latest answered cycle, else start of the earliest cycle, else the
/// staggered first-cycle start.
fn grace_expired_while_delegated(
    set: &ConfirmationSet,
    removed: &DelegationEntry,
    ctx: &ReconcileContext<'_>,
) -> Option<ConfirmationEvent> {
    let last_submitted = set
        .confirmations()
        .iter()
        .filter(|c| c.kind() == StatusKind::Submitted)
        .map(|c| c.valid_to)
        .max();
    let reference = last_submitted
        .or_else(|| set.earliest().map(|c| c.valid_from))
        .unwrap_or_else(|| {
            set.period
                .started
                .max(earliest_cycle_start(&set.period, ctx.config, ctx.stagger))
        });

    let Some(grace_end) = reference
        .checked_add_signed(removed.interval)
        .and_then(|t| t.checked_add_signed(removed.grace))
    else {
        tracing::warn!(
            periode_id = %set.period.period_id,
            loesning = ?removed.solution,
            "delegated grace period ends out of range"
        );
        return None;
    };
    if ctx.now < grace_end {
        return None;
    }

    Some(ConfirmationEvent::new(
        &set.period,
        period_event_id(
            set.period.period_id,
            &format!("graceperiode_utloept_etter_ekstern_innsamling/{:?}", removed.solution),
            ctx.now,
        ),
        ctx.now,
        EventKind::GraceExpiredWhileDelegated {
            solution: removed.solution,
        },
    ))
}

/// Upper bound for a delegated interval or grace period (ten years).
const MAX_DELEGATED_MS: i64 = 10 * 365 * 24 * 60 * 60 * 1000;

fn positive_millis(ms: i64, field: &str) -> Result<TimeDelta, CoreError> {
    if !(1..=MAX_DELEGATED_MS).contains(&ms) {
        return Err(CoreError::Malformed(format!(
            "{field} must be in 1..={MAX_DELEGATED_MS}, got {ms}"
        )));
    }
    Ok(TimeDelta::milliseconds(ms))
}

fn non_negative_millis(ms: i64, field: &str) -> Result<TimeDelta, CoreError> {
    if !(0..=MAX_DELEGATED_MS).contains(&ms) {
        return Err(CoreError::Malformed(format!(
            "{field} must be in 0..={MAX_DELEGATED_MS}, got {ms}"
        )));
    }
    Ok(TimeDelta::milliseconds(ms))
}

/// True when `loesning` may submit for the period.
pub fn may_submit(state: &PartitionState, period_id: PeriodId, loesning: ConfirmationSolution) -> bool {
    has_responsibility(state.delegations.get(&period_id).as_ref(), loesning)
}
