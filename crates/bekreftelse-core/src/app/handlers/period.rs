//! Period lifecycle messages.

use crate::domain::events::period_event_id;
use crate::domain::{
    ConfirmationEvent, ConfirmationSet, EventKind, PeriodInfo, PeriodMessage,
};

use crate::app::handling::Handling;
use crate::app::state::PartitionState;

/// Open: remember the period (empty set). Closed: forget both stores and
/// announce the closure.
pub fn handle_period(state: &PartitionState, record_key: i64, msg: &PeriodMessage) -> Vec<Handling> {
    let period_id = msg.period_id;
    let existing = state.confirmations.get(&period_id);

    match (msg.closed, existing) {
        (None, None) => {
            tracing::debug!(periode_id = %period_id, "period observed");
            let period = PeriodInfo {
                period_id,
                identity_number: msg.identity_number.clone(),
                arbeidssoeker_id: msg.arbeidssoeker_id,
                record_key,
                started: msg.started,
                closed: None,
            };
            vec![Handling::WriteConfirmationSet(ConfirmationSet::new(period))]
        }
        (None, Some(_)) => Vec::new(),
        (Some(closed), Some(set)) => {
            tracing::info!(periode_id = %period_id, "period closed");
            let event = ConfirmationEvent::new(
                &set.period,
                period_event_id(period_id, "periode_avsluttet", closed),
                closed,
                EventKind::PeriodClosed,
            );
            vec![
                Handling::DeleteConfirmationSet(period_id),
                Handling::DeleteDelegation(period_id),
                Handling::emit(set.period.record_key, event),
            ]
        }
        (Some(_), None) => {
            tracing::debug!(periode_id = %period_id, "closed period is not known");
            Vec::new()
        }
    }
}
