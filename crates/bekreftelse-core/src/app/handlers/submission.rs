//! Confirmation submissions.

use crate::domain::policy::apply_retention;
use crate::domain::{
    Confirmation, ConfirmationEvent, ConfirmationStatus, CoreError, EventId, EventKind,
    ReconcileContext, StatusKind, SubmissionMessage,
};

use super::delegation::may_submit;
use crate::app::handling::Handling;
use crate::app::state::PartitionState;

pub fn handle_submission(
    state: &PartitionState,
    msg: &SubmissionMessage,
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<Handling>, CoreError> {
    let period_id = msg.period_id;
    let confirmation_id = msg.confirmation_id;
    let loesning = msg.solution;
    let answer = &msg.answer;

    let set = state
        .confirmations
        .get(&period_id)
        .ok_or(CoreError::UnknownPeriod(period_id))?;
    if !may_submit(state, period_id, loesning) {
        return Err(CoreError::NoResponsibility {
            period_id,
            solution: loesning,
        });
    }
    if answer.valid_from >= answer.valid_to {
        return Err(CoreError::Malformed(format!(
            "{confirmation_id}: gjelderFra {} is not before gjelderTil {}",
            answer.valid_from, answer.valid_to
        )));
    }

    let submitted_at = answer.submitted_by.at;
    let confirmation = match set.find(confirmation_id) {
        Some(existing) if existing.kind() == StatusKind::Submitted => {
            tracing::debug!(bekreftelse_id = %confirmation_id, "already submitted");
            return Ok(Vec::new());
        }
        Some(existing) if existing.kind() == StatusKind::GraceExpired => {
            return Err(CoreError::LateSubmission(confirmation_id));
        }
        Some(existing) => existing
            .clone()
            .with_status(ConfirmationStatus::Submitted(submitted_at))?,
        None => Confirmation::new(
            confirmation_id,
            answer.valid_from,
            answer.valid_to,
            ConfirmationStatus::Submitted(submitted_at),
        ),
    };

    let record_key = set.period.record_key;
    let set = apply_retention(set.upsert(confirmation), &ctx.config.retention);
    let closure_request = (!answer.wants_to_continue).then(|| {
        tracing::info!(periode_id = %period_id, bekreftelse_id = %confirmation_id, "person asks to close the period");
        ConfirmationEvent::new(
            &set.period,
            EventId::from_uuid(confirmation_id.as_uuid()),
            submitted_at,
            EventKind::RequestPeriodClosure {
                actor: answer.submitted_by.actor.clone(),
            },
        )
    });

    let mut handlings = vec![Handling::WriteConfirmationSet(set)];
    if let Some(event) = closure_request {
        handlings.push(Handling::emit(record_key, event));
    }

    tracing::debug!(periode_id = %period_id, bekreftelse_id = %confirmation_id, ?loesning, "submission accepted");
    Ok(handlings)
}
