//! Delegation state ("paa vegne av")
//!
//! Which external solutions currently collect confirmations for a period,
//! each with its own interval and grace period. The built-in solution is
//! never stored; an empty set is never stored either (the entry is deleted).

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::duration_ms;
use super::ids::PeriodId;

/// Source of a confirmation / owner of a delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfirmationSolution {
    /// Built-in collection. Always responsible, never stored in a delegation set.
    #[serde(rename = "ARBEIDSSOEKERREGISTERET")]
    Registry,

    #[serde(rename = "DAGPENGER")]
    Dagpenger,

    #[serde(rename = "FRISKMELDT_TIL_ARBEIDSFORMIDLING")]
    FriskmeldtTilArbeidsformidling,

    #[serde(rename = "UKJENT_VERDI", other)]
    Unknown,
}

impl ConfirmationSolution {
    pub fn is_builtin(self) -> bool {
        self == ConfirmationSolution::Registry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationEntry {
    pub solution: ConfirmationSolution,
    #[serde(with = "duration_ms")]
    pub interval: TimeDelta,
    #[serde(with = "duration_ms")]
    pub grace: TimeDelta,
}

/// Non-empty set of delegation entries for one period, ordered by solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationState {
    pub period_id: PeriodId,
    entries: Vec<DelegationEntry>,
}

impl DelegationState {
    pub fn entries(&self) -> &[DelegationEntry] {
        &self.entries
    }

    pub fn get(&self, solution: ConfirmationSolution) -> Option<&DelegationEntry> {
        self.entries.iter().find(|e| e.solution == solution)
    }
}

/// Result of `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    /// `None` when the set became empty.
    pub state: Option<DelegationState>,
    pub removed: Option<DelegationEntry>,
}

/// Add or replace the entry for `entry.solution`.
pub fn start(
    state: Option<DelegationState>,
    period_id: PeriodId,
    entry: DelegationEntry,
) -> DelegationState {
    let mut state = state.unwrap_or(DelegationState {
        period_id,
        entries: Vec::new(),
    });
    state.entries.retain(|e| e.solution != entry.solution);
    state.entries.push(entry);
    state.entries.sort_by_key(|e| e.solution);
    state
}

/// Remove the entry for `solution`.
pub fn stop(state: Option<DelegationState>, solution: ConfirmationSolution) -> StopOutcome {
    let Some(mut state) = state else {
        return StopOutcome {
            state: None,
            removed: None,
        };
    };

    let removed = state
        .entries
        .iter()
        .position(|e| e.solution == solution)
        .map(|index| state.entries.remove(index));

    StopOutcome {
        state: (!state.entries.is_empty()).then_some(state),
        removed,
    }
}

pub fn has_responsibility(state: Option<&DelegationState>, solution: ConfirmationSolution) -> bool {
    solution.is_builtin() || state.is_some_and(|s| s.get(solution).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(solution: ConfirmationSolution, days: i64) -> DelegationEntry {
        DelegationEntry {
            solution,
            interval: TimeDelta::days(days),
            grace: TimeDelta::days(7),
        }
    }

    #[test]
    fn start_creates_and_replaces() {
        let period_id = PeriodId::random();
        let state = start(None, period_id, entry(ConfirmationSolution::Dagpenger, 14));
        let state = start(Some(state), period_id, entry(ConfirmationSolution::Dagpenger, 7));

        assert_eq!(state.entries().len(), 1);
        assert_eq!(state.entries()[0].interval, TimeDelta::days(7));
    }

    #[test]
    fn start_is_idempotent() {
        let period_id = PeriodId::random();
        let once = start(None, period_id, entry(ConfirmationSolution::Dagpenger, 14));
        let twice = start(
            Some(once.clone()),
            period_id,
            entry(ConfirmationSolution::Dagpenger, 14),
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn stop_last_entry_deletes_state() {
        let period_id = PeriodId::random();
        let state = start(None, period_id, entry(ConfirmationSolution::Dagpenger, 14));

        let outcome = stop(Some(state), ConfirmationSolution::Dagpenger);
        assert!(outcome.state.is_none());
        assert_eq!(
            outcome.removed.map(|e| e.solution),
            Some(ConfirmationSolution::Dagpenger)
        );
    }

    #[test]
    fn stop_keeps_other_entries() {
        let period_id = PeriodId::random();
        let state = start(None, period_id, entry(ConfirmationSolution::Dagpenger, 14));
        let state = start(
            Some(state),
            period_id,
            entry(ConfirmationSolution::FriskmeldtTilArbeidsformidling, 14),
        );

        let outcome = stop(Some(state), ConfirmationSolution::Dagpenger);
        let remaining = outcome.state.unwrap();
        assert_eq!(remaining.entries().len(), 1);
        assert!(has_responsibility(
            Some(&remaining),
            ConfirmationSolution::FriskmeldtTilArbeidsformidling
        ));
        assert!(!has_responsibility(
            Some(&remaining),
            ConfirmationSolution::Dagpenger
        ));
    }

    #[test]
    fn stop_without_state_is_noop() {
        let outcome = stop(None, ConfirmationSolution::Dagpenger);
        assert_eq!(
            outcome,
            StopOutcome {
                state: None,
                removed: None
            }
        );
    }

    #[test]
    fn builtin_is_always_responsible() {
        assert!(has_responsibility(None, ConfirmationSolution::Registry));
        assert!(!has_responsibility(None, ConfirmationSolution::Dagpenger));
    }

    #[test]
    fn unknown_solution_name_deserializes() {
        let solution: ConfirmationSolution = serde_json::from_str("\"NOE_NYTT\"").unwrap();
        assert_eq!(solution, ConfirmationSolution::Unknown);
    }
}
