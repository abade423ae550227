//! PartitionState - 1 パーティションが所有する 2 つのストア
//!
//! 同じ periodeId をキーに、confirmation set と delegation state を別々に持ちます。
//!
//! 永続化の形は compacted changelog（キーごとに `Put` 1 件）です。
//! `changelog()` で書き出し、`restore()` で再構築します。

use serde::{Deserialize, Serialize};

use crate::domain::{ConfirmationSet, DelegationState};
use crate::impls::{ChangelogEntry, InMemoryStore};
use crate::ports::KeyValueStore;

use super::handling::Handling;
use super::status::StatusCounts;

const CONFIRMATION_STORE: &str = "bekreftelse";
const DELEGATION_STORE: &str = "paa_vegne_av";

/// Persisted form of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionChangelog {
    #[serde(rename = "bekreftelse")]
    pub confirmations: Vec<ChangelogEntry<ConfirmationSet>>,
    #[serde(rename = "paa_vegne_av")]
    pub delegations: Vec<ChangelogEntry<DelegationState>>,
}

pub struct PartitionState {
    pub confirmations: Box<dyn KeyValueStore<ConfirmationSet>>,
    pub delegations: Box<dyn KeyValueStore<DelegationState>>,
}

impl PartitionState {
    pub fn new(
        confirmations: Box<dyn KeyValueStore<ConfirmationSet>>,
        delegations: Box<dyn KeyValueStore<DelegationState>>,
    ) -> Self {
        Self {
            confirmations,
            delegations,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Box::new(InMemoryStore::new(CONFIRMATION_STORE)),
            Box::new(InMemoryStore::new(DELEGATION_STORE)),
        )
    }

    /// In-memory state rebuilt from a persisted changelog.
    pub fn restore(changelog: PartitionChangelog) -> Self {
        Self::new(
            Box::new(InMemoryStore::restore(CONFIRMATION_STORE, changelog.confirmations)),
            Box::new(InMemoryStore::restore(DELEGATION_STORE, changelog.delegations)),
        )
    }

    /// Compacted changelog: one `Put` per stored key.
    pub fn changelog(&self) -> PartitionChangelog {
        PartitionChangelog {
            confirmations: compact(self.confirmations.as_ref()),
            delegations: compact(self.delegations.as_ref()),
        }
    }

    /// Apply the store writes of `handlings`. `Emit` entries are left to the caller.
    pub fn apply_writes(&mut self, handlings: &[Handling]) {
        for handling in handlings {
            match handling {
                Handling::WriteConfirmationSet(set) => {
                    self.confirmations.put(set.period.period_id, set.clone());
                }
                Handling::DeleteConfirmationSet(period_id) => {
                    self.confirmations.delete(period_id);
                }
                Handling::WriteDelegation(state) => {
                    self.delegations.put(state.period_id, state.clone());
                }
                Handling::DeleteDelegation(period_id) => {
                    self.delegations.delete(period_id);
                }
                Handling::Emit { .. } => {}
            }
        }
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            periods: self.confirmations.len(),
            delegated_periods: self.delegations.len(),
            ..StatusCounts::default()
        };
        for key in self.confirmations.keys() {
            let Some(set) = self.confirmations.get(&key) else {
                continue;
            };
            for confirmation in set.confirmations() {
                counts.confirmations += 1;
                *counts.by_status.entry(confirmation.kind()).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn compact<V>(store: &dyn KeyValueStore<V>) -> Vec<ChangelogEntry<V>> {
    store
        .keys()
        .into_iter()
        .filter_map(|key| store.get(&key).map(|value| ChangelogEntry::Put { key, value }))
        .collect()
}

impl Default for PartitionState {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for PartitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionState")
            .field("confirmations", &self.confirmations.len())
            .field("delegations", &self.delegations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::handlers::fixtures::state_with_open_cycle;
    use crate::domain::delegation::start;
    use crate::domain::{ConfirmationSolution, DelegationEntry, PeriodId};
    use chrono::TimeDelta;

    #[test]
    fn changelog_survives_json_and_restore() {
        let period_id = PeriodId::random();
        let mut state = state_with_open_cycle(period_id);
        state.delegations.put(
            period_id,
            start(
                None,
                period_id,
                DelegationEntry {
                    solution: ConfirmationSolution::Dagpenger,
                    interval: TimeDelta::days(14),
                    grace: TimeDelta::days(7),
                },
            ),
        );

        let json = serde_json::to_string(&state.changelog()).unwrap();
        let restored = PartitionState::restore(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.counts(), state.counts());
        assert_eq!(
            restored.confirmations.get(&period_id),
            state.confirmations.get(&period_id)
        );
        assert_eq!(
            restored.delegations.get(&period_id),
            state.delegations.get(&period_id)
        );
    }

    #[test]
    fn deleted_keys_are_not_in_the_changelog() {
        let kept = PeriodId::random();
        let gone = PeriodId::random();
        let mut state = state_with_open_cycle(kept);
        let set = state.confirmations.get(&kept).unwrap();
        state.confirmations.put(gone, set);
        state.confirmations.delete(&gone);

        let changelog = state.changelog();
        assert_eq!(changelog.confirmations.len(), 1);
        assert!(matches!(
            &changelog.confirmations[0],
            ChangelogEntry::Put { key, .. } if *key == kept
        ));
        assert!(changelog.delegations.is_empty());
    }
}
