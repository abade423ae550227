//! Status - パーティション状態の集計
//!
//! ログ出力とシャットダウン時の報告に使います。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::StatusKind;

/// Counts over the stores of one or more partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub periods: usize,
    pub delegated_periods: usize,
    pub confirmations: usize,
    /// Current status of every stored confirmation.
    pub by_status: BTreeMap<StatusKind, usize>,
}

impl StatusCounts {
    pub fn merge(mut self, other: StatusCounts) -> Self {
        self.periods += other.periods;
        self.delegated_periods += other.delegated_periods;
        self.confirmations += other.confirmations;
        for (kind, count) in other.by_status {
            *self.by_status.entry(kind).or_insert(0) += count;
        }
        self
    }

    pub fn count(&self, kind: StatusKind) -> usize {
        self.by_status.get(&kind).copied().unwrap_or(0)
    }
}

/// Outcome of one sweep over one or more partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub visited: usize,
    /// Reconciled and changed (written back).
    pub reconciled: usize,
    pub skipped_delegated: usize,
    pub failed: usize,
    pub events: usize,
}

impl SweepReport {
    pub fn merge(self, other: SweepReport) -> Self {
        Self {
            visited: self.visited + other.visited,
            reconciled: self.reconciled + other.reconciled,
            skipped_delegated: self.skipped_delegated + other.skipped_delegated,
            failed: self.failed + other.failed,
            events: self.events + other.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_per_status() {
        let a = StatusCounts {
            periods: 1,
            delegated_periods: 0,
            confirmations: 2,
            by_status: BTreeMap::from([(StatusKind::Open, 1), (StatusKind::Submitted, 1)]),
        };
        let b = StatusCounts {
            periods: 2,
            delegated_periods: 1,
            confirmations: 1,
            by_status: BTreeMap::from([(StatusKind::Open, 1)]),
        };

        let merged = a.merge(b);
        assert_eq!(merged.periods, 3);
        assert_eq!(merged.delegated_periods, 1);
        assert_eq!(merged.count(StatusKind::Open), 2);
        assert_eq!(merged.count(StatusKind::Submitted), 1);
        assert_eq!(merged.count(StatusKind::GraceExpired), 0);
    }

    #[test]
    fn sweep_reports_sum() {
        let a = SweepReport {
            visited: 2,
            reconciled: 1,
            skipped_delegated: 1,
            failed: 0,
            events: 3,
        };
        assert_eq!(a.merge(a).events, 6);
        assert_eq!(a.merge(SweepReport::default()), a);
    }
}
