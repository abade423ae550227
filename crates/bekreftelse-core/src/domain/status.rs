//! Confirmation status and the append-only status log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one confirmation cycle.
///
/// State transitions:
/// - NotYetOpen -> Open -> AwaitingAnswer -> GraceWarningIssued -> GraceExpired
/// - any non-terminal status -> Submitted (ingestion only)
/// - any non-terminal status -> DelegationStarted (delegation start only)
///
/// Every variant carries the wall-clock time it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "tidspunkt", rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Created, but not yet available to the person.
    NotYetOpen(DateTime<Utc>),

    /// Available for answering.
    Open(DateTime<Utc>),

    /// Deadline (`valid_to`) has passed without an answer.
    AwaitingAnswer(DateTime<Utc>),

    /// The "grace period is about to run out" warning has been issued.
    GraceWarningIssued(DateTime<Utc>),

    /// Grace period ran out without an answer.
    GraceExpired(DateTime<Utc>),

    /// An answer was received.
    Submitted(DateTime<Utc>),

    /// An external solution took over collection while this cycle was in flight.
    DelegationStarted(DateTime<Utc>),
}

/// Payload-free view of `ConfirmationStatus`, used as a key for counting and
/// retention caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    NotYetOpen,
    Open,
    AwaitingAnswer,
    GraceWarningIssued,
    GraceExpired,
    Submitted,
    DelegationStarted,
}

impl ConfirmationStatus {
    pub fn at(&self) -> DateTime<Utc> {
        match *self {
            ConfirmationStatus::NotYetOpen(at)
            | ConfirmationStatus::Open(at)
            | ConfirmationStatus::AwaitingAnswer(at)
            | ConfirmationStatus::GraceWarningIssued(at)
            | ConfirmationStatus::GraceExpired(at)
            | ConfirmationStatus::Submitted(at)
            | ConfirmationStatus::DelegationStarted(at) => at,
        }
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            ConfirmationStatus::NotYetOpen(_) => StatusKind::NotYetOpen,
            ConfirmationStatus::Open(_) => StatusKind::Open,
            ConfirmationStatus::AwaitingAnswer(_) => StatusKind::AwaitingAnswer,
            ConfirmationStatus::GraceWarningIssued(_) => StatusKind::GraceWarningIssued,
            ConfirmationStatus::GraceExpired(_) => StatusKind::GraceExpired,
            ConfirmationStatus::Submitted(_) => StatusKind::Submitted,
            ConfirmationStatus::DelegationStarted(_) => StatusKind::DelegationStarted,
        }
    }
}

impl StatusKind {
    /// Position in the status order. A log never moves to a lower rank.
    ///
    /// GraceExpired and Submitted are the two terminal branches and share a rank.
    pub fn rank(self) -> u8 {
        match self {
            StatusKind::NotYetOpen => 0,
            StatusKind::Open => 1,
            StatusKind::AwaitingAnswer => 2,
            StatusKind::GraceWarningIssued => 3,
            StatusKind::DelegationStarted => 4,
            StatusKind::GraceExpired | StatusKind::Submitted => 5,
        }
    }

    /// Still part of the built-in collection flow (eligible for the delegation marker).
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            StatusKind::NotYetOpen
                | StatusKind::Open
                | StatusKind::AwaitingAnswer
                | StatusKind::GraceWarningIssued
        )
    }

    /// Deadline passed, answer still missing. Counted against the roll-forward cap.
    pub fn is_pending_answer(self) -> bool {
        matches!(
            self,
            StatusKind::AwaitingAnswer | StatusKind::GraceWarningIssued
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StatusKind::GraceExpired | StatusKind::Submitted)
    }
}

/// Rejected append: the next status ranks below the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status regression: {from:?} -> {to:?}")]
pub struct StatusRegression {
    pub from: StatusKind,
    pub to: StatusKind,
}

/// Append-only log of statuses. The last entry is the current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLog {
    latest: ConfirmationStatus,
    previous: Vec<ConfirmationStatus>,
}

impl StatusLog {
    pub fn new(initial: ConfirmationStatus) -> Self {
        Self {
            latest: initial,
            previous: Vec::new(),
        }
    }

    pub fn latest(&self) -> &ConfirmationStatus {
        &self.latest
    }

    pub fn kind(&self) -> StatusKind {
        self.latest.kind()
    }

    /// Append `next`, keeping the old latest in history.
    pub fn append(mut self, next: ConfirmationStatus) -> Result<Self, StatusRegression> {
        let from = self.latest.kind();
        let to = next.kind();
        if to.rank() < from.rank() {
            return Err(StatusRegression { from, to });
        }
        let old = std::mem::replace(&mut self.latest, next);
        self.previous.push(old);
        Ok(self)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConfirmationStatus> {
        self.previous.iter().chain(std::iter::once(&self.latest))
    }

    pub fn len(&self) -> usize {
        self.previous.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    #[test]
    fn append_keeps_history_in_order() {
        let log = StatusLog::new(ConfirmationStatus::NotYetOpen(t0()))
            .append(ConfirmationStatus::Open(t0()))
            .unwrap()
            .append(ConfirmationStatus::AwaitingAnswer(t0()))
            .unwrap();

        let kinds: Vec<StatusKind> = log.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StatusKind::NotYetOpen,
                StatusKind::Open,
                StatusKind::AwaitingAnswer
            ]
        );
        assert_eq!(log.kind(), StatusKind::AwaitingAnswer);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn submitted_never_reverts() {
        let log = StatusLog::new(ConfirmationStatus::Open(t0()))
            .append(ConfirmationStatus::Submitted(t0()))
            .unwrap();

        let err = log
            .append(ConfirmationStatus::AwaitingAnswer(t0()))
            .unwrap_err();
        assert_eq!(err.from, StatusKind::Submitted);
        assert_eq!(err.to, StatusKind::AwaitingAnswer);
    }

    #[test]
    fn marker_can_be_followed_by_submission() {
        let log = StatusLog::new(ConfirmationStatus::Open(t0()))
            .append(ConfirmationStatus::DelegationStarted(t0()))
            .unwrap()
            .append(ConfirmationStatus::Submitted(t0()))
            .unwrap();
        assert_eq!(log.kind(), StatusKind::Submitted);
    }

    #[rstest]
    #[case::not_yet_open(StatusKind::NotYetOpen, true)]
    #[case::open(StatusKind::Open, true)]
    #[case::awaiting(StatusKind::AwaitingAnswer, true)]
    #[case::warned(StatusKind::GraceWarningIssued, true)]
    #[case::expired(StatusKind::GraceExpired, false)]
    #[case::submitted(StatusKind::Submitted, false)]
    #[case::delegated(StatusKind::DelegationStarted, false)]
    fn in_flight_statuses(#[case] kind: StatusKind, #[case] expected: bool) {
        assert_eq!(kind.is_in_flight(), expected);
    }

    #[test]
    fn serializes_with_tag_and_timestamp() {
        let json = serde_json::to_value(ConfirmationStatus::Open(t0())).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["tidspunkt"], "2025-03-03T08:00:00Z");
    }
}
