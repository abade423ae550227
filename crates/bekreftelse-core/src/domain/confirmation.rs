//! Confirmation - 1 サイクル分の確認と、その状態遷移
//!
//! # 状態遷移（`advance`）
//! 壁時計 `now` だけを入力にする純粋関数です。1 回の呼び出しで遷移は最大 1 つ。
//!
//! ```text
//! NotYetOpen ──(gjelderFra - offset)──▶ Open ──(gjelderTil)──▶ AwaitingAnswer
//!     AwaitingAnswer ──(gjelderTil + grace - lead)──▶ GraceWarningIssued
//!     AwaitingAnswer | GraceWarningIssued ──(gjelderTil + grace)──▶ GraceExpired
//! ```
//!
//! Submitted と DelegationStarted はここでは作られず、進められることもありません。

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfirmationConfig;

use super::errors::CoreError;
use super::events::{ConfirmationEvent, EventKind};
use super::ids::{ConfirmationId, EventId, PeriodId};
use super::period::PeriodInfo;
use super::status::{ConfirmationStatus, StatusKind, StatusLog, StatusRegression};

/// One confirmation cycle. `[valid_from, valid_to)` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub id: ConfirmationId,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    status_log: StatusLog,
}

impl Confirmation {
    pub fn new(
        id: ConfirmationId,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
        initial: ConfirmationStatus,
    ) -> Self {
        Self {
            id,
            valid_from,
            valid_to,
            status_log: StatusLog::new(initial),
        }
    }

    /// New cycle created by the policy. The id is derived from the period and
    /// `valid_from`, so recreating the same cycle yields the same id.
    pub fn scheduled(
        period_id: PeriodId,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = ConfirmationId::derived(
            period_id.as_uuid(),
            &valid_from.timestamp_millis().to_be_bytes(),
        );
        Self::new(id, valid_from, valid_to, ConfirmationStatus::NotYetOpen(now))
    }

    pub fn status(&self) -> &ConfirmationStatus {
        self.status_log.latest()
    }

    pub fn kind(&self) -> StatusKind {
        self.status_log.kind()
    }

    pub fn status_log(&self) -> &StatusLog {
        &self.status_log
    }

    pub fn warning_issued(&self) -> bool {
        self.status_log
            .iter()
            .any(|s| s.kind() == StatusKind::GraceWarningIssued)
    }

    pub fn with_status(mut self, next: ConfirmationStatus) -> Result<Self, StatusRegression> {
        self.status_log = self.status_log.append(next)?;
        Ok(self)
    }
}

/// Transition taken by `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Available,
    DeadlineExpired { deadline: DateTime<Utc> },
    GraceTimeRemaining { remaining: TimeDelta },
    GraceExpired,
}

impl Transition {
    fn tag(&self) -> &'static [u8] {
        match self {
            Transition::Available => b"tilgjengelig",
            Transition::DeadlineExpired { .. } => b"leveringsfrist_utloept",
            Transition::GraceTimeRemaining { .. } => b"gjenstaaende_graceperiode",
            Transition::GraceExpired => b"graceperiode_utloept",
        }
    }

    /// Outbound event for this transition of `confirmation`.
    ///
    /// Each transition happens at most once per confirmation, so the id is
    /// derived from the confirmation id and the transition alone.
    pub fn to_event(
        &self,
        period: &PeriodInfo,
        confirmation: &Confirmation,
        now: DateTime<Utc>,
    ) -> ConfirmationEvent {
        let event_id = EventId::derived(confirmation.id.as_uuid(), self.tag());
        let confirmation_id = confirmation.id;
        let kind = match *self {
            Transition::Available => EventKind::ConfirmationAvailable {
                confirmation_id,
                valid_from: confirmation.valid_from,
                valid_to: confirmation.valid_to,
            },
            Transition::DeadlineExpired { deadline } => EventKind::DeadlineExpired {
                confirmation_id,
                deadline,
            },
            Transition::GraceTimeRemaining { remaining } => EventKind::GraceTimeRemaining {
                confirmation_id,
                remaining,
            },
            Transition::GraceExpired => EventKind::GraceExpired { confirmation_id },
        };
        ConfirmationEvent::new(period, event_id, now, kind)
    }
}

/// Advance one confirmation against `now`. First matching rule wins.
pub fn advance(
    confirmation: Confirmation,
    now: DateTime<Utc>,
    config: &ConfirmationConfig,
) -> Result<(Confirmation, Option<Transition>), CoreError> {
    // Thresholds past the representable range are never reached.
    let opens_at = confirmation
        .valid_from
        .checked_sub_signed(config.available_offset)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let grace_end = confirmation
        .valid_to
        .checked_add_signed(config.grace_period)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let warn_from = confirmation
        .valid_to
        .checked_add_signed(config.grace_period - config.grace_warning_lead)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let (next, transition) = match confirmation.kind() {
        StatusKind::NotYetOpen if now >= opens_at => {
            (ConfirmationStatus::Open(now), Transition::Available)
        }
        StatusKind::Open if now >= confirmation.valid_to => (
            ConfirmationStatus::AwaitingAnswer(now),
            Transition::DeadlineExpired {
                deadline: confirmation.valid_to,
            },
        ),
        StatusKind::AwaitingAnswer
            if now >= warn_from && now < grace_end && !confirmation.warning_issued() =>
        {
            (
                ConfirmationStatus::GraceWarningIssued(now),
                Transition::GraceTimeRemaining {
                    remaining: grace_end - now,
                },
            )
        }
        StatusKind::AwaitingAnswer | StatusKind::GraceWarningIssued if now >= grace_end => {
            (ConfirmationStatus::GraceExpired(now), Transition::GraceExpired)
        }
        _ => return Ok((confirmation, None)),
    };

    let confirmation = confirmation.with_status(next)?;
    Ok((confirmation, Some(transition)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
    }

    fn config() -> ConfirmationConfig {
        ConfirmationConfig {
            interval: TimeDelta::days(14),
            available_offset: TimeDelta::days(3),
            grace_period: TimeDelta::days(7),
            grace_warning_lead: TimeDelta::days(3),
            ..ConfirmationConfig::default()
        }
    }

    fn fresh() -> Confirmation {
        Confirmation::scheduled(PeriodId::random(), t0(), t0() + TimeDelta::days(14), t0())
    }

    fn step(c: Confirmation, now: DateTime<Utc>) -> (Confirmation, Option<Transition>) {
        advance(c, now, &config()).unwrap()
    }

    #[test]
    fn not_yet_open_before_offset() {
        let (c, t) = step(fresh(), t0() - TimeDelta::days(4));
        assert_eq!(c.kind(), StatusKind::NotYetOpen);
        assert!(t.is_none());
    }

    #[test]
    fn opens_at_offset() {
        let (c, t) = step(fresh(), t0() - TimeDelta::days(3));
        assert_eq!(c.kind(), StatusKind::Open);
        assert_eq!(t, Some(Transition::Available));
    }

    #[test]
    fn at_most_one_transition_per_call() {
        // Far past every threshold: still only NotYetOpen -> Open.
        let (c, t) = step(fresh(), t0() + TimeDelta::days(60));
        assert_eq!(c.kind(), StatusKind::Open);
        assert_eq!(t, Some(Transition::Available));
    }

    #[test]
    fn full_walk_without_answer() {
        let to = t0() + TimeDelta::days(14);
        let (c, _) = step(fresh(), t0());

        let (c, t) = step(c, to);
        assert_eq!(c.kind(), StatusKind::AwaitingAnswer);
        assert_eq!(t, Some(Transition::DeadlineExpired { deadline: to }));

        let (c, t) = step(c, to + TimeDelta::days(4));
        assert_eq!(c.kind(), StatusKind::GraceWarningIssued);
        assert_eq!(
            t,
            Some(Transition::GraceTimeRemaining {
                remaining: TimeDelta::days(3)
            })
        );

        let (c, t) = step(c.clone(), to + TimeDelta::days(5));
        assert_eq!(c.kind(), StatusKind::GraceWarningIssued);
        assert!(t.is_none());

        let (c, t) = step(c, to + TimeDelta::days(7));
        assert_eq!(c.kind(), StatusKind::GraceExpired);
        assert_eq!(t, Some(Transition::GraceExpired));
        assert_eq!(c.status_log().len(), 5);
    }

    #[test]
    fn late_observation_skips_warning() {
        let to = t0() + TimeDelta::days(14);
        let (c, _) = step(fresh(), t0());
        let (c, _) = step(c, to);

        let (c, t) = step(c, to + TimeDelta::days(9));
        assert_eq!(c.kind(), StatusKind::GraceExpired);
        assert_eq!(t, Some(Transition::GraceExpired));
        assert!(!c.warning_issued());
    }

    #[rstest]
    #[case::submitted(ConfirmationStatus::Submitted(t0()))]
    #[case::delegated(ConfirmationStatus::DelegationStarted(t0()))]
    #[case::expired(ConfirmationStatus::GraceExpired(t0()))]
    fn frozen_statuses_never_advance(#[case] status: ConfirmationStatus) {
        let c = Confirmation::new(
            ConfirmationId::random(),
            t0(),
            t0() + TimeDelta::days(14),
            status,
        );
        let (after, t) = step(c.clone(), t0() + TimeDelta::days(365));
        assert_eq!(after, c);
        assert!(t.is_none());
    }

    #[test]
    fn deadline_at_the_end_of_time_does_not_overflow() {
        let to = DateTime::<Utc>::MAX_UTC - TimeDelta::days(1);
        let c = Confirmation::new(
            ConfirmationId::random(),
            to - TimeDelta::days(14),
            to,
            ConfirmationStatus::AwaitingAnswer(t0()),
        );
        let (after, t) = step(c.clone(), t0());
        assert_eq!(after, c);
        assert!(t.is_none());
    }

    #[test]
    fn event_ids_are_stable_per_transition() {
        let period = PeriodInfo {
            period_id: PeriodId::random(),
            identity_number: "1".into(),
            arbeidssoeker_id: 1,
            record_key: 1,
            started: t0(),
            closed: None,
        };
        let c = Confirmation::scheduled(period.period_id, t0(), t0() + TimeDelta::days(14), t0());
        let a = Transition::Available.to_event(&period, &c, t0());
        let b = Transition::Available.to_event(&period, &c, t0());
        let other = Transition::GraceExpired.to_event(&period, &c, t0());
        assert_eq!(a.event_id, b.event_id);
        assert_ne!(a.event_id, other.event_id);
    }
}
