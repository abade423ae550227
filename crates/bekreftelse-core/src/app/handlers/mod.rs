//! Ingestion handlers
//!
//! 1 メッセージを現在の状態に畳み込み、`Handling` の列を返す関数です。
//! 状態は読むだけで、書き込みは partition が行います。
//!
//! - 未知の periodeId・責任のない loesning・不正な入力・不変条件違反は `Err(CoreError)`
//!   （partition が `ErrorKind` に応じたレベルでログを出して続行）
//! - replay など「何もすることがない」場合は空の列

pub mod delegation;
pub mod period;
pub mod submission;

pub use self::delegation::handle_delegation;
pub use self::period::handle_period;
pub use self::submission::handle_submission;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use crate::app::state::PartitionState;
    use crate::config::ConfirmationConfig;
    use crate::domain::{ConfirmationSet, PeriodId, PeriodInfo, StaggerMap, reconcile};
    use crate::domain::ReconcileContext;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    pub fn config() -> ConfirmationConfig {
        ConfirmationConfig {
            interval: TimeDelta::days(14),
            available_offset: TimeDelta::zero(),
            grace_period: TimeDelta::days(7),
            grace_warning_lead: TimeDelta::days(3),
            ..ConfirmationConfig::default()
        }
    }

    pub fn period(period_id: PeriodId) -> PeriodInfo {
        PeriodInfo {
            period_id,
            identity_number: "12345678901".into(),
            arbeidssoeker_id: 77,
            record_key: -3,
            started: t0(),
            closed: None,
        }
    }

    /// State with one period whose first cycle `[t0, t0 + 14d)` is open.
    pub fn state_with_open_cycle(period_id: PeriodId) -> PartitionState {
        let config = config();
        let stagger = StaggerMap::empty();
        let ctx = ReconcileContext {
            config: &config,
            stagger: &stagger,
            now: t0(),
        };
        let set = reconcile(ConfirmationSet::new(period(period_id)), &ctx)
            .unwrap()
            .set;
        let mut state = PartitionState::in_memory();
        state.confirmations.put(period_id, set);
        state
    }
}
