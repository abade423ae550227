//! Period snapshot held next to the confirmations of that period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::PeriodId;

/// What the confirmation service knows about one job-seeker period.
///
/// The period itself is owned upstream; this is the snapshot taken when the
/// period message was first observed, plus the log key it arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub period_id: PeriodId,
    pub identity_number: String,
    pub arbeidssoeker_id: i64,

    /// Key of the inbound record. Every outbound event for this period is
    /// produced with this key so it lands on the same partition downstream.
    pub record_key: i64,

    pub started: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
}

impl PeriodInfo {
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }
}
