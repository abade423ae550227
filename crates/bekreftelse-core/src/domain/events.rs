//! Outbound events
//!
//! Every event carries `hendelseId`, `periodeId`, `arbeidssoekerId` and
//! `hendelseTidspunkt`; the payload is selected by the `hendelseType` tag.
//!
//! Design:
//! - ids are derived (UUIDv5) from stable inputs so replays dedupe downstream
//! - the routing key is not part of the payload; it travels next to the event

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::delegation::ConfirmationSolution;
use super::duration_ms;
use super::ids::{ConfirmationId, EventId, PeriodId};
use super::messages::Actor;
use super::period::PeriodInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    #[serde(rename = "hendelseId")]
    pub event_id: EventId,

    #[serde(rename = "periodeId")]
    pub period_id: PeriodId,

    #[serde(rename = "arbeidssoekerId")]
    pub arbeidssoeker_id: i64,

    #[serde(rename = "hendelseTidspunkt")]
    pub at: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hendelseType")]
pub enum EventKind {
    #[serde(rename = "bekreftelse.tilgjengelig")]
    ConfirmationAvailable {
        #[serde(rename = "bekreftelseId")]
        confirmation_id: ConfirmationId,
        #[serde(rename = "gjelderFra")]
        valid_from: DateTime<Utc>,
        #[serde(rename = "gjelderTil")]
        valid_to: DateTime<Utc>,
    },

    #[serde(rename = "bekreftelse.leveringsfrist_utloept")]
    DeadlineExpired {
        #[serde(rename = "bekreftelseId")]
        confirmation_id: ConfirmationId,
        #[serde(rename = "leveringsfrist")]
        deadline: DateTime<Utc>,
    },

    #[serde(rename = "bekreftelse.gjenstaaende_graceperiode")]
    GraceTimeRemaining {
        #[serde(rename = "bekreftelseId")]
        confirmation_id: ConfirmationId,
        #[serde(rename = "gjenstaandeTidMs", with = "duration_ms")]
        remaining: TimeDelta,
    },

    #[serde(rename = "bekreftelse.graceperiode_utloept")]
    GraceExpired {
        #[serde(rename = "bekreftelseId")]
        confirmation_id: ConfirmationId,
    },

    #[serde(rename = "bekreftelse.graceperiode_utloept_etter_ekstern_innsamling")]
    GraceExpiredWhileDelegated {
        #[serde(rename = "bekreftelsesloesning")]
        solution: ConfirmationSolution,
    },

    #[serde(rename = "bekreftelse.paa_vegne_av_startet")]
    DelegationStarted {
        #[serde(rename = "bekreftelsesloesning")]
        solution: ConfirmationSolution,
    },

    #[serde(rename = "bekreftelse.baer_om_aa_avslutte_periode")]
    RequestPeriodClosure {
        #[serde(rename = "utfoertAv")]
        actor: Actor,
    },

    #[serde(rename = "bekreftelse.periode_avsluttet")]
    PeriodClosed,
}

impl EventKind {
    /// Wire tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ConfirmationAvailable { .. } => "bekreftelse.tilgjengelig",
            EventKind::DeadlineExpired { .. } => "bekreftelse.leveringsfrist_utloept",
            EventKind::GraceTimeRemaining { .. } => "bekreftelse.gjenstaaende_graceperiode",
            EventKind::GraceExpired { .. } => "bekreftelse.graceperiode_utloept",
            EventKind::GraceExpiredWhileDelegated { .. } => {
                "bekreftelse.graceperiode_utloept_etter_ekstern_innsamling"
            }
            EventKind::DelegationStarted { .. } => "bekreftelse.paa_vegne_av_startet",
            EventKind::RequestPeriodClosure { .. } => "bekreftelse.baer_om_aa_avslutte_periode",
            EventKind::PeriodClosed => "bekreftelse.periode_avsluttet",
        }
    }
}

impl ConfirmationEvent {
    pub fn new(period: &PeriodInfo, event_id: EventId, at: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            event_id,
            period_id: period.period_id,
            arbeidssoeker_id: period.arbeidssoeker_id,
            at,
            kind,
        }
    }
}

/// Event id scoped to a period and a point in time. Used for events that are
/// not tied to one confirmation.
pub fn period_event_id(period_id: PeriodId, tag: &str, at: DateTime<Utc>) -> EventId {
    let mut name = tag.as_bytes().to_vec();
    name.extend_from_slice(&at.timestamp_millis().to_be_bytes());
    EventId::derived(period_id.as_uuid(), &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn period() -> PeriodInfo {
        PeriodInfo {
            period_id: PeriodId::random(),
            identity_number: "12345678901".into(),
            arbeidssoeker_id: 42,
            record_key: -7,
            started: Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap(),
            closed: None,
        }
    }

    #[test]
    fn flattens_common_fields_and_tag() {
        let p = period();
        let at = p.started;
        let event = ConfirmationEvent::new(
            &p,
            EventId::random(),
            at,
            EventKind::GraceTimeRemaining {
                confirmation_id: ConfirmationId::random(),
                remaining: TimeDelta::hours(2),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["hendelseType"], "bekreftelse.gjenstaaende_graceperiode");
        assert_eq!(json["arbeidssoekerId"], 42);
        assert_eq!(json["gjenstaandeTidMs"], 7_200_000);
        assert_eq!(json["periodeId"], p.period_id.as_uuid().to_string());

        let back: ConfirmationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn period_closed_has_only_common_fields() {
        let p = period();
        let event = ConfirmationEvent::new(&p, EventId::random(), p.started, EventKind::PeriodClosed);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["hendelseType"], EventKind::PeriodClosed.name());
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn period_event_ids_depend_on_time() {
        let p = period();
        let a = period_event_id(p.period_id, "x", p.started);
        let b = period_event_id(p.period_id, "x", p.started);
        let c = period_event_id(p.period_id, "x", p.started + TimeDelta::milliseconds(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
