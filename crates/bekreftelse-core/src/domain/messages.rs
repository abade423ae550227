//! Inbound message shapes (one type per topic).
//!
//! Rust field names are English; the wire names are the ones upstream
//! producers use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::delegation::ConfirmationSolution;
use super::ids::{ConfirmationId, PeriodId};

/// Period opened (no `avsluttet`) or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodMessage {
    #[serde(rename = "id", alias = "periodeId")]
    pub period_id: PeriodId,

    #[serde(rename = "identitetsnummer")]
    pub identity_number: String,

    #[serde(rename = "arbeidsoekerId", alias = "arbeidssoekerId")]
    pub arbeidssoeker_id: i64,

    #[serde(rename = "startet")]
    pub started: DateTime<Utc>,

    #[serde(rename = "avsluttet", default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationMessage {
    #[serde(rename = "periodeId")]
    pub period_id: PeriodId,

    #[serde(rename = "bekreftelsesloesning")]
    pub solution: ConfirmationSolution,

    #[serde(rename = "handling")]
    pub action: DelegationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DelegationAction {
    Start {
        #[serde(rename = "intervalMS")]
        interval_ms: i64,
        #[serde(rename = "graceMS")]
        grace_ms: i64,
    },
    #[serde(rename = "Stopp")]
    Stop,
}

/// A confirmation answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMessage {
    #[serde(rename = "id")]
    pub confirmation_id: ConfirmationId,

    #[serde(rename = "periodeId")]
    pub period_id: PeriodId,

    #[serde(rename = "bekreftelsesloesning")]
    pub solution: ConfirmationSolution,

    #[serde(rename = "svar")]
    pub answer: Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "gjelderFra")]
    pub valid_from: DateTime<Utc>,

    #[serde(rename = "gjelderTil")]
    pub valid_to: DateTime<Utc>,

    #[serde(rename = "vilFortsetteSomArbeidssoeker")]
    pub wants_to_continue: bool,

    #[serde(rename = "sendtInnAv")]
    pub submitted_by: Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitted {
    #[serde(rename = "tidspunkt")]
    pub at: DateTime<Utc>,

    #[serde(rename = "utfoertAv")]
    pub actor: Actor,
}

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub kind: ActorKind,

    pub id: String,

    #[serde(
        rename = "sikkerhetsnivaa",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub security_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorKind {
    Sluttbruker,
    Veileder,
    System,
    #[serde(other)]
    Udefinert,
}
