//! Inbound/outbound JSON records.
//!
//! Inbound: `{"topic": "periode" | "paa_vegne_av" | "bekreftelse", "key": <i64>, "value": {...}}`
//! Outbound: `{"key": <i64>, "value": <event>}`

use serde::Deserialize;

use crate::domain::{DelegationMessage, PeriodMessage, SubmissionMessage};
use crate::impls::OutboundRecord;

pub const PERIOD_TOPIC: &str = "periode";
pub const DELEGATION_TOPIC: &str = "paa_vegne_av";
pub const SUBMISSION_TOPIC: &str = "bekreftelse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Period(PeriodMessage),
    Delegation(DelegationMessage),
    Submission(SubmissionMessage),
}

impl InboundMessage {
    pub fn topic(&self) -> &'static str {
        match self {
            InboundMessage::Period(_) => PERIOD_TOPIC,
            InboundMessage::Delegation(_) => DELEGATION_TOPIC,
            InboundMessage::Submission(_) => SUBMISSION_TOPIC,
        }
    }
}

/// One keyed inbound record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub key: i64,
    pub message: InboundMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

#[derive(Deserialize)]
struct RawRecord {
    topic: String,
    key: i64,
    value: serde_json::Value,
}

pub fn decode_inbound(line: &str) -> Result<InboundRecord, CodecError> {
    let raw: RawRecord = serde_json::from_str(line)?;
    let message = match raw.topic.as_str() {
        PERIOD_TOPIC => InboundMessage::Period(serde_json::from_value(raw.value)?),
        DELEGATION_TOPIC => InboundMessage::Delegation(serde_json::from_value(raw.value)?),
        SUBMISSION_TOPIC => InboundMessage::Submission(serde_json::from_value(raw.value)?),
        _ => return Err(CodecError::UnknownTopic(raw.topic)),
    };
    Ok(InboundRecord {
        key: raw.key,
        message,
    })
}

pub fn encode_outbound(record: &OutboundRecord) -> Result<String, CodecError> {
    Ok(serde_json::to_string(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_topic() {
        let period = decode_inbound(
            r#"{"topic":"periode","key":-12,"value":{"id":"2f1b0c1e-7d53-4c43-9d5b-4a3c6c1e8f00",
                "identitetsnummer":"12345678901","arbeidsoekerId":3,"startet":"2025-03-03T08:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(period.key, -12);
        assert_eq!(period.message.topic(), PERIOD_TOPIC);

        let delegation = decode_inbound(
            r#"{"topic":"paa_vegne_av","key":1,"value":{"periodeId":"2f1b0c1e-7d53-4c43-9d5b-4a3c6c1e8f00",
                "bekreftelsesloesning":"DAGPENGER","handling":{"type":"Stopp"}}}"#,
        )
        .unwrap();
        assert!(matches!(delegation.message, InboundMessage::Delegation(_)));
    }

    #[test]
    fn rejects_unknown_topic() {
        let err = decode_inbound(r#"{"topic":"noe_annet","key":1,"value":{}}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownTopic(t) if t == "noe_annet"));
    }

    #[test]
    fn rejects_bad_payload() {
        let err = decode_inbound(r#"{"topic":"periode","key":1,"value":{"id":"x"}}"#).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
