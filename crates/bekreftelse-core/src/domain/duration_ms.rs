//! Serde helper: `chrono::TimeDelta` as whole milliseconds.
//!
//! Used with `#[serde(with = "crate::domain::duration_ms")]` for config values
//! and outbound payloads.

use chrono::TimeDelta;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.num_milliseconds())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
    let ms = i64::deserialize(deserializer)?;
    TimeDelta::try_milliseconds(ms)
        .ok_or_else(|| D::Error::custom(format!("duration out of range: {ms}ms")))
}
