//! Configuration for the confirmation service
//!
//! All sections are optional in the TOML file; missing values fall back to
//! `Default`. `AppConfig::validate` is run by the loader and again by
//! `AppBuilder::build`, so an invalid file never reaches the runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::StatusKind;
use crate::domain::duration_ms;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Confirmation cycle rules
    pub bekreftelse: ConfirmationConfig,

    /// Partitioning and punctuation
    pub topology: TopologyConfig,

    /// Source of the odd/even week stagger map
    pub stagger: StaggerSourceConfig,
}

/// Rules for one confirmation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Length of one cycle (`gjelderFra` to `gjelderTil`).
    #[serde(with = "duration_ms", rename = "interval_ms")]
    pub interval: TimeDelta,

    /// How long before `gjelderFra` a cycle becomes available.
    #[serde(with = "duration_ms", rename = "tilgjengelig_offset_ms")]
    pub available_offset: TimeDelta,

    /// Extra time after the deadline before the cycle lapses.
    #[serde(with = "duration_ms", rename = "graceperiode_ms")]
    pub grace_period: TimeDelta,

    /// How long before the end of the grace period the warning goes out.
    #[serde(with = "duration_ms", rename = "varsel_foer_graceperiode_utloept_ms")]
    pub grace_warning_lead: TimeDelta,

    /// Roll-forward stops while this many cycles are waiting for an answer.
    #[serde(rename = "maks_antall_ventende_bekreftelser")]
    pub max_pending_confirmations: usize,

    /// Periods started before this date get a staggered first cycle.
    #[serde(rename = "tidligste_bekreftelse_periode_start")]
    pub earliest_cycle_start_date: NaiveDate,

    /// Week number the anchor date belongs to. Only its parity is used.
    #[serde(rename = "tidligste_start_uke")]
    pub earliest_start_week: u32,

    /// UTC offset (hours) of the zone the anchor date is interpreted in.
    ///
    /// A fixed offset, not a named zone: there is no daylight saving. For
    /// Norwegian time use 1 for a winter anchor date and 2 for a summer one.
    #[serde(rename = "tidssone_offset_timer")]
    pub zone_offset_hours: i32,

    /// Retention caps per status.
    #[serde(rename = "maks_antall_etter_status")]
    pub retention: RetentionPolicy,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            interval: TimeDelta::days(14),
            available_offset: TimeDelta::days(3),
            grace_period: TimeDelta::days(7),
            grace_warning_lead: TimeDelta::days(3),
            max_pending_confirmations: 3,
            earliest_cycle_start_date: NaiveDate::from_ymd_opt(2025, 1, 6)
                .unwrap_or(NaiveDate::MIN),
            earliest_start_week: 2,
            zone_offset_hours: 1,
            retention: RetentionPolicy::default(),
        }
    }
}

impl ConfirmationConfig {
    /// Start of `earliest_cycle_start_date` in the configured zone, as UTC.
    pub fn earliest_cycle_anchor(&self) -> DateTime<Utc> {
        let local_midnight = self.earliest_cycle_start_date.and_time(NaiveTime::MIN);
        (local_midnight - TimeDelta::hours(i64::from(self.zone_offset_hours))).and_utc()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval <= TimeDelta::zero() {
            return Err(ConfigError::invalid("interval_ms must be positive"));
        }
        if self.available_offset < TimeDelta::zero() {
            return Err(ConfigError::invalid("tilgjengelig_offset_ms must not be negative"));
        }
        if self.grace_period < TimeDelta::zero() {
            return Err(ConfigError::invalid("graceperiode_ms must not be negative"));
        }
        if self.grace_warning_lead < TimeDelta::zero() || self.grace_warning_lead > self.grace_period
        {
            return Err(ConfigError::invalid(
                "varsel_foer_graceperiode_utloept_ms must be between 0 and graceperiode_ms",
            ));
        }
        if self.max_pending_confirmations == 0 {
            return Err(ConfigError::invalid(
                "maks_antall_ventende_bekreftelser must be at least 1",
            ));
        }
        if !(1..=53).contains(&self.earliest_start_week) {
            return Err(ConfigError::invalid("tidligste_start_uke must be in 1..=53"));
        }
        if !(-12..=14).contains(&self.zone_offset_hours) {
            return Err(ConfigError::invalid("tidssone_offset_timer must be in -12..=14"));
        }
        Ok(())
    }
}

/// Max number of confirmations kept per status (by newest `gjelderTil`).
/// Statuses without an entry are kept without limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetentionPolicy {
    caps: BTreeMap<StatusKind, usize>,
}

impl RetentionPolicy {
    pub fn new(caps: impl IntoIterator<Item = (StatusKind, usize)>) -> Self {
        Self {
            caps: caps.into_iter().collect(),
        }
    }

    pub fn cap(&self, kind: StatusKind) -> Option<usize> {
        self.caps.get(&kind).copied()
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new([
            (StatusKind::Submitted, 1),
            (StatusKind::DelegationStarted, 4),
            (StatusKind::GraceExpired, 10),
        ])
    }
}

/// Partitioning and punctuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Number of partitions (one worker task each)
    pub partitions: usize,

    /// Sweep interval in milliseconds
    pub punctuation_interval_ms: u64,

    /// Bounded queue size per partition
    pub queue_capacity: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            punctuation_interval_ms: 60_000,
            queue_capacity: 1024,
        }
    }
}

impl TopologyConfig {
    pub fn punctuation_interval(&self) -> Duration {
        Duration::from_millis(self.punctuation_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::invalid("topology.partitions must be at least 1"));
        }
        if self.punctuation_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "topology.punctuation_interval_ms must be positive",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("topology.queue_capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Where and how to read the stagger CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaggerSourceConfig {
    /// No path means an empty map (everyone is `Unknown`).
    pub path: Option<PathBuf>,
    pub header: bool,
    pub delimiter: String,
    #[serde(rename = "identitetsnummer_kolonne")]
    pub identity_column: usize,
    #[serde(rename = "ukenummer_kolonne")]
    pub week_column: usize,
    #[serde(rename = "partall")]
    pub even_value: String,
    #[serde(rename = "oddetall")]
    pub odd_value: String,
}

impl Default for StaggerSourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            header: false,
            delimiter: ",".to_string(),
            identity_column: 0,
            week_column: 1,
            even_value: "P".to_string(),
            odd_value: "O".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bekreftelse.validate()?;
        self.topology.validate()?;
        if self.stagger.delimiter.is_empty() {
            return Err(ConfigError::invalid("stagger.delimiter must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: &str) -> Self {
        ConfigError::Invalid(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.bekreftelse, ConfirmationConfig::default());
        assert_eq!(config.topology.partitions, 4);
        assert!(config.stagger.path.is_none());
    }

    #[test]
    fn parses_norwegian_keys() {
        let raw = r#"
            [bekreftelse]
            interval_ms = 604800000
            tilgjengelig_offset_ms = 0
            graceperiode_ms = 86400000
            varsel_foer_graceperiode_utloept_ms = 3600000
            maks_antall_ventende_bekreftelser = 2
            tidligste_bekreftelse_periode_start = "2025-02-03"
            tidligste_start_uke = 6
            tidssone_offset_timer = 0

            [bekreftelse.maks_antall_etter_status]
            submitted = 2
            grace_expired = 5

            [topology]
            partitions = 2
            punctuation_interval_ms = 1000
        "#;
        let config = AppConfig::from_toml_str(raw).unwrap();
        let b = &config.bekreftelse;

        assert_eq!(b.interval, TimeDelta::days(7));
        assert_eq!(b.available_offset, TimeDelta::zero());
        assert_eq!(b.grace_warning_lead, TimeDelta::hours(1));
        assert_eq!(b.max_pending_confirmations, 2);
        assert_eq!(b.earliest_start_week, 6);
        assert_eq!(b.retention.cap(StatusKind::Submitted), Some(2));
        assert_eq!(b.retention.cap(StatusKind::DelegationStarted), None);
        assert_eq!(config.topology.partitions, 2);
        assert_eq!(config.topology.queue_capacity, 1024);
    }

    #[rstest]
    #[case::winter(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), 1, Utc.with_ymd_and_hms(2025, 1, 5, 23, 0, 0).unwrap())]
    #[case::summer(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), 2, Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap())]
    #[case::utc(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), 0, Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap())]
    fn anchor_is_local_midnight(
        #[case] date: NaiveDate,
        #[case] offset: i32,
        #[case] expected: DateTime<Utc>,
    ) {
        let config = ConfirmationConfig {
            earliest_cycle_start_date: date,
            zone_offset_hours: offset,
            ..ConfirmationConfig::default()
        };
        assert_eq!(config.earliest_cycle_anchor(), expected);
    }

    #[test]
    fn rejects_warning_longer_than_grace() {
        let config = ConfirmationConfig {
            grace_period: TimeDelta::days(1),
            grace_warning_lead: TimeDelta::days(2),
            ..ConfirmationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_partitions() {
        let err = AppConfig::from_toml_str("[topology]\npartitions = 0\n").unwrap_err();
        assert!(err.to_string().contains("partitions"));
    }
}
