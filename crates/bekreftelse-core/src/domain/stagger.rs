//! Stagger map - 初回サイクル開始日の分散
//!
//! 移行時に全員の初回サイクルが同じ週に集中しないよう、個人ごとに
//! 偶数週 / 奇数週のどちらで始めるかを静的ファイルから読み込みます。
//!
//! # 設計
//! - 起動時に一度だけ構築し、以後は読み取り専用の値として依存注入します
//! - 不正なファイルは起動時にエラー（fail fast）
//! - マップにない人は `Unknown`（アンカー週で開始）

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{ConfirmationConfig, StaggerSourceConfig};

use super::period::PeriodInfo;

/// Week parity bucket of one person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekParity {
    Even,
    Odd,
    Unknown,
}

impl WeekParity {
    pub fn of_week(week: u32) -> Self {
        if week % 2 == 0 {
            WeekParity::Even
        } else {
            WeekParity::Odd
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StaggerMapError {
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown week value {value:?}")]
    UnknownWeekValue { line: usize, value: String },

    #[error("failed to read stagger file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Immutable identity -> parity lookup.
#[derive(Debug, Clone, Default)]
pub struct StaggerMap {
    entries: HashMap<String, WeekParity>,
}

impl StaggerMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, WeekParity)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, identity_number: &str) -> WeekParity {
        self.entries
            .get(identity_number)
            .copied()
            .unwrap_or(WeekParity::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse delimited text. Blank lines are skipped; week values compare
    /// case-insensitively after trimming.
    pub fn from_csv<R: BufRead>(
        reader: R,
        format: &StaggerSourceConfig,
    ) -> Result<Self, StaggerMapError> {
        let expected = format.identity_column.max(format.week_column) + 1;
        let even = format.even_value.trim().to_uppercase();
        let odd = format.odd_value.trim().to_uppercase();
        let skip = usize::from(format.header);

        let mut entries = HashMap::new();
        for (index, line) in reader.lines().enumerate().skip(skip) {
            let line_no = index + 1;
            let line = line.map_err(|source| StaggerMapError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let columns: Vec<&str> = line.split(format.delimiter.as_str()).collect();
            if columns.len() < expected {
                return Err(StaggerMapError::MissingColumns {
                    line: line_no,
                    expected,
                    found: columns.len(),
                });
            }

            let identity = columns[format.identity_column].trim();
            let raw_week = columns[format.week_column].trim();
            let parity = match raw_week.to_uppercase() {
                v if v == even => WeekParity::Even,
                v if v == odd => WeekParity::Odd,
                _ => {
                    return Err(StaggerMapError::UnknownWeekValue {
                        line: line_no,
                        value: raw_week.to_string(),
                    });
                }
            };
            entries.insert(identity.to_string(), parity);
        }

        Ok(Self { entries })
    }

    /// Load from `source.path`, or an empty map when no path is configured.
    pub fn load(source: &StaggerSourceConfig) -> Result<Self, StaggerMapError> {
        match &source.path {
            None => Ok(Self::empty()),
            Some(path) => Self::load_file(path, source),
        }
    }

    fn load_file(path: &Path, format: &StaggerSourceConfig) -> Result<Self, StaggerMapError> {
        let file = std::fs::File::open(path).map_err(|source| StaggerMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv(std::io::BufReader::new(file), format).map_err(|err| match err {
            StaggerMapError::Io { source, .. } => StaggerMapError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }
}

/// Staggered earliest start of the first cycle for `period`.
///
/// Periods started after the anchor use their own start. Everyone else starts
/// in the anchor week when their parity matches the anchor week (or is
/// unknown), otherwise one week later.
pub fn earliest_cycle_start(
    period: &PeriodInfo,
    config: &ConfirmationConfig,
    map: &StaggerMap,
) -> DateTime<Utc> {
    let anchor = config.earliest_cycle_anchor();
    if period.started > anchor {
        return period.started;
    }

    let anchor_parity = WeekParity::of_week(config.earliest_start_week);
    match map.get(&period.identity_number) {
        WeekParity::Unknown => anchor,
        parity if parity == anchor_parity => anchor,
        _ => anchor + TimeDelta::weeks(1),
    }
}
