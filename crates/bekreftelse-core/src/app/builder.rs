//! AppBuilder - 構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `build()` で設定を検証し、不正なら `BuildError`
//! - EventSink は必須（未設定なら `BuildError::MissingEventSink`）
//! - 再開用の状態を渡す場合、パーティション数と一致しなければエラー

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::domain::StaggerMap;
use crate::ports::{Clock, EventSink, SystemClock};

use super::partition::{Partition, PartitionGroup};
use super::state::PartitionState;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config)
///     .stagger(stagger_map)
///     .event_sink(sink)
///     .build()?;
/// let group = app.start();
/// ```
pub struct AppBuilder {
    config: AppConfig,
    stagger: Option<StaggerMap>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn EventSink>>,
    states: Option<Vec<PartitionState>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no event sink configured")]
    MissingEventSink,

    #[error("expected {expected} partition states to resume from, got {got}")]
    PartitionStateMismatch { expected: usize, got: usize },
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            stagger: None,
            clock: None,
            sink: None,
            states: None,
        }
    }

    /// Defaults to an empty map (everyone starts in the anchor week).
    pub fn stagger(mut self, stagger: StaggerMap) -> Self {
        self.stagger = Some(stagger);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(clock);
        self.clock = Some(clock);
        self
    }

    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        let sink: Arc<dyn EventSink> = Arc::new(sink);
        self.sink = Some(sink);
        self
    }

    /// Resume from states returned by `PartitionGroup::shutdown_and_join`.
    pub fn resume_from(mut self, states: Vec<PartitionState>) -> Self {
        self.states = Some(states);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let sink = self.sink.ok_or(BuildError::MissingEventSink)?;

        let expected = self.config.topology.partitions;
        let states = match self.states {
            Some(states) if states.len() != expected => {
                return Err(BuildError::PartitionStateMismatch {
                    expected,
                    got: states.len(),
                });
            }
            Some(states) => states,
            None => (0..expected).map(|_| PartitionState::in_memory()).collect(),
        };

        Ok(App {
            config: self.config,
            stagger: Arc::new(self.stagger.unwrap_or_default()),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            sink,
            states,
        })
    }
}

/// Built, not yet running.
pub struct App {
    config: AppConfig,
    stagger: Arc<StaggerMap>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    states: Vec<PartitionState>,
}

impl App {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Spawn the partitions and the punctuator. Must be called inside a tokio runtime.
    pub fn start(self) -> PartitionGroup {
        let confirmation_config = Arc::new(self.config.bekreftelse.clone());
        let partitions = self
            .states
            .into_iter()
            .enumerate()
            .map(|(id, state)| Partition {
                id,
                state,
                config: Arc::clone(&confirmation_config),
                stagger: Arc::clone(&self.stagger),
                clock: Arc::clone(&self.clock),
                sink: Arc::clone(&self.sink),
            })
            .collect();

        PartitionGroup::spawn(
            partitions,
            self.config.topology.queue_capacity,
            self.config.topology.punctuation_interval(),
        )
    }
}
