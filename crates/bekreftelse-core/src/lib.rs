//! bekreftelse-core
//!
//! Confirmation ("bekreftelse") state machine for job-seeker periods.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, confirmation, policy, delegation, stagger, messages, events, errors）
//! - **ports**: 抽象化レイヤー（Clock, EventSink, KeyValueStore）
//! - **impls**: 実装（InMemoryStore, InMemoryEventLog, ChannelEventSink）
//! - **app**: パーティション化されたランタイム（handlers, punctuator, builder）
//! - **config**: 設定（TOML、デフォルト値、検証）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
