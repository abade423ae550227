//! Domain identifiers (strongly-typed IDs).
//!
//! # UUID ベースの ID + Phantom type
//! 外部メッセージ（periode, bekreftelse, hendelse）はすべて UUID で識別されるので、
//! `Id<T>` は UUID を包むジェネリック型として実装しています。
//! `T` は実行時には使わないマーカー型で、`PeriodId` と `ConfirmationId` を
//! コンパイル時に混同できないようにします。
//!
//! ## 決定的な ID
//! ポリシーが生成する ID は `Id::derived`（UUIDv5）で作ります。
//! 同じ状態と同じ wall clock からの再実行で同じ ID が得られるため、
//! 下流は `hendelseId` で重複排除できます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"periode-", "bekreftelse-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// Serialize/Deserialize は中身の UUID そのもの（プレフィックスなし）です。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// Random (v4) id. Only used where replay determinism does not matter.
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Name-based (v5) id scoped under `namespace`.
    pub fn derived(namespace: Uuid, name: &[u8]) -> Self {
        Self::from_uuid(Uuid::new_v5(&namespace, name))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T: IdMarker> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.uuid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Period のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodMarker {}

impl IdMarker for PeriodMarker {
    fn prefix() -> &'static str {
        "periode-"
    }
}

/// Confirmation のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfirmationMarker {}

impl IdMarker for ConfirmationMarker {
    fn prefix() -> &'static str {
        "bekreftelse-"
    }
}

/// Outbound event のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventMarker {}

impl IdMarker for EventMarker {
    fn prefix() -> &'static str {
        "hendelse-"
    }
}

pub type PeriodId = Id<PeriodMarker>;
pub type ConfirmationId = Id<ConfirmationMarker>;
pub type EventId = Id<EventMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let uuid = Uuid::nil();
        let period_id = PeriodId::from_uuid(uuid);
        let confirmation_id = ConfirmationId::from_uuid(uuid);

        assert_eq!(
            period_id.to_string(),
            "periode-00000000-0000-0000-0000-000000000000"
        );
        assert!(confirmation_id.to_string().starts_with("bekreftelse-"));
    }

    #[test]
    fn serializes_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let id = PeriodId::from_uuid(uuid);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));

        let back: PeriodId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn derived_ids_are_stable_per_name() {
        let ns = Uuid::new_v4();

        let a = EventId::derived(ns, b"tilgjengelig");
        let b = EventId::derived(ns, b"tilgjengelig");
        let c = EventId::derived(ns, b"leveringsfrist_utloept");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
