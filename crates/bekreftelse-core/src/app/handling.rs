//! Handling - 処理結果の記述
//!
//! handler と sweep は状態を直接書き換えず、`Handling` の列を返します。
//! partition が順番どおりに適用します（書き込み → 送信）。

use crate::domain::{ConfirmationEvent, ConfirmationSet, DelegationState, PeriodId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handling {
    WriteConfirmationSet(ConfirmationSet),
    DeleteConfirmationSet(PeriodId),
    WriteDelegation(DelegationState),
    DeleteDelegation(PeriodId),
    Emit { key: i64, event: ConfirmationEvent },
}

impl Handling {
    pub fn emit(key: i64, event: ConfirmationEvent) -> Self {
        Handling::Emit { key, event }
    }

    pub fn event(&self) -> Option<&ConfirmationEvent> {
        match self {
            Handling::Emit { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Events in `handlings`, in order.
pub fn events(handlings: &[Handling]) -> Vec<&ConfirmationEvent> {
    handlings.iter().filter_map(Handling::event).collect()
}
