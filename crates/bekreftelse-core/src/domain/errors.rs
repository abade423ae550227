//! Errors - エラー型と分類
//!
//! `ErrorKind` は運用上の分類です。ログのレベルと「処理を続けるか」の判断に使います。
//! どの分類でも、1 つのキーの失敗がパーティション全体を止めることはありません。

use super::delegation::ConfirmationSolution;
use super::ids::{ConfirmationId, PeriodId};
use super::status::StatusRegression;

/// ErrorKind は失敗の運用分類
///
/// - UnknownKey: 未知の periodeId（まだ見ていない / 既に削除済み）→ warn、破棄
/// - Responsibility: 責任を持たない loesning からの送信 → warn、破棄
/// - Malformed: 不正な入力 → warn、破棄
/// - Invariant: 不変条件違反（プログラムの欠陥）→ error、その単位の処理だけ失敗
/// - Infrastructure: 出力先（EventSink）の障害。リトライ後も失敗したら、その単位の書き込みは捨てる
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownKey,
    Responsibility,
    Malformed,
    Invariant,
    Infrastructure,
}

/// CoreError はドメイン処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    StatusRegression(#[from] StatusRegression),

    #[error("confirmation set for {0} is empty after ensure-first")]
    EmptyConfirmationSet(PeriodId),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("late submission for {0}: grace period already expired")]
    LateSubmission(ConfirmationId),

    #[error("unknown period {0}")]
    UnknownPeriod(PeriodId),

    #[error("{solution:?} has no responsibility for period {period_id}")]
    NoResponsibility {
        period_id: PeriodId,
        solution: ConfirmationSolution,
    },

    #[error("event sink failed: {0}")]
    Emit(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::StatusRegression(_) | CoreError::EmptyConfirmationSet(_) => {
                ErrorKind::Invariant
            }
            CoreError::Malformed(_) | CoreError::LateSubmission(_) => ErrorKind::Malformed,
            CoreError::UnknownPeriod(_) => ErrorKind::UnknownKey,
            CoreError::NoResponsibility { .. } => ErrorKind::Responsibility,
            CoreError::Emit(_) => ErrorKind::Infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StatusKind;
    use rstest::rstest;

    #[test]
    fn regression_is_an_invariant_violation() {
        let err: CoreError = StatusRegression {
            from: StatusKind::Submitted,
            to: StatusKind::Open,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert!(err.to_string().contains("Submitted"));
    }

    #[rstest]
    #[case::malformed(CoreError::Malformed("gjelderFra >= gjelderTil".into()), ErrorKind::Malformed)]
    #[case::late(CoreError::LateSubmission(ConfirmationId::random()), ErrorKind::Malformed)]
    #[case::unknown(CoreError::UnknownPeriod(PeriodId::random()), ErrorKind::UnknownKey)]
    #[case::responsibility(
        CoreError::NoResponsibility {
            period_id: PeriodId::random(),
            solution: ConfirmationSolution::Dagpenger,
        },
        ErrorKind::Responsibility
    )]
    #[case::sink(CoreError::Emit("closed".into()), ErrorKind::Infrastructure)]
    fn kinds(#[case] err: CoreError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }
}
