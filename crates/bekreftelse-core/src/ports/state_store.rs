//! State store port - パーティション内のキー付き状態
//!
//! 各パーティションは confirmation set 用と delegation 用の 2 つのストアを
//! 排他的に所有します。ロックは不要です（1 つのタスクだけが触る）。

use crate::domain::PeriodId;

/// KeyValueStore は periodeId をキーにした状態ストア
///
/// # 空の値
/// 空の状態は保存しません。`delete` で消します。
pub trait KeyValueStore<V>: Send + Sync {
    fn get(&self, key: &PeriodId) -> Option<V>;

    fn put(&mut self, key: PeriodId, value: V);

    fn delete(&mut self, key: &PeriodId) -> Option<V>;

    /// 全キー（順序は実装依存だが、同じ内容なら毎回同じ）
    fn keys(&self) -> Vec<PeriodId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
