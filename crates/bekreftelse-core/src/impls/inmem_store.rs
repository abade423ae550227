//! In-memory key-value store, rebuildable from a changelog.
//!
//! `restore` replays `Put`/`Delete` entries in order, the way a
//! changelog-backed store is rebuilt on cold start. The persisted form of a
//! partition is a compacted changelog (see `PartitionState::changelog`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::PeriodId;
use crate::ports::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ChangelogEntry<V> {
    Put { key: PeriodId, value: V },
    Delete { key: PeriodId },
}

#[derive(Debug, Clone)]
pub struct InMemoryStore<V> {
    name: &'static str,
    entries: BTreeMap<PeriodId, V>,
}

impl<V: Clone> InMemoryStore<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuild by replaying `changelog` in order.
    pub fn restore(name: &'static str, changelog: impl IntoIterator<Item = ChangelogEntry<V>>) -> Self {
        let mut store = Self::new(name);
        for entry in changelog {
            match entry {
                ChangelogEntry::Put { key, value } => {
                    store.entries.insert(key, value);
                }
                ChangelogEntry::Delete { key } => {
                    store.entries.remove(&key);
                }
            }
        }
        tracing::debug!(store = store.name, restored = store.entries.len(), "store restored");
        store
    }
}

impl<V: Clone + Send + Sync> KeyValueStore<V> for InMemoryStore<V> {
    fn get(&self, key: &PeriodId) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: PeriodId, value: V) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &PeriodId) -> Option<V> {
        self.entries.remove(key)
    }

    fn keys(&self) -> Vec<PeriodId> {
        self.entries.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut store = InMemoryStore::new("test");
        let key = PeriodId::random();

        store.put(key, 1u32);
        assert_eq!(store.get(&key), Some(1));

        store.put(key, 2);
        assert_eq!(store.get(&key), Some(2));
        assert_eq!(store.len(), 1);

        assert_eq!(store.delete(&key), Some(2));
        assert!(store.is_empty());
        assert_eq!(store.delete(&key), None);
    }

    #[test]
    fn restore_replays_in_order() {
        let a = PeriodId::random();
        let b = PeriodId::random();
        let changelog = vec![
            ChangelogEntry::Put { key: a, value: "a1".to_string() },
            ChangelogEntry::Put { key: b, value: "b1".to_string() },
            ChangelogEntry::Put { key: a, value: "a2".to_string() },
            ChangelogEntry::Delete { key: b },
        ];

        let restored = InMemoryStore::restore("test", changelog);
        assert_eq!(restored.get(&a), Some("a2".to_string()));
        assert_eq!(restored.get(&b), None);
        assert_eq!(restored.keys(), vec![a]);
    }

    #[test]
    fn changelog_entries_are_tagged_by_op() {
        let key = PeriodId::random();
        let json = serde_json::to_value(ChangelogEntry::<u32>::Delete { key }).unwrap();
        assert_eq!(json["op"], "delete");
        assert_eq!(json["key"], key.as_uuid().to_string());
    }
}
