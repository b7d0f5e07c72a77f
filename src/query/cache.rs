//! In-memory result cache for repeated dimension queries.
//!
//! Entries are keyed by operation name plus its parameters; the cache is
//! cleared as a whole (explicit [`QueryCache::clear`] or process restart) and
//! never partially invalidated — the underlying table is immutable for the
//! lifetime of a load.

use std::collections::HashMap;
use std::sync::Mutex;

/// A cached query result.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CachedEntry {
    Strings(Vec<String>),
    Years(Vec<i32>),
    Files(Vec<(String, usize)>),
}

/// Shared, interior-mutable cache of computed results.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, CachedEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &str) -> Option<CachedEntry> {
        self.entries
            .lock()
            .expect("query cache mutex poisoned")
            .get(key)
            .cloned()
    }

    pub(crate) fn insert(&self, key: String, entry: CachedEntry) {
        self.entries
            .lock()
            .expect("query cache mutex poisoned")
            .insert(key, entry);
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("query cache mutex poisoned")
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("query cache mutex poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_clear_round_trip() {
        let cache = QueryCache::default();
        assert!(cache.is_empty());

        cache.insert(
            "distinct:uf".to_string(),
            CachedEntry::Strings(vec!["RJ".to_string(), "SP".to_string()]),
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("distinct:uf"),
            Some(CachedEntry::Strings(vec![
                "RJ".to_string(),
                "SP".to_string()
            ]))
        );
        assert_eq!(cache.get("distinct:evento"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
