//! Memoized lookups keyed by stable identifiers

use std::collections::HashMap;
use std::hash::Hash;

/// Values computed once per key and dropped explicitly
///
/// Owners call [`KeyedCache::remove_where`] from their teardown path so no
/// entry outlives the object its key names.
#[derive(Debug)]
pub struct KeyedCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> KeyedCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, computing it on first use
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        self.entries.entry(key).or_insert_with(compute)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Drops every entry whose key matches; returns how many were dropped
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computes_once() {
        let mut cache = KeyedCache::new();
        let mut calls = 0;
        cache.get_or_insert_with((1, 'a'), || {
            calls += 1;
            10
        });
        let value = *cache.get_or_insert_with((1, 'a'), || {
            calls += 1;
            20
        });
        assert_eq!(value, 10);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_remove_where_invalidates_owner() {
        let mut cache = KeyedCache::new();
        cache.get_or_insert_with((1, 'a'), || 1);
        cache.get_or_insert_with((1, 'b'), || 2);
        cache.get_or_insert_with((2, 'a'), || 3);
        assert_eq!(cache.remove_where(|(user, _)| *user == 1), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&(2, 'a')), Some(&3));
    }
}
