//! Insertion-ordered map keyed by directory path.
//!
//! Both the tree and its side-table are `DirMap`s. Iteration follows the
//! order in which keys were first inserted, which is the probe's walk order,
//! so reports and write phases are deterministic across runs.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct DirMap<V> {
    order: Vec<PathBuf>,
    entries: HashMap<PathBuf, V>,
}

impl<V> Default for DirMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> DirMap<V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace the value at `key`.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: PathBuf, value: V) -> Option<V> {
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.order.push(key.clone());
        self.entries.insert(key, value);
        None
    }

    pub fn get(&self, key: &Path) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &Path) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &Path) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &PathBuf> {
        self.order.iter()
    }

    /// `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &V)> {
        self.order.iter().map(move |k| (k, &self.entries[k]))
    }

    /// Keep only the entries for which `keep` returns `true`.
    ///
    /// The surviving keys keep their relative order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Path, &V) -> bool,
    {
        let entries = &mut self.entries;
        self.order.retain(|key| {
            let keep_it = entries.get(key).is_some_and(|v| keep(key, v));
            if !keep_it {
                entries.remove(key);
            }
            keep_it
        });
    }

    /// `true` if both maps hold exactly the same keys in the same order.
    pub fn same_keys<W>(&self, other: &DirMap<W>) -> bool {
        self.order == other.order
    }
}

impl<V> FromIterator<(PathBuf, V)> for DirMap<V> {
    fn from_iter<I: IntoIterator<Item = (PathBuf, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for DirMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(&k.to_string_lossy(), v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(keys: &[&str]) -> DirMap<usize> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (PathBuf::from(k), i))
            .collect()
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let map = map_of(&["/z", "/a", "/m"]);
        let keys: Vec<_> = map.keys().map(|k| k.to_string_lossy().into_owned()).collect();
        assert_eq!(keys, vec!["/z", "/a", "/m"]);
    }

    #[test]
    fn replacing_a_key_keeps_its_position() {
        let mut map = map_of(&["/a", "/b"]);
        assert_eq!(map.insert(PathBuf::from("/a"), 42), Some(0));
        let pairs: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(pairs, vec![42, 1]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn retain_drops_keys_from_both_order_and_entries() {
        let mut map = map_of(&["/a", "/b", "/c", "/d"]);
        map.retain(|_, v| v % 2 == 0);
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key(Path::new("/b")));
        assert!(map.get(Path::new("/b")).is_none());
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let map = map_of(&["/b", "/a"]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"/b":0,"/a":1}"#);
    }
}
