use rustc_hash::FxHasher;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

pub type FastMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FastHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;

/// Outcome of [`OrderedMap::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// An entry with the same name existed and was overwritten at its position.
    Replaced(usize),
    Appended(usize),
}

/// Name-keyed entries in encounter order, with an O(1) name → position index.
///
/// Replacing an existing name keeps its position; new names go to the end.
/// Entries are never removed, so positions stay valid for the map's lifetime.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<(SmolStr, V)>,
    index: FastMap<SmolStr, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FastMap::default(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FastMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn upsert(&mut self, name: impl Into<SmolStr>, value: V) -> Upsert {
        let name = name.into();
        if let Some(&pos) = self.index.get(&name) {
            self.entries[pos].1 = value;
            return Upsert::Replaced(pos);
        }
        let pos = self.entries.len();
        self.index.insert(name.clone(), pos);
        self.entries.push((name, value));
        Upsert::Appended(pos)
    }

    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.position(name).map(|pos| &self.entries[pos].1)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let pos = self.position(name)?;
        Some(&mut self.entries[pos].1)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V: PartialEq> PartialEq for OrderedMap<V> {
    /// Order-sensitive: two maps with the same entries in a different order differ.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (SmolStr, V);
    type IntoIter = std::vec::IntoIter<(SmolStr, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<SmolStr>, V> FromIterator<(K, V)> for OrderedMap<V> {
    /// Later duplicates overwrite earlier ones in place.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.upsert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut map = OrderedMap::new();
        assert_eq!(map.upsert("a", 1), Upsert::Appended(0));
        assert_eq!(map.upsert("b", 2), Upsert::Appended(1));
        assert_eq!(map.upsert("a", 3), Upsert::Replaced(0));

        let pairs: Vec<(&str, i32)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn test_position_and_lookup() {
        let map: OrderedMap<i32> = [("x", 10), ("y", 20)].into_iter().collect();
        assert_eq!(map.position("y"), Some(1));
        assert_eq!(map.get("x"), Some(&10));
        assert!(map.get("z").is_none());
        assert!(!map.contains("z"));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a: OrderedMap<i32> = [("x", 1), ("y", 2)].into_iter().collect();
        let b: OrderedMap<i32> = [("y", 2), ("x", 1)].into_iter().collect();
        assert_ne!(a, b);
    }
}
