use std::collections::HashMap;

use super::Value;

/// An in-memory typed property bag.
///
/// Keyed by string, each slot holds exactly one [`Value`]; setting a
/// different-typed value under an existing key fully replaces the slot
/// rather than merging, so two stores with the same key holding
/// differently-typed values are never equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValueStore {
    entries: HashMap<String, Value>,
}

impl KeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` is present, regardless of its type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the value at `key`.
    ///
    /// # Panics
    /// Panics if `key` is absent. Callers must gate on
    /// [`KeyValueStore::contains`] first, or use
    /// [`KeyValueStore::lookup`] for a defaulting read.
    #[must_use]
    pub fn get(&self, key: &str) -> &Value {
        self.entries
            .get(key)
            .unwrap_or_else(|| panic!("KeyValueStore::get: key {key:?} is not present"))
    }

    /// Returns the value at `key`, or `default` if absent.
    #[must_use]
    pub fn lookup(&self, key: &str, default: Value) -> Value {
        self.entries.get(key).cloned().unwrap_or(default)
    }

    /// Sets `key` to `value`, replacing any prior (possibly differently
    /// typed) entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes `key`. A no-op if `key` is absent.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` iff `self` and `other` contain exactly the same keys
    /// with the same typed values.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// Replaces `self`'s contents with a copy of `other`'s.
    pub fn copy_from(&mut self, other: &Self) {
        self.entries = other.entries.clone();
    }

    /// Iterates over the store's key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_round_trip() {
        let mut store = KeyValueStore::new();
        assert!(!store.contains("enabled"));
        store.set("enabled", true);
        assert!(store.contains("enabled"));
        assert_eq!(store.get("enabled").as_bool(), Some(true));
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut store = KeyValueStore::new();
        store.remove("missing");
        assert!(store.is_empty());
    }

    #[test]
    fn lookup_returns_default_when_absent() {
        let store = KeyValueStore::new();
        assert_eq!(store.lookup("missing", Value::Int(7)), Value::Int(7));
    }

    #[test]
    fn copy_from_then_equals_holds() {
        let mut a = KeyValueStore::new();
        a.set("x", 1i32);
        a.set("y", "hi".to_string());

        let mut b = KeyValueStore::new();
        b.copy_from(&a);
        assert!(a.equals(&b));
    }

    #[test]
    fn clear_then_is_empty_holds() {
        let mut store = KeyValueStore::new();
        store.set("x", 1i32);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn different_types_under_same_key_do_not_coexist() {
        let mut store = KeyValueStore::new();
        store.set("k", true);
        store.set("k", 5i32);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").as_int(), Some(5));
        assert_eq!(store.get("k").as_bool(), None);
    }

    #[test]
    fn different_typed_entries_are_not_equal() {
        let mut a = KeyValueStore::new();
        a.set("k", 1i32);
        let mut b = KeyValueStore::new();
        b.set("k", 1u32);
        assert!(!a.equals(&b));
    }

    #[test]
    #[should_panic(expected = "is not present")]
    fn get_of_absent_key_panics() {
        let store = KeyValueStore::new();
        store.get("missing");
    }
}
