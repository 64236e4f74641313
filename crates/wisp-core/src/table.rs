//! Open-addressed hash table with tombstone deletion.
//!
//! Used for two purposes by the rest of the interpreter: the string intern
//! pool (content-addressed, via `find_string`) and the VM's global variable
//! environment (identity-addressed, via `set`/`get`/`delete`). Keys are
//! `ObjRef`s; since `Table` doesn't own the arena the strings live in, every
//! operation that needs a hash takes it from the caller (who already has it
//! cached on the `ObjString`) rather than looking it up itself.
//!
//! Probing is linear starting at `hash mod capacity`. An insert that
//! doesn't find its key before an empty slot uses the first tombstone it
//! passed, if any, as the insertion point — this keeps probe chains from
//! growing unbounded under repeated insert/delete churn.

use crate::object::ObjRef;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone)]
struct Entry {
    key: Option<ObjRef>,
    hash: u32,
    value: Value,
}

fn empty_entry() -> Entry {
    Entry {
        key: None,
        hash: 0,
        value: Value::None,
    }
}

/// A slot is empty iff `key.is_none() && value == None`; a tombstone has
/// `key.is_none()` with any other value (we use `Bool(true)`, matching the
/// spec's "any non-None marker suffices").
fn is_tombstone(entry: &Entry) -> bool {
    entry.key.is_none() && !matches!(entry.value, Value::None)
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table {
            entries: Vec::new(),
            count: 0,
        }
    }

    /// Number of live entries plus tombstones (slots that can't be reused
    /// by a fresh `find_entry` scan without probing past them).
    pub fn count(&self) -> usize {
        self.count
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn grow_capacity(capacity: usize) -> usize {
        if capacity < 8 { 8 } else { capacity * 2 }
    }

    fn find_entry(entries: &[Entry], capacity: usize, key: ObjRef, hash: u32) -> usize {
        let mut index = (hash as usize) % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match entry.key {
                Some(k) if k == key => return index,
                None if matches!(entry.value, Value::None) => {
                    // Truly empty: stop here, reusing a tombstone if we saw one.
                    return tombstone.unwrap_or(index);
                }
                None => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(_) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn adjust_capacity(&mut self, new_capacity: usize) {
        let mut new_entries = vec![empty_entry(); new_capacity];
        let mut new_count = 0;
        for entry in self.entries.iter() {
            let Some(key) = entry.key else { continue }; // drop tombstones on resize
            let idx = Self::find_entry(&new_entries, new_capacity, key, entry.hash);
            new_entries[idx] = entry.clone();
            new_count += 1;
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    /// Insert or overwrite. Returns `true` iff `key` was not already present.
    pub fn set(&mut self, key: ObjRef, hash: u32, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * TABLE_MAX_LOAD {
            let new_capacity = Self::grow_capacity(self.capacity());
            self.adjust_capacity(new_capacity);
        }
        let capacity = self.capacity();
        let idx = Self::find_entry(&self.entries, capacity, key, hash);
        let entry = &mut self.entries[idx];
        let is_new_key = entry.key.is_none();
        if is_new_key && matches!(entry.value, Value::None) {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.hash = hash;
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, key: ObjRef, hash: u32) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = Self::find_entry(&self.entries, self.capacity(), key, hash);
        self.entries[idx].key.map(|_| self.entries[idx].value)
    }

    /// Place a tombstone. Returns `true` iff the key was present.
    pub fn delete(&mut self, key: ObjRef, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let idx = Self::find_entry(&self.entries, self.capacity(), key, hash);
        if self.entries[idx].key.is_none() {
            return false;
        }
        self.entries[idx].key = None;
        self.entries[idx].value = Value::Bool(true);
        true
    }

    /// Copy every live entry from `self` into `dst`.
    pub fn add_all(&self, dst: &mut Table) {
        for entry in &self.entries {
            if let Some(key) = entry.key {
                dst.set(key, entry.hash, entry.value);
            }
        }
    }

    /// Content-addressed lookup for the intern pool: probes by `hash`,
    /// accepting the first live key for which `same` returns true. `same`
    /// is expected to compare the candidate's actual string bytes against
    /// the bytes being interned — `Table` has no byte data of its own.
    pub fn find_string(&self, hash: u32, mut same: impl FnMut(ObjRef) -> bool) -> Option<ObjRef> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) % capacity;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None if matches!(entry.value, Value::None) => return None,
                Some(k) if entry.hash == hash && same(k) => return Some(k),
                _ => {}
            }
            index = (index + 1) % capacity;
        }
    }

    #[cfg(test)]
    fn live_entries(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key.is_some())
            .count()
    }

    #[cfg(test)]
    fn tombstone_count(&self) -> usize {
        self.entries.iter().filter(|e| is_tombstone(e)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: u32) -> ObjRef {
        ObjRef(n)
    }

    #[test]
    fn set_returns_true_for_new_key() {
        let mut t = Table::new();
        assert!(t.set(k(1), 1, Value::Number(1.0)));
        assert!(!t.set(k(1), 1, Value::Number(2.0)));
        assert_eq!(t.get(k(1), 1), Some(Value::Number(2.0)));
    }

    #[test]
    fn get_missing_is_none() {
        let t = Table::new();
        assert_eq!(t.get(k(1), 1), None);
    }

    #[test]
    fn delete_then_get_is_none_but_reinsert_works() {
        let mut t = Table::new();
        t.set(k(5), 5, Value::Bool(false));
        assert!(t.delete(k(5), 5));
        assert_eq!(t.get(k(5), 5), None);
        assert!(t.set(k(5), 5, Value::Number(9.0)));
        assert_eq!(t.get(k(5), 5), Some(Value::Number(9.0)));
    }

    #[test]
    fn delete_missing_returns_false() {
        let mut t = Table::new();
        assert!(!t.delete(k(1), 1));
    }

    #[test]
    fn count_includes_tombstones() {
        let mut t = Table::new();
        t.set(k(1), 1, Value::None);
        t.set(k(2), 2, Value::None);
        t.delete(k(1), 1);
        // count is unchanged by delete: tombstone still occupies a slot.
        assert_eq!(t.count(), 2);
        assert_eq!(t.live_entries(), 1);
        assert_eq!(t.tombstone_count(), 1);
    }

    #[test]
    fn load_factor_respected_after_growth() {
        let mut t = Table::new();
        for i in 0..100u32 {
            t.set(k(i), i, Value::Number(i as f64));
        }
        assert!(t.count() as f64 <= t.capacity() as f64 * TABLE_MAX_LOAD + 1.0);
        for i in 0..100u32 {
            assert_eq!(t.get(k(i), i), Some(Value::Number(i as f64)));
        }
    }

    #[test]
    fn add_all_copies_live_entries_only() {
        let mut src = Table::new();
        src.set(k(1), 1, Value::Number(1.0));
        src.set(k(2), 2, Value::Number(2.0));
        src.delete(k(2), 2);

        let mut dst = Table::new();
        src.add_all(&mut dst);
        assert_eq!(dst.get(k(1), 1), Some(Value::Number(1.0)));
        assert_eq!(dst.get(k(2), 2), None);
    }

    #[test]
    fn find_string_matches_by_predicate() {
        let mut t = Table::new();
        t.set(k(7), 42, Value::None);
        let found = t.find_string(42, |key| key == k(7));
        assert_eq!(found, Some(k(7)));
        let missing = t.find_string(42, |key| key == k(99));
        assert_eq!(missing, None);
    }

    #[test]
    fn collisions_probe_linearly() {
        // Capacity starts at 8 after first insert; force two keys to the
        // same initial bucket and verify both remain retrievable.
        let mut t = Table::new();
        t.set(k(1), 1, Value::Number(1.0));
        t.set(k(9), 1, Value::Number(2.0)); // hash 1 % 8 == hash 9 % 8 == 1
        assert_eq!(t.get(k(1), 1), Some(Value::Number(1.0)));
        assert_eq!(t.get(k(9), 1), Some(Value::Number(2.0)));
    }
}
