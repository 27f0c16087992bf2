//! Associative arrays with configurable key semantics
//!
//! A hash keeps its entries in a vector (the iteration order) and an index
//! from normalized key to position. Flags decide how keys match and how
//! entries are ordered:
//!
//! - `IGNORECASE`: string keys match without regard to ASCII case
//! - `BINARY`: sorted order compares strings bytewise instead of as text
//! - `KEEPORDER`: iterate in insertion order instead of sorted key order
//! - `RESORT`: one-shot request to re-sort; never stored
//!
//! Keys may be strings, numbers, dates or pointers. All numeric widths share
//! one key space, so `1` and `1.0` address the same entry.

use crate::error::{ItemError, ItemResult};
use crate::item::Item;
use bitflags::bitflags;
use std::cmp::Ordering;
use std::collections::HashMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HashFlags: u32 {
        const IGNORECASE = 1 << 0;
        const BINARY = 1 << 1;
        const KEEPORDER = 1 << 2;
        const RESORT = 1 << 3;
    }
}

impl Default for HashFlags {
    fn default() -> Self {
        HashFlags::BINARY | HashFlags::KEEPORDER
    }
}

/// Normalized key used for matching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HashKey {
    Number(Number),
    Date(i64),
    Pointer(usize),
    String(Vec<u8>),
}

/// Numeric key: integral doubles fold into the integer space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Number {
    Int(i64),
    Float(u64),
}

impl Number {
    fn from_f64(d: f64) -> Self {
        if d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 {
            Number::Int(d as i64)
        } else {
            Number::Float(d.to_bits())
        }
    }

    fn cmp(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(bits) => f64::from_bits(bits),
        }
    }
}

impl HashKey {
    fn rank(&self) -> u8 {
        match self {
            HashKey::Number(_) => 0,
            HashKey::Date(_) => 1,
            HashKey::Pointer(_) => 2,
            HashKey::String(_) => 3,
        }
    }

    fn compare(&self, other: &HashKey, binary: bool) -> Ordering {
        match (self, other) {
            (HashKey::Number(a), HashKey::Number(b)) => a.cmp(*b),
            (HashKey::Date(a), HashKey::Date(b)) => a.cmp(b),
            (HashKey::Pointer(a), HashKey::Pointer(b)) => a.cmp(b),
            (HashKey::String(a), HashKey::String(b)) if binary => a.cmp(b),
            (HashKey::String(a), HashKey::String(b)) => {
                let la = String::from_utf8_lossy(a).to_lowercase();
                let lb = String::from_utf8_lossy(b).to_lowercase();
                la.cmp(&lb).then_with(|| a.cmp(b))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    key: Item,
    value: Item,
    norm: HashKey,
}

#[derive(Debug, Clone)]
pub struct Hash {
    entries: Vec<Entry>,
    index: HashMap<HashKey, usize>,
    flags: HashFlags,
}

impl Default for Hash {
    fn default() -> Self {
        Hash::new(HashFlags::default())
    }
}

// Same flags and same (key, value) pairs in the same order
impl PartialEq for Hash {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.key == b.key && a.value == b.value)
    }
}

impl Hash {
    pub fn new(flags: HashFlags) -> Self {
        Hash {
            entries: Vec::new(),
            index: HashMap::new(),
            flags: flags - HashFlags::RESORT,
        }
    }

    pub fn flags(&self) -> HashFlags {
        self.flags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserve room for `additional` entries; contents are unchanged
    pub fn preallocate(&mut self, additional: usize) {
        self.entries.reserve(additional);
        self.index.reserve(additional);
    }

    fn normalize(&self, key: &Item) -> ItemResult<HashKey> {
        let key = key.value();
        let norm = match &key {
            Item::Integer(n) => HashKey::Number(Number::Int(i64::from(*n))),
            Item::Long(n) => HashKey::Number(Number::Int(*n)),
            Item::Double(d) => HashKey::Number(Number::from_f64(*d)),
            Item::Date(d) => HashKey::Date(d.julian()),
            Item::Pointer(p) => HashKey::Pointer(*p),
            Item::String(s) if self.flags.contains(HashFlags::IGNORECASE) => {
                HashKey::String(s.as_bytes().to_ascii_uppercase())
            }
            Item::String(s) => HashKey::String(s.as_bytes().to_vec()),
            other => return Err(ItemError::InvalidHashKey(other.kind())),
        };
        Ok(norm)
    }

    fn is_sorted_mode(&self) -> bool {
        !self.flags.contains(HashFlags::KEEPORDER)
    }

    /// Insert or replace
    ///
    /// Replacing keeps the entry's position and its original key item.
    pub fn add(&mut self, key: impl Into<Item>, value: impl Into<Item>) -> ItemResult<()> {
        let key = key.into().deref_value();
        let value = value.into().deref_value();
        let norm = self.normalize(&key)?;

        if let Some(&pos) = self.index.get(&norm) {
            self.entries[pos].value = value;
            return Ok(());
        }

        let pos = if self.is_sorted_mode() {
            let binary = self.flags.contains(HashFlags::BINARY);
            self.entries
                .partition_point(|e| e.norm.compare(&norm, binary) == Ordering::Less)
        } else {
            self.entries.len()
        };
        self.entries.insert(pos, Entry { key, value, norm });
        self.reindex_from(pos);
        Ok(())
    }

    /// Value for `key`; absent when missing or when `key` is not a valid key kind
    pub fn get(&self, key: &Item) -> Option<&Item> {
        let norm = self.normalize(key).ok()?;
        self.index.get(&norm).map(|&pos| &self.entries[pos].value)
    }

    pub fn get_mut(&mut self, key: &Item) -> Option<&mut Item> {
        let norm = self.normalize(key).ok()?;
        let pos = *self.index.get(&norm)?;
        Some(&mut self.entries[pos].value)
    }

    pub fn contains(&self, key: &Item) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &Item) -> Option<Item> {
        let norm = self.normalize(key).ok()?;
        let pos = self.index.remove(&norm)?;
        let entry = self.entries.remove(pos);
        self.reindex_from(pos);
        Some(entry.value)
    }

    fn position(&self, ordinal: usize) -> ItemResult<usize> {
        if ordinal == 0 || ordinal > self.entries.len() {
            return Err(ItemError::OutOfBounds {
                index: ordinal,
                len: self.entries.len(),
            });
        }
        Ok(ordinal - 1)
    }

    /// Entry at 1-based `ordinal` in the current order
    pub fn get_at(&self, ordinal: usize) -> ItemResult<(&Item, &Item)> {
        let entry = &self.entries[self.position(ordinal)?];
        Ok((&entry.key, &entry.value))
    }

    pub fn key_at(&self, ordinal: usize) -> ItemResult<&Item> {
        self.get_at(ordinal).map(|(k, _)| k)
    }

    pub fn value_at(&self, ordinal: usize) -> ItemResult<&Item> {
        self.get_at(ordinal).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Item, &Item)> {
        self.entries.iter().map(|e| (&e.key, &e.value))
    }

    pub fn set_flags(&mut self, flags: HashFlags) {
        let resort = flags.contains(HashFlags::RESORT);
        self.apply_flags(self.flags | (flags - HashFlags::RESORT), resort);
    }

    pub fn clear_flags(&mut self, flags: HashFlags) {
        self.apply_flags(self.flags - flags, false);
    }

    fn apply_flags(&mut self, new: HashFlags, force_sort: bool) {
        let old = self.flags;
        self.flags = new;

        let case_changed =
            old.contains(HashFlags::IGNORECASE) != new.contains(HashFlags::IGNORECASE);
        let binary_changed = old.contains(HashFlags::BINARY) != new.contains(HashFlags::BINARY);
        let order_dropped =
            old.contains(HashFlags::KEEPORDER) && !new.contains(HashFlags::KEEPORDER);

        if case_changed {
            self.rekey();
        }
        let sorted = self.is_sorted_mode();
        if force_sort || order_dropped || (sorted && (case_changed || binary_changed)) {
            self.sort();
        }
    }

    // Recompute every normalized key. On a collision the earlier entry
    // keeps its position and takes the later value.
    fn rekey(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        self.index.clear();
        for entry in entries {
            let norm = match self.normalize(&entry.key) {
                Ok(norm) => norm,
                Err(_) => continue,
            };
            if let Some(pos) = self.index.get(&norm).copied() {
                self.entries[pos].value = entry.value;
                continue;
            }
            self.index.insert(norm.clone(), self.entries.len());
            self.entries.push(Entry {
                key: entry.key,
                value: entry.value,
                norm,
            });
        }
    }

    fn sort(&mut self) {
        let binary = self.flags.contains(HashFlags::BINARY);
        self.entries.sort_by(|a, b| a.norm.compare(&b.norm, binary));
        self.reindex_from(0);
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, entry) in self.entries.iter().enumerate().skip(start) {
            self.index.insert(entry.norm.clone(), pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::Date;
    use crate::kind::Kind;

    fn keys(h: &Hash) -> Vec<Item> {
        h.iter().map(|(k, _)| k.clone()).collect()
    }

    #[test]
    fn test_default_flags_keep_insertion_order() {
        let mut h = Hash::default();
        assert_eq!(h.flags(), HashFlags::BINARY | HashFlags::KEEPORDER);
        h.add("zeta", 1).unwrap();
        h.add("alpha", 2).unwrap();
        h.add(10, 3).unwrap();
        assert_eq!(
            keys(&h),
            vec![Item::from("zeta"), Item::from("alpha"), Item::Integer(10)]
        );
    }

    #[test]
    fn test_add_is_upsert() {
        let mut h = Hash::default();
        h.add("k", 1).unwrap();
        h.add("k", 2).unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h.get(&Item::from("k")), Some(&Item::Integer(2)));
    }

    #[test]
    fn test_numeric_keys_share_one_space() {
        let mut h = Hash::default();
        h.add(1, "one").unwrap();
        assert_eq!(h.get(&Item::Double(1.0)), Some(&Item::from("one")));
        assert_eq!(h.get(&Item::Long(1)), Some(&Item::from("one")));
        h.add(1.5, "one and a half").unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_invalid_key_kinds() {
        let mut h = Hash::default();
        assert_eq!(
            h.add(Item::Nil, 1),
            Err(ItemError::InvalidHashKey(Kind::Nil))
        );
        assert_eq!(
            h.add(Item::new_array(0), 1),
            Err(ItemError::InvalidHashKey(Kind::Array))
        );
        assert_eq!(h.get(&Item::Logical(true)), None);
    }

    #[test]
    fn test_ignorecase_matches_any_case() {
        let mut h = Hash::new(HashFlags::IGNORECASE | HashFlags::KEEPORDER);
        h.add("Nombre", "Ana").unwrap();
        assert_eq!(h.get(&Item::from("NOMBRE")), Some(&Item::from("Ana")));
        assert_eq!(h.get(&Item::from("nombre")), Some(&Item::from("Ana")));
        // the stored key keeps its spelling
        assert_eq!(h.key_at(1).unwrap(), &Item::from("Nombre"));
    }

    #[test]
    fn test_sorted_order_across_kinds() {
        let mut h = Hash::new(HashFlags::BINARY);
        h.add("b", 1).unwrap();
        h.add(Item::pointer(7), 2).unwrap();
        h.add(Date::from_ymd(2021, 1, 1), 3).unwrap();
        h.add(2.5, 4).unwrap();
        h.add(-1, 5).unwrap();
        h.add("A", 6).unwrap();
        assert_eq!(
            keys(&h),
            vec![
                Item::Integer(-1),
                Item::Double(2.5),
                Item::Date(Date::from_ymd(2021, 1, 1)),
                Item::Pointer(7),
                Item::from("A"),
                Item::from("b"),
            ]
        );
    }

    #[test]
    fn test_textual_order_without_binary() {
        let mut h = Hash::new(HashFlags::empty());
        h.add("b", 1).unwrap();
        h.add("B", 2).unwrap();
        h.add("a", 3).unwrap();
        assert_eq!(
            keys(&h),
            vec![Item::from("a"), Item::from("B"), Item::from("b")]
        );
    }

    #[test]
    fn test_clearing_keeporder_sorts() {
        let mut h = Hash::default();
        h.add("c", 1).unwrap();
        h.add("a", 2).unwrap();
        h.add("b", 3).unwrap();
        h.clear_flags(HashFlags::KEEPORDER);
        assert_eq!(
            keys(&h),
            vec![Item::from("a"), Item::from("b"), Item::from("c")]
        );
        assert_eq!(h.value_at(1).unwrap(), &Item::Integer(2));
        assert_eq!(h.get(&Item::from("c")), Some(&Item::Integer(1)));
    }

    #[test]
    fn test_resort_is_one_shot() {
        let mut h = Hash::default();
        h.add("y", 1).unwrap();
        h.add("x", 2).unwrap();
        h.set_flags(HashFlags::RESORT);
        assert!(!h.flags().contains(HashFlags::RESORT));
        assert_eq!(keys(&h), vec![Item::from("x"), Item::from("y")]);
        // still insertion ordered afterwards
        h.add("a", 3).unwrap();
        assert_eq!(h.key_at(3).unwrap(), &Item::from("a"));
    }

    #[test]
    fn test_rekey_on_ignorecase_merges_into_first() {
        let mut h = Hash::default();
        h.add("key", 1).unwrap();
        h.add("other", 2).unwrap();
        h.add("KEY", 3).unwrap();
        assert_eq!(h.len(), 3);

        h.set_flags(HashFlags::IGNORECASE);
        assert_eq!(h.len(), 2);
        assert_eq!(h.get_at(1).unwrap(), (&Item::from("key"), &Item::Integer(3)));
        assert_eq!(h.get(&Item::from("Key")), Some(&Item::Integer(3)));
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut h = Hash::default();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            h.add(*k, i as i32).unwrap();
        }
        assert_eq!(h.remove(&Item::from("a")), Some(Item::Integer(0)));
        assert_eq!(h.get(&Item::from("c")), Some(&Item::Integer(2)));
        assert_eq!(h.key_at(1).unwrap(), &Item::from("b"));
        assert_eq!(h.remove(&Item::from("a")), None);
    }

    #[test]
    fn test_get_at_bounds() {
        let mut h = Hash::default();
        h.preallocate(16);
        assert!(h.is_empty());
        h.add("a", 1).unwrap();
        assert_eq!(
            h.get_at(2),
            Err(ItemError::OutOfBounds { index: 2, len: 1 })
        );
    }
}
