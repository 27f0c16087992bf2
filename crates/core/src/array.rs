//! 1-based arrays
//!
//! The VM addresses array elements from 1. Every positional operation
//! checks `1 <= index <= len` and reports `ItemError::OutOfBounds`
//! otherwise; nothing here panics on a bad index.

use crate::date::Date;
use crate::error::{ItemError, ItemResult};
use crate::item::Item;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    items: Vec<Item>,
}

impl Array {
    /// Array of `len` Nil elements
    pub fn new(len: usize) -> Self {
        Array {
            items: vec![Item::Nil; len],
        }
    }

    /// Empty array with room for `capacity` elements
    pub fn with_capacity(capacity: usize) -> Self {
        Array {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn slot(&self, index: usize) -> ItemResult<usize> {
        if index == 0 || index > self.items.len() {
            return Err(ItemError::OutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        Ok(index - 1)
    }

    pub fn get(&self, index: usize) -> ItemResult<&Item> {
        let i = self.slot(index)?;
        Ok(&self.items[i])
    }

    pub fn get_mut(&mut self, index: usize) -> ItemResult<&mut Item> {
        let i = self.slot(index)?;
        Ok(&mut self.items[i])
    }

    /// Replace element `index`; the previous element is dropped
    pub fn set(&mut self, index: usize, value: impl Into<Item>) -> ItemResult<()> {
        let i = self.slot(index)?;
        self.items[i] = value.into().deref_value();
        Ok(())
    }

    pub fn append(&mut self, value: impl Into<Item>) {
        self.items.push(value.into().deref_value());
    }

    /// Grow with Nil elements or truncate to `len`
    pub fn resize(&mut self, len: usize) {
        self.items.resize(len, Item::Nil);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    // Typed element helpers. Getters read numbers of any width and return
    // zero for non-numeric elements, matching the VM's array accessors.

    pub fn get_double(&self, index: usize) -> ItemResult<f64> {
        Ok(self.get(index)?.to_f64().unwrap_or(0.0))
    }

    pub fn get_int(&self, index: usize) -> ItemResult<i32> {
        Ok(self.get(index)?.to_i32().unwrap_or(0))
    }

    pub fn get_long(&self, index: usize) -> ItemResult<i64> {
        Ok(self.get(index)?.to_i64().unwrap_or(0))
    }

    pub fn get_logical(&self, index: usize) -> ItemResult<bool> {
        Ok(self.get(index)?.as_logical().unwrap_or(false))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> ItemResult<()> {
        self.set(index, Item::Double(value))
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> ItemResult<()> {
        self.set(index, Item::Integer(value))
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> ItemResult<()> {
        self.set(index, Item::Long(value))
    }

    pub fn set_logical(&mut self, index: usize, value: bool) -> ItemResult<()> {
        self.set(index, Item::Logical(value))
    }

    pub fn set_str(&mut self, index: usize, value: &str) -> ItemResult<()> {
        self.set(index, Item::from(value))
    }

    /// Store a date given as `YYYYMMDD`
    pub fn set_date_str(&mut self, index: usize, yyyymmdd: &str) -> ItemResult<()> {
        self.set(index, Date::from_yyyymmdd(yyyymmdd.as_bytes()))
    }
}

impl From<Vec<Item>> for Array {
    fn from(items: Vec<Item>) -> Self {
        Array {
            items: items.into_iter().map(Item::deref_value).collect(),
        }
    }
}

impl FromIterator<Item> for Array {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Array {
            items: iter.into_iter().map(Item::deref_value).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Slot;

    #[test]
    fn test_new_is_nil_filled() {
        let a = Array::new(3);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(Item::is_nil));
    }

    #[test]
    fn test_bounds_are_one_based() {
        let mut a = Array::new(2);
        assert_eq!(
            a.get(0),
            Err(ItemError::OutOfBounds { index: 0, len: 2 })
        );
        assert!(a.get(2).is_ok());
        assert_eq!(
            a.set(3, 1),
            Err(ItemError::OutOfBounds { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_typed_helpers() {
        let mut a = Array::new(6);
        a.set_double(1, 3.5).unwrap();
        a.set_int(2, 42).unwrap();
        a.set_long(3, 95_415_545_541).unwrap();
        a.set_logical(4, true).unwrap();
        a.set_str(5, "Harbour").unwrap();
        a.set_date_str(6, "20210517").unwrap();

        assert_eq!(a.get_double(1).unwrap(), 3.5);
        assert_eq!(a.get_int(2).unwrap(), 42);
        assert_eq!(a.get_double(2).unwrap(), 42.0);
        assert_eq!(a.get_long(3).unwrap(), 95_415_545_541);
        assert!(a.get_logical(4).unwrap());
        // non-numeric element reads as zero
        assert_eq!(a.get_int(5).unwrap(), 0);
        assert_eq!(a.get(6).unwrap().as_date().unwrap().to_yyyymmdd(), "20210517");
    }

    #[test]
    fn test_resize_and_append() {
        let mut a = Array::with_capacity(4);
        assert!(a.is_empty());
        a.append(1);
        a.append("two");
        a.resize(4);
        assert_eq!(a.len(), 4);
        assert!(a.get(4).unwrap().is_nil());
        a.resize(1);
        assert_eq!(a.as_slice(), &[Item::Integer(1)]);
    }

    #[test]
    fn test_storing_a_reference_stores_its_value() {
        let slot = Slot::new(9);
        let mut a = Array::new(1);
        a.set(1, slot.by_ref()).unwrap();
        slot.set(10);
        assert_eq!(a.get(1).unwrap(), &Item::Integer(9));
    }
}
