//! Property-based tests for items and containers
//!
//! Checks, over generated inputs:
//! 1. Typed access returns exactly the payload an item was made from
//! 2. Array set/get agree inside bounds and fail outside
//! 3. Hash add/get agree under every flag combination
//! 4. Snapshots restore an equal item

use itembridge_core::snapshot;
use itembridge_core::{Array, Date, Hash, HashFlags, Item, ItemError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn flags_strategy() -> impl Strategy<Value = HashFlags> {
    (0u32..16).prop_map(HashFlags::from_bits_truncate)
}

fn key_strategy() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<i32>().prop_map(Item::Integer),
        any::<i64>().prop_map(Item::Long),
        "[a-zA-Z]{1,8}".prop_map(Item::from),
        (1i64..=365).prop_map(|d| Item::Date(Date::from_julian(2_460_310 + d))),
    ]
}

fn data_item_strategy() -> impl Strategy<Value = Item> {
    let leaf = prop_oneof![
        Just(Item::Nil),
        any::<bool>().prop_map(Item::Logical),
        any::<i32>().prop_map(Item::Integer),
        any::<i64>().prop_map(Item::Long),
        (-1.0e9f64..1.0e9).prop_map(Item::Double),
        "[ -~]{0,12}".prop_map(Item::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(|items| Item::array(Array::from(items)))
    })
}

proptest! {
    #[test]
    fn typed_access_returns_payload(b in any::<bool>(), n in any::<i32>(), l in any::<i64>(),
                                    d in any::<f64>(), s in "[ -~]{0,20}", p in any::<usize>()) {
        prop_assert_eq!(Item::logical(b).as_logical(), Some(b));
        prop_assert_eq!(Item::integer(n).as_integer(), Some(n));
        prop_assert_eq!(Item::long(l).as_long(), Some(l));
        prop_assert_eq!(Item::double(d).as_double().map(f64::to_bits), Some(d.to_bits()));
        let string_item = Item::string(s.as_str());
        prop_assert_eq!(string_item.as_str_bytes(), Some(s.as_bytes()));
        prop_assert_eq!(Item::pointer(p).as_pointer(), Some(p));
    }

    #[test]
    fn dates_survive_yyyymmdd(y in 1i32..=9999, m in 1u32..=12, d in 1u32..=28) {
        let date = Date::from_ymd(y, m, d);
        prop_assert_eq!(date.ymd(), (y, m, d));
        prop_assert_eq!(Date::from_yyyymmdd(date.to_yyyymmdd().as_bytes()), date);
    }

    #[test]
    fn array_set_get_within_bounds(len in 1usize..32, value in any::<i64>(), seed in any::<usize>()) {
        let mut array = Array::new(len);
        let index = seed % len + 1;
        array.set(index, value).unwrap();
        prop_assert_eq!(array.get(index).unwrap(), &Item::Long(value));
        prop_assert_eq!(
            array.get(len + 1),
            Err(ItemError::OutOfBounds { index: len + 1, len })
        );
        prop_assert_eq!(array.get(0), Err(ItemError::OutOfBounds { index: 0, len }));
    }

    #[test]
    fn hash_add_then_get(flags in flags_strategy(),
                         pairs in prop::collection::vec((key_strategy(), any::<i32>()), 1..24)) {
        let mut hash = Hash::new(flags);
        for (key, value) in &pairs {
            hash.add(key.clone(), *value).unwrap();
        }
        // the last write for a key wins
        for (key, _) in &pairs {
            let last = pairs
                .iter()
                .rev()
                .find(|(k, _)| hash_key_eq(k, key, flags))
                .map(|(_, v)| Item::Integer(*v));
            prop_assert_eq!(hash.get(key).cloned(), last);
        }
        prop_assert!(hash.len() <= pairs.len());
    }

    #[test]
    fn snapshot_restores_equal_item(item in data_item_strategy()) {
        let bytes = snapshot::to_bytes(&item).unwrap();
        prop_assert_eq!(snapshot::from_bytes(&bytes).unwrap(), item);
    }
}

// Key equality as the hash defines it: one numeric space, optional case folding
fn hash_key_eq(a: &Item, b: &Item, flags: HashFlags) -> bool {
    match (a.to_i64(), b.to_i64()) {
        (Some(x), Some(y)) => return x == y,
        (Some(_), None) | (None, Some(_)) => return false,
        (None, None) => {}
    }
    match (a.as_str_bytes(), b.as_str_bytes()) {
        (Some(x), Some(y)) if flags.contains(HashFlags::IGNORECASE) => x.eq_ignore_ascii_case(y),
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[test]
fn hash_ordinal_access_follows_iteration_order() {
    let mut hash = Hash::new(HashFlags::empty());
    for key in ["delta", "alpha", "charlie", "bravo"] {
        hash.add(key, key.len() as i32).unwrap();
    }
    let keys: Vec<Item> = (1..=hash.len())
        .map(|i| hash.key_at(i).unwrap().clone())
        .collect();
    let iterated: Vec<Item> = hash.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, iterated);
    assert_eq!(keys[0], Item::from("alpha"));
}
