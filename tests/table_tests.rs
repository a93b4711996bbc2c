use std::collections::HashSet;

use buildgraph_rs::{HashTable, Slot, TableNode};
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct KeyNode {
    hash: u64,
    key: u64,
}

impl TableNode for KeyNode {
    const DELETABLE: bool = true;

    fn hash_value(&self) -> u64 {
        self.hash
    }
}

#[derive(Clone, Debug)]
struct FixedNode(u64);

impl TableNode for FixedNode {
    fn hash_value(&self) -> u64 {
        self.0
    }
}

fn spread(key: u64) -> u64 {
    key.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn insert(table: &mut HashTable<KeyNode>, key: u64, hash: u64) -> bool {
    let index = table.lookup_index(hash, |node| node.key == key);
    if table.slot(index).is_valid() {
        return false;
    }
    table.insert_at(index, KeyNode { hash, key });
    true
}

fn erase(table: &mut HashTable<KeyNode>, key: u64, hash: u64) -> bool {
    let index = table.lookup_index(hash, |node| node.key == key);
    if !table.slot(index).is_valid() {
        return false;
    }
    table.remove_at(index);
    true
}

fn contains(table: &HashTable<KeyNode>, key: u64, hash: u64) -> bool {
    table.find(hash, |node| node.key == key).is_some()
}

#[test]
fn test_fresh_table_has_one_slot() {
    let mut table: HashTable<KeyNode> = HashTable::new();
    assert_eq!(table.size(), 1);
    assert!(table.is_empty());
    assert!(!contains(&table, 7, spread(7)));

    assert!(insert(&mut table, 7, spread(7)));
    assert_eq!(table.size(), 8, "first growth goes from 1 straight to 8");
    assert!(contains(&table, 7, spread(7)));
    assert!(!insert(&mut table, 7, spread(7)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_no_false_negatives_across_growth() {
    for n in [1u64, 7, 8, 9, 100, 1000] {
        let mut table = HashTable::new();
        for key in 0..n {
            assert!(insert(&mut table, key, spread(key)));
        }
        assert_eq!(table.len(), n as usize);
        for key in 0..n {
            assert!(contains(&table, key, spread(key)), "n={n}: key {key} missing");
        }
        for key in n..n + 50 {
            assert!(!contains(&table, key, spread(key)), "n={n}: key {key} present");
        }
    }
}

#[test]
fn test_load_factor_after_every_insert() {
    let mut table = HashTable::new();
    for key in 0..5000u64 {
        insert(&mut table, key, spread(key));
        assert!(table.size().is_power_of_two());
        assert!(
            table.len() * 4 < table.size() * 3,
            "len {} size {}",
            table.len(),
            table.size()
        );
    }
}

#[test]
fn test_tombstone_keeps_probe_chain() {
    let mut table = HashTable::with_capacity(4);
    let hash = 3; // every key lands in the same bucket

    assert!(insert(&mut table, 1, hash));
    assert!(insert(&mut table, 2, hash));
    assert!(erase(&mut table, 1, hash));

    // 2 sits behind the tombstone left by 1.
    assert!(contains(&table, 2, hash));
    assert!(!contains(&table, 1, hash));

    assert!(insert(&mut table, 3, hash));
    assert!(contains(&table, 3, hash));
    assert!(contains(&table, 2, hash));
    assert!(!contains(&table, 1, hash));
    assert_eq!(table.len(), 2);
}

#[test]
fn test_miss_reuses_first_tombstone() {
    let mut table = HashTable::with_capacity(4);
    let hash = 5;

    insert(&mut table, 10, hash);
    let first = table.lookup_index(hash, |node| node.key == 10);
    erase(&mut table, 10, hash);
    assert!(table.slot(first).is_tombstone());

    let index = table.lookup_index(hash, |node| node.key == 11);
    assert_eq!(index, first);
    assert!(!table.slot(index).is_valid());
}

#[test]
fn test_insert_erase_churn_stays_small() {
    let mut table = HashTable::new();
    for key in 0..10_000u64 {
        assert!(insert(&mut table, key, spread(key)));
        assert!(erase(&mut table, key, spread(key)));
        assert!(!contains(&table, key + 1, spread(key + 1)));
    }
    assert!(table.is_empty());
    assert_eq!(table.size(), 8);
}

#[test]
fn test_lookup_slot_states() {
    let mut table: HashTable<FixedNode> = HashTable::with_capacity(8);
    let slot = table.lookup(42, |node| node.0 == 42);
    assert!(slot.is_null());
    *slot = Slot::Occupied(FixedNode(42));
    table.commit_insert();

    let slot = table.lookup(42, |node| node.0 == 42);
    assert!(slot.is_valid());
    assert_eq!(slot.node().map(|node| node.0), Some(42));
}

#[test]
#[should_panic(expected = "not deletable")]
fn test_remove_from_non_deletable_table_panics() {
    let mut table: HashTable<FixedNode> = HashTable::new();
    let index = table.lookup_index(1, |node| node.0 == 1);
    table.insert_at(index, FixedNode(1));
    let index = table.lookup_index(1, |node| node.0 == 1);
    table.remove_at(index);
}

#[test]
fn test_with_capacity_avoids_growth() {
    let mut table = HashTable::with_capacity(100);
    let size = table.size();
    for key in 0..100u64 {
        insert(&mut table, key, spread(key));
    }
    assert_eq!(table.size(), size);
}

#[test]
fn test_clear_and_clone() {
    let mut table = HashTable::new();
    for key in 0..20u64 {
        insert(&mut table, key, spread(key));
    }
    let copy = table.clone();
    table.clear();

    assert_eq!(table.size(), 1);
    assert!(table.is_empty());
    assert!(!contains(&table, 3, spread(3)));
    assert_eq!(copy.len(), 20);
    assert!(contains(&copy, 3, spread(3)));

    let mut keys: Vec<u64> = copy.iter().map(|node| node.key).collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..20).collect::<Vec<_>>());
}

proptest! {
    // Hashes collapse onto a few buckets so probing, tombstones and growth all get exercised.
    #[test]
    fn prop_contains_matches_model(
        ops in proptest::collection::vec((any::<bool>(), 0u64..64), 0..400)
    ) {
        let mut table = HashTable::new();
        let mut model = HashSet::new();
        for (add, key) in ops {
            let hash = key % 5;
            if add {
                prop_assert_eq!(insert(&mut table, key, hash), model.insert(key));
            } else {
                prop_assert_eq!(erase(&mut table, key, hash), model.remove(&key));
            }
            prop_assert_eq!(table.len(), model.len());
            prop_assert!(table.len() * 4 < table.size() * 3);
        }
        for key in 0..64u64 {
            prop_assert_eq!(contains(&table, key, key % 5), model.contains(&key));
        }
    }
}
