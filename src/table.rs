//! HashTable: an open-addressing, linear-probing table that every set and map in this crate sits on.
//! The table stores opaque nodes; callers bring the hash and the equality test.

use std::fmt;
use std::mem;

use tracing::trace;

const INITIAL_SIZE: usize = 1;
const FIRST_GROWTH_SIZE: usize = 8; // growing from the initial single slot jumps straight here

/// A node stored in a [`HashTable`].
///
/// `hash_value` must return the same hash the caller passes to
/// [`HashTable::lookup_index`] for this node, since growth re-probes every
/// node by it.
pub trait TableNode {
    /// Whether this node type is ever removed. Tables of non-deletable nodes
    /// never produce tombstones and lookup skips tombstone bookkeeping.
    const DELETABLE: bool = false;

    fn hash_value(&self) -> u64;
}

/// One cell of the bucket array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<N> {
    /// Never held a node.
    Empty,
    /// Held a node that was removed; kept so probe sequences stay intact.
    Tombstone,
    Occupied(N),
}

impl<N> Default for Slot<N> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<N> Slot<N> {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }

    #[inline]
    pub fn node(&self) -> Option<&N> {
        match self {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    pub fn node_mut(&mut self) -> Option<&mut N> {
        match self {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }
}

/// Open-addressing hash table with a power-of-two bucket array.
///
/// The protocol is split in two halves so that derived structures control
/// what gets written: [`lookup_index`](Self::lookup_index) finds either the
/// matching node or the slot where it belongs, the caller writes the slot and
/// then calls [`commit_insert`](Self::commit_insert) or
/// [`commit_remove`](Self::commit_remove). [`insert_at`](Self::insert_at) and
/// [`remove_at`](Self::remove_at) bundle both halves.
///
/// Load factor is kept below 3/4: after every committed insertion
/// `len() * 4 < size() * 3`. The table never shrinks.
pub struct HashTable<N> {
    buckets: Box<[Slot<N>]>,
    count: usize,
    tombstones: usize, // removals since the last rehash, an upper bound on tombstones present
}

impl<N: TableNode> HashTable<N> {
    /// Creates an empty table with a single slot.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty table sized so that `size_hint` nodes fit without growing.
    ///
    /// # Arguments
    ///
    /// * `size_hint` - The number of nodes expected. The table still grows
    ///                 past this if more nodes are inserted.
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            buckets: alloc_buckets(calc_table_size(size_hint)),
            count: 0,
            tombstones: 0,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Length of the bucket array. Always a power of two.
    #[inline]
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Probes for `hash` and returns the index of the slot to use.
    ///
    /// If an occupied slot satisfies `eq` its index is returned (a hit).
    /// Otherwise the result is the insertion point for a node with this hash:
    /// the first tombstone met on the probe sequence, or the empty slot that
    /// ended it (a miss). Inspect [`Slot::is_valid`] on the result to tell the
    /// two apart.
    ///
    /// # Arguments
    ///
    /// * `hash` - The hash of the key being looked up.
    /// * `eq` - Returns true when an occupied node matches the key.
    pub fn lookup_index<F>(&self, hash: u64, mut eq: F) -> usize
    where
        F: FnMut(&N) -> bool,
    {
        let mask = self.buckets.len() - 1;
        let mut index = (hash as usize) & mask;
        let mut first_tombstone: Option<usize> = None;

        // Bounded by size: a table saturated with tombstones has no empty slot to stop at.
        for _ in 0..self.buckets.len() {
            match &self.buckets[index] {
                Slot::Empty => return first_tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if N::DELETABLE && first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied(node) => {
                    if eq(node) {
                        return index;
                    }
                }
            }
            index = (index + 1) & mask;
        }

        // count < size always holds, so a full scan without a hit saw a tombstone.
        match first_tombstone {
            Some(index) => index,
            None => unreachable!("hash table probed every slot without finding room"),
        }
    }

    /// Like [`lookup_index`](Self::lookup_index) but returns the slot itself.
    ///
    /// The returned reference borrows the table, so it cannot be held across
    /// an insertion that might grow the bucket array.
    pub fn lookup<F>(&mut self, hash: u64, eq: F) -> &mut Slot<N>
    where
        F: FnMut(&N) -> bool,
    {
        let index = self.lookup_index(hash, eq);
        &mut self.buckets[index]
    }

    /// Returns the matching node, if any.
    pub fn find<F>(&self, hash: u64, eq: F) -> Option<&N>
    where
        F: FnMut(&N) -> bool,
    {
        self.buckets[self.lookup_index(hash, eq)].node()
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &Slot<N> {
        &self.buckets[index]
    }

    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> &mut Slot<N> {
        &mut self.buckets[index]
    }

    /// Records that the caller filled a slot returned by a miss, growing the
    /// table if the load factor threshold has been reached.
    ///
    /// Any slot index obtained before this call is invalid afterwards.
    pub fn commit_insert(&mut self) {
        self.count += 1;
        if self.count * 4 >= self.buckets.len() * 3 {
            self.grow();
        } else if N::DELETABLE && (self.count + self.tombstones) * 4 >= self.buckets.len() * 3 {
            // Plenty of live room but few empty slots left: purge tombstones in place.
            self.rehash(self.buckets.len());
        }
    }

    /// Records that the caller replaced a previously occupied slot with
    /// [`Slot::Tombstone`].
    pub fn commit_remove(&mut self) {
        debug_assert!(N::DELETABLE, "commit_remove on a table whose nodes are not deletable");
        debug_assert!(self.count > 0, "commit_remove on an empty table");
        self.count -= 1;
        self.tombstones += 1;
    }

    /// Writes `node` into the slot at `index` (which must be a miss returned by
    /// [`lookup_index`](Self::lookup_index)) and commits the insertion.
    pub fn insert_at(&mut self, index: usize, node: N) {
        debug_assert!(!self.buckets[index].is_valid(), "insert_at over an occupied slot");
        self.buckets[index] = Slot::Occupied(node);
        self.commit_insert();
    }

    /// Replaces the occupied slot at `index` with a tombstone, commits the
    /// removal and returns the node that was there.
    ///
    /// # Panics
    ///
    /// Panics if the node type is not deletable or the slot is not occupied.
    pub fn remove_at(&mut self, index: usize) -> N {
        assert!(N::DELETABLE, "remove_at on a table whose nodes are not deletable");
        match mem::replace(&mut self.buckets[index], Slot::Tombstone) {
            Slot::Occupied(node) => {
                self.commit_remove();
                node
            }
            other => {
                self.buckets[index] = other;
                panic!("remove_at on slot {index}, which holds no node");
            }
        }
    }

    /// Drops every node and returns to the initial single-slot array.
    pub fn clear(&mut self) {
        self.buckets = alloc_buckets(INITIAL_SIZE);
        self.count = 0;
        self.tombstones = 0;
    }

    /// Iterates over occupied nodes in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = &N> + '_ {
        self.buckets.iter().filter_map(Slot::node)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut N> + '_ {
        self.buckets.iter_mut().filter_map(Slot::node_mut)
    }

    fn grow(&mut self) {
        let size = self.buckets.len();
        let new_size = if size == INITIAL_SIZE {
            FIRST_GROWTH_SIZE
        } else {
            size * 2
        };
        self.rehash(new_size);
    }

    fn rehash(&mut self, new_size: usize) {
        debug_assert!(new_size.is_power_of_two());
        trace!(
            old_size = self.buckets.len(),
            new_size,
            count = self.count,
            "rehashing table"
        );
        let old = mem::replace(&mut self.buckets, alloc_buckets(new_size));
        let mask = new_size - 1;
        for slot in old.into_vec() {
            if let Slot::Occupied(node) = slot {
                let mut index = (node.hash_value() as usize) & mask;
                while !self.buckets[index].is_null() {
                    index = (index + 1) & mask;
                }
                self.buckets[index] = Slot::Occupied(node);
            }
        }
        self.tombstones = 0;
    }
}

impl<N: TableNode> Default for HashTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> Clone for HashTable<N> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            count: self.count,
            tombstones: self.tombstones,
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for HashTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("size", &self.buckets.len())
            .field("count", &self.count)
            .field(
                "nodes",
                &self.buckets.iter().filter_map(Slot::node).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn alloc_buckets<N>(size: usize) -> Box<[Slot<N>]> {
    (0..size).map(|_| Slot::Empty).collect()
}

#[inline]
fn calc_table_size(size_hint: usize) -> usize {
    if size_hint == 0 {
        return INITIAL_SIZE;
    }
    // Smallest power of two keeping size_hint under the 3/4 load factor.
    let mut size = FIRST_GROWTH_SIZE;
    while size_hint * 4 >= size * 3 {
        size *= 2;
    }
    size
}
