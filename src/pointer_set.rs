//! PointerSet: a set of non-owning handles compared by identity.

use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault};
use std::num::{NonZeroU32, NonZeroU64, NonZeroUsize};
use std::ptr::NonNull;

use ahash::AHasher;

use crate::table::{HashTable, TableNode};

/// A copyable, never-null handle whose identity is a machine word.
///
/// Two handles are the same set member exactly when their [`addr`](Self::addr)
/// values are equal. For references and pointers that is the pointee address,
/// not the pointee's value.
pub trait Handle: Copy {
    /// The identity of this handle. Never zero.
    fn addr(self) -> usize;
}

impl<T: ?Sized> Handle for &T {
    #[inline]
    fn addr(self) -> usize {
        self as *const T as *const () as usize
    }
}

impl<T: ?Sized> Handle for NonNull<T> {
    #[inline]
    fn addr(self) -> usize {
        self.as_ptr() as *const () as usize
    }
}

impl Handle for NonZeroUsize {
    #[inline]
    fn addr(self) -> usize {
        self.get()
    }
}

impl Handle for NonZeroU32 {
    #[inline]
    fn addr(self) -> usize {
        self.get() as usize
    }
}

impl Handle for NonZeroU64 {
    #[inline]
    fn addr(self) -> usize {
        self.get() as usize
    }
}

#[derive(Clone, Copy)]
struct HandleNode<H>(H);

impl<H: Handle> TableNode for HandleNode<H> {
    const DELETABLE: bool = true;

    #[inline]
    fn hash_value(&self) -> u64 {
        hash_addr(self.0.addr())
    }
}

#[inline]
fn hash_addr(addr: usize) -> u64 {
    BuildHasherDefault::<AHasher>::default().hash_one(addr)
}

/// A set of [`Handle`]s. Holds no ownership over what the handles point to,
/// so cloning the set copies handles only.
///
/// Iteration order is bucket order: it depends on hashes and on the insertion
/// history, and is not stable across growth.
#[derive(Clone)]
pub struct PointerSet<H> {
    table: HashTable<HandleNode<H>>,
}

impl<H: Handle> PointerSet<H> {
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }

    /// Creates an empty set that can hold `size_hint` handles without growing.
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            table: HashTable::with_capacity(size_hint),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, handle: H) -> bool {
        let addr = handle.addr();
        self.table
            .find(hash_addr(addr), |node| node.0.addr() == addr)
            .is_some()
    }

    /// Adds `handle` to the set.
    ///
    /// # Returns
    ///
    /// * `bool` - true if the handle was inserted, false if it was already present.
    pub fn add(&mut self, handle: H) -> bool {
        let addr = handle.addr();
        let index = self
            .table
            .lookup_index(hash_addr(addr), |node| node.0.addr() == addr);
        if self.table.slot(index).is_valid() {
            return false;
        }
        self.table.insert_at(index, HandleNode(handle));
        true
    }

    /// Removes `handle` from the set.
    ///
    /// # Returns
    ///
    /// * `bool` - true if the handle was present.
    pub fn erase(&mut self, handle: H) -> bool {
        let addr = handle.addr();
        let index = self
            .table
            .lookup_index(hash_addr(addr), |node| node.0.addr() == addr);
        if !self.table.slot(index).is_valid() {
            return false;
        }
        self.table.remove_at(index);
        true
    }

    /// Adds every handle yielded by `handles`.
    pub fn insert_all<I>(&mut self, handles: I)
    where
        I: IntoIterator<Item = H>,
    {
        for handle in handles {
            self.add(handle);
        }
    }

    /// Returns a new set holding the handles present in both `self` and `other`.
    pub fn intersection_with(&self, other: &PointerSet<H>) -> PointerSet<H> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut result = PointerSet::new();
        for handle in small.iter() {
            if large.contains(handle) {
                result.add(handle);
            }
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = H> + '_ {
        self.table.iter().map(|node| node.0)
    }

    /// Copies the handles out in iteration order.
    pub fn to_vec(&self) -> Vec<H> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl<H: Handle> Default for PointerSet<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle> Extend<H> for PointerSet<H> {
    fn extend<I: IntoIterator<Item = H>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<H: Handle> FromIterator<H> for PointerSet<H> {
    fn from_iter<I: IntoIterator<Item = H>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = PointerSet::with_capacity(iter.size_hint().0);
        set.insert_all(iter);
        set
    }
}

impl<H: Handle> PartialEq for PointerSet<H> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|handle| other.contains(handle))
    }
}

impl<H: Handle> Eq for PointerSet<H> {}

impl<H: Handle + fmt::Debug> fmt::Debug for PointerSet<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
