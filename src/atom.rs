//! String interning.
//!
//! [`Interner`] hands out one canonical, permanently addressed copy of every
//! distinct string, wrapped in an [`Atom`]. Atoms compare and hash by address,
//! so once text has been interned, equality is a pointer comparison.
//!
//! The interner has two layers:
//!
//! * the shared [`Interner`], a [`HashTable`] plus a slab arena behind one
//!   `parking_lot` mutex, safe to use from many threads at once;
//! * a [`LocalInterner`] per thread or per parsing job, an unsynchronized
//!   cache in front of the shared layer. Text it has already seen costs no
//!   locking at all.
//!
//! Interned text is never freed while the interner lives.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::mem;
use std::ops::Deref;
use std::sync::OnceLock;

use ahash::AHasher;
use parking_lot::Mutex;
use tracing::debug;

use crate::table::{HashTable, TableNode};

/// Number of average-sized strings a slab is sized for.
pub const SLAB_BATCH: usize = 128;
const AVERAGE_ATOM_LEN: usize = 32;

static EMPTY_TEXT: &str = "";

/// An interned string.
///
/// Equality and hashing use the address of the interned text, ordering uses
/// the text itself. Atoms from different interners never compare equal unless
/// both are empty.
#[derive(Clone, Copy)]
pub struct Atom<'a> {
    text: &'a str,
}

impl<'a> Atom<'a> {
    #[inline]
    fn new(text: &'a str) -> Self {
        Self { text }
    }

    #[inline]
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// The address that identifies this atom.
    #[inline]
    pub fn addr(&self) -> usize {
        self.text.as_ptr() as usize
    }
}

impl PartialEq for Atom<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.text, other.text)
    }
}

impl Eq for Atom<'_> {}

impl Hash for Atom<'_> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.addr().hash(state);
    }
}

impl PartialOrd for Atom<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.text.cmp(other.text)
    }
}

impl Deref for Atom<'_> {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.text
    }
}

impl AsRef<str> for Atom<'_> {
    fn as_ref(&self) -> &str {
        self.text
    }
}

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

impl fmt::Debug for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.text, f)
    }
}

/// Anything that can turn text into an [`Atom`] living for `'a`.
pub trait Intern<'a> {
    fn intern(&mut self, text: &str) -> Atom<'a>;
}

/// Tunables for an [`Interner`].
#[derive(Clone, Debug)]
pub struct InternerConfig {
    slab_capacity: usize,
    initial_entries: usize,
}

impl Default for InternerConfig {
    fn default() -> Self {
        Self {
            slab_capacity: SLAB_BATCH * AVERAGE_ATOM_LEN,
            initial_entries: 0,
        }
    }
}

impl InternerConfig {
    /// Sets how many bytes of text each slab reserves. Strings longer than a
    /// slab get an allocation of their own.
    pub fn with_slab_capacity(mut self, bytes: usize) -> Self {
        self.slab_capacity = bytes.max(1);
        self
    }

    /// Pre-sizes the shared table for this many distinct strings.
    pub fn with_initial_entries(mut self, entries: usize) -> Self {
        self.initial_entries = entries;
        self
    }

    pub fn slab_capacity(&self) -> usize {
        self.slab_capacity
    }
}

#[derive(Clone, Copy)]
struct AtomNode<'a> {
    hash: u64,
    text: &'a str,
}

impl TableNode for AtomNode<'_> {
    #[inline]
    fn hash_value(&self) -> u64 {
        self.hash
    }
}

#[inline]
fn hash_text(text: &str) -> u64 {
    BuildHasherDefault::<AHasher>::default().hash_one(text)
}

// Text storage. Slabs are reserved up front and never pushed past their
// capacity, so their heap buffers never move while the arena lives.
struct Arena {
    current: String,
    full: Vec<String>,
    slab_capacity: usize,
}

impl Arena {
    fn new(slab_capacity: usize) -> Self {
        Self {
            current: String::new(),
            full: Vec::new(),
            slab_capacity,
        }
    }

    // The returned reference is only valid while the arena is alive; the
    // 'static lifetime never escapes the Interner unshortened.
    fn alloc(&mut self, text: &str) -> &'static str {
        if text.len() > self.slab_capacity {
            let own = String::from(text);
            let ptr: *const str = own.as_str();
            self.full.push(own);
            // SAFETY: `own`'s heap buffer was moved into `self.full` without reallocation
            // and is dropped only with the arena.
            return unsafe { &*ptr };
        }

        if self.current.capacity() - self.current.len() < text.len() {
            debug!(
                slab_capacity = self.slab_capacity,
                slabs = self.full.len() + 1,
                "allocating string slab"
            );
            let fresh = String::with_capacity(self.slab_capacity);
            let old = mem::replace(&mut self.current, fresh);
            if old.capacity() > 0 {
                self.full.push(old);
            }
        }

        let start = self.current.len();
        self.current.push_str(text);
        let ptr: *const str = &self.current[start..];
        // SAFETY: the push above fit in the reserved capacity, so the buffer did not move,
        // and slabs are only ever moved (not reallocated) into `self.full`.
        unsafe { &*ptr }
    }
}

struct SharedTable {
    table: HashTable<AtomNode<'static>>,
    arena: Arena,
}

/// The shared, thread-safe interning layer.
pub struct Interner {
    shared: Mutex<SharedTable>,
    empty: &'static str,
}

impl Interner {
    pub fn new() -> Self {
        Self::with_config(InternerConfig::default())
    }

    pub fn with_config(config: InternerConfig) -> Self {
        let mut table = HashTable::with_capacity(config.initial_entries.max(1));
        // Seed the empty string so every interner owns a canonical "".
        let hash = hash_text(EMPTY_TEXT);
        let index = table.lookup_index(hash, |_: &AtomNode<'static>| false);
        table.insert_at(
            index,
            AtomNode {
                hash,
                text: EMPTY_TEXT,
            },
        );
        Self {
            shared: Mutex::new(SharedTable {
                table,
                arena: Arena::new(config.slab_capacity),
            }),
            empty: EMPTY_TEXT,
        }
    }

    /// Returns the canonical atom for `text`, interning it on first use.
    ///
    /// Takes the interner's lock for the duration of one lookup-or-insert.
    pub fn intern(&self, text: &str) -> Atom<'_> {
        self.intern_hashed(hash_text(text), text)
    }

    /// The pre-seeded empty atom.
    pub fn empty(&self) -> Atom<'_> {
        Atom::new(self.empty)
    }

    /// Number of distinct strings interned, the empty string included.
    pub fn len(&self) -> usize {
        self.shared.lock().table.len()
    }

    /// Always false: the empty string is seeded at construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn intern_hashed(&self, hash: u64, text: &str) -> Atom<'_> {
        let mut shared = self.shared.lock();
        let SharedTable { table, arena } = &mut *shared;
        let index = table.lookup_index(hash, |node| node.hash == hash && node.text == text);
        if let Some(node) = table.slot(index).node() {
            return Atom::new(node.text);
        }
        let stored = arena.alloc(text);
        table.insert_at(index, AtomNode { hash, text: stored });
        Atom::new(stored)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("Interner")
            .field("len", &shared.table.len())
            .field("slabs", &(shared.arena.full.len() + 1))
            .finish()
    }
}

impl<'a> Intern<'a> for &'a Interner {
    fn intern(&mut self, text: &str) -> Atom<'a> {
        Interner::intern(*self, text)
    }
}

/// An unsynchronized cache in front of an [`Interner`].
///
/// A miss consults the shared interner once and remembers the answer; every
/// later request for the same text is served locally.
pub struct LocalInterner<'a> {
    shared: &'a Interner,
    cache: HashTable<AtomNode<'a>>,
}

impl<'a> LocalInterner<'a> {
    pub fn new(shared: &'a Interner) -> Self {
        let mut cache = HashTable::new();
        let empty = shared.empty();
        let hash = hash_text(empty.as_str());
        let index = cache.lookup_index(hash, |_: &AtomNode<'a>| false);
        cache.insert_at(
            index,
            AtomNode {
                hash,
                text: empty.as_str(),
            },
        );
        Self { shared, cache }
    }

    pub fn intern(&mut self, text: &str) -> Atom<'a> {
        let hash = hash_text(text);
        let index = self
            .cache
            .lookup_index(hash, |node| node.hash == hash && node.text == text);
        if let Some(node) = self.cache.slot(index).node() {
            return Atom::new(node.text);
        }
        let atom = self.shared.intern_hashed(hash, text);
        self.cache.insert_at(
            index,
            AtomNode {
                hash,
                text: atom.as_str(),
            },
        );
        atom
    }

    /// Number of strings cached locally.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn shared(&self) -> &'a Interner {
        self.shared
    }
}

impl<'a> Intern<'a> for LocalInterner<'a> {
    fn intern(&mut self, text: &str) -> Atom<'a> {
        LocalInterner::intern(self, text)
    }
}

impl fmt::Debug for LocalInterner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalInterner")
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// The process-wide interner, created on first use and never torn down.
pub fn global() -> &'static Interner {
    static GLOBAL: OnceLock<Interner> = OnceLock::new();
    GLOBAL.get_or_init(Interner::new)
}

thread_local! {
    static LOCAL: RefCell<LocalInterner<'static>> = RefCell::new(LocalInterner::new(global()));
}

/// Interns `text` in the [`global`] interner through this thread's cache.
pub fn intern(text: &str) -> Atom<'static> {
    LOCAL.with(|local| local.borrow_mut().intern(text))
}
