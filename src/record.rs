//! BuilderRecord: one build item's identity and resolution state.

use std::fmt;
use std::mem;
use std::num::NonZeroU32;

use crate::error::GraphError;
use crate::label::{Label, Origin};
use crate::pointer_set::{Handle, PointerSet};

/// What kind of build item a record names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemType {
    Target,
    Config,
    Toolchain,
    Pool,
    /// Referenced in a way that does not say what it is yet.
    Unknown,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Target => "target",
            ItemType::Config => "config",
            ItemType::Toolchain => "toolchain",
            ItemType::Pool => "pool",
            ItemType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed declaration a record owns once its build file has been loaded.
pub trait Item: fmt::Debug {
    fn item_type(&self) -> ItemType;
}

/// Index of a record inside its [`RecordMap`](crate::RecordMap).
///
/// Never zero, so `Option<RecordId>` costs nothing and a null id cannot exist.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(NonZeroU32);

impl RecordId {
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or_else(|| panic!("record index {index} does not fit in a RecordId"));
        RecordId(raw)
    }

    /// Position of the record in creation order.
    #[inline]
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl Handle for RecordId {
    #[inline]
    fn addr(self) -> usize {
        self.0.get() as usize
    }
}

/// A node of the build graph.
///
/// A record is created the first time its label is seen, possibly before its
/// declaration has been parsed, in which case it holds no item. It becomes
/// resolved once it has an item and every dependency added with
/// [`RecordMap::add_dep`](crate::RecordMap::add_dep) has resolved.
pub struct BuilderRecord<'a> {
    id: RecordId,
    item_type: ItemType,
    label: Label<'a>,
    item: Option<Box<dyn Item + 'a>>,
    origin: Origin<'a>,
    should_generate: bool,
    resolved: bool,
    unresolved_count: usize,
    all_deps: PointerSet<RecordId>,
    waiting_on_resolution: PointerSet<RecordId>,
}

impl<'a> BuilderRecord<'a> {
    pub(crate) fn new(id: RecordId, label: Label<'a>, origin: Origin<'a>, item_type: ItemType) -> Self {
        Self {
            id,
            item_type,
            label,
            item: None,
            origin,
            should_generate: false,
            resolved: false,
            unresolved_count: 0,
            all_deps: PointerSet::new(),
            waiting_on_resolution: PointerSet::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn label(&self) -> &Label<'a> {
        &self.label
    }

    pub fn item(&self) -> Option<&(dyn Item + 'a)> {
        self.item.as_deref()
    }

    /// Where the label was first referenced.
    pub fn origin(&self) -> &Origin<'a> {
        &self.origin
    }

    /// Attaches the parsed declaration.
    ///
    /// A record created as [`ItemType::Unknown`] takes on the item's type.
    ///
    /// # Returns
    ///
    /// * `Err(GraphError::DuplicateDefinition)` - the record already has an item.
    /// * `Err(GraphError::ItemTypeMismatch)` - the record was referenced as a
    ///   different kind of item.
    pub fn set_item(&mut self, item: Box<dyn Item + 'a>) -> Result<(), GraphError> {
        if self.item.is_some() {
            return Err(GraphError::DuplicateDefinition {
                label: self.label.to_string(),
            });
        }
        let found = item.item_type();
        if self.item_type != ItemType::Unknown && self.item_type != found {
            return Err(GraphError::ItemTypeMismatch {
                label: self.label.to_string(),
                expected: self.item_type,
                found,
            });
        }
        self.item_type = found;
        self.item = Some(item);
        Ok(())
    }

    pub fn should_generate(&self) -> bool {
        self.should_generate
    }

    pub fn set_should_generate(&mut self, should_generate: bool) {
        self.should_generate = should_generate;
    }

    pub fn resolved(&self) -> bool {
        self.resolved
    }

    /// True when the record has its item and no unresolved dependencies.
    pub fn can_resolve(&self) -> bool {
        self.item.is_some() && self.unresolved_count == 0
    }

    /// Marks the record resolved.
    ///
    /// # Returns
    ///
    /// * `bool` - true if the flag flipped now; false if the record was already
    ///            resolved or cannot resolve yet.
    pub fn set_resolved(&mut self) -> bool {
        if self.resolved || !self.can_resolve() {
            return false;
        }
        self.resolved = true;
        true
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved_count
    }

    /// Every record this one depends on, generator-only dependencies included.
    pub fn all_deps(&self) -> &PointerSet<RecordId> {
        &self.all_deps
    }

    /// Every record blocked on this one resolving.
    pub fn waiting_on_resolution(&self) -> &PointerSet<RecordId> {
        &self.waiting_on_resolution
    }

    /// Empties the waiting set, returning what it held. Called once this
    /// record has resolved and its waiters have been notified.
    pub fn take_waiting_on_resolution(&mut self) -> PointerSet<RecordId> {
        mem::take(&mut self.waiting_on_resolution)
    }

    /// Tells this record that `dep` has resolved.
    ///
    /// # Returns
    ///
    /// * `bool` - true if that was the last unresolved dependency. The record
    ///            still needs an item before it can resolve.
    ///
    /// # Panics
    ///
    /// Panics if `dep` is not a dependency of this record or no dependency is
    /// outstanding; either means the caller's cascade is broken.
    pub fn on_resolved_dep(&mut self, dep: RecordId) -> bool {
        assert!(
            self.all_deps.contains(dep),
            "{}: on_resolved_dep for {:?}, which is not a dependency",
            self.label,
            dep
        );
        assert!(
            self.unresolved_count > 0,
            "{}: on_resolved_dep for {:?} with no unresolved dependencies",
            self.label,
            dep
        );
        self.unresolved_count -= 1;
        self.unresolved_count == 0
    }

    pub(crate) fn insert_dep(&mut self, dep: RecordId) -> bool {
        self.all_deps.add(dep)
    }

    pub(crate) fn wait_on_one_more(&mut self) {
        self.unresolved_count += 1;
    }

    pub(crate) fn add_waiter(&mut self, waiter: RecordId) -> bool {
        self.waiting_on_resolution.add(waiter)
    }
}

impl fmt::Debug for BuilderRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRecord")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("item_type", &self.item_type)
            .field("has_item", &self.item.is_some())
            .field("resolved", &self.resolved)
            .field("unresolved_count", &self.unresolved_count)
            .field("all_deps", &self.all_deps)
            .field("waiting_on_resolution", &self.waiting_on_resolution)
            .finish()
    }
}
