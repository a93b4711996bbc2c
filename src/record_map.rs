//! RecordMap: the label-keyed directory that owns every [`BuilderRecord`], and
//! the dependency edges between them.

use std::fmt;
use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::label::{Label, Origin};
use crate::record::{BuilderRecord, ItemType, RecordId};
use crate::table::{HashTable, TableNode};

#[derive(Clone, Copy)]
struct RecordNode {
    hash: u64,
    id: RecordId,
}

// Records are never removed, so the index never holds tombstones.
impl TableNode for RecordNode {
    #[inline]
    fn hash_value(&self) -> u64 {
        self.hash
    }
}

/// Owns every record of a build graph and indexes them by label.
///
/// Records live in creation order in an arena and refer to each other by
/// [`RecordId`], so dependency cycles are plain index pairs. Dropping the map
/// drops every record and every item.
pub struct RecordMap<'a> {
    records: Vec<BuilderRecord<'a>>,
    index: HashTable<RecordNode>,
}

impl<'a> RecordMap<'a> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map that holds `size_hint` records before its index grows.
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            records: Vec::with_capacity(size_hint),
            index: HashTable::with_capacity(size_hint),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record for `label`.
    pub fn find(&self, label: &Label<'a>) -> Option<RecordId> {
        let records = &self.records;
        self.index
            .find(label.hash_value(), |node| records[node.id.index()].label() == label)
            .map(|node| node.id)
    }

    /// Returns the record for `label`, creating a placeholder if none exists.
    ///
    /// # Arguments
    ///
    /// * `label` - The record's key.
    /// * `origin` - Where the label was referenced; kept only if the record is created.
    /// * `item_type` - The kind of item the reference implies; kept only if the record is created.
    ///
    /// # Returns
    ///
    /// * `(bool, RecordId)` - whether a record was created, and the record.
    pub fn try_emplace(
        &mut self,
        label: Label<'a>,
        origin: Origin<'a>,
        item_type: ItemType,
    ) -> (bool, RecordId) {
        let hash = label.hash_value();
        let records = &self.records;
        let slot = self
            .index
            .lookup_index(hash, |node| *records[node.id.index()].label() == label);
        if let Some(node) = self.index.slot(slot).node() {
            return (false, node.id);
        }

        let id = RecordId::from_index(self.records.len());
        trace!(%label, %origin, %item_type, "creating record");
        self.records.push(BuilderRecord::new(id, label, origin, item_type));
        self.index.insert_at(slot, RecordNode { hash, id });
        (true, id)
    }

    /// # Panics
    ///
    /// Panics if `id` did not come from this map.
    pub fn get(&self, id: RecordId) -> &BuilderRecord<'a> {
        &self.records[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` did not come from this map.
    pub fn get_mut(&mut self, id: RecordId) -> &mut BuilderRecord<'a> {
        &mut self.records[id.index()]
    }

    /// Iterates over records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &BuilderRecord<'a>> + '_ {
        self.records.iter()
    }

    /// Records that `from` depends on `to` and cannot resolve before it.
    ///
    /// Adding the same edge twice has no further effect. If `to` has already
    /// resolved the edge is recorded but `from` does not wait on it.
    pub fn add_dep(&mut self, from: RecordId, to: RecordId) {
        let to_resolved = self.records[to.index()].resolved();
        let from_record = &mut self.records[from.index()];
        if !from_record.insert_dep(to) {
            return;
        }
        if !to_resolved {
            from_record.wait_on_one_more();
            self.records[to.index()].add_waiter(from);
        }
    }

    /// Records that `from` depends on `to` for generation only. The edge
    /// appears in `all_deps` but never holds up resolution.
    pub fn add_gen_dep(&mut self, from: RecordId, to: RecordId) {
        self.records[from.index()].insert_dep(to);
    }

    /// The dependencies of `id` that it is still waiting on, sorted by label.
    ///
    /// Meant for diagnostics, e.g. reporting the records on a cycle that can
    /// never resolve.
    pub fn sorted_unresolved_deps(&self, id: RecordId) -> Vec<RecordId> {
        let mut deps: Vec<RecordId> = self.records[id.index()]
            .all_deps()
            .iter()
            .filter(|dep| self.records[dep.index()].waiting_on_resolution().contains(id))
            .collect();
        deps.sort_by(|a, b| self.records[a.index()].label().cmp(self.records[b.index()].label()));
        deps
    }

    /// Resolves `id` and every record this unblocks, transitively.
    ///
    /// `on_resolved` is called once for each record as it resolves, `id`
    /// first. Deciding what to load next is left to the caller. Records whose
    /// dependencies all resolve but which have no item yet stay unresolved;
    /// call `resolve` on them once their item is set.
    ///
    /// # Returns
    ///
    /// * `usize` - how many records resolved. Zero if `id` cannot resolve or
    ///             already has.
    pub fn resolve<F>(&mut self, id: RecordId, mut on_resolved: F) -> usize
    where
        F: FnMut(&BuilderRecord<'a>),
    {
        let mut pending = vec![id];
        let mut resolved = 0;
        while let Some(current) = pending.pop() {
            let record = &mut self.records[current.index()];
            if !record.set_resolved() {
                continue;
            }
            resolved += 1;
            let waiters = record.take_waiting_on_resolution();
            on_resolved(&self.records[current.index()]);

            for waiter in waiters.iter() {
                let waiting = &mut self.records[waiter.index()];
                if waiting.on_resolved_dep(current) && waiting.can_resolve() {
                    pending.push(waiter);
                }
            }
        }
        if resolved > 0 {
            debug!(label = %self.records[id.index()].label(), resolved, "resolved records");
        }
        resolved
    }
}

impl Default for RecordMap<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Index<RecordId> for RecordMap<'a> {
    type Output = BuilderRecord<'a>;

    fn index(&self, id: RecordId) -> &BuilderRecord<'a> {
        self.get(id)
    }
}

impl<'a> IndexMut<RecordId> for RecordMap<'a> {
    fn index_mut(&mut self, id: RecordId) -> &mut BuilderRecord<'a> {
        self.get_mut(id)
    }
}

impl fmt::Debug for RecordMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.records.iter()).finish()
    }
}
