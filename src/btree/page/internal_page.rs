use crate::btree::page::base_page::BTreeBasePage;
use crate::btree::page::page::BTreePage;
use crate::btree::page_id::{BTreePageID, PageCategory};
use crate::storage::cell::Cell;
use crate::storage::schema::Schema;
use crate::types::SmallResult;

/// A node pointer: the internal-level record of §3/§4.B. `key` is the
/// routing prefix; `left`/`right` are the children the separator sits
/// between. `record_id` is the index into the owning page's key/child
/// arrays this entry currently occupies -- record_id of entry `i` is
/// always `i`, but callers thread it through so that a later
/// `update_entry`/`delete_key_and_*_child` call doesn't have to
/// re-locate the entry by key comparison.
#[derive(Clone, Debug)]
pub struct Entry {
    pub key: Cell,
    pub left: BTreePageID,
    pub right: BTreePageID,
    pub record_id: usize,
}

impl Entry {
    pub fn new(key: Cell, left: &BTreePageID, right: &BTreePageID) -> Entry {
        Entry {
            key,
            left: left.clone(),
            right: right.clone(),
            record_id: 0,
        }
    }
}

/// An internal (non-leaf) page: `n+1` children bracketing `n`
/// separator keys, `keys[i]` routing between `children[i]` and
/// `children[i+1]`. Per the invariant in §3, the leftmost node
/// pointer on every level conceptually carries the min-rec flag
/// (acts as `-infinity`); since `children[0]` has no key to its left
/// at all, that flag is implicit in this representation rather than
/// stored -- there is no `keys[-1]` slot to hold it.
///
/// Storage note: the teacher's original internal page kept a sparse,
/// bitmap-indexed slot array so that deletions don't have to shift
/// surviving entries. This version keeps the simpler invariant that
/// `children` and `keys` are always dense and key-ordered; every
/// insert/delete pays an `O(entries)` shift, which is fine at the
/// small `max_entries` per page used here and keeps the split/merge
/// algorithms' invariants easier to state. The entry/child semantics
/// (min-rec-as-leftmost-child, node-pointer routing, root-raise,
/// split/merge/lift) are unchanged.
#[derive(Clone, Debug)]
pub struct BTreeInternalPage {
    base: BTreeBasePage,
    keys: Vec<Cell>,
    children: Vec<BTreePageID>,
    max_entries: usize,
    pub key_field: usize,
    /// The min-rec flag (§3/§9 glossary): set on this page iff it is
    /// the leftmost page on its level (`prev == NIL`, invariant 5).
    /// Conceptually a flag on the page's first child slot rather than
    /// a real node-pointer record -- `children[0]` has no key of its
    /// own to carry a flag bit on, so it lives on the page instead.
    min_rec_mark: bool,
}

/// Rough on-page overhead budget reserved for header fields (prev,
/// next, level, index_id, segment headers) -- see §3 page header
/// fields.
const INTERNAL_HEADER_OVERHEAD: usize = 32;

impl BTreeInternalPage {
    pub fn calculate_max_entries(schema: &Schema) -> usize {
        let page_size = crate::btree::page_cache::PageCache::get_page_size();
        let key_field_size = schema.fields[0].field_type.fixed_len();
        // one child pointer (category tag + table id + page index ==
        // 12 bytes, see BTreePageID::encode) per entry, plus one key
        let per_entry = key_field_size + 12;
        (page_size.saturating_sub(INTERNAL_HEADER_OVERHEAD)) / per_entry
    }

    pub fn empty(pid: BTreePageID, tuple_scheme: &Schema, key_field: usize) -> BTreeInternalPage {
        BTreeInternalPage {
            max_entries: Self::calculate_max_entries(tuple_scheme),
            base: BTreeBasePage::new(pid, 0),
            keys: Vec::new(),
            children: Vec::new(),
            key_field,
            min_rec_mark: false,
        }
    }

    pub fn min_rec_mark(&self) -> bool {
        self.min_rec_mark
    }

    /// §4.F `set_min_rec_mark`: flip the flag. Logging is the caller's
    /// job -- `delete_parent_entry`'s generalized Discard path emits
    /// `log_rec_min_mark` alongside the covering `Update` record
    /// whenever it re-derives a spliced child's flag as `true`.
    pub fn set_min_rec_mark(&mut self, value: bool) {
        self.min_rec_mark = value;
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn entries_count(&self) -> usize {
        self.keys.len()
    }

    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    pub fn empty_slots_count(&self) -> usize {
        self.max_entries.saturating_sub(self.entries_count())
    }

    pub fn get_entry(&self, index: usize) -> Entry {
        Entry {
            key: self.keys[index].clone(),
            left: self.children[index].clone(),
            right: self.children[index + 1].clone(),
            record_id: index,
        }
    }

    pub fn get_first_child_pid(&self) -> Option<BTreePageID> {
        self.children.first().cloned()
    }

    pub fn get_last_child_pid(&self) -> Option<BTreePageID> {
        self.children.last().cloned()
    }

    pub fn get_child_pid(&self, index: usize) -> BTreePageID {
        self.children[index].clone()
    }

    /// Locate the entry whose children are exactly `(left, right)`,
    /// used to find the parent's separator when rebalancing two
    /// sibling internal pages.
    pub fn get_entry_by_children(
        &self,
        left: &BTreePageID,
        right: &BTreePageID,
    ) -> Option<Entry> {
        for i in 0..self.entries_count() {
            if &self.children[i] == left && &self.children[i + 1] == right {
                return Some(self.get_entry(i));
            }
        }
        None
    }

    /// Index of the child that search key `key` routes to: the first
    /// entry whose separator is `>= key` routes to its left child,
    /// otherwise the last child.
    pub fn find_child_index(&self, key: &Cell) -> usize {
        for i in 0..self.entries_count() {
            if key < &self.keys[i] {
                return i;
            }
        }
        self.children.len() - 1
    }

    /// Insert a new node pointer. `entry.left` must already be one of
    /// this page's children (or this must be the very first entry
    /// inserted into a freshly-emptied page, in which case both
    /// `left` and `right` are new). On success, `entry.record_id` is
    /// updated to the slot the entry now occupies.
    pub fn insert_entry(&mut self, entry: &mut Entry) -> SmallResult {
        if self.children.is_empty() {
            self.children.push(entry.left.clone());
            self.children.push(entry.right.clone());
            self.keys.push(entry.key.clone());
            entry.record_id = 0;
            return Ok(());
        }

        if self.entries_count() >= self.max_entries {
            return Err(crate::error::SmallError::new(
                "insert_entry: internal page has no empty slots",
            ));
        }

        let pos = self
            .children
            .iter()
            .position(|c| c == &entry.left)
            .ok_or_else(|| {
                crate::error::SmallError::new("insert_entry: left child not found on page")
            })?;

        self.keys.insert(pos, entry.key.clone());
        self.children.insert(pos + 1, entry.right.clone());
        entry.record_id = pos;
        Ok(())
    }

    /// Rewrite entry `record_id`'s key in place, used when
    /// redistribution moves the dividing boundary between two
    /// siblings and the parent's separator must track the new split
    /// point.
    pub fn update_entry(&mut self, entry: &Entry) {
        self.keys[entry.record_id] = entry.key.clone();
    }

    /// Delete an entry together with its right child: used when the
    /// right sibling in a merge has been fully drained and its
    /// separator removed.
    pub fn delete_key_and_right_child(&mut self, record_id: usize) {
        self.keys.remove(record_id);
        self.children.remove(record_id + 1);
    }

    /// Delete an entry together with its left child.
    pub fn delete_key_and_left_child(&mut self, record_id: usize) {
        self.keys.remove(record_id);
        self.children.remove(record_id);
    }

    /// Split this page at entry index `mid`: entries `[0, mid)` (and
    /// their `mid + 1` children) stay here; `keys[mid]` is the
    /// separator that gets promoted to the parent; the trailing
    /// entries `(mid, n)` together with their children are handed back
    /// for the caller to seed a fresh right sibling with.
    pub fn split_off(&mut self, mid: usize) -> (Cell, Vec<Cell>, Vec<BTreePageID>) {
        let promoted_key = self.keys[mid].clone();
        let right_keys = self.keys.split_off(mid + 1);
        self.keys.truncate(mid);
        let right_children = self.children.split_off(mid + 1);
        (promoted_key, right_keys, right_children)
    }

    /// Install `keys`/`children` directly on a freshly-allocated (and
    /// therefore still empty) page, as the right half of a split.
    /// Bypasses `insert_entry`, which validates that each entry's
    /// `left` child is already present -- exactly backwards for a page
    /// that has no children yet.
    pub fn seed_right_half(&mut self, keys: Vec<Cell>, children: Vec<BTreePageID>) {
        debug_assert!(self.keys.is_empty() && self.children.is_empty());
        self.keys = keys;
        self.children = children;
    }

    pub fn keys(&self) -> &[Cell] {
        &self.keys
    }

    pub fn children(&self) -> &[BTreePageID] {
        &self.children
    }

    /// Overwrite this page's entries wholesale. Used by the internal
    /// redistribution path, which computes whole new key/children
    /// arrays for both siblings (by re-cutting their combined sequence
    /// near the middle) before writing either back -- the entry-at-a-
    /// time `insert_entry`/`delete_key_and_*_child` API can't express
    /// "rotate the parent separator through two siblings" cleanly.
    pub fn set_entries(&mut self, keys: Vec<Cell>, children: Vec<BTreePageID>) {
        self.keys = keys;
        self.children = children;
    }

    /// Absorb `other_keys`/`other_children` from a right sibling being
    /// merged into this page, with `promoted_key` (the parent
    /// separator that used to sit between the two siblings) pulled
    /// down to bridge this page's own last child to the absorbed
    /// page's first child.
    pub fn absorb_right(&mut self, promoted_key: Cell, mut other_keys: Vec<Cell>, mut other_children: Vec<BTreePageID>) {
        self.keys.push(promoted_key);
        self.keys.append(&mut other_keys);
        self.children.append(&mut other_children);
    }

    /// Overwrite whichever child slot currently holds `old` with
    /// `new`, without touching any separator key. Used when a child
    /// internal page collapses to a single grandchild (the
    /// generalized Discard case, §4.D) and that grandchild should be
    /// spliced directly into this page in its place.
    pub fn replace_child(&mut self, old: &BTreePageID, new: &BTreePageID) {
        for child in self.children.iter_mut() {
            if child == old {
                *child = new.clone();
                return;
            }
        }
        panic!("replace_child: {} not found among this page's children", old);
    }

    pub fn get_pid(&self) -> BTreePageID {
        self.base.get_pid()
    }

    /// Underflow check: an internal page at the tree's root is exempt
    /// (there is nothing above it to merge into).
    pub fn should_merge(&self) -> bool {
        if self.get_parent_pid().category == PageCategory::RootPointer {
            return false;
        }
        self.entries_count() < self.max_entries.saturating_sub(1) / 2
    }

    pub fn stable(&self) -> bool {
        !self.should_merge()
    }

    pub fn iter(&self) -> BTreeInternalPageIterator {
        BTreeInternalPageIterator {
            page: self,
            front: 0,
            back: self.entries_count(),
        }
    }

    pub fn check_integrity(
        &self,
        parent_pid: &BTreePageID,
        lower_bound: &Option<Cell>,
        upper_bound: &Option<Cell>,
        check_occupancy: bool,
        depth: usize,
    ) -> SmallResult {
        if &self.get_parent_pid() != parent_pid {
            return Err(crate::error::SmallError::new(&format!(
                "internal page {} parent mismatch: expected {}, got {}",
                self.get_pid(),
                parent_pid,
                self.get_parent_pid()
            )));
        }

        let mut previous = lower_bound.clone();
        for key in &self.keys {
            if let Some(prev) = &previous {
                if key <= prev {
                    return Err(crate::error::SmallError::new(&format!(
                        "internal page {} keys out of order",
                        self.get_pid()
                    )));
                }
            }
            previous = Some(key.clone());
        }
        if let (Some(last), Some(upper)) = (&previous, upper_bound) {
            if last >= upper {
                return Err(crate::error::SmallError::new(&format!(
                    "internal page {} last key exceeds upper bound",
                    self.get_pid()
                )));
            }
        }

        if check_occupancy && depth > 0 {
            let min_entries = self.max_entries.saturating_sub(1) / 2;
            if self.entries_count() < min_entries {
                return Err(crate::error::SmallError::new(&format!(
                    "internal page {} underfull: {} entries, minimum {}",
                    self.get_pid(),
                    self.entries_count(),
                    min_entries
                )));
            }
        }

        Ok(())
    }
}

impl BTreePage for BTreeInternalPage {
    fn new(pid: BTreePageID, bytes: &[u8], tuple_scheme: &Schema, key_field: usize) -> Self {
        let max_entries = Self::calculate_max_entries(tuple_scheme);
        let parent_page_index = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let children_count =
            u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let min_rec_mark = bytes[8] != 0;

        let mut offset = 9;
        let mut children = Vec::with_capacity(children_count);
        for _ in 0..children_count {
            children.push(crate::utils::io::Decodeable::decode(&bytes[offset..offset + 12]));
            offset += 12;
        }

        let key_type = tuple_scheme.fields[key_field].field_type;
        let mut keys = Vec::with_capacity(children_count.saturating_sub(1));
        for _ in 0..children_count.saturating_sub(1) {
            let (cell, len) = Cell::decode_one(&bytes[offset..], key_type);
            keys.push(cell);
            offset += len;
        }

        BTreeInternalPage {
            base: BTreeBasePage::new(pid, parent_page_index),
            keys,
            children,
            max_entries,
            key_field,
            min_rec_mark,
        }
    }

    fn get_pid(&self) -> BTreePageID {
        self.base.get_pid()
    }

    fn get_parent_pid(&self) -> BTreePageID {
        self.base.get_parent_pid()
    }

    fn set_parent_pid(&mut self, pid: &BTreePageID) {
        self.base.set_parent_pid(pid)
    }

    fn get_page_data(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(self.base.parent_page_index().to_be_bytes());
        buf.extend((self.children.len() as u32).to_be_bytes());
        buf.push(self.min_rec_mark as u8);
        for child in &self.children {
            buf.extend(crate::utils::io::Encodeable::encode(child));
        }
        for key in &self.keys {
            buf.extend(crate::utils::io::Encodeable::encode(key));
        }
        let page_size = crate::btree::page_cache::PageCache::get_page_size();
        buf.resize(page_size, 0);
        buf
    }
}

pub struct BTreeInternalPageIterator<'page> {
    page: &'page BTreeInternalPage,
    front: usize,
    back: usize,
}

impl<'page> Iterator for BTreeInternalPageIterator<'page> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.front >= self.back {
            return None;
        }
        let entry = self.page.get_entry(self.front);
        self.front += 1;
        Some(entry)
    }
}

impl<'page> DoubleEndedIterator for BTreeInternalPageIterator<'page> {
    fn next_back(&mut self) -> Option<Entry> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.page.get_entry(self.back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::small_int_schema;

    fn pid(table: u32, index: u32) -> BTreePageID {
        BTreePageID::new(PageCategory::Leaf, table, index)
    }

    #[test]
    fn test_insert_and_iterate() {
        let schema = small_int_schema(2, "");
        let page_pid = BTreePageID::new(PageCategory::Internal, 0, 1);
        let mut page = BTreeInternalPage::empty(page_pid, &schema, 0);

        let left = pid(0, 1);
        let mid = pid(0, 2);
        let right = pid(0, 3);

        let mut e1 = Entry::new(Cell::Int64(10), &left, &mid);
        page.insert_entry(&mut e1).unwrap();

        let mut e2 = Entry::new(Cell::Int64(20), &mid, &right);
        page.insert_entry(&mut e2).unwrap();

        assert_eq!(page.entries_count(), 2);
        let entries: Vec<Entry> = page.iter().collect();
        assert_eq!(entries[0].key, Cell::Int64(10));
        assert_eq!(entries[1].key, Cell::Int64(20));
    }

    #[test]
    fn test_delete_key_and_right_child() {
        let schema = small_int_schema(2, "");
        let page_pid = BTreePageID::new(PageCategory::Internal, 0, 1);
        let mut page = BTreeInternalPage::empty(page_pid, &schema, 0);

        let a = pid(0, 1);
        let b = pid(0, 2);
        let c = pid(0, 3);
        let mut e1 = Entry::new(Cell::Int64(10), &a, &b);
        page.insert_entry(&mut e1).unwrap();
        let mut e2 = Entry::new(Cell::Int64(20), &b, &c);
        page.insert_entry(&mut e2).unwrap();

        page.delete_key_and_right_child(1);
        assert_eq!(page.entries_count(), 1);
        assert_eq!(page.children_count(), 2);
    }
}
