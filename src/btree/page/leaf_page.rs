use crate::btree::page::base_page::BTreeBasePage;
use crate::btree::page::page::BTreePage;
use crate::btree::page_id::{BTreePageID, PageCategory};
use crate::storage::cell::Cell;
use crate::storage::schema::Schema;
use crate::storage::tuple::{Tuple, WrappedTuple};
use crate::types::SmallResult;
use crate::utils::io::Encodeable;

const LEAF_HEADER_OVERHEAD: usize = 24;

/// A leaf page: the full indexed tuple for every user record (§3). No
/// virtual dispatch between leaf/internal -- see the "deep dispatch"
/// design note -- this is a concrete, tagged type with its own
/// accessor surface instead of an implementor of some shared "page
/// body" trait object.
///
/// As with `BTreeInternalPage`, tuples are kept dense and key-ordered
/// rather than living at stable bitmap-addressed slots; see the note
/// there for why.
#[derive(Clone, Debug)]
pub struct BTreeLeafPage {
    base: BTreeBasePage,
    tuples: Vec<Tuple>,
    tuple_scheme: Schema,
    pub key_field: usize,
    right_sibling_id: Option<u32>,
    left_sibling_id: Option<u32>,
    max_tuples: usize,
    /// `PAGE_LAST_INSERT` (§3 page header fields): slot of the most
    /// recent successful in-place insert, consulted by the split-point
    /// heuristics (§4.E) to detect a sequential-insert workload. Reset
    /// to `None` by any structural change to this page's tuple set
    /// other than a plain insert.
    last_insert_slot: Option<usize>,
}

impl BTreeLeafPage {
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let page_size = crate::btree::page_cache::PageCache::get_page_size();
        let tuple_size = schema.tuple_size();
        (page_size.saturating_sub(LEAF_HEADER_OVERHEAD)) / tuple_size.max(1)
    }

    pub fn empty(pid: BTreePageID, tuple_scheme: Schema, key_field: usize) -> BTreeLeafPage {
        let max_tuples = Self::calculate_slots_count(&tuple_scheme);
        BTreeLeafPage {
            base: BTreeBasePage::new(pid, 0),
            tuples: Vec::new(),
            tuple_scheme,
            key_field,
            right_sibling_id: None,
            left_sibling_id: None,
            max_tuples,
            last_insert_slot: None,
        }
    }

    pub fn get_pid(&self) -> BTreePageID {
        self.base.get_pid()
    }

    pub fn get_slots_count(&self) -> usize {
        self.max_tuples
    }

    pub fn tuples_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn empty_slots_count(&self) -> usize {
        self.max_tuples.saturating_sub(self.tuples.len())
    }

    pub fn get_right_pid(&self) -> Option<BTreePageID> {
        self.right_sibling_id
            .map(|idx| BTreePageID::new(PageCategory::Leaf, self.get_pid().table_id, idx))
    }

    pub fn set_right_pid(&mut self, pid: Option<BTreePageID>) {
        self.right_sibling_id = pid.map(|p| p.page_index);
    }

    pub fn get_left_pid(&self) -> Option<BTreePageID> {
        self.left_sibling_id
            .map(|idx| BTreePageID::new(PageCategory::Leaf, self.get_pid().table_id, idx))
    }

    pub fn set_left_pid(&mut self, pid: Option<BTreePageID>) {
        self.left_sibling_id = pid.map(|p| p.page_index);
    }

    pub fn set_parent_pid(&mut self, pid: &BTreePageID) {
        self.base.set_parent_pid(pid)
    }

    pub fn get_parent_pid(&self) -> BTreePageID {
        self.base.get_parent_pid()
    }

    /// Insert keeping the key field in strictly increasing order.
    pub fn insert_tuple(&mut self, tuple: &Tuple) {
        let key = tuple.get_cell(self.key_field);
        let pos = self
            .tuples
            .iter()
            .position(|t| t.get_cell(self.key_field) > key)
            .unwrap_or(self.tuples.len());
        self.tuples.insert(pos, tuple.clone());
        self.last_insert_slot = Some(pos);
    }

    pub fn get_last_insert_slot(&self) -> Option<usize> {
        self.last_insert_slot
    }

    /// Any structural change wider than a single insert (split, merge,
    /// redistribution, reorganize) invalidates the sequential-insert
    /// hint -- a fresh page has no "previous insert position" to
    /// reason about.
    pub fn clear_last_insert_slot(&mut self) {
        self.last_insert_slot = None;
    }

    /// Logical analogue of §4.A `data_size`: total footprint of the
    /// tuples currently stored, used by the merge feasibility check.
    pub fn data_size(&self) -> usize {
        self.tuples.len() * self.tuple_scheme.tuple_size()
    }

    pub fn get_tuple(&self, slot_number: usize) -> WrappedTuple {
        WrappedTuple::new(self.tuples[slot_number].clone(), slot_number, self.get_pid())
    }

    pub fn delete_tuple(&mut self, slot_number: usize) {
        self.tuples.remove(slot_number);
        self.last_insert_slot = None;
    }

    pub fn first_key(&self) -> Option<Cell> {
        self.tuples.first().map(|t| t.get_cell(self.key_field))
    }

    pub fn last_key(&self) -> Option<Cell> {
        self.tuples.last().map(|t| t.get_cell(self.key_field))
    }

    /// Remove and return the last `count` tuples, for a split that
    /// moves the tail of the page onto a new right sibling.
    pub fn take_tail(&mut self, count: usize) -> Vec<Tuple> {
        let split_at = self.tuples.len() - count;
        self.last_insert_slot = None;
        self.tuples.split_off(split_at)
    }

    /// Remove and return the first `count` tuples.
    pub fn take_head(&mut self, count: usize) -> Vec<Tuple> {
        let rest = self.tuples.split_off(count);
        self.last_insert_slot = None;
        std::mem::replace(&mut self.tuples, rest)
    }

    pub fn extend_tail(&mut self, mut tuples: Vec<Tuple>) {
        self.last_insert_slot = None;
        self.tuples.append(&mut tuples);
    }

    pub fn extend_head(&mut self, tuples: Vec<Tuple>) {
        self.last_insert_slot = None;
        let mut new_tuples = tuples;
        new_tuples.append(&mut self.tuples);
        self.tuples = new_tuples;
    }

    pub fn iter(&self) -> BTreeLeafPageIterator {
        BTreeLeafPageIterator {
            page: self,
            front: 0,
            back: self.tuples.len(),
        }
    }

    /// Underflow check, exempt at the root (a root leaf with few rows
    /// is simply a small tree, never requires a merge).
    pub fn should_merge(&self) -> bool {
        if self.get_parent_pid().category == PageCategory::RootPointer {
            return false;
        }
        self.tuples_count() < self.max_tuples / 2
    }

    pub fn stable(&self) -> bool {
        !self.should_merge()
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
                "leaf page {} parent mismatch: expected {}, got {}",
                self.get_pid(),
                parent_pid,
                self.get_parent_pid()
            )));
        }

        let mut previous = lower_bound.clone();
        for tuple in &self.tuples {
            let key = tuple.get_cell(self.key_field);
            if let Some(prev) = &previous {
                if key < *prev {
                    return Err(crate::error::SmallError::new(&format!(
                        "leaf page {} tuples out of order",
                        self.get_pid()
                    )));
                }
            }
            previous = Some(key);
        }
        if let (Some(last), Some(upper)) = (&previous, upper_bound) {
            if last >= upper {
                return Err(crate::error::SmallError::new(&format!(
                    "leaf page {} last key exceeds upper bound",
                    self.get_pid()
                )));
            }
        }

        if check_occupancy && depth > 0 {
            if self.tuples_count() < self.max_tuples / 2 {
                return Err(crate::error::SmallError::new(&format!(
                    "leaf page {} underfull: {} tuples, minimum {}",
                    self.get_pid(),
                    self.tuples_count(),
                    self.max_tuples / 2
                )));
            }
        }

        Ok(())
    }
}

impl BTreePage for BTreeLeafPage {
    fn new(pid: BTreePageID, bytes: &[u8], tuple_scheme: &Schema, key_field: usize) -> Self {
        let parent_page_index = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let tuple_count = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let left_raw = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let right_raw = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        let tuple_size = tuple_scheme.tuple_size();
        let mut offset = 16;
        let mut tuples = Vec::with_capacity(tuple_count);
        for _ in 0..tuple_count {
            tuples.push(Tuple::new(tuple_scheme, &bytes[offset..offset + tuple_size]));
            offset += tuple_size;
        }

        BTreeLeafPage {
            max_tuples: Self::calculate_slots_count(tuple_scheme),
            base: BTreeBasePage::new(pid, parent_page_index),
            tuples,
            tuple_scheme: tuple_scheme.clone(),
            key_field,
            left_sibling_id: if left_raw == 0 { None } else { Some(left_raw) },
            right_sibling_id: if right_raw == 0 { None } else { Some(right_raw) },
            last_insert_slot: None,
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
        buf.extend((self.tuples.len() as u32).to_be_bytes());
        buf.extend(self.left_sibling_id.unwrap_or(0).to_be_bytes());
        buf.extend(self.right_sibling_id.unwrap_or(0).to_be_bytes());
        for tuple in &self.tuples {
            buf.extend(tuple.encode());
        }
        let page_size = crate::btree::page_cache::PageCache::get_page_size();
        buf.resize(page_size, 0);
        buf
    }
}

pub struct BTreeLeafPageIterator<'page> {
    page: &'page BTreeLeafPage,
    front: usize,
    back: usize,
}

impl<'page> Iterator for BTreeLeafPageIterator<'page> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<WrappedTuple> {
        if self.front >= self.back {
            return None;
        }
        let tuple = self.page.get_tuple(self.front);
        self.front += 1;
        Some(tuple)
    }
}

impl<'page> DoubleEndedIterator for BTreeLeafPageIterator<'page> {
    fn next_back(&mut self) -> Option<WrappedTuple> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.page.get_tuple(self.back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::small_int_schema;

    #[test]
    fn test_insert_keeps_order() {
        let schema = small_int_schema(2, "");
        let pid = BTreePageID::new(PageCategory::Leaf, 0, 1);
        let mut page = BTreeLeafPage::empty(pid, schema, 0);

        page.insert_tuple(&Tuple::new_int_tuples(5, 2));
        page.insert_tuple(&Tuple::new_int_tuples(1, 2));
        page.insert_tuple(&Tuple::new_int_tuples(3, 2));

        let keys: Vec<i64> = page
            .iter()
            .map(|t| match t.get_cell(0) {
                Cell::Int64(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![1, 3, 5]);
    }

    #[test]
    fn test_take_tail() {
        let schema = small_int_schema(2, "");
        let pid = BTreePageID::new(PageCategory::Leaf, 0, 1);
        let mut page = BTreeLeafPage::empty(pid, schema, 0);
        for i in 0..10 {
            page.insert_tuple(&Tuple::new_int_tuples(i, 2));
        }
        let tail = page.take_tail(4);
        assert_eq!(tail.len(), 4);
        assert_eq!(page.tuples_count(), 6);
        assert_eq!(tail[0].get_cell(0), Cell::Int64(6));
    }
}
