use bit_vec::BitVec;

use crate::btree::page::base_page::BTreeBasePage;
use crate::btree::page::page::BTreePage;
use crate::btree::page_id::BTreePageID;
use crate::storage::schema::Schema;

/// The free-page bitmap page, chained from the root pointer page's
/// `header_page_index`. Stands in for the space manager's per-tree
/// free list used by `IBUF`-style page allocation (§4.D "for IBUF
/// indexes it pops from a per-tree free list stored on the root");
/// here every table uses this mechanism uniformly to reclaim pages
/// freed by merges before growing the file.
pub struct BTreeHeaderPage {
    base: BTreeBasePage,
    header: BitVec<u32>,
    slot_count: usize,
}

impl BTreeHeaderPage {
    /// A freshly allocated header page: every slot starts unused. The
    /// bitmap is sized to fill exactly one page, so the header chain
    /// never needs a partial-page special case.
    pub fn empty(pid: BTreePageID, page_size: usize) -> BTreeHeaderPage {
        let slot_count = (page_size - 4) * 8;
        BTreeHeaderPage {
            base: BTreeBasePage::new(pid, 0),
            header: BitVec::from_elem(slot_count, false),
            slot_count,
        }
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    /// `true` means the page at this slot is currently allocated.
    pub fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    pub fn get_slot_status(&self, slot_index: usize) -> bool {
        self.header.get(slot_index).unwrap_or(false)
    }

    /// First unused slot, if any. `None` means this header page's
    /// bitmap is fully allocated; the caller should chain to the next
    /// header page or fall back to growing the file.
    pub fn get_empty_slot(&self) -> Option<usize> {
        (0..self.slot_count).find(|&i| !self.header.get(i).unwrap_or(false))
    }
}

impl BTreePage for BTreeHeaderPage {
    fn new(pid: BTreePageID, bytes: &[u8], _tuple_scheme: &Schema, _key_field: usize) -> Self {
        let parent_page_index = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        // every bit after the 4-byte parent field tracks one page
        // slot; this gives a fixed, page-size-independent capacity
        let slot_count = (bytes.len() - 4) * 8;
        let header = BitVec::from_bytes(&bytes[4..]);
        BTreeHeaderPage {
            base: BTreeBasePage::new(pid, parent_page_index),
            header,
            slot_count,
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
        buf.extend(self.header.to_bytes());
        buf
    }
}
