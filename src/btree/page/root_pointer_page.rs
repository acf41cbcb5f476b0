use crate::btree::page::page::BTreePage;
use crate::btree::page_id::{BTreePageID, PageCategory};
use crate::storage::schema::Schema;

/// The root page of a B-tree relocates every time a root raise or a
/// lift collapses a level. A stable pointer at a fixed, never-moving
/// location (page index 0 of the table's file) is therefore needed so
/// that "where is the current root" survives those structural
/// changes without anyone having to rewrite an external reference --
/// this page is that pointer.
///
/// It doubles as the anchor for the free-page list: `header_page_index`
/// names the first `BTreeHeaderPage`, the root of the free-bitmap
/// chain consulted by page allocation (§4.D).
pub struct BTreeRootPointerPage {
    pid: BTreePageID,
    root_pid: BTreePageID,
    header_page_index: u32,
}

impl BTreeRootPointerPage {
    /// A brand-new table starts with no root and no free-page chain
    /// at all: the first insert will allocate a leaf and set it as
    /// root via `set_root_pid`.
    pub fn empty(pid: BTreePageID) -> BTreeRootPointerPage {
        let table_id = pid.table_id;
        BTreeRootPointerPage {
            pid,
            root_pid: BTreePageID::new(PageCategory::Leaf, table_id, 0),
            header_page_index: 0,
        }
    }

    pub fn get_root_pid(&self) -> BTreePageID {
        self.root_pid.clone()
    }

    pub fn set_root_pid(&mut self, pid: &BTreePageID) {
        self.root_pid = pid.clone();
    }

    pub fn get_header_pid(&self) -> Option<BTreePageID> {
        if self.header_page_index == 0 {
            None
        } else {
            Some(BTreePageID::new(
                PageCategory::Header,
                self.pid.table_id,
                self.header_page_index,
            ))
        }
    }

    pub fn set_header_pid(&mut self, pid: &BTreePageID) {
        self.header_page_index = pid.page_index;
    }
}

impl BTreePage for BTreeRootPointerPage {
    fn new(pid: BTreePageID, bytes: &[u8], _tuple_scheme: &Schema, _key_field: usize) -> Self {
        let root_category_tag = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let root_page_index = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let header_page_index = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        let root_category = match root_category_tag {
            1 => PageCategory::Internal,
            2 => PageCategory::Leaf,
            _ => PageCategory::Leaf,
        };

        BTreeRootPointerPage {
            root_pid: BTreePageID::new(root_category, pid.table_id, root_page_index),
            header_page_index,
            pid,
        }
    }

    fn get_pid(&self) -> BTreePageID {
        self.pid.clone()
    }

    fn get_parent_pid(&self) -> BTreePageID {
        // the root pointer page has no parent; it is not itself a
        // node in the tree
        self.pid.clone()
    }

    fn set_parent_pid(&mut self, _pid: &BTreePageID) {
        panic!("the root pointer page has no parent")
    }

    fn get_page_data(&self) -> Vec<u8> {
        let tag: u32 = match self.root_pid.category {
            PageCategory::Internal => 1,
            _ => 2,
        };
        let mut buf = Vec::new();
        buf.extend(tag.to_be_bytes());
        buf.extend(self.root_pid.page_index.to_be_bytes());
        buf.extend(self.header_page_index.to_be_bytes());
        let page_size = crate::btree::page_cache::PageCache::get_page_size();
        buf.resize(page_size, 0);
        buf
    }
}
