use crate::btree::page_id::{BTreePageID, PageCategory};

/// Fields shared by every non-root-pointer page: the page's own id,
/// and its parent's page index. The parent's *category* is never
/// stored explicitly -- a leaf or internal page's parent is the root
/// pointer page iff the stored index is `0`, otherwise it is an
/// internal page. This mirrors the teacher's memory-saving trick of
/// deriving the category rather than storing a full `BTreePageID` for
/// the parent link.
#[derive(Clone, Debug)]
pub struct BTreeBasePage {
    pid: BTreePageID,
    parent_page_index: u32,
}

impl BTreeBasePage {
    pub fn new(pid: BTreePageID, parent_page_index: u32) -> BTreeBasePage {
        BTreeBasePage {
            pid,
            parent_page_index,
        }
    }

    pub fn get_pid(&self) -> BTreePageID {
        self.pid.clone()
    }

    pub fn get_parent_pid(&self) -> BTreePageID {
        if self.parent_page_index == 0 {
            BTreePageID::new(PageCategory::RootPointer, self.pid.table_id, 0)
        } else {
            BTreePageID::new(
                PageCategory::Internal,
                self.pid.table_id,
                self.parent_page_index,
            )
        }
    }

    pub fn set_parent_pid(&mut self, pid: &BTreePageID) {
        match pid.category {
            PageCategory::RootPointer => self.parent_page_index = 0,
            PageCategory::Internal => self.parent_page_index = pid.page_index,
            other => panic!("invalid parent category: {:?}", other),
        }
    }

    pub fn parent_page_index(&self) -> u32 {
        self.parent_page_index
    }
}
