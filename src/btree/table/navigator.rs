use crate::btree::page::{BTreeInternalPage, BTreeLeafPage, BTreePage, BTreePageID, Entry, PageCategory};
use crate::btree::table::table::BTreeTable;
use crate::common::database::Database;
use crate::storage::cell::Cell;
use crate::transaction::{Permission, Transaction};
use crate::types::{Pod, ResultPod};

/// What a leaf-page search is looking for: an exact key's possible
/// location, or one of the tree's extremities (used by the
/// whole-table iterator to find its start/end cursor).
#[derive(Clone)]
pub(crate) enum SearchFor {
    Key(Cell),
    LeftMost,
    RightMost,
}

impl BTreeTable {
    /// Recursive descent to the leaf possibly containing `search`,
    /// taking `perm` on the leaf and `ReadOnly` on every internal page
    /// along the way. This is the optimistic-descent half of §5's
    /// latch-coupling protocol -- callers that may need to split
    /// re-acquire pages with a write latch as they go back down.
    pub(crate) fn find_leaf_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: BTreePageID,
        search: SearchFor,
    ) -> ResultPod<BTreeLeafPage> {
        match pid.category {
            PageCategory::Leaf => Database::mut_page_cache().get_leaf_page(tx, perm, &pid),
            PageCategory::Internal => {
                let page = Database::mut_page_cache().get_internal_page(tx, Permission::ReadOnly, &pid)?;
                let child_pid = {
                    let page = page.read().unwrap();
                    match &search {
                        SearchFor::LeftMost => page.get_first_child_pid(),
                        SearchFor::RightMost => page.get_last_child_pid(),
                        SearchFor::Key(key) => Some(page.get_child_pid(page.find_child_index(key))),
                    }
                    .expect("internal page must have at least one child")
                };
                self.find_leaf_page(tx, perm, child_pid, search)
            }
            other => panic!("invalid page category during descent: {:?}", other),
        }
    }
}

/// Tree Navigator (§4.C): finds a page's sibling by walking up to its
/// parent and reading the neighboring child, since pages keep no
/// direct sibling pointer of their own except at the leaf level
/// (`BTreeLeafPage::get_left_pid`/`get_right_pid`). Internal pages
/// have no persisted sibling link at all -- every lookup goes through
/// the parent, exactly as the teacher's `BTreeInternalPage` methods of
/// the same name do.
impl BTreeTable {
    pub(crate) fn get_internal_left_sibling_pid(
        &self,
        tx: &Transaction,
        page: &Pod<BTreeInternalPage>,
    ) -> Option<BTreePageID> {
        let (pid, parent_pid) = {
            let page = page.read().unwrap();
            (page.get_pid(), page.get_parent_pid())
        };
        if parent_pid.category != PageCategory::Internal {
            return None;
        }
        let parent = Database::mut_page_cache()
            .get_internal_page(tx, Permission::ReadOnly, &parent_pid)
            .ok()?;
        let parent = parent.read().unwrap();
        let index = (0..parent.children_count()).find(|&i| parent.get_child_pid(i) == pid)?;
        if index == 0 {
            None
        } else {
            Some(parent.get_child_pid(index - 1))
        }
    }

    pub(crate) fn get_internal_right_sibling_pid(
        &self,
        tx: &Transaction,
        page: &Pod<BTreeInternalPage>,
    ) -> Option<BTreePageID> {
        let (pid, parent_pid) = {
            let page = page.read().unwrap();
            (page.get_pid(), page.get_parent_pid())
        };
        if parent_pid.category != PageCategory::Internal {
            return None;
        }
        let parent = Database::mut_page_cache()
            .get_internal_page(tx, Permission::ReadOnly, &parent_pid)
            .ok()?;
        let parent = parent.read().unwrap();
        let index = (0..parent.children_count()).find(|&i| parent.get_child_pid(i) == pid)?;
        if index + 1 >= parent.children_count() {
            None
        } else {
            Some(parent.get_child_pid(index + 1))
        }
    }

    /// The father node pointer (§4.C): the parent entry whose `right`
    /// child is `pid`. `None` only for the current root, which no
    /// entry anywhere names as a child. `pid` may also be its parent's
    /// leftmost (min-rec) child, which is never any entry's `right` --
    /// entry 0 is the routing pointer for that case, found by its
    /// `left` instead. Any other failure to find `pid` among its
    /// claimed parent's children is treated as the corruption policy
    /// in §7 -- there is no sane in-band recovery from a page whose
    /// parent doesn't actually reference it, so this panics rather
    /// than returning an error a caller might paper over.
    pub(crate) fn father_node_ptr(&self, tx: &Transaction, pid: &BTreePageID) -> Option<Entry> {
        let parent_pid = match pid.category {
            PageCategory::Internal => {
                let page = Database::mut_page_cache()
                    .get_internal_page(tx, Permission::ReadOnly, pid)
                    .expect("page must be readable");
                page.read().unwrap().get_parent_pid()
            }
            PageCategory::Leaf => {
                let page = Database::mut_page_cache()
                    .get_leaf_page(tx, Permission::ReadOnly, pid)
                    .expect("page must be readable");
                page.read().unwrap().get_parent_pid()
            }
            other => panic!("invalid page category: {:?}", other),
        };
        if parent_pid.category != PageCategory::Internal {
            return None;
        }
        let parent = Database::mut_page_cache()
            .get_internal_page(tx, Permission::ReadOnly, &parent_pid)
            .expect("parent page must be readable");
        let parent = parent.read().unwrap();
        let mut first_entry = None;
        for entry in parent.iter() {
            if &entry.right == pid {
                return Some(entry);
            }
            if entry.record_id == 0 {
                first_entry = Some(entry);
            }
        }
        if let Some(entry) = first_entry {
            if &entry.left == pid {
                return Some(entry);
            }
        }
        panic!(
            "corrupt tree: parent {} does not list child {} among its children",
            parent_pid, pid
        );
    }

    /// Recurse to the leftmost leaf under `pid` and report its first
    /// key. The validator uses this to check that a node pointer's
    /// routing key actually matches the smallest key living under its
    /// right child.
    pub(crate) fn first_descendant_key(&self, tx: &Transaction, pid: &BTreePageID) -> Option<Cell> {
        match pid.category {
            PageCategory::Leaf => {
                let page = Database::mut_page_cache()
                    .get_leaf_page(tx, Permission::ReadOnly, pid)
                    .expect("leaf page must be readable");
                page.read().unwrap().first_key()
            }
            PageCategory::Internal => {
                let page = Database::mut_page_cache()
                    .get_internal_page(tx, Permission::ReadOnly, pid)
                    .expect("internal page must be readable");
                let first_child = page.read().unwrap().get_first_child_pid()?;
                self.first_descendant_key(tx, &first_child)
            }
            other => panic!("invalid page category: {:?}", other),
        }
    }
}
