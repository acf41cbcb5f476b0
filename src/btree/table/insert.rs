use std::sync::RwLockWriteGuard;

use crate::btree::node_ptr;
use crate::btree::page::{BTreeInternalPage, BTreeLeafPage, BTreePage, Entry, PageCategory};
use crate::btree::table::table::BTreeTable;
use crate::common::database::Database;
use crate::error::SmallError;
use crate::storage::tuple::Tuple;
use crate::transaction::{Permission, Transaction};
use crate::types::SmallResult;

/// What a child reports back to its parent once it has placed the
/// incoming tuple: either the insert fit without a structural change
/// and every ancestor latch above can be released (§5), or the child
/// just split and the parent must thread the new node pointer in.
enum Action {
    Release,
    InsertEntry(Entry),
}

impl BTreeTable {
    /// Insert `tuple`, keeping every leaf in key order. May cascade
    /// into one or more splits and, at the limit, a root raise.
    pub fn insert_tuple(&self, tx: &Transaction, tuple: Tuple) -> SmallResult {
        let root_ptr_pod = self.get_root_ptr_page(tx)?;
        let mut root_ptr = root_ptr_pod.write().unwrap();
        let root_pid = root_ptr.get_root_pid();

        let root_ptr_callback = move |action: Action| match action {
            Action::Release => drop(root_ptr),
            Action::InsertEntry(mut entry) => {
                let new_root_pod = self
                    .get_empty_internal_page(tx)
                    .expect("allocating a new root page must succeed");
                let new_root_pid = {
                    let mut new_root = new_root_pod.write().unwrap();
                    // the new root is, by definition, the only node on
                    // its level: nothing sits to its left.
                    new_root.set_min_rec_mark(true);
                    new_root
                        .insert_entry(&mut entry)
                        .expect("a brand-new internal page always has room for its first entry");
                    new_root.get_pid()
                };

                self.set_parent(tx, &entry.left, &new_root_pid);
                self.set_parent(tx, &entry.right, &new_root_pid);
                Database::mut_concurrent_status().notify_root_raise(&root_pid, &new_root_pid);

                let after = new_root_pod.read().unwrap().get_page_data();
                self.log_page_mutation(tx, &new_root_pid, Vec::new(), after);

                let root_ptr_before = root_ptr.get_page_data();
                root_ptr.set_root_pid(&new_root_pid);
                let root_ptr_after = root_ptr.get_page_data();
                self.log_page_mutation(tx, &root_ptr.get_pid(), root_ptr_before, root_ptr_after);
            }
        };

        match root_pid.category {
            PageCategory::Internal => {
                let page_pod = Database::mut_page_cache().get_internal_page(tx, Permission::ReadWrite, &root_pid)?;
                let page = page_pod.write().unwrap();
                self.insert_into_internal(tx, page, root_ptr_callback, &tuple)
            }
            PageCategory::Leaf => {
                let page_pod = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadWrite, &root_pid)?;
                let page = page_pod.write().unwrap();
                self.insert_into_leaf(tx, page, root_ptr_callback, &tuple)
            }
            other => Err(SmallError::new(&format!("invalid root page category: {:?}", other))),
        }
    }

    /// §4.E split-point heuristic: consult `PAGE_LAST_INSERT` to tell a
    /// sequential-insert workload from a random one. A run of inserts
    /// landing at the tail (ascending keys) or the head (descending
    /// keys) converges the split point toward that edge so the page
    /// that keeps absorbing new inserts doesn't get split down the
    /// middle every time; anything else falls back to an even split.
    fn choose_leaf_split_count(tuple_count: usize, last_insert_slot: Option<usize>) -> usize {
        match last_insert_slot {
            Some(slot) if slot + 1 == tuple_count => 1,
            Some(0) => tuple_count.saturating_sub(1).max(1),
            _ => (tuple_count / 2).max(1),
        }
    }

    fn insert_into_leaf(
        &self,
        tx: &Transaction,
        mut page: RwLockWriteGuard<'_, BTreeLeafPage>,
        parent_callback: impl FnOnce(Action),
        tuple: &Tuple,
    ) -> SmallResult {
        if page.empty_slots_count() > 0 {
            parent_callback(Action::Release);
            let before = page.get_page_data();
            page.insert_tuple(tuple);
            let pid = page.get_pid();
            let after = page.get_page_data();
            self.log_page_mutation(tx, &pid, before, after);
            return Ok(());
        }

        self.split_leaf_and_insert(tx, page, parent_callback, tuple)
    }

    fn split_leaf_and_insert(
        &self,
        tx: &Transaction,
        mut page: RwLockWriteGuard<'_, BTreeLeafPage>,
        parent_callback: impl FnOnce(Action),
        tuple: &Tuple,
    ) -> SmallResult {
        let before = page.get_page_data();

        let new_sibling_pod = self.get_empty_leaf_page(tx)?;
        let mut new_sibling = new_sibling_pod.write().unwrap();

        let tuple_count = page.tuples_count();
        let move_count = Self::choose_leaf_split_count(tuple_count, page.get_last_insert_slot());
        let moved = page.take_tail(move_count);
        new_sibling.extend_tail(moved);

        new_sibling.set_right_pid(page.get_right_pid());
        new_sibling.set_left_pid(Some(page.get_pid()));
        page.set_right_pid(Some(new_sibling.get_pid()));

        // the far sibling (if any) still points back at `page`; it now
        // needs to point at the freshly-inserted `new_sibling` instead,
        // or the leaf chain's reciprocity invariant breaks.
        if let Some(far_right_pid) = new_sibling.get_right_pid() {
            let far_right = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadWrite, &far_right_pid)?;
            far_right.write().unwrap().set_left_pid(Some(new_sibling.get_pid()));
        }

        let split_key = new_sibling
            .first_key()
            .expect("the new sibling received at least one tuple from the split");
        if tuple.get_cell(self.key_field) >= split_key {
            new_sibling.insert_tuple(tuple);
        } else {
            page.insert_tuple(tuple);
        }

        let page_pid = page.get_pid();
        let new_sibling_pid = new_sibling.get_pid();
        let page_after = page.get_page_data();
        let sibling_after = new_sibling.get_page_data();
        self.log_page_mutation(tx, &page_pid, before, page_after);
        self.log_page_mutation(tx, &new_sibling_pid, Vec::new(), sibling_after);
        Database::mut_concurrent_status().notify_split(&page_pid, &new_sibling_pid);

        let entry = node_ptr::build(split_key, &page_pid, &new_sibling_pid);
        parent_callback(Action::InsertEntry(entry));
        Ok(())
    }

    fn insert_into_internal(
        &self,
        tx: &Transaction,
        page: RwLockWriteGuard<'_, BTreeInternalPage>,
        parent_callback: impl FnOnce(Action),
        tuple: &Tuple,
    ) -> SmallResult {
        if page.empty_slots_count() > 0 {
            parent_callback(Action::Release);
            return self.insert_into_internal_safe(tx, page, tuple);
        }

        self.split_internal_and_insert(tx, page, parent_callback, tuple)
    }

    fn split_internal_and_insert(
        &self,
        tx: &Transaction,
        mut page: RwLockWriteGuard<'_, BTreeInternalPage>,
        parent_callback: impl FnOnce(Action),
        tuple: &Tuple,
    ) -> SmallResult {
        let before = page.get_page_data();

        let sibling_pod = self.get_empty_internal_page(tx)?;
        let mut sibling = sibling_pod.write().unwrap();

        let entries_count = page.entries_count();
        let mid = entries_count / 2;
        let (promoted_key, right_keys, right_children) = page.split_off(mid);
        sibling.seed_right_half(right_keys, right_children.clone());
        // never leftmost: it sits immediately to the right of `page`.
        sibling.set_min_rec_mark(false);

        let page_pid = page.get_pid();
        let sibling_pid = sibling.get_pid();
        let parent_pid = page.get_parent_pid();
        sibling.set_parent_pid(&parent_pid);

        for child_pid in &right_children {
            self.set_parent(tx, child_pid, &sibling_pid);
        }

        let page_after = page.get_page_data();
        let sibling_after = sibling.get_page_data();
        self.log_page_mutation(tx, &page_pid, before, page_after);
        self.log_page_mutation(tx, &sibling_pid, Vec::new(), sibling_after);
        Database::mut_concurrent_status().notify_split(&page_pid, &sibling_pid);

        let entry = node_ptr::build(promoted_key.clone(), &page_pid, &sibling_pid);
        parent_callback(Action::InsertEntry(entry));

        let key = tuple.get_cell(self.key_field);
        if key >= promoted_key {
            self.insert_into_internal_safe(tx, sibling, tuple)
        } else {
            self.insert_into_internal_safe(tx, page, tuple)
        }
    }

    fn insert_into_internal_safe(
        &self,
        tx: &Transaction,
        mut page: RwLockWriteGuard<'_, BTreeInternalPage>,
        tuple: &Tuple,
    ) -> SmallResult {
        let key = tuple.get_cell(self.key_field);
        let child_index = page.find_child_index(&key);
        let child_pid = page.get_child_pid(child_index);

        let callback = move |action: Action| match action {
            Action::Release => drop(page),
            Action::InsertEntry(mut entry) => {
                let before = page.get_page_data();
                page.insert_entry(&mut entry)
                    .expect("parent page still had room when its child reported a split");
                let pid = page.get_pid();
                let after = page.get_page_data();
                self.log_page_mutation(tx, &pid, before, after);
            }
        };

        match child_pid.category {
            PageCategory::Internal => {
                let child_pod = Database::mut_page_cache().get_internal_page(tx, Permission::ReadWrite, &child_pid)?;
                let child = child_pod.write().unwrap();
                self.insert_into_internal(tx, child, callback, tuple)
            }
            PageCategory::Leaf => {
                let child_pod = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadWrite, &child_pid)?;
                let child = child_pod.write().unwrap();
                self.insert_into_leaf(tx, child, callback, tuple)
            }
            other => Err(SmallError::new(&format!("invalid child page category: {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::database::Database;
    use crate::storage::{small_int_schema, Cell};
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn fresh_table(path: &str) -> crate::types::Pod<BTreeTable> {
        Database::reset();
        std::fs::remove_file(path).ok();
        let schema = small_int_schema(2, "");
        let table = BTreeTable::new(path, 0, &schema).unwrap();
        Database::mut_catalog().add_table(table.clone());
        table
    }

    #[test]
    fn test_insert_forces_split_and_root_raise() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_insert_split.db");
        let tx = Transaction::new();
        {
            let table = table.read().unwrap();
            for i in 0..500 {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
            assert_eq!(table.pages_count() > 1, true);
        }
        tx.commit().unwrap();

        let table = table.read().unwrap();
        table.check_integrity(true).unwrap();
        assert_eq!(table.tuples_count(), 500);
        std::fs::remove_file("./test_insert_split.db").ok();
    }

    #[test]
    fn test_insert_descending_keys() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_insert_desc.db");
        let tx = Transaction::new();
        {
            let table = table.read().unwrap();
            for i in (0..300).rev() {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
        }
        tx.commit().unwrap();

        let table = table.read().unwrap();
        table.check_integrity(true).unwrap();
        let tx2 = Transaction::new();
        let first = crate::btree::table::iterator::BTreeTableIterator::new(&tx2, &table)
            .next()
            .unwrap();
        assert_eq!(first.get_cell(0), Cell::Int64(0));
        tx2.commit().unwrap();
        std::fs::remove_file("./test_insert_desc.db").ok();
    }
}
