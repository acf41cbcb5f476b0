use std::collections::VecDeque;

use crate::btree::page_id::BTreePageID;
use crate::btree::table::navigator::SearchFor;
use crate::btree::table::table::BTreeTable;
use crate::common::database::Database;
use crate::storage::cell::{Op, Predicate};
use crate::storage::tuple::WrappedTuple;
use crate::transaction::{Permission, Transaction};

/// Whole-table scan: descend to the leftmost leaf once, then walk the
/// leaf sibling chain to the right, buffering one page's tuples at a
/// time. Mirrors the teacher's `BTreeTableIterator`, generalized only
/// in that this crate's leaf pages are dense vectors rather than
/// sparse slot directories.
pub struct BTreeTableIterator<'t> {
    tx: &'t Transaction,
    next_pid: Option<BTreePageID>,
    buffer: VecDeque<WrappedTuple>,
}

impl<'t> BTreeTableIterator<'t> {
    pub fn new(tx: &'t Transaction, table: &BTreeTable) -> Self {
        let root_pid = table.get_root_pid(tx);
        let leaf = table
            .find_leaf_page(tx, Permission::ReadOnly, root_pid, SearchFor::LeftMost)
            .expect("leftmost leaf must be reachable");
        let (next_pid, tuples) = {
            let page = leaf.read().unwrap();
            (page.get_right_pid(), page.iter().collect::<Vec<_>>())
        };
        BTreeTableIterator {
            tx,
            next_pid,
            buffer: tuples.into(),
        }
    }

    fn pull_next_page(&mut self) {
        while self.buffer.is_empty() {
            let pid = match self.next_pid.take() {
                Some(pid) => pid,
                None => return,
            };
            let page = Database::mut_page_cache()
                .get_leaf_page(self.tx, Permission::ReadOnly, &pid)
                .expect("sibling leaf must be readable");
            let page = page.read().unwrap();
            self.next_pid = page.get_right_pid();
            self.buffer.extend(page.iter());
        }
    }
}

impl<'t> Iterator for BTreeTableIterator<'t> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<WrappedTuple> {
        if self.buffer.is_empty() {
            self.pull_next_page();
        }
        self.buffer.pop_front()
    }
}

/// Predicate-filtered scan: positions its start leaf directly (leftmost
/// for a downward-unbounded predicate, otherwise the leaf the key would
/// route to) and stops as soon as ascending key order rules out any
/// further match, instead of always draining to the end of the table.
pub struct BTreeTableSearchIterator<'t> {
    tx: &'t Transaction,
    key_field: usize,
    predicate: Predicate,
    next_pid: Option<BTreePageID>,
    buffer: VecDeque<WrappedTuple>,
    done: bool,
}

impl<'t> BTreeTableSearchIterator<'t> {
    pub fn new(tx: &'t Transaction, table: &BTreeTable, predicate: Predicate) -> Self {
        let key_field = table.key_field();
        let root_pid = table.get_root_pid(tx);
        let search = match predicate.op {
            Op::LessThan | Op::LessThanOrEq => SearchFor::LeftMost,
            _ => SearchFor::Key(predicate.value.clone()),
        };
        let leaf = table
            .find_leaf_page(tx, Permission::ReadOnly, root_pid, search)
            .expect("search leaf must be reachable");
        let (next_pid, tuples) = {
            let page = leaf.read().unwrap();
            (page.get_right_pid(), page.iter().collect::<Vec<_>>())
        };
        BTreeTableSearchIterator {
            tx,
            key_field,
            predicate,
            next_pid,
            buffer: tuples.into(),
            done: false,
        }
    }

    fn pull_next_page(&mut self) {
        while self.buffer.is_empty() {
            let pid = match self.next_pid.take() {
                Some(pid) => pid,
                None => return,
            };
            let page = Database::mut_page_cache()
                .get_leaf_page(self.tx, Permission::ReadOnly, &pid)
                .expect("sibling leaf must be readable");
            let page = page.read().unwrap();
            self.next_pid = page.get_right_pid();
            self.buffer.extend(page.iter());
        }
    }
}

impl<'t> Iterator for BTreeTableSearchIterator<'t> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<WrappedTuple> {
        if self.done {
            return None;
        }
        loop {
            if self.buffer.is_empty() {
                self.pull_next_page();
                if self.buffer.is_empty() {
                    self.done = true;
                    return None;
                }
            }
            let candidate = self.buffer.pop_front().unwrap();
            let key = candidate.get_cell(self.key_field);

            match self.predicate.op {
                // Ascending order means once a key overshoots `value`
                // no later record can match either.
                Op::Equals => {
                    if key < self.predicate.value {
                        continue;
                    }
                    if key > self.predicate.value {
                        self.done = true;
                        return None;
                    }
                    return Some(candidate);
                }
                Op::LessThan | Op::LessThanOrEq => {
                    if self.predicate.is_satisfied(&key) {
                        return Some(candidate);
                    }
                    self.done = true;
                    return None;
                }
                // No upper bound to detect early: the leaf the search
                // landed on may still hold a few keys short of `value`.
                Op::GreaterThan | Op::GreaterThanOrEq => {
                    if self.predicate.is_satisfied(&key) {
                        return Some(candidate);
                    }
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::table::table::BTreeTable;
    use crate::common::database::Database;
    use crate::storage::{small_int_schema, Cell};
    use crate::storage::tuple::Tuple;
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
    fn test_full_scan_ascending() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_iter_scan.db");
        let tx = Transaction::new();
        {
            let table = table.read().unwrap();
            for i in (0..20).rev() {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
        }
        let keys: Vec<i64> = BTreeTableIterator::new(&tx, &table.read().unwrap())
            .map(|t| match t.get_cell(0) {
                Cell::Int64(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
        tx.commit().unwrap();
        std::fs::remove_file("./test_iter_scan.db").ok();
    }

    #[test]
    fn test_search_equals() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_iter_search.db");
        let tx = Transaction::new();
        {
            let table = table.read().unwrap();
            for i in 0..20 {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
        }
        let predicate = Predicate::new(0, Op::Equals, &Cell::Int64(7));
        let matches: Vec<_> = BTreeTableSearchIterator::new(&tx, &table.read().unwrap(), predicate).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get_cell(0), Cell::Int64(7));
        tx.commit().unwrap();
        std::fs::remove_file("./test_iter_search.db").ok();
    }
}
