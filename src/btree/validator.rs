//! Validator (§4.G): walks every level of the tree checking invariants
//! that no single page's own `check_integrity` can see in isolation --
//! sibling reciprocity, min-rec-flag placement (invariant 5), and
//! node-pointer key agreement with the subtree it routes to. Each
//! page's own `check_integrity` still does the in-page checks (key
//! order, parent linkage, occupancy); this module adds the cross-page
//! ones and drives the recursive descent.

use crate::btree::page::{BTreePage, BTreePageID, PageCategory};
use crate::btree::table::table::BTreeTable;
use crate::common::database::Database;
use crate::error::SmallError;
use crate::storage::cell::Cell;
use crate::transaction::{Permission, Transaction};
use crate::types::SmallResult;

pub fn validate(table: &BTreeTable, check_occupancy: bool) -> SmallResult {
    let tx = Transaction::new();
    let root_ptr_pid = BTreePageID::new(PageCategory::RootPointer, table.get_id(), 0);
    let root_pid = table.get_root_pid(&tx);

    let result = validate_subtree(
        table,
        &tx,
        &root_pid,
        &root_ptr_pid,
        &None,
        &None,
        check_occupancy,
        0,
    );
    tx.commit().ok();
    result
}

fn validate_subtree(
    table: &BTreeTable,
    tx: &Transaction,
    pid: &BTreePageID,
    parent_pid: &BTreePageID,
    lower_bound: &Option<Cell>,
    upper_bound: &Option<Cell>,
    check_occupancy: bool,
    depth: usize,
) -> SmallResult {
    match pid.category {
        PageCategory::Leaf => {
            validate_leaf(table, tx, pid, parent_pid, lower_bound, upper_bound, check_occupancy, depth)
        }
        PageCategory::Internal => {
            validate_internal(table, tx, pid, parent_pid, lower_bound, upper_bound, check_occupancy, depth)
        }
        other => Err(SmallError::new(&format!(
            "unexpected page category in tree walk: {:?}",
            other
        ))),
    }
}

fn validate_leaf(
    table: &BTreeTable,
    tx: &Transaction,
    pid: &BTreePageID,
    parent_pid: &BTreePageID,
    lower_bound: &Option<Cell>,
    upper_bound: &Option<Cell>,
    check_occupancy: bool,
    depth: usize,
) -> SmallResult {
    let _ = table;
    let page = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadOnly, pid)?;
    let page = page.read().unwrap();
    page.check_integrity(parent_pid, lower_bound, upper_bound, check_occupancy, depth)?;

    if let Some(left_pid) = page.get_left_pid() {
        let left = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadOnly, &left_pid)?;
        if left.read().unwrap().get_right_pid() != Some(*pid) {
            return Err(SmallError::new(&format!(
                "leaf {} and its claimed left sibling {} do not point back at each other",
                pid, left_pid
            )));
        }
    }
    if let Some(right_pid) = page.get_right_pid() {
        let right = Database::mut_page_cache().get_leaf_page(tx, Permission::ReadOnly, &right_pid)?;
        if right.read().unwrap().get_left_pid() != Some(*pid) {
            return Err(SmallError::new(&format!(
                "leaf {} and its claimed right sibling {} do not point back at each other",
                pid, right_pid
            )));
        }
    }
    Ok(())
}

fn validate_internal(
    table: &BTreeTable,
    tx: &Transaction,
    pid: &BTreePageID,
    parent_pid: &BTreePageID,
    lower_bound: &Option<Cell>,
    upper_bound: &Option<Cell>,
    check_occupancy: bool,
    depth: usize,
) -> SmallResult {
    let page_pod = Database::mut_page_cache().get_internal_page(tx, Permission::ReadOnly, pid)?;

    let (min_rec_mark, entries) = {
        let page = page_pod.read().unwrap();
        page.check_integrity(parent_pid, lower_bound, upper_bound, check_occupancy, depth)?;
        (page.min_rec_mark(), page.iter().collect::<Vec<_>>())
    };

    if entries.is_empty() {
        // Only a root in the middle of a lift can have a single child
        // and no separator; any other page in this state is corrupt.
        if *pid != table.get_root_pid(tx) {
            return Err(SmallError::new(&format!(
                "internal page {} has no entries but is not the tree root",
                pid
            )));
        }
        let only_child = page_pod.read().unwrap().get_first_child_pid();
        return match only_child {
            Some(child) => {
                validate_subtree(table, tx, &child, pid, lower_bound, upper_bound, check_occupancy, depth + 1)
            }
            None => Ok(()),
        };
    }

    let has_left_sibling = table.get_internal_left_sibling_pid(tx, &page_pod).is_some();
    if min_rec_mark == has_left_sibling {
        return Err(SmallError::new(&format!(
            "internal page {} min-rec flag is {} but has-left-sibling is {}",
            pid, min_rec_mark, has_left_sibling
        )));
    }

    for (i, entry) in entries.iter().enumerate() {
        if i == 0 {
            validate_subtree(
                table,
                tx,
                &entry.left,
                pid,
                lower_bound,
                &Some(entry.key.clone()),
                check_occupancy,
                depth + 1,
            )?;
        }

        if let Some(descendant_key) = table.first_descendant_key(tx, &entry.right) {
            if descendant_key != entry.key {
                return Err(SmallError::new(&format!(
                    "internal page {} entry key {} does not match its right subtree's first key {}",
                    pid, entry.key, descendant_key
                )));
            }
        }

        let next_upper = entries.get(i + 1).map(|e| e.key.clone()).or_else(|| upper_bound.clone());
        validate_subtree(
            table,
            tx,
            &entry.right,
            pid,
            &Some(entry.key.clone()),
            &next_upper,
            check_occupancy,
            depth + 1,
        )?;
    }

    Ok(())
}
