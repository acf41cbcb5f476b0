//! Node-Pointer Codec (§4.B): builds and rewrites the internal-level
//! records that route a search down the tree. In the on-disk `dtuple_t`
//! world this is a prefix of `n_uniq` leaf-key fields plus a trailing
//! 4-byte child page number; this crate's indexes are always keyed on
//! a single field (`BTreeTable::key_field`), so `n_uniq` is always 1
//! and the "prefix" collapses to that one field's value, carried by
//! [`Entry`].

use crate::btree::page::{BTreePageID, Entry};
use crate::storage::cell::Cell;

/// `build_node_ptr`: construct a routing record pointing `left`/`right`
/// apart at `key`. Mirrors the teacher's `Entry::new`, kept as a
/// distinct free function so callers read `node_ptr::build(...)`
/// rather than reaching for `Entry::new` directly at call sites that
/// are conceptually doing node-pointer construction (splits, root
/// raises) rather than generic entry bookkeeping.
pub fn build(key: Cell, left: &BTreePageID, right: &BTreePageID) -> Entry {
    Entry::new(key, left, right)
}

/// `set_child_page_no`: overwrite the trailing child-page field of an
/// existing node pointer in place. The caller still has to write the
/// mutated entry back through `BTreeInternalPage::update_entry` (or
/// delete+reinsert if the routing key itself moved) so the change
/// goes through the owning page's own mutation path.
pub fn set_child_page_no(entry: &mut Entry, new_child: BTreePageID) {
    entry.right = new_child;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::page_id::PageCategory;

    #[test]
    fn test_build_and_rewrite() {
        let left = BTreePageID::new(PageCategory::Leaf, 0, 1);
        let right = BTreePageID::new(PageCategory::Leaf, 0, 2);
        let mut entry = build(Cell::Int64(10), &left, &right);
        assert_eq!(entry.key, Cell::Int64(10));

        let new_right = BTreePageID::new(PageCategory::Leaf, 0, 3);
        set_child_page_no(&mut entry, new_right.clone());
        assert_eq!(entry.right, new_right);
    }
}
