use crate::btree::page_id::BTreePageID;
use crate::storage::schema::Schema;

/// Common accessor surface every page type exposes: §4.A Page
/// Accessor narrowed to the fields every page category needs
/// regardless of its body (level, header/internal/leaf, root
/// pointer). Category-specific operations (tuple/entry access,
/// sibling links) live on the concrete types; this crate avoids
/// virtual dispatch in favor of a tagged `PageCategory` plus
/// per-variant inherent methods, per the "deep dispatch" design note.
pub trait BTreePage {
    fn new(pid: BTreePageID, bytes: &[u8], tuple_scheme: &Schema, key_field: usize) -> Self
    where
        Self: Sized;

    fn get_pid(&self) -> BTreePageID;

    fn get_parent_pid(&self) -> BTreePageID;

    fn set_parent_pid(&mut self, pid: &BTreePageID);

    /// Serialize this page's body back into a fixed-size frame ready
    /// to be written through the mini-transaction.
    fn get_page_data(&self) -> Vec<u8>;
}
