pub mod delete;
pub mod insert;
pub mod iterator;
pub mod navigator;
pub mod table;

pub use iterator::{BTreeTableIterator, BTreeTableSearchIterator};
pub use navigator::SearchFor;
pub use table::BTreeTable;
