pub mod btree;
pub mod common;
pub mod error;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod utils;

pub use btree::table::{BTreeTable, BTreeTableIterator, BTreeTableSearchIterator};
pub use common::Database;
pub use storage::{small_int_schema, Cell, Op, Predicate, Schema};
pub use types::{Pod, ResultPod, SmallResult};
