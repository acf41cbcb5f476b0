use std::collections::HashMap;

use crate::btree::table::table::BTreeTable;
use crate::types::Pod;

/// The set of tables (B-tree indexes) known to this process. Schema
/// storage/lookup belongs to the out-of-scope SQL layer in a full
/// system; this crate only needs enough of a catalog to resolve a
/// page's owning table by id when the page cache loads it off disk.
#[derive(Default)]
pub struct Catalog {
    tables: HashMap<u32, Pod<BTreeTable>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn add_table(&mut self, table: Pod<BTreeTable>) {
        let table_id = table.read().unwrap().get_id();
        self.tables.insert(table_id, table);
    }

    pub fn get_table(&self, table_id: u32) -> Option<Pod<BTreeTable>> {
        self.tables.get(&table_id).cloned()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
