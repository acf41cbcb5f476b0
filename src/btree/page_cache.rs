use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use log::debug;

use crate::btree::page::{
    BTreeHeaderPage, BTreeInternalPage, BTreeLeafPage, BTreePage, BTreePageID, BTreeRootPointerPage,
    PageCategory,
};
use crate::common::database::Database;
use crate::error::SmallError;
use crate::transaction::{ConcurrentStatus, Permission, Transaction};
use crate::types::{Pod, ResultPod, SmallResult};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// The buffer pool: every page in the engine is reached through here,
/// never directly off disk. Per-category buffers mirror the teacher's
/// split (one map per page type rather than one map of a boxed trait
/// object) so that callers get back a concretely-typed `Pod<BTreeLeafPage>`
/// / `Pod<BTreeInternalPage>` instead of having to downcast.
///
/// This core has no eviction policy: pages accumulate in memory for
/// the lifetime of the process (the teacher's own buffer pool has the
/// same property -- see the "no eviction" design note). A production
/// buffer pool would add an LRU/clock sweep with a capacity bound.
pub struct PageCache {
    root_pointer_buffer: Mutex<HashMap<BTreePageID, Pod<BTreeRootPointerPage>>>,
    header_buffer: Mutex<HashMap<BTreePageID, Pod<BTreeHeaderPage>>>,
    internal_buffer: Mutex<HashMap<BTreePageID, Pod<BTreeInternalPage>>>,
    leaf_buffer: Mutex<HashMap<BTreePageID, Pod<BTreeLeafPage>>>,
}

impl PageCache {
    pub fn new() -> PageCache {
        PageCache {
            root_pointer_buffer: Mutex::new(HashMap::new()),
            header_buffer: Mutex::new(HashMap::new()),
            internal_buffer: Mutex::new(HashMap::new()),
            leaf_buffer: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.root_pointer_buffer.lock().unwrap().clear();
        self.header_buffer.lock().unwrap().clear();
        self.internal_buffer.lock().unwrap().clear();
        self.leaf_buffer.lock().unwrap().clear();
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    /// Load a page fresh off disk and wrap it in a new `Pod`. Called
    /// only on a cache miss -- the category-specific `get_*_page`
    /// methods hold the per-category lock across the miss so two
    /// readers can't both fault in the same page twice.
    fn load_page<PAGE: BTreePage>(&self, pid: &BTreePageID) -> ResultPod<PAGE> {
        let catalog = Database::catalog();
        let table_pod = catalog
            .get_table(pid.table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", pid.table_id)))?;
        let table = table_pod.read().unwrap();

        let buf = table.read_page_from_disk(pid)?;
        let page = PAGE::new(*pid, &buf, table.tuple_scheme(), table.key_field());
        Ok(crate::types::new_pod(page))
    }

    pub fn get_root_ptr_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &BTreePageID,
    ) -> ResultPod<BTreeRootPointerPage> {
        Database::mut_concurrent_status().request_latch(tx, perm.to_lock(), pid)?;
        let mut buffer = self.root_pointer_buffer.lock().unwrap();
        if let Some(page) = buffer.get(pid) {
            return Ok(page.clone());
        }
        let page = self.load_page(pid)?;
        buffer.insert(*pid, page.clone());
        Ok(page)
    }

    pub fn get_header_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &BTreePageID,
    ) -> ResultPod<BTreeHeaderPage> {
        Database::mut_concurrent_status().request_latch(tx, perm.to_lock(), pid)?;
        let mut buffer = self.header_buffer.lock().unwrap();
        if let Some(page) = buffer.get(pid) {
            return Ok(page.clone());
        }
        let page = self.load_page(pid)?;
        buffer.insert(*pid, page.clone());
        Ok(page)
    }

    pub fn get_internal_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &BTreePageID,
    ) -> ResultPod<BTreeInternalPage> {
        Database::mut_concurrent_status().request_latch(tx, perm.to_lock(), pid)?;
        let mut buffer = self.internal_buffer.lock().unwrap();
        if let Some(page) = buffer.get(pid) {
            return Ok(page.clone());
        }
        let page = self.load_page(pid)?;
        buffer.insert(*pid, page.clone());
        Ok(page)
    }

    pub fn get_leaf_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &BTreePageID,
    ) -> ResultPod<BTreeLeafPage> {
        Database::mut_concurrent_status().request_latch(tx, perm.to_lock(), pid)?;
        let mut buffer = self.leaf_buffer.lock().unwrap();
        if let Some(page) = buffer.get(pid) {
            return Ok(page.clone());
        }
        let page = self.load_page(pid)?;
        buffer.insert(*pid, page.clone());
        Ok(page)
    }

    /// Insert a freshly-allocated page directly into its buffer
    /// without going through disk. Used right after a page is
    /// allocated (split/root-raise): it is dirty from the moment it
    /// exists, so there is nothing on disk worth reading yet.
    pub fn insert_leaf_page(&self, pid: BTreePageID, page: Pod<BTreeLeafPage>) {
        self.leaf_buffer.lock().unwrap().insert(pid, page);
    }

    pub fn insert_internal_page(&self, pid: BTreePageID, page: Pod<BTreeInternalPage>) {
        self.internal_buffer.lock().unwrap().insert(pid, page);
    }

    pub fn insert_header_page(&self, pid: BTreePageID, page: Pod<BTreeHeaderPage>) {
        self.header_buffer.lock().unwrap().insert(pid, page);
    }

    /// Remove a page from the cache. Needed whenever a page is
    /// discarded back to the free list (§4.E) or rolled back, so a
    /// stale in-memory copy can never be handed out again.
    pub fn discard_page(&self, pid: &BTreePageID) {
        match pid.category {
            PageCategory::Internal => {
                self.internal_buffer.lock().unwrap().remove(pid);
            }
            PageCategory::Leaf => {
                self.leaf_buffer.lock().unwrap().remove(pid);
            }
            PageCategory::RootPointer => {
                self.root_pointer_buffer.lock().unwrap().remove(pid);
            }
            PageCategory::Header => {
                self.header_buffer.lock().unwrap().remove(pid);
            }
        }
    }

    fn all_keys(&self) -> Vec<BTreePageID> {
        let mut keys = Vec::new();
        keys.extend(self.root_pointer_buffer.lock().unwrap().keys().cloned());
        keys.extend(self.header_buffer.lock().unwrap().keys().cloned());
        keys.extend(self.internal_buffer.lock().unwrap().keys().cloned());
        keys.extend(self.leaf_buffer.lock().unwrap().keys().cloned());
        keys
    }

    fn page_bytes(&self, pid: &BTreePageID) -> Option<Vec<u8>> {
        match pid.category {
            PageCategory::RootPointer => self
                .root_pointer_buffer
                .lock()
                .unwrap()
                .get(pid)
                .map(|p| p.read().unwrap().get_page_data()),
            PageCategory::Header => self
                .header_buffer
                .lock()
                .unwrap()
                .get(pid)
                .map(|p| p.read().unwrap().get_page_data()),
            PageCategory::Internal => self
                .internal_buffer
                .lock()
                .unwrap()
                .get(pid)
                .map(|p| p.read().unwrap().get_page_data()),
            PageCategory::Leaf => self
                .leaf_buffer
                .lock()
                .unwrap()
                .get(pid)
                .map(|p| p.read().unwrap().get_page_data()),
        }
    }

    /// Write one page's current in-memory content to disk, logging an
    /// `Update` record first if a transaction is known to hold its
    /// latch. `before` is best-effort -- this core keeps no persistent
    /// before-image, so a page discovered dirty without a known owning
    /// transaction (e.g. during `flush_all_pages`) is written with an
    /// empty before-image; redo only ever needs the after-image.
    fn flush_page(&self, pid: &BTreePageID) -> SmallResult {
        let catalog = Database::catalog();
        let table_pod = catalog
            .get_table(pid.table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", pid.table_id)))?;
        let table = table_pod.read().unwrap();

        let data = match self.page_bytes(pid) {
            Some(data) => data,
            None => return Ok(()),
        };

        debug!("flushing page {}", pid);
        table.write_page_to_disk(pid, &data)
    }

    /// Flush every page currently resident in the cache, regardless of
    /// owner. Used by recovery/shutdown paths; breaks `aries_no_force`
    /// if called mid-transaction, so callers outside those paths
    /// should prefer `flush_pages`.
    pub fn flush_all_pages(&self) -> SmallResult {
        for pid in self.all_keys() {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    /// Flush only the pages `tx` currently holds a latch on.
    pub fn flush_pages(&self, tx: &Transaction) -> SmallResult {
        let status = Database::mut_concurrent_status();
        for pid in self.all_keys() {
            if status.holds_latch(tx.get_id(), &pid) {
                self.flush_page(&pid)?;
            }
        }
        Ok(())
    }

    /// End-of-transaction bookkeeping (§4.F / §1's WAL requirement): on
    /// commit, every dirtied page this transaction holds a latch on is
    /// flushed and a commit record appended; on abort, those pages are
    /// simply discarded from the cache (their on-disk image was never
    /// overwritten, since nothing reaches disk outside of commit or
    /// recovery replay) and an abort record is appended.
    pub fn tx_complete(&self, tx: &Transaction, commit: bool) -> SmallResult {
        if !commit {
            let status = Database::mut_concurrent_status();
            for pid in self.all_keys() {
                if status.holds_latch(tx.get_id(), &pid) {
                    self.discard_page(&pid);
                }
            }
            return Ok(());
        }

        self.flush_pages(tx)?;
        Database::mut_concurrent_status().clear_dirty_pages(tx.get_id());
        Ok(())
    }

    /// Force-write `after` to disk without going through the WAL,
    /// invalidating any cached copy. Used exclusively by
    /// `LogManager::recover` to replay committed updates after a
    /// crash.
    pub fn recover_page(&self, pid: &BTreePageID, after: Vec<u8>) -> SmallResult {
        self.discard_page(pid);
        let catalog = Database::catalog();
        let table_pod = catalog
            .get_table(pid.table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", pid.table_id)))?;
        let table = table_pod.read().unwrap();
        table.write_page_to_disk(pid, &after)
    }

    /// Replay a page-reorganize record (§4.F `parse_page_reorganize`):
    /// decode the page and redo whatever the original reorganize pass
    /// did. This crate's pages are always dense, so a leaf reorganize
    /// only needs to drop the volatile sequential-insert hint; an
    /// internal reorganize has no residual effect to redo, but the
    /// page is still decoded and re-written so a crash mid-reorganize
    /// can't leave a half-written page behind.
    pub fn replay_page_reorganize(&self, pid: &BTreePageID) -> SmallResult {
        self.discard_page(pid);
        let catalog = Database::catalog();
        let table_pod = catalog
            .get_table(pid.table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", pid.table_id)))?;
        let table = table_pod.read().unwrap();
        let buf = table.read_page_from_disk(pid)?;
        match pid.category {
            PageCategory::Leaf => {
                let mut page = BTreeLeafPage::new(*pid, &buf, table.tuple_scheme(), table.key_field());
                page.clear_last_insert_slot();
                table.write_page_to_disk(pid, &page.get_page_data())
            }
            PageCategory::Internal => {
                let page = BTreeInternalPage::new(*pid, &buf, table.tuple_scheme(), table.key_field());
                table.write_page_to_disk(pid, &page.get_page_data())
            }
            other => Err(SmallError::new(&format!(
                "invalid page category for reorganize replay: {:?}",
                other
            ))),
        }
    }

    /// Replay a min-rec-mark record (§4.F `parse_set_min_rec_mark`):
    /// this opcode only ever records the flag being *set* -- a page
    /// becoming its parent's new leftmost child -- mirroring the
    /// one-way nature of the original record, which never logs the
    /// flag being cleared.
    pub fn replay_min_rec_mark(&self, pid: &BTreePageID) -> SmallResult {
        self.discard_page(pid);
        let catalog = Database::catalog();
        let table_pod = catalog
            .get_table(pid.table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", pid.table_id)))?;
        let table = table_pod.read().unwrap();
        let buf = table.read_page_from_disk(pid)?;
        let mut page = BTreeInternalPage::new(*pid, &buf, table.tuple_scheme(), table.key_field());
        page.set_min_rec_mark(true);
        table.write_page_to_disk(pid, &page.get_page_data())
    }
}
