use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::btree::page_id::BTreePageID;
use crate::error::SmallError;
use crate::transaction::tx::{Transaction, TransactionID, TransactionStatus};
use crate::transaction::wait_for_graph::WaitForGraph;
use crate::types::SmallResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lock {
    SLock,
    XLock,
}

/// The permission a caller asks the page cache for; translates
/// directly to the kind of page latch taken, per §5's "S for reads, X
/// for writes".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

static TIMEOUT_SECS: AtomicU64 = AtomicU64::new(3);

/// Stands in for the out-of-scope lock manager: grants/tracks
/// per-page S/X latches on behalf of transactions, detects deadlock
/// via a wait-for graph, and tracks which pages a transaction has
/// dirtied so the page cache knows what to flush at commit. The
/// structural-move notification hooks named in §6
/// (`move_reorganize`/`split_left`/`split_right`/`merge_left`/
/// `merge_right`/`discard`/`root_raise`) are exposed as no-op-by-default
/// methods below: the real lock manager would use them to migrate gap
/// locks; this core only needs to call them at the right points.
#[derive(Default)]
pub struct ConcurrentStatus {
    s_latch_holders: Mutex<HashMap<BTreePageID, HashSet<TransactionID>>>,
    x_latch_holders: Mutex<HashMap<BTreePageID, TransactionID>>,
    hold_pages: Mutex<HashMap<TransactionID, HashSet<BTreePageID>>>,
    dirty_pages: Mutex<HashMap<TransactionID, HashSet<BTreePageID>>>,
    tx_status: Mutex<HashMap<TransactionID, TransactionStatus>>,
    wait_for_graph: Mutex<WaitForGraph>,
}

impl ConcurrentStatus {
    pub fn new() -> ConcurrentStatus {
        ConcurrentStatus::default()
    }

    pub fn set_timeout(secs: u64) {
        TIMEOUT_SECS.store(secs, Ordering::SeqCst);
    }

    pub fn register(&self, tx: TransactionID) {
        self.tx_status
            .lock()
            .unwrap()
            .insert(tx, TransactionStatus::Active);
    }

    pub fn set_status(&self, tx: TransactionID, status: TransactionStatus) {
        self.tx_status.lock().unwrap().insert(tx, status);
    }

    fn conflicts(&self, tx: TransactionID, lock: Lock, pid: &BTreePageID) -> bool {
        if let Some(holder) = self.x_latch_holders.lock().unwrap().get(pid) {
            if *holder != tx {
                return true;
            }
        }
        if lock == Lock::XLock {
            let s_holders = self.s_latch_holders.lock().unwrap();
            if let Some(holders) = s_holders.get(pid) {
                if holders.iter().any(|&h| h != tx) {
                    return true;
                }
            }
        }
        false
    }

    fn try_add_latch(&self, tx: TransactionID, lock: Lock, pid: &BTreePageID) -> bool {
        if self.conflicts(tx, lock, pid) {
            return false;
        }
        match lock {
            Lock::SLock => {
                self.s_latch_holders
                    .lock()
                    .unwrap()
                    .entry(pid.clone())
                    .or_insert_with(HashSet::new)
                    .insert(tx);
            }
            Lock::XLock => {
                self.x_latch_holders.lock().unwrap().insert(pid.clone(), tx);
            }
        }
        self.hold_pages
            .lock()
            .unwrap()
            .entry(tx)
            .or_insert_with(HashSet::new)
            .insert(pid.clone());
        true
    }

    fn update_wait_for_graph(&self, tx: TransactionID, pid: &BTreePageID) {
        let mut graph = self.wait_for_graph.lock().unwrap();
        if let Some(holder) = self.x_latch_holders.lock().unwrap().get(pid) {
            graph.add_edge(tx, *holder);
        }
        for &holder in self.s_latch_holders.lock().unwrap().get(pid).into_iter().flatten() {
            graph.add_edge(tx, holder);
        }
    }

    /// Acquire `lock` on `pid` on behalf of `tx`, blocking with a
    /// short poll loop until it is granted or the configured timeout
    /// elapses. Checks for a deadlock cycle before waiting at all, so
    /// two transactions that would wait on each other fail fast
    /// instead of both timing out.
    pub fn request_latch(&self, tx: &Transaction, lock: Lock, pid: &BTreePageID) -> SmallResult {
        if self.try_add_latch(tx.get_id(), lock, pid) {
            return Ok(());
        }

        self.update_wait_for_graph(tx.get_id(), pid);
        if self.wait_for_graph.lock().unwrap().find_cycle(tx.get_id()) {
            return Err(SmallError::new(&format!(
                "deadlock detected while {} waits for latch on {}",
                tx, pid
            )));
        }

        let deadline = Instant::now() + Duration::from_secs(TIMEOUT_SECS.load(Ordering::SeqCst));
        loop {
            if self.try_add_latch(tx.get_id(), lock, pid) {
                self.wait_for_graph.lock().unwrap().remove_node(tx.get_id());
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SmallError::new(&format!(
                    "timeout waiting for latch on {} (tx {})",
                    pid, tx
                )));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn release_latch(&self, tx: TransactionID, pid: &BTreePageID) {
        self.s_latch_holders
            .lock()
            .unwrap()
            .get_mut(pid)
            .map(|set| set.remove(&tx));
        let mut x_holders = self.x_latch_holders.lock().unwrap();
        if x_holders.get(pid) == Some(&tx) {
            x_holders.remove(pid);
        }
        self.hold_pages.lock().unwrap().get_mut(&tx).map(|set| set.remove(pid));
    }

    pub fn holds_latch(&self, tx: TransactionID, pid: &BTreePageID) -> bool {
        self.hold_pages
            .lock()
            .unwrap()
            .get(&tx)
            .map(|set| set.contains(pid))
            .unwrap_or(false)
    }

    pub fn release_latches(&self, tx: TransactionID) {
        let pages: Vec<BTreePageID> = self
            .hold_pages
            .lock()
            .unwrap()
            .get(&tx)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        for pid in pages {
            self.release_latch(tx, &pid);
        }
        self.hold_pages.lock().unwrap().remove(&tx);
        self.wait_for_graph.lock().unwrap().remove_node(tx);
    }

    pub fn set_dirty_page(&self, tx: TransactionID, pid: &BTreePageID) {
        self.dirty_pages
            .lock()
            .unwrap()
            .entry(tx)
            .or_insert_with(HashSet::new)
            .insert(pid.clone());
    }

    pub fn get_dirty_pages(&self, tx: TransactionID) -> Vec<BTreePageID> {
        self.dirty_pages
            .lock()
            .unwrap()
            .get(&tx)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_dirty_pages(&self, tx: TransactionID) {
        self.dirty_pages.lock().unwrap().remove(&tx);
    }

    pub fn clear(&self) {
        self.s_latch_holders.lock().unwrap().clear();
        self.x_latch_holders.lock().unwrap().clear();
        self.hold_pages.lock().unwrap().clear();
        self.dirty_pages.lock().unwrap().clear();
        self.tx_status.lock().unwrap().clear();
        self.wait_for_graph.lock().unwrap().clear();
    }

    // --- lock-manager structural-move notification hooks (§5/§6) ---
    // A real lock manager would migrate record/gap locks here; this
    // core only needs to call these at the right points so a future
    // lock manager implementation has somewhere to hook in.
    pub fn notify_root_raise(&self, _old_root: &BTreePageID, _new_page: &BTreePageID) {}
    pub fn notify_split(&self, _page: &BTreePageID, _new_page: &BTreePageID) {}
    pub fn notify_merge(&self, _absorbed: &BTreePageID, _survivor: &BTreePageID) {}
    pub fn notify_discard(&self, _page: &BTreePageID) {}
    pub fn notify_reorganize(&self, _page: &BTreePageID) {}
}
