use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::common::database::Database;
use crate::types::SmallResult;

pub type TransactionID = u32;

static NEXT_TRANSACTION_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Committed,
    Aborted,
}

/// The user-visible unit of work a mini-transaction operates within:
/// every structural operation takes place under some `Transaction`'s
/// identity so that the lock manager and WAL can attribute latches and
/// redo/undo records to it. The core's narrower "mini-transaction"
/// (§9 glossary: a short atomic unit grouping page mutations and the
/// redo records they emit) nests inside the span of one `Transaction`
/// -- a single `Transaction` may drive many structural mini-transactions
/// (e.g. a split cascading through several levels) before it commits.
#[derive(Clone, Copy, Debug)]
pub struct Transaction {
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Transaction {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst);
        let tx = Transaction { id };
        tx.start();
        tx
    }

    fn start(&self) {
        Database::mut_log_manager().log_start(self.id);
        Database::mut_concurrent_status().register(self.id);
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    /// Flush this transaction's dirty pages, write the commit record,
    /// then release every latch it holds. Latches are held through
    /// the log write so that no other transaction can observe a
    /// partial structural change before it is durable.
    pub fn commit(&self) -> SmallResult {
        Database::mut_page_cache().tx_complete(self, true)?;
        Database::mut_log_manager().log_commit(self.id);
        Database::mut_concurrent_status().release_latches(self.id);
        Database::mut_concurrent_status().set_status(self.id, TransactionStatus::Committed);
        Ok(())
    }

    pub fn abort(&self) -> SmallResult {
        Database::mut_log_manager().log_abort(self.id);
        Database::mut_page_cache().tx_complete(self, false)?;
        Database::mut_concurrent_status().release_latches(self.id);
        Database::mut_concurrent_status().set_status(self.id, TransactionStatus::Aborted);
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Transaction {}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
