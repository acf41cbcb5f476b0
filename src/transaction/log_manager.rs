use std::collections::HashMap;

use crate::btree::page_id::BTreePageID;
use crate::common::database::Database;
use crate::error::SmallError;
use crate::transaction::tx::TransactionID;
use crate::types::SmallResult;
use crate::utils::io::{Decodeable, Encodeable, SmallFile};

const LOG_PATH: &str = "./wal.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum RecordType {
    Start = 0,
    Commit = 1,
    Abort = 2,
    Update = 3,
    /// component F: page-reorganize redo, opcode distinguishes
    /// compact vs. old row format only in the original source; this
    /// core has one row format, so the distinction collapses to a
    /// single opcode.
    PageReorganize = 4,
    /// component F: min-rec-mark redo; payload is the record's offset
    /// within the page (here: its slot number).
    RecMinMark = 5,
}

impl RecordType {
    fn from_u8(b: u8) -> RecordType {
        match b {
            0 => RecordType::Start,
            1 => RecordType::Commit,
            2 => RecordType::Abort,
            3 => RecordType::Update,
            4 => RecordType::PageReorganize,
            5 => RecordType::RecMinMark,
            _ => panic!("unknown log record type: {}", b),
        }
    }
}

/// One entry in the append-only redo/undo log. `Update` carries
/// whole-page before/after images -- simpler than the original
/// operation-log format, but it gives this crate genuine physical
/// redo *and* undo (needed for `aries_no_force`/`aries_steal`
/// combinations) without having to special-case every structural
/// operation's log format. `PageReorganize`/`RecMinMark` are kept as
/// distinguished logical records because §4.F calls them out
/// specifically and `S5`/`S6` verify them by name.
enum LogRecord {
    Start {
        tx: TransactionID,
    },
    Commit {
        tx: TransactionID,
    },
    Abort {
        tx: TransactionID,
    },
    Update {
        tx: TransactionID,
        pid: BTreePageID,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    PageReorganize {
        tx: TransactionID,
        pid: BTreePageID,
    },
    RecMinMark {
        tx: TransactionID,
        pid: BTreePageID,
        offset: u16,
    },
}

impl LogRecord {
    fn tx(&self) -> TransactionID {
        match self {
            LogRecord::Start { tx }
            | LogRecord::Commit { tx }
            | LogRecord::Abort { tx }
            | LogRecord::Update { tx, .. }
            | LogRecord::PageReorganize { tx, .. }
            | LogRecord::RecMinMark { tx, .. } => *tx,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            LogRecord::Start { tx } => {
                buf.push(RecordType::Start as u8);
                buf.extend(tx.to_be_bytes());
            }
            LogRecord::Commit { tx } => {
                buf.push(RecordType::Commit as u8);
                buf.extend(tx.to_be_bytes());
            }
            LogRecord::Abort { tx } => {
                buf.push(RecordType::Abort as u8);
                buf.extend(tx.to_be_bytes());
            }
            LogRecord::Update { tx, pid, before, after } => {
                buf.push(RecordType::Update as u8);
                buf.extend(tx.to_be_bytes());
                buf.extend(pid.encode());
                buf.extend((before.len() as u32).to_be_bytes());
                buf.extend(before);
                buf.extend((after.len() as u32).to_be_bytes());
                buf.extend(after);
            }
            LogRecord::PageReorganize { tx, pid } => {
                buf.push(RecordType::PageReorganize as u8);
                buf.extend(tx.to_be_bytes());
                buf.extend(pid.encode());
            }
            LogRecord::RecMinMark { tx, pid, offset } => {
                buf.push(RecordType::RecMinMark as u8);
                buf.extend(tx.to_be_bytes());
                buf.extend(pid.encode());
                buf.extend(offset.to_be_bytes());
            }
        }
        let mut framed = (buf.len() as u32).to_be_bytes().to_vec();
        framed.extend(buf);
        framed
    }

    fn decode(bytes: &[u8]) -> LogRecord {
        let record_type = RecordType::from_u8(bytes[0]);
        let tx = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        match record_type {
            RecordType::Start => LogRecord::Start { tx },
            RecordType::Commit => LogRecord::Commit { tx },
            RecordType::Abort => LogRecord::Abort { tx },
            RecordType::Update => {
                let pid = BTreePageID::decode(&bytes[5..17]);
                let before_len =
                    u32::from_be_bytes([bytes[17], bytes[18], bytes[19], bytes[20]]) as usize;
                let before = bytes[21..21 + before_len].to_vec();
                let mut offset = 21 + before_len;
                let after_len = u32::from_be_bytes([
                    bytes[offset],
                    bytes[offset + 1],
                    bytes[offset + 2],
                    bytes[offset + 3],
                ]) as usize;
                offset += 4;
                let after = bytes[offset..offset + after_len].to_vec();
                LogRecord::Update { tx, pid, before, after }
            }
            RecordType::PageReorganize => {
                let pid = BTreePageID::decode(&bytes[5..17]);
                LogRecord::PageReorganize { tx, pid }
            }
            RecordType::RecMinMark => {
                let pid = BTreePageID::decode(&bytes[5..17]);
                let offset = u16::from_be_bytes([bytes[17], bytes[18]]);
                LogRecord::RecMinMark { tx, pid, offset }
            }
        }
    }
}

/// The write-ahead log / mini-transaction manager: an out-of-scope
/// collaborator per §1, carried here as ambient infrastructure so the
/// crate is actually crash-recoverable and `S5` is testable.
pub struct LogManager {
    file: SmallFile,
    tx_start_position: HashMap<TransactionID, u64>,
}

impl LogManager {
    pub fn new() -> LogManager {
        LogManager {
            file: SmallFile::new(LOG_PATH).expect("failed to open wal.log"),
            tx_start_position: HashMap::new(),
        }
    }

    fn append(&mut self, record: LogRecord) {
        let bytes = record.encode();
        self.file.append_bytes(&bytes).ok();
    }

    pub fn log_start(&mut self, tx: TransactionID) {
        self.tx_start_position.insert(tx, 0);
        self.append(LogRecord::Start { tx });
    }

    pub fn log_commit(&mut self, tx: TransactionID) {
        self.append(LogRecord::Commit { tx });
        self.tx_start_position.remove(&tx);
    }

    pub fn log_abort(&mut self, tx: TransactionID) {
        self.append(LogRecord::Abort { tx });
        self.tx_start_position.remove(&tx);
    }

    pub fn log_update(&mut self, tx: TransactionID, pid: &BTreePageID, before: Vec<u8>, after: Vec<u8>) {
        self.append(LogRecord::Update {
            tx,
            pid: pid.clone(),
            before,
            after,
        });
    }

    /// §4.F: page-reorganize redo record. Written first, before the
    /// scratch-copy/rewrite work proceeds (see `reorganize_low`'s log
    /// mode switch), so that a crash mid-reorganize can still redo it
    /// from the pre-image.
    pub fn log_page_reorganize(&mut self, tx: TransactionID, pid: &BTreePageID) {
        self.append(LogRecord::PageReorganize { tx, pid: pid.clone() });
    }

    /// §4.F: min-rec-mark redo record.
    pub fn log_rec_min_mark(&mut self, tx: TransactionID, pid: &BTreePageID, offset: u16) {
        self.append(LogRecord::RecMinMark {
            tx,
            pid: pid.clone(),
            offset,
        });
    }

    /// Truncate the log, for test setup between cases.
    pub fn reset(&mut self) {
        self.file.set_len(0).ok();
        self.tx_start_position.clear();
    }

    /// ARIES-style analysis + redo: scan the log once, track which
    /// transactions committed, then replay every record belonging to
    /// a committed transaction in log order (an uncommitted
    /// transaction's records are simply not replayed, which is the
    /// effect undo would otherwise have to produce -- valid because
    /// page writes only ever reach disk through this log's replay
    /// during recovery, never directly). `PageReorganize` and
    /// `RecMinMark` replay via `parse_page_reorganize`/
    /// `parse_set_min_rec_mark` (§6); since a full `Update` for the
    /// same page always follows in the log, replaying these first is
    /// safe -- the later `Update` still has the final say.
    pub fn recover(&mut self) -> SmallResult {
        let records = self.read_all()?;

        let mut committed = std::collections::HashSet::new();
        for record in &records {
            if let LogRecord::Commit { tx } = record {
                committed.insert(*tx);
            }
        }

        for record in &records {
            match record {
                LogRecord::Update { tx, pid, after, .. } if committed.contains(tx) => {
                    Database::mut_page_cache().recover_page(pid, after.clone())?;
                }
                LogRecord::PageReorganize { tx, pid } if committed.contains(tx) => {
                    Database::mut_page_cache().replay_page_reorganize(pid)?;
                }
                LogRecord::RecMinMark { tx, pid, .. } if committed.contains(tx) => {
                    Database::mut_page_cache().replay_min_rec_mark(pid)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_all(&mut self) -> Result<Vec<LogRecord>, SmallError> {
        let mut records = Vec::new();
        let total = self.file.get_size()?;
        let mut offset = 0u64;
        // records are length-framed, but SmallFile only exposes
        // fixed-slot page reads; re-open the backing store as a flat
        // byte buffer for the recovery scan instead.
        let raw = std::fs::read(LOG_PATH).unwrap_or_default();
        while (offset as usize) + 4 <= raw.len() && offset < total {
            let len = u32::from_be_bytes([
                raw[offset as usize],
                raw[offset as usize + 1],
                raw[offset as usize + 2],
                raw[offset as usize + 3],
            ]) as usize;
            if len == 0 {
                break;
            }
            let start = offset as usize + 4;
            if start + len > raw.len() {
                break;
            }
            records.push(LogRecord::decode(&raw[start..start + len]));
            offset += 4 + len as u64;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::table::BTreeTable;
    use crate::common::database::Database;
    use crate::storage::small_int_schema;
    use crate::storage::tuple::Tuple;
    use crate::transaction::tx::Transaction;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn fresh_table(path: &str) -> crate::types::Pod<BTreeTable> {
        Database::reset();
        Database::mut_log_manager().reset();
        std::fs::remove_file(path).ok();
        let schema = small_int_schema(2, "");
        let table = BTreeTable::new(path, 0, &schema).unwrap();
        Database::mut_catalog().add_table(table.clone());
        table
    }

    /// S5: start a mutation, let its `Update` record and commit record
    /// reach the log, then simulate a crash that lost the data-page
    /// write (page on disk reverted to its pre-image) before recovery
    /// runs. Replaying the log must reproduce the same bytes a normal
    /// commit would have left on disk -- idempotent redo (property 6),
    /// checked here by re-running `recover` a second time and getting
    /// byte-identical results.
    #[test]
    fn test_recover_replays_committed_page_update() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_recover_replay.db");

        let tx = Transaction::new();
        let root_pid = {
            let table = table.read().unwrap();
            for i in 0..10 {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
            table.get_root_pid(&tx)
        };
        tx.commit().unwrap();

        let expected = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&root_pid).unwrap()
        };

        // simulate a crash that lost the flushed data page: blank it
        // out on disk and drop the cached copy, leaving only the WAL
        // as a source of truth.
        {
            let table = table.read().unwrap();
            table.write_page_to_disk(&root_pid, &vec![0u8; expected.len()]).unwrap();
        }
        Database::mut_page_cache().discard_page(&root_pid);

        Database::mut_log_manager().recover().unwrap();
        let recovered = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&root_pid).unwrap()
        };
        assert_eq!(recovered, expected);

        // idempotent: replaying again from the same log must not
        // change the now-correct page.
        Database::mut_page_cache().discard_page(&root_pid);
        Database::mut_log_manager().recover().unwrap();
        let recovered_again = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&root_pid).unwrap()
        };
        assert_eq!(recovered_again, expected);

        std::fs::remove_file("./test_recover_replay.db").ok();
    }

    /// S5 continued: an aborted transaction's page writes must never
    /// surface, even though the log contains its `Update` records --
    /// recovery only redoes updates belonging to a transaction whose
    /// `Commit` record is also present.
    #[test]
    fn test_recover_ignores_uncommitted_updates() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_recover_abort.db");

        let tx = Transaction::new();
        let root_pid = {
            let table = table.read().unwrap();
            for i in 0..10 {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
            table.get_root_pid(&tx)
        };
        tx.abort().unwrap();

        let before_recover = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&root_pid).unwrap()
        };

        Database::mut_log_manager().recover().unwrap();

        let after_recover = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&root_pid).unwrap()
        };
        assert_eq!(before_recover, after_recover);

        std::fs::remove_file("./test_recover_abort.db").ok();
    }

    /// S6: a min-rec-mark record must redo its flag the same way an
    /// `Update` redoes a page's bytes. Flip an internal page's flag
    /// directly (the same two log calls `delete_parent_entry` makes
    /// when it re-derives a spliced child's flag as `true`), let it
    /// commit, then simulate a crash that lost just the flag byte on
    /// disk and confirm recovery restores it.
    #[test]
    fn test_recover_replays_min_rec_mark() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let table = fresh_table("./test_recover_min_rec_mark.db");

        let tx = Transaction::new();
        let internal_pid = {
            let table = table.read().unwrap();
            for i in 0..500 {
                table.insert_tuple(&tx, Tuple::new_int_tuples(i, 2)).unwrap();
            }
            let root_pid = table.get_root_pid(&tx);
            assert_eq!(root_pid.category, crate::btree::page_id::PageCategory::Internal);
            root_pid
        };

        {
            let page_pod = Database::mut_page_cache()
                .get_internal_page(&tx, crate::transaction::Permission::ReadWrite, &internal_pid)
                .unwrap();
            let mut page = page_pod.write().unwrap();
            let before = page.get_page_data();
            page.set_min_rec_mark(true);
            let after = page.get_page_data();
            Database::mut_log_manager().log_update(tx.get_id(), &internal_pid, before, after);
            Database::mut_log_manager().log_rec_min_mark(tx.get_id(), &internal_pid, 0);
        }
        tx.commit().unwrap();

        let expected = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&internal_pid).unwrap()
        };

        // simulate a crash that lost the flushed page: clear just the
        // min-rec-mark byte on disk, leaving the WAL as the only
        // source of truth for it.
        {
            let table = table.read().unwrap();
            let mut corrupted = expected.clone();
            corrupted[8] = 0;
            table.write_page_to_disk(&internal_pid, &corrupted).unwrap();
        }
        Database::mut_page_cache().discard_page(&internal_pid);

        Database::mut_log_manager().recover().unwrap();
        let recovered = {
            let table = table.read().unwrap();
            table.read_page_from_disk(&internal_pid).unwrap()
        };
        assert_eq!(recovered, expected);

        std::fs::remove_file("./test_recover_min_rec_mark.db").ok();
    }

    /// §4.F round-trip: encoding then decoding a `PageReorganize` or
    /// `RecMinMark` record preserves the transaction id, page id and
    /// (for `RecMinMark`) the record offset exactly.
    #[test]
    fn test_redo_record_encode_decode_roundtrip() {
        use crate::btree::page_id::{BTreePageID, PageCategory};

        let pid = BTreePageID::new(PageCategory::Leaf, 7, 3);

        let reorganize = LogRecord::PageReorganize { tx: 42, pid: pid.clone() };
        let bytes = reorganize.encode();
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        match LogRecord::decode(&bytes[4..4 + len]) {
            LogRecord::PageReorganize { tx, pid: decoded } => {
                assert_eq!(tx, 42);
                assert_eq!(decoded, pid);
            }
            _ => panic!("wrong record type decoded"),
        }

        let min_mark = LogRecord::RecMinMark { tx: 7, pid: pid.clone(), offset: 5 };
        let bytes = min_mark.encode();
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        match LogRecord::decode(&bytes[4..4 + len]) {
            LogRecord::RecMinMark { tx, pid: decoded, offset } => {
                assert_eq!(tx, 7);
                assert_eq!(decoded, pid);
                assert_eq!(offset, 5);
            }
            _ => panic!("wrong record type decoded"),
        }
    }
}
