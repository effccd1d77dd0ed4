//! Per-page shared/exclusive lock bookkeeping (spec §4.3).
//!
//! This is plain data plus pure logic, not a separately-synchronized
//! component: spec §4.3 calls it "conceptually separate but implemented
//! under the same mutex" as the buffer pool, so `BufferPool` owns a single
//! `LockTable` behind its one `Mutex` (spec §9's "single coarse mutex"
//! design note) rather than this type doing its own locking.

use crate::page_id::PageKey;
use crate::transaction_id::{Permission, TransactionId};
use crate::wait_for_graph::WaitForGraph;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct TxLocks {
    read_locks: HashSet<PageKey>,
    write_locks: HashSet<PageKey>,
}

#[derive(Default)]
pub struct LockTable {
    readers: HashMap<PageKey, HashSet<TransactionId>>,
    writer: HashMap<PageKey, TransactionId>,
    tx_locks: HashMap<TransactionId, TxLocks>,
    wait_for: WaitForGraph,
}

impl LockTable {
    pub fn new() -> Self {
        LockTable::default()
    }

    pub fn begin(&mut self, tid: TransactionId) {
        self.tx_locks.entry(tid).or_insert_with(TxLocks::default);
    }

    pub fn is_live(&self, tid: TransactionId) -> bool {
        self.tx_locks.contains_key(&tid)
    }

    /// Other live transactions that currently hold a lock on `key`
    /// conflicting with `tid` requesting `perm` (spec §4.3's compatibility
    /// table). Same-transaction holders never conflict with themselves.
    pub fn conflicting_holders(
        &self,
        tid: TransactionId,
        key: &PageKey,
        perm: Permission,
    ) -> Vec<TransactionId> {
        let mut holders = Vec::new();

        if let Some(&w) = self.writer.get(key) {
            if w != tid {
                holders.push(w);
            }
        }

        if perm == Permission::ReadWrite {
            if let Some(readers) = self.readers.get(key) {
                for &r in readers {
                    if r != tid {
                        holders.push(r);
                    }
                }
            }
        }

        holders
    }

    /// Record a speculative wait edge from `tid` to each conflicting holder.
    pub fn record_wait(&mut self, tid: TransactionId, holders: &[TransactionId]) {
        for &holder in holders {
            self.wait_for.add_edge(tid, holder);
        }
    }

    pub fn find_cycle(&self) -> Option<Vec<TransactionId>> {
        self.wait_for.find_cycle()
    }

    /// Try to record the lock for `tid` on `key`. Returns `true` iff no
    /// conflicting holder exists at this instant (the lock was granted).
    pub fn try_acquire(&mut self, tid: TransactionId, key: &PageKey, perm: Permission) -> bool {
        if !self.conflicting_holders(tid, key, perm).is_empty() {
            return false;
        }

        match perm {
            Permission::ReadOnly => {
                self.readers
                    .entry(key.clone())
                    .or_insert_with(HashSet::new)
                    .insert(tid);
                self.tx_locks
                    .entry(tid)
                    .or_insert_with(TxLocks::default)
                    .read_locks
                    .insert(key.clone());
            }
            Permission::ReadWrite => {
                self.writer.insert(key.clone(), tid);
                self.tx_locks
                    .entry(tid)
                    .or_insert_with(TxLocks::default)
                    .write_locks
                    .insert(key.clone());
            }
        }

        self.wait_for.remove_waiter(tid);
        true
    }

    pub fn write_locks(&self, tid: TransactionId) -> Vec<PageKey> {
        self.tx_locks
            .get(&tid)
            .map(|l| l.write_locks.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn holds_write(&self, tid: TransactionId, key: &PageKey) -> bool {
        self.writer.get(key) == Some(&tid)
    }

    /// Release every lock `tid` holds and drop its transaction state
    /// entirely (spec §4.4 commit/abort).
    pub fn release_all(&mut self, tid: TransactionId) {
        if let Some(locks) = self.tx_locks.remove(&tid) {
            for key in locks.read_locks {
                if let Some(readers) = self.readers.get_mut(&key) {
                    readers.remove(&tid);
                    if readers.is_empty() {
                        self.readers.remove(&key);
                    }
                }
            }
            for key in locks.write_locks {
                if self.writer.get(&key) == Some(&tid) {
                    self.writer.remove(&key);
                }
            }
        }
        self.wait_for.remove_transaction(tid);
    }

    pub fn clear(&mut self) {
        self.readers.clear();
        self.writer.clear();
        self.tx_locks.clear();
        self.wait_for.clear();
    }
}
