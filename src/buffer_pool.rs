//! `BufferPool`: bounded LRU page cache, FORCE/NO-STEAL commit, and the
//! embedded lock manager (spec §4.4, §4.3, §9's "single coarse mutex" note).
//!
//! Grounded on the teacher's `btree::buffer_pool::BufferPool` for the cache
//! shape (a capacity-bounded map behind one lock, page-not-found triggers a
//! load, eviction scans for a victim) generalized from the teacher's
//! page-latch/steal design to this crate's simpler NO-STEAL contract: a
//! dirty page is never an eviction victim, full stop, so commit is the only
//! thing that ever writes a page back to disk.

use crate::config::Config;
use crate::error::StorageError;
use crate::heap_file::flush_page_bytes;
use crate::lock_manager::LockTable;
use crate::operator::DBFile;
use crate::page::HeapPage;
use crate::page_id::PageKey;
use crate::schema::TupleDesc;
use crate::transaction_id::{Permission, TransactionId};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct PoolState {
    lock_table: LockTable,
    pages: HashMap<PageKey, Arc<Mutex<HeapPage>>>,
    /// Front = most recently used, back = next eviction candidate.
    lru: VecDeque<PageKey>,
}

pub struct BufferPool {
    capacity: usize,
    config: Config,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(capacity: usize, config: Config) -> Self {
        BufferPool {
            capacity,
            config,
            state: Mutex::new(PoolState {
                lock_table: LockTable::new(),
                pages: HashMap::new(),
                lru: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Move `tid` into the `Active` state (spec §3 lifecycle).
    pub fn begin_transaction(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        state.lock_table.begin(tid);
        debug!("{} began", tid);
    }

    fn backoff(&self) {
        let ms = rand::thread_rng().gen_range(0, self.config.lock_backoff_max_ms.max(1));
        std::thread::sleep(Duration::from_millis(ms));
    }

    /// Fetch `pno` of `file` under `perm` for `tid`, running the full
    /// lock-acquisition / wait-for / deadlock-detection protocol of spec
    /// §4.3 before touching the cache.
    pub fn get_page(
        &self,
        file: &dyn DBFile,
        pno: u32,
        tid: TransactionId,
        perm: Permission,
    ) -> crate::types::Result<Arc<Mutex<HeapPage>>> {
        let key = file.page_key(pno);
        loop {
            let mut state = self.state.lock().unwrap();
            if !state.lock_table.is_live(tid) {
                return Err(StorageError::TransactionDead { tid: tid.raw() });
            }

            let holders = state.lock_table.conflicting_holders(tid, &key, perm);
            if holders.is_empty() {
                state.lock_table.try_acquire(tid, &key, perm);
                return self.fetch_or_load(&mut state, &key, || file.read_page(pno));
            }

            state.lock_table.record_wait(tid, &holders);
            if state.lock_table.find_cycle().is_some() {
                warn!("deadlock detected, aborting {}", tid);
                self.abort_locked(&mut state, tid);
                drop(state);
                self.backoff();
                return Err(StorageError::TransactionAborted { tid: tid.raw() });
            }
            drop(state);
            self.backoff();
        }
    }

    /// Register a freshly allocated (not-yet-on-disk) page under write lock,
    /// used by `HeapFile::insert_tuple`'s growth path (spec §9 open question
    /// 3: the page stays dirty in the pool, nothing is flushed out of band).
    pub fn alloc_page(
        &self,
        file: &dyn DBFile,
        pno: u32,
        tid: TransactionId,
        desc: TupleDesc,
        config: Config,
    ) -> crate::types::Result<Arc<Mutex<HeapPage>>> {
        let key = file.page_key(pno);
        loop {
            let mut state = self.state.lock().unwrap();
            if !state.lock_table.is_live(tid) {
                return Err(StorageError::TransactionDead { tid: tid.raw() });
            }
            let holders = state.lock_table.conflicting_holders(tid, &key, Permission::ReadWrite);
            if holders.is_empty() {
                state.lock_table.try_acquire(tid, &key, Permission::ReadWrite);
                let file_id = key.file.clone();
                return self.fetch_or_load(&mut state, &key, || {
                    HeapPage::new(desc.clone(), pno, file_id.clone(), config.page_size, config.string_length)
                });
            }
            state.lock_table.record_wait(tid, &holders);
            if state.lock_table.find_cycle().is_some() {
                self.abort_locked(&mut state, tid);
                drop(state);
                self.backoff();
                return Err(StorageError::TransactionAborted { tid: tid.raw() });
            }
            drop(state);
            self.backoff();
        }
    }

    /// Return the cached page for `key`, promoting it in the LRU order, or
    /// load it with `load` after evicting a clean victim if the cache is at
    /// capacity (spec §4.4's eviction policy).
    fn fetch_or_load(
        &self,
        state: &mut PoolState,
        key: &PageKey,
        load: impl FnOnce() -> crate::types::Result<HeapPage>,
    ) -> crate::types::Result<Arc<Mutex<HeapPage>>> {
        if state.pages.contains_key(key) {
            state.lru.retain(|k| k != key);
            state.lru.push_front(key.clone());
            return Ok(Arc::clone(state.pages.get(key).unwrap()));
        }

        if state.pages.len() >= self.capacity {
            self.evict_one(state)?;
        }

        let page = load()?;
        let arc = Arc::new(Mutex::new(page));
        state.pages.insert(key.clone(), Arc::clone(&arc));
        state.lru.push_front(key.clone());
        Ok(arc)
    }

    /// Scan from the LRU tail; rotate dirty pages to the front and evict the
    /// first clean page found. `AllDirty` if a full pass finds none (spec
    /// §4.4, invariant 2: a dirty page is never an eviction victim).
    fn evict_one(&self, state: &mut PoolState) -> crate::types::Result<()> {
        let attempts = state.lru.len();
        for _ in 0..attempts {
            let candidate = match state.lru.back() {
                Some(k) => k.clone(),
                None => break,
            };
            let dirty = state
                .pages
                .get(&candidate)
                .map(|p| p.lock().unwrap().is_dirty())
                .unwrap_or(false);
            state.lru.pop_back();
            if dirty {
                state.lru.push_front(candidate);
            } else {
                state.pages.remove(&candidate);
                debug!("evicted clean page {}", candidate);
                return Ok(());
            }
        }
        Err(StorageError::AllDirty)
    }

    /// Flush every write-locked dirty page to disk, then release all of
    /// `tid`'s locks (spec §4.4 FORCE commit).
    pub fn commit_transaction(&self, tid: TransactionId) -> crate::types::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.lock_table.is_live(tid) {
            return Err(StorageError::TransactionDead { tid: tid.raw() });
        }

        let keys = state.lock_table.write_locks(tid);
        for key in keys {
            if let Some(page_arc) = state.pages.get(&key).cloned() {
                let mut page = page_arc.lock().unwrap();
                if page.is_dirty() {
                    let bytes = page.serialize();
                    flush_page_bytes(key.file.as_str(), key.page_no, &bytes, self.config.page_size)?;
                    page.set_dirty(false);
                }
            }
        }

        state.lock_table.release_all(tid);
        info!("{} committed", tid);
        Ok(())
    }

    /// Discard `tid`'s dirty pages without flushing, then release its locks
    /// (spec §4.4 abort contract).
    pub fn abort_transaction(&self, tid: TransactionId) -> crate::types::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.lock_table.is_live(tid) {
            return Err(StorageError::TransactionDead { tid: tid.raw() });
        }
        self.abort_locked(&mut state, tid);
        info!("{} aborted", tid);
        Ok(())
    }

    fn abort_locked(&self, state: &mut PoolState, tid: TransactionId) {
        for key in state.lock_table.write_locks(tid) {
            state.pages.remove(&key);
            state.lru.retain(|k| k != &key);
        }
        state.lock_table.release_all(tid);
    }

    /// Synchronously flush and drop every cached page regardless of dirty
    /// state or ownership; a test-only escape hatch (spec §4.4).
    pub fn flush_all_pages(&self) -> crate::types::Result<()> {
        let mut state = self.state.lock().unwrap();
        let keys: Vec<PageKey> = state.pages.keys().cloned().collect();
        for key in keys {
            if let Some(page_arc) = state.pages.get(&key).cloned() {
                let mut page = page_arc.lock().unwrap();
                let bytes = page.serialize();
                flush_page_bytes(key.file.as_str(), key.page_no, &bytes, self.config.page_size)?;
                page.set_dirty(false);
            }
        }
        state.pages.clear();
        state.lru.clear();
        Ok(())
    }

    /// One past the highest cached page number belonging to `file`, or
    /// `None` if the pool holds nothing for it. Lets `HeapFile` see pages it
    /// has allocated but not yet flushed (read-your-own-writes before commit).
    pub fn highest_cached_page_no(&self, file: &crate::page_id::FileId) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .keys()
            .filter(|k| &k.file == file)
            .map(|k| k.page_no)
            .max()
    }

    pub fn occupancy(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    pub fn contains_cached(&self, key: &PageKey) -> bool {
        self.state.lock().unwrap().pages.contains_key(key)
    }

    pub fn holds_write_lock(&self, tid: TransactionId, key: &PageKey) -> bool {
        self.state.lock().unwrap().lock_table.holds_write(tid, key)
    }
}
