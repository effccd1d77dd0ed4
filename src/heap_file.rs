//! `HeapFile`: a page-slotted table backed by a single OS file (spec §4.2).
//!
//! Grounded on the teacher's `table.rs` (`HeapTable::read_page`,
//! `get_num_pages`, opening the backing file and seeking to a page offset)
//! and the Go source's `heap_file.go` for the insert growth path. Every call
//! opens the backing file fresh rather than keeping a long-lived handle,
//! matching the teacher's `table.rs` pattern of a `Mutex<File>` reopened per
//! operation - simplified here to a bare open since all access is already
//! serialized behind the buffer pool's mutex.

use crate::buffer_pool::BufferPool;
use crate::config::Config;
use crate::operator::{DBFile, Operator};
use crate::page::HeapPage;
use crate::page_id::{FileId, PageKey};
use crate::schema::TupleDesc;
use crate::transaction_id::{Permission, TransactionId};
use crate::tuple::{RecordId, Tuple};
use crate::types::Result;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct HeapFile {
    path: PathBuf,
    file_id: FileId,
    desc: TupleDesc,
    config: Config,
    pool: Arc<BufferPool>,
}

impl HeapFile {
    /// Open (creating if absent) the backing file at `path` for `desc`,
    /// sharing pages through `pool` (spec §4.2 `new`).
    pub fn new(path: impl AsRef<Path>, desc: TupleDesc, pool: Arc<BufferPool>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(&path)?;
        let file_id = FileId::new(path.to_string_lossy().into_owned());
        Ok(HeapFile {
            path,
            file_id,
            desc,
            config,
            pool,
        })
    }

    /// Pages actually persisted to disk right now. FORCE/NO-STEAL means this
    /// only changes on commit.
    pub fn num_pages(&self) -> usize {
        let len = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        (len as usize) / self.config.page_size
    }

    /// Pages visible to a transaction that already has some of them cached
    /// (read-your-own-writes): the larger of the on-disk count and one past
    /// the highest page number of this file currently held in the pool.
    /// `insert_tuple`'s growth path and the scan iterator both need this, not
    /// the raw on-disk count, or a transaction could never see tuples it
    /// just inserted into an unflushed page.
    fn page_count_view(&self) -> usize {
        let on_disk = self.num_pages();
        let cached = self
            .pool
            .highest_cached_page_no(&self.file_id)
            .map(|p| p as usize + 1)
            .unwrap_or(0);
        on_disk.max(cached)
    }

    fn read_page_bytes(&self, page_no: u32) -> Result<Vec<u8>> {
        let mut f = OpenOptions::new().read(true).open(&self.path)?;
        f.seek(SeekFrom::Start(page_no as u64 * self.config.page_size as u64))?;
        let mut buf = vec![0u8; self.config.page_size];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Insert `tuple` into the first page with a free slot, allocating a
    /// fresh page if every existing page is full (spec §4.2). The freshly
    /// allocated page is registered directly in the buffer pool and left
    /// dirty for the eventual commit to flush - spec §9's open question 3:
    /// unlike the Go source, this never performs an out-of-band flush during
    /// growth.
    pub fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> Result<RecordId> {
        let n = self.page_count_view();
        for pno in 0..n as u32 {
            let page_arc = self.pool.get_page(self, pno, tid, Permission::ReadWrite)?;
            let mut page = page_arc.lock().unwrap();
            if !page.is_full() {
                let rid = page.insert(tuple)?;
                page.set_dirty(true);
                return Ok(rid);
            }
        }

        let new_pno = n as u32;
        let page_arc = self
            .pool
            .alloc_page(self, new_pno, tid, self.desc.clone(), self.config)?;
        let mut page = page_arc.lock().unwrap();
        let rid = page.insert(tuple)?;
        page.set_dirty(true);
        Ok(rid)
    }

    /// Delete the tuple named by `tuple.rid` (spec §4.2).
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.rid.ok_or_else(|| crate::error::StorageError::MalformedData {
            detail: "cannot delete a tuple with no record id".to_string(),
        })?;
        let page_arc = self.pool.get_page(self, rid.page_no, tid, Permission::ReadWrite)?;
        let mut page = page_arc.lock().unwrap();
        page.delete(rid)?;
        page.set_dirty(true);
        Ok(())
    }
}

impl Operator for HeapFile {
    fn descriptor(&self) -> &TupleDesc {
        &self.desc
    }

    fn iterator<'a>(&'a self, tid: TransactionId) -> Box<dyn Iterator<Item = Result<Tuple>> + 'a> {
        Box::new(HeapFileIter {
            file: self,
            tid,
            next_page_no: 0,
            buffer: Vec::new().into_iter(),
        })
    }
}

impl DBFile for HeapFile {
    fn page_key(&self, page_no: u32) -> PageKey {
        PageKey::new(self.file_id.clone(), page_no)
    }

    fn read_page(&self, page_no: u32) -> Result<HeapPage> {
        let bytes = self.read_page_bytes(page_no)?;
        HeapPage::deserialize(
            &bytes,
            self.desc.clone(),
            page_no,
            self.file_id.clone(),
            self.config.page_size,
            self.config.string_length,
        )
    }

    fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> Result<RecordId> {
        HeapFile::insert_tuple(self, tid, tuple)
    }

    fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        HeapFile::delete_tuple(self, tid, tuple)
    }

    fn flush_page(&self, page: &HeapPage) -> Result<()> {
        let bytes = page.serialize();
        flush_page_bytes(self.file_id.as_str(), page.page_no(), &bytes, self.config.page_size)
    }
}

/// Flush a page's serialized bytes to `path` at its page offset. Used by
/// `BufferPool::commit_transaction`, which addresses pages purely by
/// `PageKey` (file path + page number) and so never needs a `HeapFile`
/// handle at commit time.
pub fn flush_page_bytes(path: &str, page_no: u32, bytes: &[u8], page_size: usize) -> Result<()> {
    debug_assert_eq!(bytes.len(), page_size);
    let mut f = OpenOptions::new().write(true).open(path)?;
    f.seek(SeekFrom::Start(page_no as u64 * page_size as u64))?;
    f.write_all(bytes)?;
    f.flush()?;
    Ok(())
}

struct HeapFileIter<'a> {
    file: &'a HeapFile,
    tid: TransactionId,
    next_page_no: u32,
    buffer: std::vec::IntoIter<Tuple>,
}

impl<'a> Iterator for HeapFileIter<'a> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Result<Tuple>> {
        loop {
            if let Some(t) = self.buffer.next() {
                return Some(Ok(t));
            }
            if self.next_page_no as usize >= self.file.page_count_view() {
                return None;
            }
            match self
                .file
                .pool
                .get_page(self.file, self.next_page_no, self.tid, Permission::ReadOnly)
            {
                Ok(page_arc) => {
                    let page = page_arc.lock().unwrap();
                    let tuples: Vec<Tuple> = page.iter().collect();
                    drop(page);
                    self.buffer = tuples.into_iter();
                    self.next_page_no += 1;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
