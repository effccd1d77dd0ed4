//! Storage and transactional core: a page-slotted heap file, an LRU buffer
//! pool with FORCE/NO-STEAL commit semantics and page-level two-phase
//! locking, and an embedded deadlock-detecting lock manager.
//!
//! Grounded throughout on the teacher's `btree` module layout (one file per
//! concern: page, table, buffer pool, tuple, transaction id) and its
//! `once_cell`-backed `Database::global()` singleton (`database.rs`).

pub mod buffer_pool;
pub mod config;
pub mod error;
pub mod field;
pub mod heap_file;
pub mod io;
pub mod lock_manager;
pub mod logging;
pub mod operator;
pub mod page;
pub mod page_id;
pub mod schema;
pub mod transaction_id;
pub mod tuple;
pub mod types;
pub mod wait_for_graph;

pub use buffer_pool::BufferPool;
pub use config::Config;
pub use error::StorageError;
pub use field::{FieldKind, FieldType, Value};
pub use heap_file::HeapFile;
pub use operator::{Delete, DBFile, Insert, Operator, SequentialScan};
pub use page::HeapPage;
pub use schema::TupleDesc;
pub use transaction_id::{Permission, TransactionId};
pub use tuple::{RecordId, Tuple};
pub use types::Result;

use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;

static DATABASE: OnceCell<Database> = OnceCell::new();

/// Process-wide handle to a single buffer pool, mirroring the teacher's
/// `Database::global()` singleton so tests and a future executor can share
/// one pool without threading an `Arc<BufferPool>` through every call site.
pub struct Database {
    pool: Arc<BufferPool>,
}

impl Database {
    fn new(capacity: usize, config: Config) -> Self {
        Database {
            pool: Arc::new(BufferPool::new(capacity, config)),
        }
    }

    /// Initialize the global database. Panics if already initialized -
    /// intended to be called once at process start, matching the teacher's
    /// `Database::global()` contract.
    pub fn init(capacity: usize, config: Config) {
        DATABASE
            .set(Database::new(capacity, config))
            .unwrap_or_else(|_| panic!("Database already initialized"));
    }

    pub fn global() -> &'static Database {
        DATABASE.get().expect("Database::init was never called")
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn open_heap_file(&self, path: impl AsRef<Path>, desc: TupleDesc, config: Config) -> Result<HeapFile> {
        HeapFile::new(path, desc, Arc::clone(&self.pool), config)
    }
}
