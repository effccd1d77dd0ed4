//! The executor-facing boundary (spec §6, §4.6): the only contract consumed
//! by collaborator operators (filter, project, join, ...), none of which are
//! implemented here beyond `SequentialScan`/`Insert`/`Delete`.
//!
//! Grounded on the teacher's `sequential_scan.rs` (a pull-based `Iterator`
//! impl pulling from the buffer pool page by page) and `godb/insert_op.go`/
//! `godb/delete_op.go` for the two mutating operators.

use crate::field::{FieldKind, Value};
use crate::schema::TupleDesc;
use crate::transaction_id::TransactionId;
use crate::tuple::Tuple;
use crate::types::Result;
use std::cell::RefCell;

/// Anything that can be scanned by the (absent) query executor.
pub trait Operator {
    fn descriptor(&self) -> &TupleDesc;
    fn iterator<'a>(&'a self, tid: TransactionId) -> Box<dyn Iterator<Item = Result<Tuple>> + 'a>;
}

/// What `HeapFile` implements: the page-level operations the buffer pool
/// calls into, plus the `Operator` boundary so a `DBFile` can be scanned
/// directly (spec §6).
pub trait DBFile: Operator {
    fn page_key(&self, page_no: u32) -> crate::page_id::PageKey;
    fn read_page(&self, page_no: u32) -> Result<crate::page::HeapPage>;
    fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> Result<crate::tuple::RecordId>;
    fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()>;
    fn flush_page(&self, page: &crate::page::HeapPage) -> Result<()>;
}

/// Pulls every tuple of a `DBFile` under read intent, in page-then-slot
/// order (spec §4.2's `iterator`, wrapped for direct executor consumption).
pub struct SequentialScan<'a> {
    file: &'a dyn DBFile,
    tid: TransactionId,
}

impl<'a> SequentialScan<'a> {
    pub fn new(file: &'a dyn DBFile, tid: TransactionId) -> Self {
        SequentialScan { file, tid }
    }
}

impl<'a> Operator for SequentialScan<'a> {
    fn descriptor(&self) -> &TupleDesc {
        self.file.descriptor()
    }

    fn iterator<'b>(&'b self, tid: TransactionId) -> Box<dyn Iterator<Item = Result<Tuple>> + 'b> {
        let _ = tid;
        self.file.iterator(self.tid)
    }
}

fn count_tuple_desc() -> TupleDesc {
    TupleDesc::new(vec![crate::field::FieldType::new(
        "count",
        "",
        FieldKind::Int,
    )])
}

/// Inserts every tuple an upstream iterator yields and produces a single
/// count tuple (spec §4.6, mirroring `godb/insert_op.go`'s `InsertOp.Iterator`,
/// which performs the inserts and yields a one-field count tuple). The
/// upstream is held behind a `RefCell` so the work can run from `iterator`'s
/// `&self` receiver, matching the `Operator` trait's shape.
pub struct Insert<'a> {
    file: &'a dyn DBFile,
    tid: TransactionId,
    upstream: RefCell<Option<Box<dyn Iterator<Item = Result<Tuple>> + 'a>>>,
    desc: TupleDesc,
}

impl<'a> Insert<'a> {
    pub fn new(
        file: &'a dyn DBFile,
        tid: TransactionId,
        upstream: Box<dyn Iterator<Item = Result<Tuple>> + 'a>,
    ) -> Self {
        Insert {
            file,
            tid,
            upstream: RefCell::new(Some(upstream)),
            desc: count_tuple_desc(),
        }
    }

    /// Run to completion, returning the number of tuples inserted. Panics if
    /// called more than once (the upstream is consumed on the first call).
    pub fn execute(&self) -> Result<usize> {
        let mut upstream = self
            .upstream
            .borrow_mut()
            .take()
            .expect("Insert already executed");
        let mut count = 0usize;
        while let Some(tuple) = upstream.next() {
            self.file.insert_tuple(self.tid, tuple?)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<'a> Operator for Insert<'a> {
    fn descriptor(&self) -> &TupleDesc {
        &self.desc
    }

    fn iterator<'b>(&'b self, _tid: TransactionId) -> Box<dyn Iterator<Item = Result<Tuple>> + 'b> {
        let result = self.execute().map(|n| single_int(n as i64));
        Box::new(std::iter::once(result))
    }
}

/// Deletes every tuple an upstream iterator yields (each must carry a
/// `RecordId`) and produces a single count tuple (spec §4.6, mirroring
/// `godb/delete_op.go`; exercised by scenario S3).
pub struct Delete<'a> {
    file: &'a dyn DBFile,
    tid: TransactionId,
    upstream: RefCell<Option<Box<dyn Iterator<Item = Result<Tuple>> + 'a>>>,
    desc: TupleDesc,
}

impl<'a> Delete<'a> {
    pub fn new(
        file: &'a dyn DBFile,
        tid: TransactionId,
        upstream: Box<dyn Iterator<Item = Result<Tuple>> + 'a>,
    ) -> Self {
        Delete {
            file,
            tid,
            upstream: RefCell::new(Some(upstream)),
            desc: count_tuple_desc(),
        }
    }

    /// Run to completion, returning the number of tuples deleted. Panics if
    /// called more than once (the upstream is consumed on the first call).
    pub fn execute(&self) -> Result<usize> {
        let mut upstream = self
            .upstream
            .borrow_mut()
            .take()
            .expect("Delete already executed");
        let mut count = 0usize;
        while let Some(tuple) = upstream.next() {
            let tuple = tuple?;
            self.file.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<'a> Operator for Delete<'a> {
    fn descriptor(&self) -> &TupleDesc {
        &self.desc
    }

    fn iterator<'b>(&'b self, _tid: TransactionId) -> Box<dyn Iterator<Item = Result<Tuple>> + 'b> {
        let result = self.execute().map(|n| single_int(n as i64));
        Box::new(std::iter::once(result))
    }
}

pub fn single_int(n: i64) -> Tuple {
    Tuple::new(count_tuple_desc(), vec![Value::Int(n)])
}
