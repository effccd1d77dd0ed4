//! Cross-module scenario tests, mirroring the teacher's `tests/` layout for
//! behavior that spans `HeapFile`, `BufferPool`, and the lock manager
//! together rather than any one module in isolation.

use heap_core::{
    BufferPool, Config, DBFile, Delete, FieldKind, FieldType, Insert, Operator, Permission,
    Result, SequentialScan, StorageError, Tuple, TupleDesc, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

fn int_desc() -> TupleDesc {
    TupleDesc::new(vec![FieldType::new("n", "t", FieldKind::Int)])
}

fn open(page_size: usize, capacity: usize) -> (tempfile::TempPath, Arc<BufferPool>, heap_core::HeapFile) {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.into_temp_path();
    let config = Config {
        page_size,
        ..Config::default()
    };
    let pool = Arc::new(BufferPool::new(capacity, config));
    let file = heap_core::HeapFile::new(&path, int_desc(), Arc::clone(&pool), config).unwrap();
    (path, pool, file)
}

/// S1: insert a batch of tuples under one transaction and scan them back
/// before commit; the result is exactly the inserted multiset.
#[test]
fn s1_insert_then_scan_round_trip() {
    let (_tmp, pool, file) = open(4096, 8);
    let tid = heap_core::TransactionId::new();
    pool.begin_transaction(tid);

    let upstream: Box<dyn Iterator<Item = Result<Tuple>>> = Box::new(
        (0..20).map(|i| Ok(Tuple::new(int_desc(), vec![Value::Int(i)]))),
    );
    let insert = Insert::new(&file, tid, upstream);
    let inserted = insert.execute().unwrap();
    assert_eq!(inserted, 20);

    let scan = SequentialScan::new(&file, tid);
    let scanned: Vec<i64> = scan
        .iterator(tid)
        .map(|t| match t.unwrap().get(0) {
            Value::Int(n) => *n,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(scanned, (0..20).collect::<Vec<_>>());
}

/// S2: a pool too small to hold every dirty page at once fails the insert
/// that would require evicting an uncommitted (dirty) page.
#[test]
fn s2_eviction_with_every_page_dirty_fails_with_all_dirty() {
    let tuple_size = int_desc().tuple_size(32);
    let page_size = tuple_size + 8; // one slot per page
    let (_tmp, pool, file) = open(page_size, 2);
    let tid = heap_core::TransactionId::new();
    pool.begin_transaction(tid);
    file.insert_tuple(tid, Tuple::new(int_desc(), vec![Value::Int(0)])).unwrap();
    file.insert_tuple(tid, Tuple::new(int_desc(), vec![Value::Int(1)])).unwrap();
    // Pool is now full of two dirty pages; a third page cannot be made room
    // for without evicting a dirty one, which NO-STEAL forbids.
    let result = file.insert_tuple(tid, Tuple::new(int_desc(), vec![Value::Int(2)]));
    assert!(matches!(result, Err(StorageError::AllDirty)));
}

/// S3: deleting by `RecordId` removes exactly that tuple from the scan.
#[test]
fn s3_delete_via_record_id() {
    let (_tmp, pool, file) = open(4096, 8);
    let tid = heap_core::TransactionId::new();
    pool.begin_transaction(tid);
    let rid = file
        .insert_tuple(tid, Tuple::new(int_desc(), vec![Value::Int(42)]))
        .unwrap();
    file.insert_tuple(tid, Tuple::new(int_desc(), vec![Value::Int(43)])).unwrap();

    let victim = Tuple::new(int_desc(), vec![Value::Int(42)]).with_rid(rid);
    let upstream: Box<dyn Iterator<Item = Result<Tuple>>> = Box::new(std::iter::once(Ok(victim)));
    let delete = Delete::new(&file, tid, upstream);
    let deleted = delete.execute().unwrap();
    assert_eq!(deleted, 1, "counter returned by a delete operator equals 1");

    let remaining: Vec<i64> = file
        .iterator(tid)
        .map(|t| match t.unwrap().get(0) {
            Value::Int(n) => *n,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(remaining, vec![43]);
}

/// S4: a second transaction requesting a conflicting lock blocks until the
/// first commits, then proceeds.
#[test]
fn s4_conflicting_transaction_blocks_until_release() {
    let (_tmp, pool, file) = open(4096, 8);
    let tid1 = heap_core::TransactionId::new();
    pool.begin_transaction(tid1);
    file.insert_tuple(tid1, Tuple::new(int_desc(), vec![Value::Int(1)])).unwrap();
    // tid1 holds a write lock on page 0 but has not committed.

    let tid2 = heap_core::TransactionId::new();
    pool.begin_transaction(tid2);

    let done = Arc::new(AtomicBool::new(false));
    let started = Arc::new(Barrier::new(2));

    let result = crossbeam::thread::scope(|scope| {
        let done2 = Arc::clone(&done);
        let started2 = Arc::clone(&started);
        let pool2 = Arc::clone(&pool);
        let handle = scope.spawn(move |_| {
            started2.wait();
            let r = pool2.get_page(&file, 0, tid2, Permission::ReadOnly);
            done2.store(true, Ordering::SeqCst);
            r
        });

        started.wait();
        std::thread::sleep(Duration::from_millis(80));
        assert!(
            !done.load(Ordering::SeqCst),
            "tid2 should still be blocked on tid1's write lock"
        );

        pool.commit_transaction(tid1).unwrap();
        handle.join().unwrap()
    })
    .unwrap();

    assert!(result.is_ok());
    assert!(done.load(Ordering::SeqCst));
}

/// S5: two transactions each holding what the other wants form a wait-for
/// cycle; deadlock detection aborts exactly one of them within bounded
/// retries, letting the survivor finish.
#[test]
fn s5_two_transaction_deadlock_aborts_one_side() {
    let tuple_size = int_desc().tuple_size(32);
    let page_size = tuple_size + 8; // one slot per page, so page 0 and 1 are distinct
    let (_tmp, pool, file) = open(page_size, 8);
    let setup_tid = heap_core::TransactionId::new();
    pool.begin_transaction(setup_tid);
    file.insert_tuple(setup_tid, Tuple::new(int_desc(), vec![Value::Int(0)])).unwrap();
    file.insert_tuple(setup_tid, Tuple::new(int_desc(), vec![Value::Int(1)])).unwrap();
    pool.commit_transaction(setup_tid).unwrap();

    let tid1 = heap_core::TransactionId::new();
    let tid2 = heap_core::TransactionId::new();
    pool.begin_transaction(tid1);
    pool.begin_transaction(tid2);

    pool.get_page(&file, 0, tid1, Permission::ReadWrite).unwrap();
    pool.get_page(&file, 1, tid2, Permission::ReadWrite).unwrap();

    let outcome = crossbeam::thread::scope(|scope| {
        let h1 = scope.spawn(|_| pool.get_page(&file, 1, tid1, Permission::ReadWrite));
        let h2 = scope.spawn(|_| pool.get_page(&file, 0, tid2, Permission::ReadWrite));
        (h1.join().unwrap(), h2.join().unwrap())
    })
    .unwrap();

    let aborted = matches!(outcome.0, Err(StorageError::TransactionAborted { .. }))
        || matches!(outcome.1, Err(StorageError::TransactionAborted { .. }));
    assert!(aborted, "expected at least one side of the cycle to abort");

    let both_succeeded = outcome.0.is_ok() && outcome.1.is_ok();
    assert!(!both_succeeded, "a genuine cycle cannot let both sides win");
}

/// S6: LRU promotion. Touching pages 0,1,2 then 0 again and finally 3 must
/// evict page 1 (the true tail), not page 0 (recently re-touched).
#[test]
fn s6_lru_promotion_spares_recently_touched_page() {
    let tuple_size = int_desc().tuple_size(32);
    let page_size = tuple_size + 8;
    let (path, setup_pool, setup_file) = open(page_size, 4);
    let setup_tid = heap_core::TransactionId::new();
    setup_pool.begin_transaction(setup_tid);
    for i in 0..4 {
        setup_file
            .insert_tuple(setup_tid, Tuple::new(int_desc(), vec![Value::Int(i)]))
            .unwrap();
    }
    setup_pool.commit_transaction(setup_tid).unwrap();

    let config = Config {
        page_size,
        ..Config::default()
    };
    let pool = Arc::new(BufferPool::new(3, config));
    let file = heap_core::HeapFile::new(&path, int_desc(), Arc::clone(&pool), config).unwrap();

    let tid = heap_core::TransactionId::new();
    pool.begin_transaction(tid);
    pool.get_page(&file, 0, tid, Permission::ReadOnly).unwrap();
    pool.get_page(&file, 1, tid, Permission::ReadOnly).unwrap();
    pool.get_page(&file, 2, tid, Permission::ReadOnly).unwrap();
    pool.get_page(&file, 0, tid, Permission::ReadOnly).unwrap();
    pool.get_page(&file, 3, tid, Permission::ReadOnly).unwrap();

    assert_eq!(pool.occupancy(), 3);
    assert!(pool.contains_cached(&file.page_key(0)));
    assert!(pool.contains_cached(&file.page_key(2)));
    assert!(pool.contains_cached(&file.page_key(3)));
    assert!(
        !pool.contains_cached(&file.page_key(1)),
        "page 1 was the true LRU tail and should have been evicted, not page 0"
    );
}
