/*!
 * RWMutex Tests
 * Reader overlap, writer exclusion, and writer preference
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use taskmesh::{LockError, RawRwMutex, RwMutex, SyncConfig};

#[test]
fn test_readers_overlap() {
    let lock = Arc::new(RwMutex::new(0u32));
    let barrier = Arc::new(Barrier::new(5));
    let peak = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..5)
        .map(|_| {
            let lock = lock.clone();
            let barrier = barrier.clone();
            let peak = peak.clone();
            thread::spawn(move || {
                let guard = lock.read();
                // All five must hold the read lock at once to pass the barrier.
                barrier.wait();
                peak.fetch_max(lock.reader_count(), Ordering::SeqCst);
                drop(guard);
            })
        })
        .collect();

    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 5);
}

#[test]
fn test_writer_excludes_everyone() {
    let lock = Arc::new(RwMutex::new(Vec::new()));
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let lock = lock.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    let mut guard = lock.write();
                    let before = guard.len();
                    guard.push(w * 100 + i);
                    assert_eq!(guard.len(), before + 1);
                }
            })
        })
        .collect();

    let reader = {
        let lock = lock.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                let guard = lock.read();
                assert!(!lock.is_write_locked());
                let _ = guard.len();
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();
    assert_eq!(lock.read().len(), 400);
}

#[test]
fn test_waiting_writer_is_not_starved_by_readers() {
    let raw = Arc::new(RawRwMutex::with_config(SyncConfig::long_wait()));
    let writes = Arc::new(AtomicUsize::new(0));
    raw.rlock();

    let writer = {
        let raw = raw.clone();
        let writes = writes.clone();
        thread::spawn(move || {
            raw.lock();
            writes.fetch_add(1, Ordering::SeqCst);
            raw.unlock().unwrap();
        })
    };
    while raw.waiting_writers() == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    // A reader arriving now queues behind the writer.
    let late_reader = {
        let raw = raw.clone();
        let writes = writes.clone();
        thread::spawn(move || {
            raw.rlock();
            let seen = writes.load(Ordering::SeqCst);
            raw.runlock().unwrap();
            seen
        })
    };
    while raw.waiting_readers() == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    raw.runlock().unwrap();
    writer.join().unwrap();
    assert_eq!(late_reader.join().unwrap(), 1);
}

#[test]
fn test_runlock_misuse() {
    let raw = RawRwMutex::new();
    assert_eq!(raw.runlock(), Err(LockError::NotReadLocked));

    raw.rlock();
    let raw = Arc::new(raw);
    let other = raw.clone();
    // Read locks are per task; another task cannot release ours.
    let fault = thread::spawn(move || other.runlock()).join().unwrap();
    assert_eq!(fault, Err(LockError::NotReadLocked));
    assert_eq!(raw.reader_count(), 1);
    raw.runlock().unwrap();
}
