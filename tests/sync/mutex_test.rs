/*!
 * Mutex Tests
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use taskmesh::{LockError, LockKind, Mutex, RawMutex, SyncConfig};

#[test]
fn test_concurrent_increments_are_not_lost() {
    let counter = Arc::new(Mutex::new(0u64));
    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                *counter.lock() += 1;
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*counter.lock(), 1000);
}

#[test]
fn test_mutual_exclusion_under_contention() {
    let raw = Arc::new(RawMutex::with_config(SyncConfig::low_latency()));
    let inside = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let raw = raw.clone();
            let inside = inside.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    raw.lock();
                    assert!(!inside.swap(true, Ordering::SeqCst));
                    inside.store(false, Ordering::SeqCst);
                    raw.unlock().unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert!(!raw.is_locked());
}

#[test]
fn test_fifo_handoff_order() {
    let raw = Arc::new(RawMutex::with_config(SyncConfig::long_wait()));
    let order = Arc::new(Mutex::new(Vec::new()));
    raw.lock();

    let mut handles = Vec::new();
    for id in 0..4 {
        let waiter_raw = raw.clone();
        let order = order.clone();
        handles.push(thread::spawn(move || {
            waiter_raw.lock();
            order.lock().push(id);
            waiter_raw.unlock().unwrap();
        }));
        // Queue waiters one at a time so arrival order is known.
        while raw.waiter_count() != id + 1 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    raw.unlock().unwrap();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
}

#[test]
fn test_misuse_faults_leave_state_unchanged() {
    let raw = Arc::new(RawMutex::new());
    assert_eq!(raw.unlock(), Err(LockError::NotLocked(LockKind::Mutex)));
    assert!(!raw.is_locked());

    raw.lock();
    let other = raw.clone();
    let fault = thread::spawn(move || other.unlock()).join().unwrap();
    assert_eq!(fault, Err(LockError::NotOwner(LockKind::Mutex)));
    assert!(raw.is_held_by_current());
    raw.unlock().unwrap();
}
