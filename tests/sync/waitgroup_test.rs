/*!
 * WaitGroup Tests
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use taskmesh::{WaitGroup, WaitGroupError};

#[test]
fn test_wait_returns_after_all_done() {
    let group = Arc::new(WaitGroup::new());
    let finished = Arc::new(AtomicUsize::new(0));
    group.add(5).unwrap();

    for i in 0..5 {
        let group = group.clone();
        let finished = finished.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5 * i));
            finished.fetch_add(1, Ordering::SeqCst);
            group.done().unwrap();
        });
    }

    group.wait();
    assert_eq!(finished.load(Ordering::SeqCst), 5);
    assert_eq!(group.count(), 0);
}

#[test]
fn test_negative_counter_rejected() {
    let group = WaitGroup::new();
    group.add(2).unwrap();
    assert_eq!(
        group.add(-3),
        Err(WaitGroupError::NegativeCounter {
            counter: 2,
            delta: -3
        })
    );
    assert_eq!(group.count(), 2);
}

#[test]
fn test_counter_overflow_rejected() {
    let group = WaitGroup::new();
    group.add(i64::MAX - 1).unwrap();
    for _ in 0..3 {
        assert_eq!(
            group.add(2),
            Err(WaitGroupError::CounterOverflow {
                counter: i64::MAX - 1,
                delta: 2
            })
        );
    }
    assert_eq!(group.count(), i64::MAX - 1);

    group.add(1).unwrap();
    assert_eq!(group.count(), i64::MAX);
    assert!(group.add(i64::MAX).is_err());
    assert_eq!(group.count(), i64::MAX);
}

#[test]
fn test_waiter_blocks_while_positive() {
    let group = Arc::new(WaitGroup::new());
    group.add(1).unwrap();
    assert!(!group.wait_timeout(Duration::from_millis(20)));

    let g = group.clone();
    let handle = thread::spawn(move || g.wait_timeout(Duration::from_secs(5)));
    thread::sleep(Duration::from_millis(10));
    group.done().unwrap();
    assert!(handle.join().unwrap());
}
