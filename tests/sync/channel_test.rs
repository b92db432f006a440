/*!
 * Channel Tests
 * Ordering, capacity, close, and rendezvous behavior
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::thread;
use std::time::{Duration, Instant};
use taskmesh::channel::Channel;
use taskmesh::{ChannelError, RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};

#[test]
fn test_buffered_send_does_not_block_until_full() {
    let ch = Channel::new(3);
    for i in 0..3 {
        ch.try_send(i).unwrap();
    }
    assert!(ch.is_full());
    assert!(matches!(ch.try_send(3), Err(TrySendError::Full(3))));
    assert_eq!(ch.len(), 3);
}

#[test]
fn test_blocked_sender_resumes_after_recv() {
    let ch = Channel::new(1);
    ch.send(1).unwrap();

    let tx = ch.clone();
    let handle = thread::spawn(move || {
        tx.send(2).unwrap();
        Instant::now()
    });

    thread::sleep(Duration::from_millis(30));
    let released_at = Instant::now();
    assert_eq!(ch.recv(), Some(1));
    let sent_at = handle.join().unwrap();
    assert!(sent_at >= released_at);
    assert_eq!(ch.recv(), Some(2));
}

#[test]
fn test_unbuffered_rendezvous() {
    let ch = Channel::unbuffered();
    assert!(matches!(ch.try_send(1), Err(TrySendError::Full(1))));

    let tx = ch.clone();
    let handle = thread::spawn(move || tx.send("ping").is_ok());
    assert_eq!(ch.recv(), Some("ping"));
    assert!(handle.join().unwrap());
}

#[test]
fn test_close_drains_buffer_then_reports_closed() {
    let ch = Channel::new(4);
    ch.send('a').unwrap();
    ch.send('b').unwrap();
    ch.close().unwrap();

    assert_eq!(ch.recv(), Some('a'));
    assert_eq!(ch.recv_or_default(), ('b', true));
    assert_eq!(ch.recv_or_default(), ('\0', false));
    assert_eq!(ch.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn test_send_on_closed_returns_value() {
    let ch = Channel::new(1);
    ch.close().unwrap();

    for i in 0..5 {
        let err = ch.send(format!("late {}", i)).unwrap_err();
        assert_eq!(err.into_inner(), format!("late {}", i));
    }
    match ch.try_send(String::from("try")) {
        Err(TrySendError::Closed(value)) => assert_eq!(value, "try"),
        other => panic!("expected closed, got {:?}", other),
    }
    match ch.send_timeout(String::from("timed"), Duration::from_millis(50)) {
        Err(SendTimeoutError::Closed(value)) => assert_eq!(value, "timed"),
        other => panic!("expected closed, got {:?}", other),
    }

    assert_eq!(ch.len(), 0);
    assert_eq!(ch.try_recv(), Err(TryRecvError::Closed));
    assert_eq!(ch.close(), Err(ChannelError::DoubleClose));
}

#[test]
fn test_close_wakes_blocked_receivers() {
    let ch = Channel::<u32>::unbuffered();
    let receivers: Vec<_> = (0..3)
        .map(|_| {
            let rx = ch.clone();
            thread::spawn(move || rx.recv())
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    ch.close().unwrap();
    for r in receivers {
        assert_eq!(r.join().unwrap(), None);
    }
}

#[test]
fn test_close_fails_blocked_senders() {
    let ch = Channel::new(0);
    let tx = ch.clone();
    let handle = thread::spawn(move || tx.send(5u8));

    thread::sleep(Duration::from_millis(30));
    ch.close().unwrap();
    assert_eq!(handle.join().unwrap().unwrap_err().into_inner(), 5);
}

#[test]
fn test_recv_timeout_on_idle_channel() {
    let ch = Channel::<u8>::new(1);
    let start = Instant::now();
    assert_eq!(
        ch.recv_timeout(Duration::from_millis(20)),
        Err(RecvTimeoutError::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_iteration_ends_at_close() {
    let ch = Channel::new(2);
    let tx = ch.clone();
    let producer = thread::spawn(move || {
        for i in 0..10 {
            tx.send(i).unwrap();
        }
        tx.close().unwrap();
    });

    let got: Vec<i32> = ch.iter().collect();
    producer.join().unwrap();
    assert_eq!(got, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_many_producers_deliver_everything() {
    let ch = Channel::new(8);
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let tx = ch.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    tx.send(p * 1000 + i).unwrap();
                }
            })
        })
        .collect();

    let mut got: Vec<u32> = (0..1000).map(|_| ch.recv().unwrap()).collect();
    for p in producers {
        p.join().unwrap();
    }
    got.sort_unstable();
    let mut expected: Vec<u32> = (0..4).flat_map(|p| (0..250).map(move |i| p * 1000 + i)).collect();
    expected.sort_unstable();
    assert_eq!(got, expected);
}

proptest! {
    #[test]
    fn prop_single_producer_fifo(values in prop::collection::vec(any::<i64>(), 0..200), capacity in 0usize..8) {
        let ch = Channel::new(capacity);
        let tx = ch.clone();
        let sent = values.clone();
        let producer = thread::spawn(move || {
            for v in sent {
                tx.send(v).unwrap();
            }
            tx.close().unwrap();
        });

        let received: Vec<i64> = ch.iter().collect();
        producer.join().unwrap();
        prop_assert_eq!(received, values);
    }
}
