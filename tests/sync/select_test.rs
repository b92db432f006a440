/*!
 * Select Tests
 * Fair choice, default branch, timer composition, and cross-thread handoff
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};
use taskmesh::{after, Channel, Select};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[test]
#[serial]
fn test_fair_choice_between_ready_branches() {
    const RUNS: usize = 10_000;
    let left = Channel::new(1);
    let right = Channel::new(1);
    left.send(()).unwrap();
    right.send(()).unwrap();

    let mut left_wins = 0;
    for _ in 0..RUNS {
        let side = Select::new()
            .recv(&left, |_| Side::Left)
            .recv(&right, |_| Side::Right)
            .run();
        match side {
            Side::Left => {
                left_wins += 1;
                left.send(()).unwrap();
            }
            Side::Right => right.send(()).unwrap(),
        }
    }

    // Uniform choice lands well inside 40%..60% over 10k draws.
    assert!(left_wins > RUNS * 2 / 5, "left chosen {} times", left_wins);
    assert!(left_wins < RUNS * 3 / 5, "left chosen {} times", left_wins);
}

#[test]
fn test_timer_branch_fires_when_nothing_else_ready() {
    let idle = Channel::<u32>::unbuffered();
    let timer = after(Duration::from_millis(40));
    let start = Instant::now();

    let side = Select::new()
        .recv(&idle, |_| Side::Left)
        .recv(&timer, |_| Side::Right)
        .run();

    assert_eq!(side, Side::Right);
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_value_beats_timer() {
    let data = Channel::new(1);
    let timer = after(Duration::from_secs(5));
    let tx = data.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        tx.send(42).unwrap();
    });

    let got = Select::new()
        .recv(&data, |v| v)
        .recv(&timer, |_| None)
        .run();
    assert_eq!(got, Some(42));
}

#[test]
fn test_default_runs_only_when_idle() {
    let ch = Channel::new(1);
    let idle = Select::new().recv(&ch, |v: Option<u8>| v).default(|| None).run();
    assert_eq!(idle, None);

    ch.send(3).unwrap();
    let ready = Select::new().recv(&ch, |v| v).default(|| None).run();
    assert_eq!(ready, Some(3));
}

#[test]
fn test_blocked_select_send_pairs_with_receiver() {
    let jobs = Channel::unbuffered();
    let other = Channel::<u32>::unbuffered();
    let rx = jobs.clone();
    let consumer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        rx.recv()
    });

    let sent = Select::new()
        .send(&jobs, 11u32, |res| res.is_ok())
        .recv(&other, |_| false)
        .run();
    assert!(sent);
    assert_eq!(consumer.join().unwrap(), Some(11));
}

#[test]
fn test_two_selects_exchange_exactly_once() {
    let ch = Channel::unbuffered();
    let decoy = Channel::<u8>::unbuffered();
    let tx = ch.clone();
    let decoy_tx = decoy.clone();

    let sender = thread::spawn(move || {
        Select::new()
            .send(&tx, 1u8, |res| res.is_ok())
            .send(&decoy_tx, 2u8, |res| res.is_ok())
            .run_timeout(Duration::from_secs(5))
    });

    let got = Select::new()
        .recv(&ch, |v| v)
        .run_timeout(Duration::from_secs(5))
        .flatten();
    assert_eq!(got, Some(1));
    assert_eq!(sender.join().unwrap(), Some(true));
    // The losing send branch never delivered.
    assert!(decoy.try_recv().is_err());
}
