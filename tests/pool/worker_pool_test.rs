/*!
 * Worker Pool Tests
 */

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use taskmesh::pool::{self, FaultKind, PoolConfig, WorkerPool};

#[test]
fn test_three_workers_ten_jobs() {
    let outcome = pool::run(PoolConfig::new(3), 1..=10u32, |job| -> Result<(String, u32), String> {
        thread::sleep(Duration::from_millis(2));
        let worker = thread::current().name().unwrap_or("unnamed").to_string();
        Ok((worker, job * 2))
    })
    .unwrap();

    let mut doubled: Vec<u32> = outcome.results.iter().map(|(_, v)| *v).collect();
    doubled.sort_unstable();
    assert_eq!(doubled, vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20]);
    assert!(outcome.faults.is_empty());

    let names: HashSet<_> = outcome.results.iter().map(|(n, _)| n.clone()).collect();
    assert!(names.iter().all(|n| n.starts_with("taskmesh-worker-")));
    assert!(names.len() <= 3);

    assert_eq!(outcome.report.workers, 3);
    assert_eq!(outcome.report.stats.jobs_completed, 10);
}

#[test]
fn test_panicking_job_is_isolated() {
    let outcome = pool::run(PoolConfig::new(2), 0..20u32, |job| -> Result<u32, String> {
        if job == 7 {
            panic!("job 7 exploded");
        }
        Ok(job)
    })
    .unwrap();

    assert_eq!(outcome.results.len(), 19);
    assert_eq!(outcome.faults.len(), 1);
    let fault = &outcome.faults[0];
    assert_eq!(fault.kind, FaultKind::Panicked);
    assert_eq!(fault.message, "job 7 exploded");
    assert_eq!(outcome.report.stats.jobs_failed, 1);
}

#[test]
fn test_unbuffered_pipeline() {
    let config = PoolConfig::new(4).with_capacities(0, 0).with_fault_capacity(0);
    let outcome = pool::run(config, 0..50u64, |n| -> Result<u64, &'static str> {
        if n % 10 == 9 {
            Err("nines rejected")
        } else {
            Ok(n * n)
        }
    })
    .unwrap();

    let stats = outcome.report.stats;
    assert_eq!(outcome.results.len(), 45);
    assert_eq!(stats.jobs_failed, 5);
    assert_eq!(outcome.faults.len(), 5);
    assert_eq!(stats.faults_unreported, 0);
}

#[test]
fn test_every_fault_delivered_under_burst() {
    let outcome = pool::run(PoolConfig::new(4), 0..2000u32, |n| -> Result<u32, String> {
        Err(format!("job {} rejected", n))
    })
    .unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.faults.len(), 2000);
    assert_eq!(outcome.report.stats.jobs_failed, 2000);
    assert_eq!(outcome.report.stats.faults_unreported, 0);

    let messages: HashSet<_> = outcome.faults.iter().map(|f| f.message.clone()).collect();
    assert_eq!(messages.len(), 2000);
}

#[test]
fn test_manual_drive_with_wait() {
    let pool = WorkerPool::spawn(PoolConfig::new(3).with_name("manual"), |s: String| {
        Ok::<usize, String>(s.len())
    })
    .unwrap();

    let results = pool.results();
    let collector = thread::spawn(move || results.iter().sum::<usize>());

    for word in ["alpha", "beta", "gamma"] {
        pool.submit(word.to_string()).unwrap();
    }
    pool.close_input().unwrap();
    pool.wait();

    assert_eq!(collector.join().unwrap(), 14);
    let report = pool.join().unwrap();
    assert_eq!(report.name, "manual");
    assert_eq!(report.stats.jobs_completed, 3);
}
