/*!
 * taskmesh demo
 *
 * Runs a small fan-out/fan-in pipeline and a timer-bounded select with
 * structured logs (set RUST_LOG / TASKMESH_TRACE_JSON to adjust).
 */

use miette::Result;
use std::thread;
use std::time::Duration;
use taskmesh::pool::{self, PoolConfig};
use taskmesh::{after, init_tracing, Channel, Mutex, Select, WaitGroup};
use tracing::{info, warn};

const WORKERS: usize = 3;
const JOBS: u64 = 10;

fn main() -> Result<()> {
    init_tracing();
    info!("taskmesh demo starting");

    // Pool: 3 workers double 10 jobs
    let config = PoolConfig::new(WORKERS).with_name("doubler");
    let outcome = pool::run(config, 1..=JOBS, |job: u64| -> Result<u64, String> {
        thread::sleep(Duration::from_millis(5));
        Ok(job * 2)
    })?;

    let mut results = outcome.results;
    results.sort_unstable();
    info!(?results, faults = outcome.faults.len(), "Pool finished");

    // Shared counter behind a mutex, completion tracked by a wait group
    let total = Mutex::new(0u64);
    let group = WaitGroup::new();
    group.add(results.len() as i64)?;
    thread::scope(|s| {
        for value in &results {
            let total = &total;
            let group = &group;
            s.spawn(move || {
                *total.lock() += value;
                if let Err(err) = group.done() {
                    warn!(error = %err, "Completion not recorded");
                }
            });
        }
        group.wait();
    });
    info!(sum = *total.lock(), "Results summed");

    // Select with a deadline: nobody ever sends on `idle`
    let idle = Channel::<u64>::unbuffered();
    let timeout = after(Duration::from_millis(50));
    let fired = Select::new()
        .recv(&idle, |_| "idle channel")
        .recv(&timeout, |_| "timer")
        .run();
    info!(fired, "Select completed");

    idle.close()?;
    info!("taskmesh demo finished");
    Ok(())
}
