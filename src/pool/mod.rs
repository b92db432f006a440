/*!
 * Worker Pool
 *
 * Fan-out/fan-in built from the crate's own primitives:
 * - Jobs flow through an input channel to W named worker threads
 * - Results flow out through an output channel, failures through a fault
 *   channel
 * - A WaitGroup tracks live workers; a closer thread waits on it and then
 *   closes the output and fault channels, so consumers can simply drain
 *   until closed
 *
 * # Failure isolation
 *
 * Every job runs inside `catch_unwind`. A handler error or panic becomes a
 * [`WorkerFault`] and the worker moves on to the next job.
 *
 * # Hazards
 *
 * Results and faults must both be drained. Workers block on a full output
 * or fault channel, so with nobody receiving, `wait`/`join` never return.
 * [`run`] drains both concurrently.
 */

mod config;
mod types;
mod worker;

pub use config::PoolConfig;
pub use types::{FaultKind, PoolOutcome, PoolReport, PoolStats, WorkerFault};

use crate::channel::Channel;
use crate::core::errors::{ChannelError, PoolError, SendError};
use crate::core::limits::WORKER_THREAD_PREFIX;
use crate::locks::Mutex;
use crate::select::Select;
use crate::waitgroup::WaitGroup;
use std::fmt::Display;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, info_span};
use worker::Worker;

/// A running pool of worker threads
pub struct WorkerPool<J, R> {
    name: String,
    input: Channel<J>,
    output: Channel<R>,
    faults: Channel<WorkerFault>,
    group: Arc<WaitGroup>,
    stats: Arc<Mutex<PoolStats>>,
    workers: Vec<JoinHandle<()>>,
    closer: Option<JoinHandle<()>>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Validate `config` and start the workers and the closer thread
    pub fn spawn<E, F>(config: PoolConfig, handler: F) -> Result<Self, PoolError>
    where
        E: Display,
        F: Fn(J) -> Result<R, E> + Send + Sync + 'static,
    {
        config.validate()?;

        let input = Channel::with_config(config.input_capacity, config.sync.clone());
        let output = Channel::with_config(config.output_capacity, config.sync.clone());
        let faults = Channel::with_config(config.fault_capacity, config.sync.clone());
        let group = Arc::new(WaitGroup::new());
        let stats = Arc::new(Mutex::new(PoolStats::default()));
        let handler = Arc::new(handler);

        // Every worker is counted before any of them can finish.
        group
            .add(config.workers as i64)
            .map_err(|err| PoolError::InvalidConfig(err.to_string()))?;

        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let worker = Worker {
                index,
                input: input.clone(),
                output: output.clone(),
                faults: faults.clone(),
                group: Arc::clone(&group),
                stats: Arc::clone(&stats),
            };
            match worker::spawn(worker, Arc::clone(&handler)) {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    error!(pool = %config.name, worker = index, error = %err, "Worker spawn failed");
                    // Workers that never started will never call done.
                    let _ = group.add(-((config.workers - index) as i64));
                    abandon(&input, workers);
                    return Err(PoolError::Spawn(err.to_string()));
                }
            }
        }

        let closer = {
            let group = Arc::clone(&group);
            let output = output.clone();
            let faults = faults.clone();
            let name = config.name.clone();
            thread::Builder::new()
                .name(format!("{}-closer", WORKER_THREAD_PREFIX))
                .spawn(move || {
                    group.wait();
                    let _ = output.close();
                    let _ = faults.close();
                    debug!(pool = %name, "All workers finished; output closed");
                })
        };
        let closer = match closer {
            Ok(handle) => handle,
            Err(err) => {
                error!(pool = %config.name, error = %err, "Closer spawn failed");
                abandon(&input, workers);
                let _ = output.close();
                let _ = faults.close();
                return Err(PoolError::Spawn(err.to_string()));
            }
        };

        info!(
            pool = %config.name,
            workers = config.workers,
            input_capacity = config.input_capacity,
            output_capacity = config.output_capacity,
            "Worker pool started"
        );

        Ok(Self {
            name: config.name,
            input,
            output,
            faults,
            group,
            stats,
            workers,
            closer: Some(closer),
        })
    }

    /// Queue a job, blocking while the input channel is full
    pub fn submit(&self, job: J) -> Result<(), SendError<J>> {
        self.input.send(job)
    }

    /// Handle to the job channel, for feeding from other tasks
    pub fn input(&self) -> Channel<J> {
        self.input.clone()
    }

    /// Signal that no more jobs are coming
    pub fn close_input(&self) -> Result<(), ChannelError> {
        self.input.close()
    }

    /// Result channel; closed once every worker has exited
    pub fn results(&self) -> Channel<R> {
        self.output.clone()
    }

    /// Fault channel; closed together with the result channel
    ///
    /// Every job fault is delivered here. Workers block while it is full,
    /// so a caller driving the pool by hand must drain it alongside
    /// [`results`](Self::results).
    pub fn faults(&self) -> Channel<WorkerFault> {
        self.faults.clone()
    }

    /// Block until every worker has exited
    pub fn wait(&self) {
        self.group.wait();
    }

    pub fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Close input if still open, join every pool thread, and report
    ///
    /// Panics are caught per job, so a panicked pool thread means the pool
    /// machinery itself failed.
    pub fn join(mut self) -> Result<PoolReport, PoolError> {
        if !self.input.is_closed() {
            let _ = self.input.close();
        }

        let workers = self.workers.len();
        let mut panicked = std::mem::take(&mut self.workers)
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count();
        if let Some(closer) = self.closer.take() {
            if closer.join().is_err() {
                panicked += 1;
            }
        }

        if panicked > 0 {
            error!(pool = %self.name, panicked, "Pool threads panicked");
            return Err(PoolError::ThreadPanicked(panicked));
        }

        let stats = self.stats();
        info!(
            pool = %self.name,
            completed = stats.jobs_completed,
            failed = stats.jobs_failed,
            "Worker pool joined"
        );
        Ok(PoolReport {
            name: self.name.clone(),
            workers,
            stats,
        })
    }
}

impl<J, R> Drop for WorkerPool<J, R> {
    fn drop(&mut self) {
        // Detached workers still exit once the input drains.
        if !self.input.is_closed() {
            let _ = self.input.close();
        }
    }
}

/// Stop started workers after a failed spawn
fn abandon<J>(input: &Channel<J>, workers: Vec<JoinHandle<()>>) {
    let _ = input.close();
    for handle in workers {
        let _ = handle.join();
    }
}

/// Closes the job channel even if the job iterator panics
struct CloseOnDrop<J>(Channel<J>);

impl<J> Drop for CloseOnDrop<J> {
    fn drop(&mut self) {
        if !self.0.is_closed() {
            let _ = self.0.close();
        }
    }
}

enum Drained<R> {
    Result(Option<R>),
    Fault(Option<WorkerFault>),
}

/// Run `jobs` through a fresh pool and collect everything it produces
///
/// Jobs are fed from a separate thread while results and faults are drained
/// here concurrently, so bounded channels never stall the pipeline.
///
/// # Examples
///
/// ```
/// use taskmesh::pool::{self, PoolConfig};
///
/// let outcome = pool::run(PoolConfig::new(3), 1..=10, |n: u64| -> Result<u64, String> {
///     Ok(n * 2)
/// })
/// .unwrap();
///
/// let mut results = outcome.results;
/// results.sort();
/// assert_eq!(results, (1..=10).map(|n| n * 2).collect::<Vec<_>>());
/// assert!(outcome.faults.is_empty());
/// ```
pub fn run<J, R, E, F, I>(config: PoolConfig, jobs: I, handler: F) -> Result<PoolOutcome<R>, PoolError>
where
    J: Send + 'static,
    R: Send + 'static,
    E: Display,
    F: Fn(J) -> Result<R, E> + Send + Sync + 'static,
    I: IntoIterator<Item = J>,
    I::IntoIter: Send + 'static,
{
    let span = info_span!("pool_run", pool = %config.name);
    let _entered = span.enter();
    let pool = WorkerPool::spawn(config, handler)?;

    let feeder = {
        let input = CloseOnDrop(pool.input());
        let jobs = jobs.into_iter();
        thread::Builder::new()
            .name(format!("{}-feeder", pool.name()))
            .spawn(move || {
                for job in jobs {
                    if input.0.send(job).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| PoolError::Spawn(err.to_string()))?
    };

    let results_rx = pool.results();
    let faults_rx = pool.faults();
    let mut results = Vec::new();
    let mut faults = Vec::new();
    let (mut results_open, mut faults_open) = (true, true);

    while results_open || faults_open {
        let mut sel = Select::new();
        if results_open {
            sel = sel.recv(&results_rx, Drained::Result);
        }
        if faults_open {
            sel = sel.recv(&faults_rx, Drained::Fault);
        }
        match sel.run() {
            Drained::Result(Some(result)) => results.push(result),
            Drained::Result(None) => results_open = false,
            Drained::Fault(Some(fault)) => faults.push(fault),
            Drained::Fault(None) => faults_open = false,
        }
    }

    let feeder_panicked = feeder.join().is_err();
    let report = pool.join()?;
    if feeder_panicked {
        error!(pool = %report.name, "Job feeder panicked");
        return Err(PoolError::ThreadPanicked(1));
    }

    Ok(PoolOutcome {
        results,
        faults,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let result = WorkerPool::<u8, u8>::spawn(PoolConfig::new(0), |n: u8| -> Result<u8, String> {
            Ok(n)
        });
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_submit_and_join() {
        let pool = WorkerPool::spawn(PoolConfig::new(2), |n: u32| -> Result<u32, String> {
            Ok(n + 1)
        })
        .unwrap();
        for n in 0..5 {
            pool.submit(n).unwrap();
        }
        pool.close_input().unwrap();
        pool.wait();

        let mut got: Vec<_> = pool.results().iter().collect();
        got.sort();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);

        let report = pool.join().unwrap();
        assert_eq!(report.workers, 2);
        assert_eq!(report.stats.jobs_completed, 5);
    }

    #[test]
    fn test_submit_after_close_returns_job() {
        let pool = WorkerPool::spawn(PoolConfig::new(1), |n: u32| -> Result<u32, String> { Ok(n) })
            .unwrap();
        pool.close_input().unwrap();
        assert_eq!(pool.submit(9).unwrap_err().into_inner(), 9);
        pool.join().unwrap();
    }

    #[test]
    fn test_run_collects_faults() {
        let outcome = run(PoolConfig::new(2), 0..6, |n: i32| -> Result<i32, String> {
            if n % 3 == 0 {
                Err(format!("job {} rejected", n))
            } else {
                Ok(n)
            }
        })
        .unwrap();

        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.faults.len(), 2);
        assert_eq!(outcome.report.stats.jobs_failed, 2);
    }
}
