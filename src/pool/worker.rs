/*!
 * Pool Worker
 *
 * One worker thread: receive jobs until the input channel is closed and
 * drained, run each inside `catch_unwind`, forward results, and report
 * failures without taking the worker down.
 */

use super::types::{FaultKind, PoolStats, WorkerFault};
use crate::channel::Channel;
use crate::core::limits::WORKER_THREAD_PREFIX;
use crate::locks::Mutex;
use crate::waitgroup::WaitGroup;
use std::any::Any;
use std::fmt::Display;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Channels and shared state a worker runs against
pub(super) struct Worker<J, R> {
    pub index: usize,
    pub input: Channel<J>,
    pub output: Channel<R>,
    pub faults: Channel<WorkerFault>,
    pub group: Arc<WaitGroup>,
    pub stats: Arc<Mutex<PoolStats>>,
}

/// Marks the worker finished on every exit path, unwinding included
struct DoneOnDrop(Arc<WaitGroup>);

impl Drop for DoneOnDrop {
    fn drop(&mut self) {
        if let Err(err) = self.0.done() {
            error!(error = %err, "Worker completion not recorded");
        }
    }
}

pub(super) fn thread_name(index: usize) -> String {
    format!("{}-{}", WORKER_THREAD_PREFIX, index)
}

pub(super) fn spawn<J, R, E, F>(worker: Worker<J, R>, handler: Arc<F>) -> io::Result<JoinHandle<()>>
where
    J: Send + 'static,
    R: Send + 'static,
    E: Display,
    F: Fn(J) -> Result<R, E> + Send + Sync + 'static,
{
    thread::Builder::new()
        .name(thread_name(worker.index))
        .spawn(move || worker.run(&*handler))
}

impl<J, R> Worker<J, R> {
    fn run<E, F>(self, handler: &F)
    where
        E: Display,
        F: Fn(J) -> Result<R, E>,
    {
        let _done = DoneOnDrop(Arc::clone(&self.group));
        debug!(worker = self.index, "Worker started");

        for job in self.input.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(job))) {
                Ok(Ok(result)) => {
                    self.stats.lock().jobs_completed += 1;
                    if self.output.send(result).is_err() {
                        warn!(worker = self.index, "Result channel closed early; result dropped");
                    }
                }
                Ok(Err(err)) => self.report(FaultKind::Failed, err.to_string()),
                Err(payload) => self.report(FaultKind::Panicked, panic_message(payload.as_ref())),
            }
        }

        debug!(worker = self.index, "Worker exiting; input closed and drained");
    }

    fn report(&self, kind: FaultKind, message: String) {
        self.stats.lock().jobs_failed += 1;
        let fault = WorkerFault {
            worker: self.index,
            kind,
            message,
        };
        debug!(%fault, "Job fault");

        // Blocks while the fault channel is full; the consumer drains it.
        if let Err(err) = self.faults.send(fault) {
            error!(
                worker = self.index,
                fault = %err.into_inner(),
                "Fault channel closed; job fault not delivered"
            );
            self.stats.lock().faults_unreported += 1;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
