/*!
 * Select
 *
 * Waits on several channel sends and receives at once and runs the handler
 * of exactly one that fires.
 *
 * # Choice
 *
 * Every attempt probes the branches in a freshly shuffled order, so when
 * several are ready each has a nonzero (uniform) chance of being chosen and
 * no branch can starve the others across repeated selects.
 *
 * # Blocking
 *
 * With no ready branch, `run` executes the default handler if one was given,
 * otherwise it parks until a branch becomes ready. A select with no branches
 * and no default blocks forever. Deadlines compose through
 * [`channel::after`](crate::channel::after) or `run_timeout`.
 */

use crate::channel::{Channel, RecvOp, SendOp};
use crate::core::errors::{ChannelError, SendError, SendTimeoutError};
use crate::core::sync::{execute, Blocking, Context, Operation, SyncConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// An operation bundled with the handler that consumes its outcome
trait Branch<R>: Operation {
    fn complete(self: Box<Self>) -> R;
}

struct RecvBranch<'a, T, F> {
    op: RecvOp<'a, T>,
    handler: F,
}

impl<T, F> Operation for RecvBranch<'_, T, F> {
    fn try_fire(&mut self) -> bool {
        self.op.try_fire()
    }

    fn register(&mut self, cx: &Arc<Context>, oper: usize) -> bool {
        self.op.register(cx, oper)
    }

    fn unregister(&mut self, cx: &Arc<Context>) {
        self.op.unregister(cx)
    }

    fn accept(&mut self) -> bool {
        self.op.accept()
    }
}

impl<T, F, R> Branch<R> for RecvBranch<'_, T, F>
where
    F: FnOnce(Option<T>) -> R,
{
    fn complete(self: Box<Self>) -> R {
        let RecvBranch { op, handler } = *self;
        handler(op.finish().ok())
    }
}

struct SendBranch<'a, T, F> {
    op: SendOp<'a, T>,
    channel: u64,
    handler: F,
}

impl<T, F> Operation for SendBranch<'_, T, F> {
    fn try_fire(&mut self) -> bool {
        self.op.try_fire()
    }

    fn register(&mut self, cx: &Arc<Context>, oper: usize) -> bool {
        self.op.register(cx, oper)
    }

    fn unregister(&mut self, cx: &Arc<Context>) {
        self.op.unregister(cx)
    }

    fn accept(&mut self) -> bool {
        self.op.accept()
    }
}

impl<T, F, R> Branch<R> for SendBranch<'_, T, F>
where
    F: FnOnce(Result<(), SendError<T>>) -> R,
{
    fn complete(self: Box<Self>) -> R {
        let SendBranch {
            op,
            channel,
            handler,
        } = *self;
        let result = op.finish().map_err(|err| match err {
            SendTimeoutError::Closed(value) | SendTimeoutError::Timeout(value) => {
                warn!(channel, "{}", ChannelError::SendOnClosed);
                SendError(value)
            }
        });
        handler(result)
    }
}

/// Multiway select over channel operations
///
/// # Examples
///
/// ```
/// use taskmesh::{Channel, Select};
///
/// let numbers = Channel::new(1);
/// let words = Channel::new(1);
/// numbers.send(10).unwrap();
///
/// let got = Select::new()
///     .recv(&numbers, |n| format!("number {:?}", n))
///     .recv(&words, |w: Option<&str>| format!("word {:?}", w))
///     .run();
/// assert_eq!(got, "number Some(10)");
/// ```
pub struct Select<'a, R> {
    branches: Vec<Box<dyn Branch<R> + 'a>>,
    default: Option<Box<dyn FnOnce() -> R + 'a>>,
    config: SyncConfig,
}

impl<'a, R> Default for Select<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            branches: Vec::new(),
            default: None,
            config,
        }
    }

    /// Add a receive branch; the handler gets `None` if the channel is
    /// closed and drained
    pub fn recv<T, F>(mut self, chan: &'a Channel<T>, handler: F) -> Self
    where
        T: 'a,
        F: FnOnce(Option<T>) -> R + 'a,
        R: 'a,
    {
        self.branches.push(Box::new(RecvBranch {
            op: RecvOp::new(&chan.shared),
            handler,
        }));
        self
    }

    /// Add a send branch; the handler gets the send fault (with the value)
    /// if the channel is closed
    ///
    /// If another branch fires, `value` is dropped unsent.
    pub fn send<T, F>(mut self, chan: &'a Channel<T>, value: T, handler: F) -> Self
    where
        T: 'a,
        F: FnOnce(Result<(), SendError<T>>) -> R + 'a,
        R: 'a,
    {
        self.branches.push(Box::new(SendBranch {
            op: SendOp::new(&chan.shared, value),
            channel: chan.id(),
            handler,
        }));
        self
    }

    /// Handler to run when no branch is ready
    pub fn default<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() -> R + 'a,
    {
        self.default = Some(Box::new(handler));
        self
    }

    /// Number of channel branches
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Fire one ready branch, the default, or block until a branch is ready
    pub fn run(self) -> R {
        let Select {
            mut branches,
            default,
            config,
        } = self;

        match default {
            Some(default) => {
                fire(&mut branches, Blocking::Never, &config).unwrap_or_else(default)
            }
            None => loop {
                if let Some(result) = fire(&mut branches, Blocking::Forever, &config) {
                    return result;
                }
            },
        }
    }

    /// Fire a ready branch without blocking; `None` if none is ready
    ///
    /// The default handler, if any, is not run.
    pub fn try_run(mut self) -> Option<R> {
        fire(&mut self.branches, Blocking::Never, &self.config)
    }

    /// Block for at most `timeout`; `None` if no branch fired in time
    ///
    /// A default handler makes this behave like `run`.
    pub fn run_timeout(self, timeout: Duration) -> Option<R> {
        self.run_deadline(Instant::now() + timeout)
    }

    pub fn run_deadline(self, deadline: Instant) -> Option<R> {
        if self.default.is_some() {
            return Some(self.run());
        }
        let Select {
            mut branches,
            config,
            ..
        } = self;
        fire(&mut branches, Blocking::Until(deadline), &config)
    }
}

fn fire<'a, R>(
    branches: &mut Vec<Box<dyn Branch<R> + 'a>>,
    blocking: Blocking,
    config: &SyncConfig,
) -> Option<R> {
    let fired = {
        let mut ops: Vec<&mut (dyn Branch<R> + 'a)> =
            branches.iter_mut().map(|branch| branch.as_mut()).collect();
        execute(ops.as_mut_slice(), blocking, config)
    };
    fired.map(|i| branches.swap_remove(i).complete())
}
