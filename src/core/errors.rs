/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Every misuse fault names the primitive and the invariant it would have
 * broken. Faults are returned to the offending task; shared state is never
 * modified on the failing path.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias for operations that can only fail with a protocol fault
pub type SyncResult<T> = Result<T, SyncError>;

/// Which lock a [`LockError`] refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Mutex,
    RwMutex,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Mutex => f.write_str("mutex"),
            LockKind::RwMutex => f.write_str("rwmutex"),
        }
    }
}

/// Channel protocol faults
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum ChannelError {
    #[error("channel: close of closed channel (close is a one-shot transition)")]
    #[diagnostic(
        code(channel::double_close),
        help("Only the owning producer should close a channel, exactly once.")
    )]
    DoubleClose,

    #[error("channel: send on closed channel (no send may succeed after close)")]
    #[diagnostic(
        code(channel::send_on_closed),
        help("Stop producing before closing, or hand close to the last producer.")
    )]
    SendOnClosed,
}

/// Lock protocol faults
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "lock", rename_all = "snake_case")]
pub enum LockError {
    #[error("{0}: unlock of unlocked lock (unlock requires a matching lock)")]
    #[diagnostic(
        code(lock::not_locked),
        help("Pair every unlock with exactly one earlier lock on the same task.")
    )]
    NotLocked(LockKind),

    #[error("{0}: unlock from a task that does not hold the lock")]
    #[diagnostic(
        code(lock::not_owner),
        help("Release the lock on the task that acquired it.")
    )]
    NotOwner(LockKind),

    #[error("rwmutex: runlock without a held read lock")]
    #[diagnostic(
        code(lock::not_read_locked),
        help("Pair every runlock with an rlock taken on the same task.")
    )]
    NotReadLocked,
}

/// WaitGroup protocol faults
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum WaitGroupError {
    #[error("waitgroup: negative counter ({counter} + {delta} < 0)")]
    #[diagnostic(
        code(waitgroup::negative_counter),
        help("Call add() for every task before it calls done(), and done() once per task.")
    )]
    NegativeCounter { counter: i64, delta: i64 },

    #[error("waitgroup: counter overflow ({counter} + {delta} > i64::MAX)")]
    #[diagnostic(
        code(waitgroup::counter_overflow),
        help("The counter tracks outstanding tasks; a delta this large is a bookkeeping bug.")
    )]
    CounterOverflow { counter: i64, delta: i64 },
}

/// Worker pool errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    #[diagnostic(
        code(pool::invalid_config),
        help("A pool needs at least one worker and bounded channel capacities.")
    )]
    InvalidConfig(String),

    #[error("Failed to spawn pool thread: {0}")]
    #[diagnostic(
        code(pool::spawn_failed),
        help("The OS refused to create a thread. Check process thread limits.")
    )]
    Spawn(String),

    #[error("{0} pool thread(s) terminated by panic outside job isolation")]
    #[diagnostic(code(pool::thread_panicked))]
    ThreadPanicked(usize),
}

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    WaitGroup(#[from] WaitGroupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pool(#[from] PoolError),
}

/// Send on a closed channel; carries the rejected value back to the caller
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("channel: send on closed channel (no send may succeed after close)")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Recover the value that could not be sent
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError { .. }")
    }
}

impl<T> From<SendError<T>> for ChannelError {
    fn from(_: SendError<T>) -> Self {
        ChannelError::SendOnClosed
    }
}

impl<T> From<SendError<T>> for SyncError {
    fn from(_: SendError<T>) -> Self {
        SyncError::Channel(ChannelError::SendOnClosed)
    }
}

/// Non-blocking send failure
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    #[error("channel: send would block (buffer full or no receiver ready)")]
    Full(T),

    #[error("channel: send on closed channel (no send may succeed after close)")]
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(v) | TrySendError::Closed(v) => v,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("Full(..)"),
            TrySendError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// Timed send failure
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub enum SendTimeoutError<T> {
    #[error("channel: send timed out")]
    Timeout(T),

    #[error("channel: send on closed channel (no send may succeed after close)")]
    Closed(T),
}

impl<T> SendTimeoutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SendTimeoutError::Timeout(v) | SendTimeoutError::Closed(v) => v,
        }
    }
}

impl<T> fmt::Debug for SendTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendTimeoutError::Timeout(_) => f.write_str("Timeout(..)"),
            SendTimeoutError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// Non-blocking receive failure
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TryRecvError {
    #[error("channel: receive would block (buffer empty and no sender ready)")]
    Empty,

    #[error("channel: closed and drained")]
    Closed,
}

/// Timed receive failure
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecvTimeoutError {
    #[error("channel: receive timed out")]
    Timeout,

    #[error("channel: closed and drained")]
    Closed,
}
