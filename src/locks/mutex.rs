/*!
 * Mutex
 *
 * Binary exclusive lock with a FIFO wait queue and direct ownership handoff:
 * unlock passes the lock to the oldest waiter and wakes exactly that one.
 *
 * # Hazards
 *
 * The lock is not reentrant. A task that calls `lock` while already holding
 * the same mutex deadlocks; nothing detects or breaks that cycle.
 */

use crate::core::errors::{LockError, LockKind};
use crate::core::sync::{Context, SpinWait, SyncConfig, WaiterQueue};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{error, warn};

struct MutexState {
    owner: Option<ThreadId>,
    waiters: WaiterQueue<()>,
}

impl MutexState {
    #[inline]
    fn try_acquire(&mut self, task: ThreadId) -> bool {
        if self.owner.is_none() {
            self.owner = Some(task);
            true
        } else {
            false
        }
    }
}

/// Mutex with explicit `lock` / `unlock`
///
/// Ownership is tracked per task, so unlocking an unlocked mutex or unlocking
/// from a task that does not hold it is reported as a fault instead of being
/// tolerated.
pub struct RawMutex {
    state: parking_lot::Mutex<MutexState>,
    config: SyncConfig,
    /// Spin budget resolved from `config` at construction
    spin: SpinWait,
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RawMutex")
            .field("locked", &state.owner.is_some())
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl RawMutex {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            state: parking_lot::Mutex::new(MutexState {
                owner: None,
                waiters: WaiterQueue::new(),
            }),
            spin: SpinWait::from_config(&config),
            config,
        }
    }

    /// Acquire the lock, blocking while another task holds it
    pub fn lock(&self) {
        let me = thread::current().id();
        if self.spin.spin(|| self.state.lock().try_acquire(me)) {
            return;
        }

        let cx = {
            let mut state = self.state.lock();
            if state.try_acquire(me) {
                return;
            }
            let cx = Arc::new(Context::current());
            state.waiters.register(Arc::clone(&cx), 0, ());
            cx
        };

        // The releasing task hands ownership over before waking us.
        cx.wait_until(None, &self.config);
    }

    /// Acquire the lock if it is free
    pub fn try_lock(&self) -> bool {
        self.state.lock().try_acquire(thread::current().id())
    }

    /// Release the lock held by the calling task
    pub fn unlock(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                drop(state);
                let err = LockError::NotLocked(LockKind::Mutex);
                warn!(error = %err, "Lock misuse");
                return Err(err);
            }
            Some(owner) if owner != me => {
                drop(state);
                let err = LockError::NotOwner(LockKind::Mutex);
                warn!(error = %err, "Lock misuse");
                return Err(err);
            }
            Some(_) => {}
        }

        match state.waiters.try_select() {
            Some(next) => {
                state.owner = Some(next.cx.thread_id());
                next.cx.unpark();
            }
            None => state.owner = None,
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the calling task holds the lock
    pub fn is_held_by_current(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Number of tasks queued for the lock (for diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

/// Mutex protecting a value, released by guard drop
///
/// A guard dropped during a panic still releases the lock; there is no
/// poisoning, so a failed task never wedges the lock for others.
///
/// # Examples
///
/// ```
/// use taskmesh::Mutex;
/// use std::sync::Arc;
/// use std::thread;
///
/// let views = Arc::new(Mutex::new(0u32));
/// let handles: Vec<_> = (0..8)
///     .map(|_| {
///         let views = views.clone();
///         thread::spawn(move || *views.lock() += 1)
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(*views.lock(), 8);
/// ```
pub struct Mutex<T: ?Sized> {
    raw: RawMutex,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `raw`.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self::with_config(value, SyncConfig::default())
    }

    pub fn with_config(value: T, config: SyncConfig) -> Self {
        Self {
            raw: RawMutex::with_config(config),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.raw.lock();
        MutexGuard::new(self)
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.raw.try_lock().then(|| MutexGuard::new(self))
    }

    /// Direct access through a unique borrow; no locking needed
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("Mutex").field("data", &&*guard).finish(),
            None => f.debug_struct("Mutex").field("data", &"<locked>").finish(),
        }
    }
}

/// Exclusive access to a `Mutex` value; unlocks on drop
///
/// Not `Send`: the lock must be released by the task that acquired it.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
    _not_send: PhantomData<*const ()>,
}

// SAFETY: a shared guard only hands out `&T`.
unsafe impl<T: ?Sized + Sync> Sync for MutexGuard<'_, T> {}

impl<'a, T: ?Sized> MutexGuard<'a, T> {
    fn new(mutex: &'a Mutex<T>) -> Self {
        Self {
            mutex,
            _not_send: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held by this task.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held by this task.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.raw.unlock() {
            error!(error = %err, "Mutex guard released a lock it did not hold");
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
