/*!
 * Reader/Writer Mutex
 *
 * Many concurrent readers or one exclusive writer, built on the same FIFO
 * queue and direct-handoff discipline as `RawMutex`.
 *
 * # Fairness: writer preference with reader batching
 *
 * - A new reader is admitted only while no writer holds the lock and no
 *   writer is waiting; otherwise it queues.
 * - When the last reader leaves, the oldest waiting writer is handed the lock.
 * - When a writer releases, every reader queued at that instant is admitted
 *   together as one batch; only if no reader is queued does the next writer
 *   get the lock.
 *
 * A continuous stream of readers therefore cannot starve a writer, and a
 * continuous stream of writers cannot starve queued readers.
 *
 * # Hazards
 *
 * Not reentrant. Taking `rlock` twice on one task can deadlock if a writer
 * queues in between, and upgrading a read lock to a write lock always does.
 */

use crate::core::errors::{LockError, LockKind};
use crate::core::sync::{Context, SpinWait, SyncConfig, WaiterQueue};
use ahash::AHashMap;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{error, warn};

struct RwState {
    writer: Option<ThreadId>,
    /// Read locks held per task
    readers: AHashMap<ThreadId, usize>,
    reader_count: usize,
    waiting_writers: WaiterQueue<()>,
    waiting_readers: WaiterQueue<()>,
}

impl RwState {
    #[inline]
    fn can_read(&self) -> bool {
        self.writer.is_none() && self.waiting_writers.is_empty()
    }

    #[inline]
    fn can_write(&self) -> bool {
        self.writer.is_none() && self.reader_count == 0
    }

    fn admit_reader(&mut self, task: ThreadId) {
        *self.readers.entry(task).or_insert(0) += 1;
        self.reader_count += 1;
    }

    fn try_read(&mut self, task: ThreadId) -> bool {
        if self.can_read() {
            self.admit_reader(task);
            true
        } else {
            false
        }
    }

    fn try_write(&mut self, task: ThreadId) -> bool {
        if self.can_write() && self.waiting_writers.is_empty() {
            self.writer = Some(task);
            true
        } else {
            false
        }
    }

    fn hand_to_writer(&mut self) -> bool {
        match self.waiting_writers.try_select() {
            Some(next) => {
                self.writer = Some(next.cx.thread_id());
                next.cx.unpark();
                true
            }
            None => false,
        }
    }

    fn admit_waiting_readers(&mut self) -> usize {
        let mut admitted = 0;
        while let Some(next) = self.waiting_readers.try_select() {
            self.admit_reader(next.cx.thread_id());
            next.cx.unpark();
            admitted += 1;
        }
        admitted
    }
}

/// Reader/writer lock with explicit `rlock`/`runlock` and `lock`/`unlock`
pub struct RawRwMutex {
    state: parking_lot::Mutex<RwState>,
    config: SyncConfig,
    /// Spin budget resolved from `config` at construction
    spin: SpinWait,
}

impl Default for RawRwMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawRwMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RawRwMutex")
            .field("write_locked", &state.writer.is_some())
            .field("readers", &state.reader_count)
            .field("waiting_writers", &state.waiting_writers.len())
            .field("waiting_readers", &state.waiting_readers.len())
            .finish()
    }
}

impl RawRwMutex {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            state: parking_lot::Mutex::new(RwState {
                writer: None,
                readers: AHashMap::new(),
                reader_count: 0,
                waiting_writers: WaiterQueue::new(),
                waiting_readers: WaiterQueue::new(),
            }),
            spin: SpinWait::from_config(&config),
            config,
        }
    }

    /// Acquire a shared read lock
    pub fn rlock(&self) {
        let me = thread::current().id();
        if self.spin.spin(|| self.state.lock().try_read(me)) {
            return;
        }

        let cx = {
            let mut state = self.state.lock();
            if state.try_read(me) {
                return;
            }
            let cx = Arc::new(Context::current());
            state.waiting_readers.register(Arc::clone(&cx), 0, ());
            cx
        };

        // Admitted by a releasing writer, which also records our read lock.
        cx.wait_until(None, &self.config);
    }

    pub fn try_rlock(&self) -> bool {
        self.state.lock().try_read(thread::current().id())
    }

    /// Release one read lock held by the calling task
    pub fn runlock(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.readers.get_mut(&me) {
            Some(held) => {
                *held -= 1;
                if *held == 0 {
                    state.readers.remove(&me);
                }
            }
            None => {
                drop(state);
                warn!(error = %LockError::NotReadLocked, "Lock misuse");
                return Err(LockError::NotReadLocked);
            }
        }

        state.reader_count -= 1;
        if state.reader_count == 0 {
            state.hand_to_writer();
        }
        Ok(())
    }

    /// Acquire the exclusive write lock
    pub fn lock(&self) {
        let me = thread::current().id();
        if self.spin.spin(|| self.state.lock().try_write(me)) {
            return;
        }

        let cx = {
            let mut state = self.state.lock();
            if state.try_write(me) {
                return;
            }
            let cx = Arc::new(Context::current());
            state.waiting_writers.register(Arc::clone(&cx), 0, ());
            cx
        };

        cx.wait_until(None, &self.config);
    }

    pub fn try_lock(&self) -> bool {
        self.state.lock().try_write(thread::current().id())
    }

    /// Release the write lock held by the calling task
    pub fn unlock(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.writer {
            None => {
                drop(state);
                let err = LockError::NotLocked(LockKind::RwMutex);
                warn!(error = %err, "Lock misuse");
                return Err(err);
            }
            Some(owner) if owner != me => {
                drop(state);
                let err = LockError::NotOwner(LockKind::RwMutex);
                warn!(error = %err, "Lock misuse");
                return Err(err);
            }
            Some(_) => {}
        }

        state.writer = None;
        if state.admit_waiting_readers() == 0 {
            state.hand_to_writer();
        }
        Ok(())
    }

    /// Number of read locks currently held
    pub fn reader_count(&self) -> usize {
        self.state.lock().reader_count
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    pub fn waiting_writers(&self) -> usize {
        self.state.lock().waiting_writers.len()
    }

    pub fn waiting_readers(&self) -> usize {
        self.state.lock().waiting_readers.len()
    }
}

/// Reader/writer lock protecting a value, released by guard drop
pub struct RwMutex<T: ?Sized> {
    raw: RawRwMutex,
    data: UnsafeCell<T>,
}

// SAFETY: readers share `&T` (needs Sync), writers get `&mut T` (needs Send).
unsafe impl<T: ?Sized + Send> Send for RwMutex<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwMutex<T> {}

impl<T> RwMutex<T> {
    pub fn new(value: T) -> Self {
        Self::with_config(value, SyncConfig::default())
    }

    pub fn with_config(value: T, config: SyncConfig) -> Self {
        Self {
            raw: RawRwMutex::with_config(config),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> RwMutex<T> {
    pub fn read(&self) -> RwReadGuard<'_, T> {
        self.raw.rlock();
        RwReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_read(&self) -> Option<RwReadGuard<'_, T>> {
        self.raw.try_rlock().then(|| RwReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    pub fn write(&self) -> RwWriteGuard<'_, T> {
        self.raw.lock();
        RwWriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_write(&self) -> Option<RwWriteGuard<'_, T>> {
        self.raw.try_lock().then(|| RwWriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn reader_count(&self) -> usize {
        self.raw.reader_count()
    }

    pub fn is_write_locked(&self) -> bool {
        self.raw.is_write_locked()
    }
}

impl<T: Default> Default for RwMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RwMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_read() {
            Some(guard) => f.debug_struct("RwMutex").field("data", &&*guard).finish(),
            None => f.debug_struct("RwMutex").field("data", &"<locked>").finish(),
        }
    }
}

/// Shared read access; releases the read lock on drop
#[must_use = "if unused the RwMutex will immediately unlock"]
pub struct RwReadGuard<'a, T: ?Sized> {
    lock: &'a RwMutex<T>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: ?Sized + Sync> Sync for RwReadGuard<'_, T> {}

impl<T: ?Sized> Deref for RwReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a held read lock excludes writers.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwReadGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.raw.runlock() {
            error!(error = %err, "Read guard released a lock it did not hold");
        }
    }
}

/// Exclusive write access; releases the write lock on drop
#[must_use = "if unused the RwMutex will immediately unlock"]
pub struct RwWriteGuard<'a, T: ?Sized> {
    lock: &'a RwMutex<T>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: ?Sized + Sync> Sync for RwWriteGuard<'_, T> {}

impl<T: ?Sized> Deref for RwWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a held write lock excludes everyone else.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: a held write lock excludes everyone else.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwWriteGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.raw.unlock() {
            error!(error = %err, "Write guard released a lock it did not hold");
        }
    }
}
