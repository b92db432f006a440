/*!
 * Channel Implementation
 * Typed FIFO conduit with a ringbuf-backed buffer and one-shot close
 *
 * # Handoff rules (all under the channel's state lock)
 *
 * - A send first hands its value straight to a waiting receiver; otherwise it
 *   buffers it; otherwise it blocks with the value parked in its slot.
 * - A receive first pops the buffer and refills it from the first blocked
 *   sender; on an empty buffer it takes a blocked sender's value directly;
 *   otherwise it reports closed or blocks.
 * - Close wakes every blocked task. Receivers then drain or observe closed,
 *   senders fail with their value handed back.
 */

use super::ops::{RecvOp, SendOp};
use crate::core::errors::{
    ChannelError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError, TrySendError,
};
use crate::core::limits::MAX_CHANNEL_CAPACITY;
use crate::core::sync::{execute, Blocking, SyncConfig, WaiterQueue};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Handoff slot shared between a blocked task and its counterpart
pub(crate) type Slot<T> = Arc<Mutex<Option<T>>>;

pub(crate) struct State<T> {
    /// `None` for an unbuffered (rendezvous) channel
    buffer: Option<HeapRb<T>>,
    closed: bool,
    senders: WaiterQueue<Slot<T>>,
    receivers: WaiterQueue<Slot<T>>,
}

impl<T> State<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: (capacity > 0).then(|| HeapRb::new(capacity)),
            closed: false,
            senders: WaiterQueue::new(),
            receivers: WaiterQueue::new(),
        }
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub(crate) fn buffered(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.occupied_len())
    }

    #[inline]
    pub(crate) fn has_room(&self) -> bool {
        self.buffer.as_ref().map_or(false, |b| !b.is_full())
    }

    pub(crate) fn senders(&mut self) -> &mut WaiterQueue<Slot<T>> {
        &mut self.senders
    }

    pub(crate) fn receivers(&mut self) -> &mut WaiterQueue<Slot<T>> {
        &mut self.receivers
    }

    pub(crate) fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
        if self.closed {
            return Err(TrySendError::Closed(value));
        }

        if let Some(entry) = self.receivers.try_select() {
            *entry.packet.lock() = Some(value);
            entry.cx.unpark();
            return Ok(());
        }

        match self.buffer.as_mut() {
            Some(buffer) => buffer.try_push(value).map_err(TrySendError::Full),
            None => Err(TrySendError::Full(value)),
        }
    }

    pub(crate) fn try_recv(&mut self) -> Result<T, TryRecvError> {
        if let Some(buffer) = self.buffer.as_mut() {
            if let Some(value) = buffer.try_pop() {
                // Keep FIFO: the oldest blocked sender moves into the freed slot.
                if let Some(entry) = self.senders.try_select() {
                    let mut packet = entry.packet.lock();
                    if let Some(pending) = packet.take() {
                        if let Err(pending) = buffer.try_push(pending) {
                            *packet = Some(pending);
                        }
                    }
                    drop(packet);
                    entry.cx.unpark();
                }
                return Ok(value);
            }
        }

        while let Some(entry) = self.senders.try_select() {
            let value = entry.packet.lock().take();
            entry.cx.unpark();
            if let Some(value) = value {
                return Ok(value);
            }
        }

        if self.closed {
            Err(TryRecvError::Closed)
        } else {
            Err(TryRecvError::Empty)
        }
    }
}

pub(crate) struct Shared<T> {
    pub(crate) state: Mutex<State<T>>,
    pub(crate) id: u64,
    capacity: usize,
    config: SyncConfig,
}

/// Typed, optionally-buffered FIFO channel
///
/// `Channel<T>` is a handle: clones share the same channel. Capacity 0 makes
/// an unbuffered channel where every send waits for a receiver.
///
/// # Examples
///
/// ```
/// use taskmesh::Channel;
/// use std::thread;
///
/// let jobs = Channel::new(4);
/// let producer = jobs.clone();
/// let handle = thread::spawn(move || {
///     for n in 0..3 {
///         producer.send(n).unwrap();
///     }
///     producer.close().unwrap();
/// });
///
/// let received: Vec<i32> = jobs.iter().collect();
/// assert_eq!(received, vec![0, 1, 2]);
/// handle.join().unwrap();
/// ```
pub struct Channel<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Channel")
            .field("id", &self.shared.id)
            .field("capacity", &self.shared.capacity)
            .field("buffered", &state.buffered())
            .field("closed", &state.closed)
            .field("blocked_senders", &state.senders.len())
            .field("blocked_receivers", &state.receivers.len())
            .finish()
    }
}

impl<T> Channel<T> {
    /// Create a channel buffering up to `capacity` values
    pub fn new(capacity: usize) -> Self {
        Self::with_config(capacity, SyncConfig::default())
    }

    /// Create an unbuffered (rendezvous) channel
    pub fn unbuffered() -> Self {
        Self::new(0)
    }

    pub fn with_config(capacity: usize, config: SyncConfig) -> Self {
        let id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
        let capacity = if capacity > MAX_CHANNEL_CAPACITY {
            warn!(
                channel = id,
                requested = capacity,
                max = MAX_CHANNEL_CAPACITY,
                "Channel capacity clamped"
            );
            MAX_CHANNEL_CAPACITY
        } else {
            capacity
        };

        debug!(channel = id, capacity, "Channel created");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new(capacity)),
                id,
                capacity,
                config,
            }),
        }
    }

    /// Process-unique identifier, used in log fields
    #[inline]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffered()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer is at capacity (always true when unbuffered)
    pub fn is_full(&self) -> bool {
        !self.shared.state.lock().has_room()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Send a value, blocking while the buffer is full or no receiver is ready
    ///
    /// Fails if the channel is closed, including when it closes while this
    /// send is blocked. The value is handed back inside the error.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut op = SendOp::new(&self.shared, value);
        execute(&mut [&mut op], Blocking::Forever, &self.shared.config);
        match op.finish() {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Closed(value)) | Err(SendTimeoutError::Timeout(value)) => {
                warn!(channel = self.shared.id, "{}", ChannelError::SendOnClosed);
                Err(SendError(value))
            }
        }
    }

    /// Send without blocking
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let result = self.shared.state.lock().try_send(value);
        if let Err(TrySendError::Closed(_)) = &result {
            warn!(channel = self.shared.id, "{}", ChannelError::SendOnClosed);
        }
        result
    }

    /// Send, giving up after `timeout`
    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
        self.send_deadline(value, Instant::now() + timeout)
    }

    pub fn send_deadline(&self, value: T, deadline: Instant) -> Result<(), SendTimeoutError<T>> {
        let mut op = SendOp::new(&self.shared, value);
        execute(&mut [&mut op], Blocking::Until(deadline), &self.shared.config);
        let result = op.finish();
        if let Err(SendTimeoutError::Closed(_)) = &result {
            warn!(channel = self.shared.id, "{}", ChannelError::SendOnClosed);
        }
        result
    }

    /// Receive the next value, blocking while the channel is empty and open
    ///
    /// Returns `None` once the channel is closed and drained, immediately and
    /// on every later call.
    pub fn recv(&self) -> Option<T> {
        let mut op = RecvOp::new(&self.shared);
        execute(&mut [&mut op], Blocking::Forever, &self.shared.config);
        op.finish().ok()
    }

    /// Receive as `(value, open)`; a closed and drained channel yields
    /// `(T::default(), false)`
    pub fn recv_or_default(&self) -> (T, bool)
    where
        T: Default,
    {
        match self.recv() {
            Some(value) => (value, true),
            None => (T::default(), false),
        }
    }

    /// Receive without blocking
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.shared.state.lock().try_recv()
    }

    /// Receive, giving up after `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.recv_deadline(Instant::now() + timeout)
    }

    pub fn recv_deadline(&self, deadline: Instant) -> Result<T, RecvTimeoutError> {
        let mut op = RecvOp::new(&self.shared);
        execute(&mut [&mut op], Blocking::Until(deadline), &self.shared.config);
        op.finish()
    }

    /// Close the channel
    ///
    /// One-shot: a second close fails with `ChannelError::DoubleClose`.
    /// Blocked senders are released with a send fault; blocked receivers
    /// observe the close once the buffer is drained.
    pub fn close(&self) -> Result<(), ChannelError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            drop(state);
            warn!(channel = self.shared.id, "{}", ChannelError::DoubleClose);
            return Err(ChannelError::DoubleClose);
        }

        state.closed = true;
        let receivers = state.receivers.notify_all();
        let senders = state.senders.notify_all();
        let buffered = state.buffered();
        drop(state);

        debug!(
            channel = self.shared.id,
            buffered,
            released_receivers = receivers.count(),
            released_senders = senders.count(),
            "Channel closed"
        );
        Ok(())
    }

    /// Blocking iterator that ends once the channel is closed and drained
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { chan: self }
    }

    /// Non-blocking iterator over the values available right now
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { chan: self }
    }
}

/// Blocking iterator over received values
///
/// Not restartable: consumed values are gone.
#[derive(Debug)]
pub struct Iter<'a, T> {
    chan: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.recv()
    }
}

impl<T> std::iter::FusedIterator for Iter<'_, T> {}

/// Non-blocking iterator over currently available values
#[derive(Debug)]
pub struct TryIter<'a, T> {
    chan: &'a Channel<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.try_recv().ok()
    }
}

/// Owning blocking iterator
#[derive(Debug)]
pub struct IntoIter<T> {
    chan: Channel<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.recv()
    }
}

impl<T> std::iter::FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { chan: self }
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
