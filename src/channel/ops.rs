/*!
 * Channel Operations
 * Send and receive as engine operations, shared by blocking calls and select
 */

use super::chan::{Shared, Slot};
use crate::core::errors::{RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};
use crate::core::sync::{Context, Operation};
use parking_lot::Mutex;
use std::sync::Arc;

/// Pending send; the value lives in the slot until a receiver takes it
pub(crate) struct SendOp<'a, T> {
    shared: &'a Shared<T>,
    slot: Slot<T>,
    closed: bool,
}

impl<'a, T> SendOp<'a, T> {
    pub(crate) fn new(shared: &'a Shared<T>, value: T) -> Self {
        Self {
            shared,
            slot: Arc::new(Mutex::new(Some(value))),
            closed: false,
        }
    }

    /// Outcome once the engine returns; an empty slot means delivered
    pub(crate) fn finish(self) -> Result<(), SendTimeoutError<T>> {
        match self.slot.lock().take() {
            None => Ok(()),
            Some(value) if self.closed => Err(SendTimeoutError::Closed(value)),
            Some(value) => Err(SendTimeoutError::Timeout(value)),
        }
    }
}

impl<T> Operation for SendOp<'_, T> {
    fn try_fire(&mut self) -> bool {
        let mut state = self.shared.state.lock();
        let Some(value) = self.slot.lock().take() else {
            return true;
        };

        match state.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Closed(value)) => {
                *self.slot.lock() = Some(value);
                self.closed = true;
                true
            }
            Err(TrySendError::Full(value)) => {
                *self.slot.lock() = Some(value);
                false
            }
        }
    }

    fn register(&mut self, cx: &Arc<Context>, oper: usize) -> bool {
        let mut state = self.shared.state.lock();
        state
            .senders()
            .register(Arc::clone(cx), oper, Arc::clone(&self.slot));
        state.is_closed() || state.has_room() || state.receivers().has_waiter_other_than(cx)
    }

    fn unregister(&mut self, cx: &Arc<Context>) {
        self.shared.state.lock().senders().unregister(cx);
    }

    fn accept(&mut self) -> bool {
        self.slot.lock().is_none()
    }
}

/// Pending receive; a sender fills the slot on direct handoff
pub(crate) struct RecvOp<'a, T> {
    shared: &'a Shared<T>,
    slot: Slot<T>,
    /// `Some(None)` once the channel is observed closed and drained
    outcome: Option<Option<T>>,
}

impl<'a, T> RecvOp<'a, T> {
    pub(crate) fn new(shared: &'a Shared<T>) -> Self {
        Self {
            shared,
            slot: Arc::new(Mutex::new(None)),
            outcome: None,
        }
    }

    pub(crate) fn finish(self) -> Result<T, RecvTimeoutError> {
        match self.outcome {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(RecvTimeoutError::Closed),
            None => Err(RecvTimeoutError::Timeout),
        }
    }
}

impl<T> Operation for RecvOp<'_, T> {
    fn try_fire(&mut self) -> bool {
        match self.shared.state.lock().try_recv() {
            Ok(value) => {
                self.outcome = Some(Some(value));
                true
            }
            Err(TryRecvError::Closed) => {
                self.outcome = Some(None);
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    fn register(&mut self, cx: &Arc<Context>, oper: usize) -> bool {
        let mut state = self.shared.state.lock();
        state
            .receivers()
            .register(Arc::clone(cx), oper, Arc::clone(&self.slot));
        state.buffered() > 0 || state.is_closed() || state.senders().has_waiter_other_than(cx)
    }

    fn unregister(&mut self, cx: &Arc<Context>) {
        self.shared.state.lock().receivers().unregister(cx);
    }

    fn accept(&mut self) -> bool {
        match self.slot.lock().take() {
            Some(value) => {
                self.outcome = Some(Some(value));
                true
            }
            None => false,
        }
    }
}
