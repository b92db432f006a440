/*!
 * Timer Channels
 *
 * Deadlines and periodic wake-ups expressed as ordinary channels, so a select
 * composes a timeout by adding one more receive branch.
 */

use super::chan::Channel;
use crate::core::errors::TrySendError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Channel that delivers one `Instant` after `duration`, then closes
///
/// # Examples
///
/// ```
/// use taskmesh::{channel, Channel, Select};
/// use std::time::Duration;
///
/// let work = Channel::<u32>::new(1);
/// let timeout = channel::after(Duration::from_millis(10));
///
/// let fired = Select::new()
///     .recv(&work, |_| "work")
///     .recv(&timeout, |_| "timeout")
///     .run();
/// assert_eq!(fired, "timeout");
/// ```
pub fn after(duration: Duration) -> Channel<Instant> {
    let chan = Channel::new(1);
    let tx = chan.clone();
    thread::spawn(move || {
        thread::sleep(duration);
        if tx.try_send(Instant::now()).is_ok() {
            let _ = tx.close();
        } else {
            debug!(channel = tx.id(), "Timer channel closed before firing");
        }
    });
    chan
}

/// Channel that delivers an `Instant` every `interval` until closed
///
/// Ticks are dropped while the previous one is still unread. The ticker
/// thread holds only a weak reference, so it also stops once every handle
/// has been dropped, closed or not.
pub fn tick(interval: Duration) -> Channel<Instant> {
    let chan = Channel::new(1);
    let id = chan.id();
    let weak = Arc::downgrade(&chan.shared);
    thread::spawn(move || loop {
        thread::sleep(interval);
        let Some(shared) = weak.upgrade() else {
            debug!(channel = id, "Ticker stopped; channel dropped");
            break;
        };
        let tx = Channel { shared };
        if tx.is_closed() {
            debug!(channel = id, "Ticker stopped");
            break;
        }
        match tx.try_send(Instant::now()) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => {
                debug!(channel = id, "Ticker stopped");
                break;
            }
        }
    });
    chan
}
