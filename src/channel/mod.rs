/*!
 * Channels
 *
 * Typed FIFO conduits between producer and consumer tasks:
 * - Buffered (capacity > 0) or unbuffered rendezvous (capacity 0)
 * - One-shot close; receivers drain buffered values before seeing closed
 * - Blocking, non-blocking, and deadline-bounded send/receive
 * - Timer channels for composing deadlines in a select
 */

mod chan;
mod ops;
mod timer;

pub use chan::{Channel, IntoIter, Iter, TryIter};
pub use timer::{after, tick};

pub(crate) use ops::{RecvOp, SendOp};
