//! Bounded byte channel with explicit attach/detach semantics.
//!
//! This crate provides a fixed-capacity byte channel shared by multiple
//! producer and consumer threads. Callers attach in a role, block until a
//! complementary peer is present, exchange bytes through a circular buffer,
//! and fail fast once the last peer of the opposite role detaches. All
//! blocking calls are cancellable and roll back their own bookkeeping on
//! cancellation.

use thiserror::Error;

/// Channel composition: attach/detach/send/receive behind one mutex.
///
/// Combines the ring store, presence tracker, and per-role wait queues into
/// the channel object, and defines the handle and cancellation token types
/// that callers interact with. This is where the blocking protocol and its
/// rollback-on-cancellation contract live.
pub mod channel;

/// Attached-caller accounting per role.
///
/// Tracks how many producer and consumer handles are currently attached to
/// a channel. The counts drive the rendezvous on attach, the fail-fast
/// paths in send/receive, and the buffer reset when both reach zero.
pub mod presence;

/// Fixed-capacity circular byte buffer.
///
/// Stores the bytes in flight between producers and consumers. Pure data
/// structure with no locking of its own; the channel serializes all access
/// behind its mutex.
pub mod ring;

/// Blocking queue primitive for one role.
///
/// Thin wrapper over a condition variable used to park callers whose
/// condition does not hold yet and to wake one or all of them when a peer
/// changes the shared state.
pub mod waitq;

pub use channel::{CancelToken, Channel, Handle};
pub use presence::Role;

/// Errors returned by blocking channel operations.
///
/// Every failure is local to the failing call: an error from one caller
/// never corrupts the channel or blocks other callers' subsequent calls.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// A blocked call was cancelled through its token.
    ///
    /// The call's contribution to the presence and waiting counters has
    /// been rolled back; the caller may retry the same call with a fresh
    /// token.
    #[error("blocked call was interrupted")]
    Interrupted,

    /// No consumer was attached at the moment the transfer would occur.
    ///
    /// Returned by send only. Terminal for that call, not for the channel:
    /// once a consumer attaches again, later sends succeed.
    #[error("no consumer attached to the channel")]
    Broken,

    /// The payload does not fit in the channel even when empty.
    ///
    /// Caller precondition violation, detected before any shared state is
    /// touched.
    #[error("payload of {len} bytes exceeds channel capacity of {capacity}")]
    TooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Capacity of the channel the payload was offered to.
        capacity: usize,
    },
}
