use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::ChannelError;
use crate::presence::{PresenceTracker, Role};
use crate::ring::RingStore;
use crate::waitq::WaitQueue;

/// State serialized behind the channel mutex. No operation reads or writes
/// any of these fields without holding it.
struct Shared {
    ring: RingStore,
    presence: PresenceTracker,
    /// Callers currently parked awaiting a condition change, per role.
    waiting: [usize; 2],
}

/// Bounded-capacity byte channel for multiple producers and consumers.
///
/// Constructed once, capacity fixed for its lifetime. Callers attach in a
/// role and get back a [`Handle`]; attach blocks until a peer of the
/// complementary role is present. Send blocks on space, receive blocks on
/// data, and both fail fast once the opposite role's presence count drops
/// to zero. When the last handle of either role detaches and both counts
/// are zero, the buffer is cleared in the same critical section, so no
/// bytes survive into the next producer/consumer generation.
pub struct Channel {
    capacity: usize,
    shared: Mutex<Shared>,
    queues: [WaitQueue; 2],
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shared: Mutex::new(Shared {
                ring: RingStore::new(capacity),
                presence: PresenceTracker::new(),
                waiting: [0, 0],
            }),
            queues: [WaitQueue::new(), WaitQueue::new()],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently buffered.
    pub fn occupancy(&self) -> usize {
        self.shared.lock().ring.len()
    }

    /// Handles of `role` currently attached.
    pub fn attached(&self, role: Role) -> usize {
        self.shared.lock().presence.count(role)
    }

    /// Callers of `role` currently parked in a blocking call.
    pub fn parked(&self, role: Role) -> usize {
        self.shared.lock().waiting[role.idx()]
    }

    /// Cancels every call blocked with `token`, now and in the future.
    ///
    /// The flag is set under the mutex and both queues are broadcast, so a
    /// caller either observes the flag before parking or is woken to
    /// observe it; there is no window in which a cancelled call stays
    /// parked.
    pub fn cancel(&self, token: &CancelToken) {
        let _shared = self.shared.lock();
        token.flag.store(true, Ordering::SeqCst);
        self.queues[0].wake_all();
        self.queues[1].wake_all();
    }

    /// Attaches a caller in `role`, blocking until a peer is present.
    ///
    /// The presence increment is visible to peers immediately: a parked
    /// peer waiting for this role is woken before this caller starts its
    /// own wait. On cancellation the increment is undone under the mutex,
    /// never leaving a half-applied attach behind.
    pub fn attach(
        self: &Arc<Self>,
        role: Role,
        cancel: &CancelToken,
    ) -> Result<Handle, ChannelError> {
        let mut shared = self.shared.lock();
        shared.presence.attach(role);
        self.wake_one_parked(&shared, role.peer());
        while shared.presence.count(role.peer()) == 0 {
            if cancel.is_cancelled() {
                shared.presence.detach(role);
                return Err(ChannelError::Interrupted);
            }
            self.park(role, &mut shared);
        }
        Ok(Handle {
            channel: Arc::clone(self),
            role,
        })
    }

    fn detach(&self, role: Role) {
        let mut shared = self.shared.lock();
        shared.presence.detach(role);
        // Broadcast, not single-wake: this detach may be the event that
        // makes every blocked peer observe "peer count is zero" and fail
        // fast instead of hanging.
        self.queues[role.peer().idx()].wake_all();
        if shared.presence.is_idle() {
            shared.ring.clear();
        }
    }

    fn send(&self, bytes: &[u8], cancel: &CancelToken) -> Result<usize, ChannelError> {
        if bytes.len() > self.capacity {
            return Err(ChannelError::TooLarge {
                len: bytes.len(),
                capacity: self.capacity,
            });
        }
        let mut shared = self.shared.lock();
        while shared.ring.free() < bytes.len() && shared.presence.count(Role::Consumer) > 0 {
            if cancel.is_cancelled() {
                return Err(ChannelError::Interrupted);
            }
            self.park(Role::Producer, &mut shared);
        }
        if shared.presence.count(Role::Consumer) == 0 {
            return Err(ChannelError::Broken);
        }
        shared.ring.push(bytes);
        self.wake_one_parked(&shared, Role::Consumer);
        Ok(bytes.len())
    }

    fn receive(&self, max_len: usize, cancel: &CancelToken) -> Result<Vec<u8>, ChannelError> {
        let mut shared = self.shared.lock();
        while shared.ring.len() < max_len && shared.presence.count(Role::Producer) > 0 {
            if cancel.is_cancelled() {
                return Err(ChannelError::Interrupted);
            }
            self.park(Role::Consumer, &mut shared);
        }
        if shared.presence.count(Role::Producer) == 0 && shared.ring.is_empty() {
            // Graceful end of stream, not an error.
            return Ok(Vec::new());
        }
        let mut out = vec![0u8; max_len];
        let n = shared.ring.pop(&mut out);
        out.truncate(n);
        self.wake_one_parked(&shared, Role::Producer);
        Ok(out)
    }

    /// Parks the caller on its role's queue. The waiting counter is
    /// incremented before the wait and decremented on every wake path, so
    /// it is back to its pre-park value by the time the predicate is
    /// re-tested.
    fn park(&self, role: Role, shared: &mut MutexGuard<'_, Shared>) {
        shared.waiting[role.idx()] += 1;
        self.queues[role.idx()].park(shared);
        shared.waiting[role.idx()] -= 1;
    }

    fn wake_one_parked(&self, shared: &Shared, role: Role) {
        if shared.waiting[role.idx()] > 0 {
            self.queues[role.idx()].wake_one();
        }
    }
}

/// Owned token for an attached role. Detach is guaranteed on every exit
/// path: dropping the handle detaches, and [`Handle::detach`] makes the
/// intent explicit.
pub struct Handle {
    channel: Arc<Channel>,
    role: Role,
}

impl Handle {
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    /// Sends the whole payload, blocking while the buffer lacks space and
    /// a consumer remains attached.
    ///
    /// Producer handles only.
    pub fn send(&self, bytes: &[u8], cancel: &CancelToken) -> Result<usize, ChannelError> {
        debug_assert_eq!(self.role, Role::Producer);
        self.channel.send(bytes, cancel)
    }

    /// Receives up to `max_len` bytes, blocking while fewer are buffered
    /// and a producer remains attached. A zero-length result is the end of
    /// the stream.
    ///
    /// Consumer handles only.
    pub fn receive(&self, max_len: usize, cancel: &CancelToken) -> Result<Vec<u8>, ChannelError> {
        debug_assert_eq!(self.role, Role::Consumer);
        self.channel.receive(max_len, cancel)
    }

    /// Detaches now instead of at end of scope.
    pub fn detach(self) {}
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.channel.detach(self.role);
    }
}

/// Cancellation flag shared between a blocked caller and whoever may
/// interrupt it. Clones observe the same flag.
///
/// A token does nothing on its own; [`Channel::cancel`] sets it and wakes
/// the channel's parked callers so they can observe it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn attach_pair(channel: &Arc<Channel>) -> (Handle, Handle) {
        let peer = Arc::clone(channel);
        let consumer =
            thread::spawn(move || peer.attach(Role::Consumer, &CancelToken::new()).unwrap());
        let producer = channel.attach(Role::Producer, &CancelToken::new()).unwrap();
        (producer, consumer.join().unwrap())
    }

    #[test]
    fn concurrent_attach_completes() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);
        assert_eq!(channel.attached(Role::Producer), 1);
        assert_eq!(channel.attached(Role::Consumer), 1);
        drop(producer);
        drop(consumer);
        assert_eq!(channel.attached(Role::Producer), 0);
        assert_eq!(channel.attached(Role::Consumer), 0);
    }

    #[test]
    fn send_without_consumer_is_broken() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);
        producer.send(&[1, 2, 3], &CancelToken::new()).unwrap();
        drop(consumer);

        let err = producer.send(&[4], &CancelToken::new()).unwrap_err();
        assert_eq!(err, ChannelError::Broken);
        // Nothing was written and nothing was disturbed.
        assert_eq!(channel.occupancy(), 3);
    }

    #[test]
    fn receive_drains_then_signals_end_of_stream() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);
        producer.send(&[1, 2, 3], &CancelToken::new()).unwrap();
        drop(producer);

        // Producer absent but data remains: the data comes out first.
        let bytes = consumer.receive(8, &CancelToken::new()).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        // Then a zero-length read, never an error.
        let bytes = consumer.receive(8, &CancelToken::new()).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn idle_transition_resets_buffer() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);
        producer.send(&[1, 2, 3, 4, 5], &CancelToken::new()).unwrap();
        drop(consumer);
        assert_eq!(channel.occupancy(), 5);
        drop(producer);
        assert_eq!(channel.occupancy(), 0);

        // A new generation never observes bytes from the previous one.
        let (producer, consumer) = attach_pair(&channel);
        producer.send(&[9], &CancelToken::new()).unwrap();
        let bytes = consumer.receive(1, &CancelToken::new()).unwrap();
        assert_eq!(bytes, vec![9]);
        assert_eq!(channel.occupancy(), 0);
    }

    #[test]
    fn oversized_payload_is_rejected_up_front() {
        let channel = Arc::new(Channel::new(8));
        let (producer, _consumer) = attach_pair(&channel);
        let err = producer.send(&[0u8; 9], &CancelToken::new()).unwrap_err();
        assert_eq!(
            err,
            ChannelError::TooLarge {
                len: 9,
                capacity: 8
            }
        );
        assert_eq!(channel.occupancy(), 0);
    }

    #[test]
    fn blocked_send_fails_fast_when_last_consumer_detaches() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);
        // Occupy 5 of 8 bytes so a 5-byte send cannot fit.
        producer.send(&[0u8; 5], &CancelToken::new()).unwrap();

        let blocked = thread::spawn(move || {
            let result = producer.send(&[0u8; 5], &CancelToken::new());
            (result, producer)
        });
        wait_until(|| channel.parked(Role::Producer) == 1);

        drop(consumer);
        let (result, _producer) = blocked.join().unwrap();
        assert_eq!(result.unwrap_err(), ChannelError::Broken);
        assert_eq!(channel.occupancy(), 5);
        assert_eq!(channel.parked(Role::Producer), 0);
    }

    #[test]
    fn blocked_receive_completes_when_payload_arrives() {
        let channel = Arc::new(Channel::new(8));
        let (producer, consumer) = attach_pair(&channel);

        let blocked = thread::spawn(move || consumer.receive(4, &CancelToken::new()).unwrap());
        wait_until(|| channel.parked(Role::Consumer) == 1);

        producer.send(&[1, 2, 3, 4], &CancelToken::new()).unwrap();
        assert_eq!(blocked.join().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(channel.occupancy(), 0);
    }

    #[test]
    fn cancelled_receive_rolls_back_counters() {
        let channel = Arc::new(Channel::new(8));
        let (_producer, consumer) = attach_pair(&channel);
        let token = CancelToken::new();

        let blocked = {
            let token = token.clone();
            thread::spawn(move || {
                let result = consumer.receive(4, &token);
                (result, consumer)
            })
        };
        wait_until(|| channel.parked(Role::Consumer) == 1);

        channel.cancel(&token);
        let (result, _consumer) = blocked.join().unwrap();
        assert_eq!(result.unwrap_err(), ChannelError::Interrupted);
        // Counts are exactly as they were before the call started.
        assert_eq!(channel.parked(Role::Consumer), 0);
        assert_eq!(channel.attached(Role::Consumer), 1);
        assert_eq!(channel.attached(Role::Producer), 1);
        assert_eq!(channel.occupancy(), 0);
    }

    #[test]
    fn cancelled_send_rolls_back_counters() {
        let channel = Arc::new(Channel::new(8));
        let (producer, _consumer) = attach_pair(&channel);
        producer.send(&[0u8; 5], &CancelToken::new()).unwrap();
        let token = CancelToken::new();

        let blocked = {
            let token = token.clone();
            thread::spawn(move || {
                let result = producer.send(&[0u8; 5], &token);
                (result, producer)
            })
        };
        wait_until(|| channel.parked(Role::Producer) == 1);

        channel.cancel(&token);
        let (result, _producer) = blocked.join().unwrap();
        assert_eq!(result.unwrap_err(), ChannelError::Interrupted);
        assert_eq!(channel.parked(Role::Producer), 0);
        assert_eq!(channel.occupancy(), 5);
    }

    #[test]
    fn cancelled_attach_rolls_back_presence() {
        let channel = Arc::new(Channel::new(8));
        let token = CancelToken::new();

        let blocked = {
            let channel = Arc::clone(&channel);
            let token = token.clone();
            thread::spawn(move || channel.attach(Role::Producer, &token))
        };
        // The increment is visible while the caller waits for a peer.
        wait_until(|| {
            channel.attached(Role::Producer) == 1 && channel.parked(Role::Producer) == 1
        });

        channel.cancel(&token);
        let result = blocked.join().unwrap();
        assert!(matches!(result, Err(ChannelError::Interrupted)));
        // The attach was fully rolled back, not half-applied.
        assert_eq!(channel.attached(Role::Producer), 0);
        assert_eq!(channel.parked(Role::Producer), 0);
    }

    #[test]
    fn pre_cancelled_token_never_parks() {
        let channel = Arc::new(Channel::new(8));
        let (_producer, consumer) = attach_pair(&channel);
        let token = CancelToken::new();
        channel.cancel(&token);

        let err = consumer.receive(4, &token).unwrap_err();
        assert_eq!(err, ChannelError::Interrupted);
        assert_eq!(channel.parked(Role::Consumer), 0);
    }

    #[test]
    fn attach_wakes_peer_blocked_in_attach() {
        let channel = Arc::new(Channel::new(8));
        let blocked = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.attach(Role::Consumer, &CancelToken::new()).unwrap())
        };
        wait_until(|| channel.parked(Role::Consumer) == 1);

        let producer = channel.attach(Role::Producer, &CancelToken::new()).unwrap();
        let consumer = blocked.join().unwrap();
        assert_eq!(producer.role(), Role::Producer);
        assert_eq!(consumer.role(), Role::Consumer);
    }
}
