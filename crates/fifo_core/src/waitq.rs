use parking_lot::{Condvar, MutexGuard};

/// FIFO-ish blocking queue for callers of one role.
///
/// The condition variable releases the channel mutex atomically with
/// entering the wait and reacquires it on wake, which is what rules out
/// the lost-wakeup race between testing a condition and parking. Wakes
/// carry no predicate guarantee; the woken caller must re-test its
/// condition under the mutex and may park again.
#[derive(Default)]
pub struct WaitQueue {
    cond: Condvar,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the caller, releasing the guard's mutex for the duration.
    pub fn park<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        self.cond.wait(guard);
    }

    /// Wakes at most one parked caller.
    pub fn wake_one(&self) {
        self.cond.notify_one();
    }

    /// Wakes every parked caller.
    pub fn wake_all(&self) {
        self.cond.notify_all();
    }
}
