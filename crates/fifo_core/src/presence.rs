/// Role bound to an attached handle on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    /// The complementary role.
    #[inline]
    pub fn peer(self) -> Role {
        match self {
            Role::Producer => Role::Consumer,
            Role::Consumer => Role::Producer,
        }
    }

    #[inline]
    pub(crate) fn idx(self) -> usize {
        match self {
            Role::Producer => 0,
            Role::Consumer => 1,
        }
    }
}

/// Counts of currently-attached producers and consumers.
///
/// Mutated only while holding the channel's mutex.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    counts: [usize; 2],
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, role: Role) {
        self.counts[role.idx()] += 1;
    }

    pub fn detach(&mut self, role: Role) {
        debug_assert!(self.counts[role.idx()] > 0);
        self.counts[role.idx()] -= 1;
    }

    #[inline]
    pub fn count(&self, role: Role) -> usize {
        self.counts[role.idx()]
    }

    /// True when no handle of either role is attached.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.counts == [0, 0]
    }
}
