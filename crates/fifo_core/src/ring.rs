/// A fixed-capacity circular byte buffer with available/used accounting.
pub struct RingStore {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl RingStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Copies the whole slice in. The caller must have checked that it fits.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        debug_assert!(bytes.len() <= self.free());
        let cap = self.buf.len();
        let tail = (self.head + self.len) % cap;
        let first = bytes.len().min(cap - tail);
        self.buf[tail..tail + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        self.buf[..rest].copy_from_slice(&bytes[first..]);
        self.len += bytes.len();
        bytes.len()
    }

    /// Copies up to `dest.len()` bytes out in FIFO order, returns the count.
    pub fn pop(&mut self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.len);
        let cap = self.buf.len();
        let first = n.min(cap - self.head);
        dest[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
        let rest = n - first;
        dest[first..n].copy_from_slice(&self.buf[..rest]);
        self.head = (self.head + n) % cap;
        self.len -= n;
        n
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
