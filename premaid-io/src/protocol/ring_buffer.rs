//! Fixed-capacity byte ring buffer for inbound reassembly
//!
//! Consuming a frame only moves the read position; nothing is shifted.

/// Fixed-capacity ring buffer with O(1) advance
///
/// Generic const parameter `N` sets buffer capacity.
pub struct RingBuffer<const N: usize = 1024> {
    data: [u8; N],
    head: usize, // Write position (next empty slot)
    tail: usize, // Read position (first valid byte)
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append bytes, returning how many did not fit
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let mut dropped = 0;
        for &b in bytes {
            if self.len < N {
                self.data[self.head] = b;
                self.head = (self.head + 1) % N;
                self.len += 1;
            } else {
                dropped += 1;
            }
        }
        dropped
    }

    /// Consume n bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
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
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Read byte at logical index (handles wraparound)
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index < self.len {
            Some(self.data[(self.tail + index) % N])
        } else {
            None
        }
    }

    /// Copy `len` bytes starting at logical index `start`
    pub fn copy_range(&self, start: usize, len: usize) -> Option<Vec<u8>> {
        if start + len > self.len {
            return None;
        }
        let real_start = (self.tail + start) % N;
        if real_start + len <= N {
            Some(self.data[real_start..real_start + len].to_vec())
        } else {
            let first = N - real_start;
            let mut out = Vec::with_capacity(len);
            out.extend_from_slice(&self.data[real_start..]);
            out.extend_from_slice(&self.data[..len - first]);
            Some(out)
        }
    }

    /// Everything currently buffered
    pub fn to_vec(&self) -> Vec<u8> {
        self.copy_range(0, self.len).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
