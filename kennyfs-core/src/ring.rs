//! Fixed-capacity byte ring used for a connection's RX and TX buffers.
//!
//! The ring is a flat `Vec<u8>` of length `capacity`; `start`/`end` from
//! spec.md's data model collapse to `0`/`capacity` since this is a
//! self-contained buffer rather than a window into a larger arena. `head` is
//! the address of the oldest unread (RX) or unsent (TX) byte; writes land at
//! `(head + used) mod capacity`.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("ring is full: {free} bytes free, {requested} requested")]
    Full { free: usize, requested: usize },
    #[error("not enough buffered: have {have}, need {need}")]
    NotEnough { have: usize, need: usize },
}

pub struct Ring {
    buf: Vec<u8>,
    head: usize,
    used: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0u8; capacity], head: 0, used: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.used
    }

    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    fn check_invariants(&self) {
        debug_assert!(self.used <= self.capacity());
        debug_assert!(self.capacity() == 0 || self.head < self.capacity());
    }

    /// Writes `data` into the ring, wrapping around the end as needed.
    /// Fails without touching the ring if there is not enough free space —
    /// the spec's backpressure contract treats a full ring as "no progress,
    /// wait", never a partial write.
    pub fn write(&mut self, data: &[u8]) -> Result<(), RingError> {
        if data.len() > self.free() {
            return Err(RingError::Full { free: self.free(), requested: data.len() });
        }
        let cap = self.capacity();
        if cap == 0 {
            debug_assert!(data.is_empty());
            return Ok(());
        }
        let write_at = (self.head + self.used) % cap;
        let first_len = data.len().min(cap - write_at);
        self.buf[write_at..write_at + first_len].copy_from_slice(&data[..first_len]);
        if first_len < data.len() {
            let rest = &data[first_len..];
            self.buf[..rest.len()].copy_from_slice(rest);
        }
        self.used += data.len();
        self.check_invariants();
        Ok(())
    }

    /// Extracts exactly `n` bytes from the front of the ring into a freshly
    /// allocated span of length `n + 1`; the trailing byte is zeroed so the
    /// span can double as a NUL-terminated path where convenient. Advances
    /// `head` and decrements `used` by `n`. Fails (leaving the ring
    /// untouched) if fewer than `n` bytes are currently buffered.
    pub fn extract(&mut self, n: usize) -> Result<Vec<u8>, RingError> {
        if n > self.used {
            return Err(RingError::NotEnough { have: self.used, need: n });
        }
        let mut out = vec![0u8; n + 1];
        let cap = self.capacity();
        if n > 0 {
            let first_len = n.min(cap - self.head);
            out[..first_len].copy_from_slice(&self.buf[self.head..self.head + first_len]);
            if first_len < n {
                out[first_len..n].copy_from_slice(&self.buf[..n - first_len]);
            }
        }
        self.head = if cap == 0 { 0 } else { (self.head + n) % cap };
        self.used -= n;
        self.check_invariants();
        Ok(out)
    }

    /// Returns the currently queued (unsent/unread) bytes as one contiguous
    /// slice, copying into `scratch` only when the queued run wraps across
    /// the ring's end. Used by the TX drain path for a single `send` call.
    pub fn peek_contiguous<'a>(&'a self, scratch: &'a mut Vec<u8>) -> &'a [u8] {
        if self.used == 0 {
            return &[];
        }
        let cap = self.capacity();
        let tail_room = cap - self.head;
        if self.used <= tail_room {
            &self.buf[self.head..self.head + self.used]
        } else {
            scratch.clear();
            scratch.extend_from_slice(&self.buf[self.head..]);
            scratch.extend_from_slice(&self.buf[..self.used - tail_room]);
            scratch.as_slice()
        }
    }

    /// Acknowledges that `n` bytes previously returned by
    /// [`Ring::peek_contiguous`] were sent/consumed, advancing `head`.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.used);
        let cap = self.capacity();
        self.head = if cap == 0 { 0 } else { (self.head + n) % cap };
        self.used -= n;
        self.check_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_extract_round_trips() {
        let mut ring = Ring::new(8);
        ring.write(b"abcd").unwrap();
        assert_eq!(ring.used(), 4);
        let got = ring.extract(4).unwrap();
        assert_eq!(&got[..4], b"abcd");
        assert_eq!(got[4], 0);
        assert_eq!(ring.used(), 0);
    }

    #[test]
    fn wraparound_write_and_extract() {
        let mut ring = Ring::new(4);
        ring.write(b"ab").unwrap();
        ring.extract(2).unwrap(); // head now at 2
        ring.write(b"cdef").unwrap(); // wraps: 'cd' at [2,3], 'ef' at [0,1]
        assert_eq!(ring.used(), 4);
        let got = ring.extract(4).unwrap();
        assert_eq!(&got[..4], b"cdef");
    }

    #[test]
    fn full_ring_rejects_write() {
        let mut ring = Ring::new(4);
        ring.write(b"abcd").unwrap();
        assert_eq!(ring.write(b"e"), Err(RingError::Full { free: 0, requested: 1 }));
    }

    #[test]
    fn extract_more_than_buffered_fails_and_is_noop() {
        let mut ring = Ring::new(4);
        ring.write(b"ab").unwrap();
        assert_eq!(ring.extract(3), Err(RingError::NotEnough { have: 2, need: 3 }));
        assert_eq!(ring.used(), 2);
    }

    #[test]
    fn peek_contiguous_copies_only_when_wrapped() {
        let mut ring = Ring::new(4);
        ring.write(b"ab").unwrap();
        ring.extract(2).unwrap();
        ring.write(b"cdef").unwrap();
        let mut scratch = Vec::new();
        let view = ring.peek_contiguous(&mut scratch).to_vec();
        assert_eq!(view, b"cdef");
        ring.consume(4);
        assert_eq!(ring.used(), 0);
    }

    proptest::proptest! {
        #[test]
        fn invariants_hold_after_arbitrary_sequences(
            ops in proptest::collection::vec((proptest::bool::ANY, 0usize..6), 0..64)
        ) {
            let mut ring = Ring::new(16);
            let mut model: std::collections::VecDeque<u8> = std::collections::VecDeque::new();
            for (is_write, n) in ops {
                if is_write {
                    let data: Vec<u8> = (0..n as u8).collect();
                    if ring.write(&data).is_ok() {
                        model.extend(data);
                    }
                } else if let Ok(got) = ring.extract(n.min(ring.used())) {
                    let take = n.min(model.len());
                    for i in 0..take {
                        proptest::prop_assert_eq!(got[i], model[i]);
                    }
                    model.drain(..take);
                }
                proptest::prop_assert!(ring.used() <= ring.capacity());
                proptest::prop_assert!(ring.capacity() == 0 || ring.head() < ring.capacity());
            }
        }
    }
}
