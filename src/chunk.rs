//! Growable scratch buffer holding one pending block of bytes.
//!
//! A [`ChunkBuffer`] sits between a codec step and whichever side drains it:
//! the compressed-output staging area of the output engine, and both staging
//! areas (raw-compressed and decompressed) of the input engine. It tracks a
//! contiguous region of `capacity` bytes of which `len` hold meaningful data
//! and `pos` have already been consumed by the caller-facing side.
//!
//! Invariant: `pos <= len <= capacity`.
//!
//! The buffer reallocates (doubling, preserving live bytes) only when a codec
//! step needs more output room than remains, and compacts — shifting unread
//! bytes down to offset 0 — once consumed-but-retained bytes cross half the
//! capacity.

use log::debug;

/// Minimum capacity a buffer will grow to; avoids pathological doubling from
/// tiny initial capacities.
const MIN_GROW_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct ChunkBuffer {
    buf: Vec<u8>,
    /// Bytes in `buf[..len]` hold meaningful data.
    len: usize,
    /// Bytes in `buf[..pos]` were already consumed; `pos <= len`.
    pos: usize,
}

impl ChunkBuffer {
    /// Create a buffer with a fixed initial capacity. `capacity` may be zero;
    /// the stream constructors reject that before it gets here.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            len: 0,
            pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Room left for a codec step to produce into.
    pub fn spare(&self) -> usize {
        self.buf.len() - self.len
    }

    /// The writable tail a codec step produces into; follow with
    /// [`commit`](Self::commit).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Mark `n` freshly produced bytes as valid.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.spare());
        self.len += n;
    }

    /// Bytes produced but not yet consumed.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    pub fn unread_len(&self) -> usize {
        self.len - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.len
    }

    /// Mark `n` unread bytes as consumed. Fully drained buffers rewind to
    /// offset 0 for free; otherwise the retained tail is compacted once the
    /// consumed prefix crosses half the capacity.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.unread_len());
        self.pos += n;
        if self.pos == self.len {
            self.pos = 0;
            self.len = 0;
        } else if self.pos >= self.buf.len() / 2 {
            self.compact();
        }
    }

    /// Shift unread bytes down to offset 0.
    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.buf.copy_within(self.pos..self.len, 0);
        self.len -= self.pos;
        self.pos = 0;
    }

    /// Guarantee at least `min` writable bytes, compacting first and doubling
    /// the allocation only when compaction is not enough. Live bytes survive.
    pub fn ensure_spare(&mut self, min: usize) {
        if self.spare() >= min {
            return;
        }
        self.compact();
        if self.spare() >= min {
            return;
        }
        let mut cap = self.buf.len().max(MIN_GROW_CAPACITY);
        while cap - self.len < min {
            cap *= 2;
        }
        debug!("chunk buffer grows {} -> {} bytes", self.buf.len(), cap);
        self.buf.resize(cap, 0);
    }

    /// Drop all staged bytes (capacity is kept).
    pub fn reset(&mut self) {
        self.len = 0;
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buf: &mut ChunkBuffer, data: &[u8]) {
        buf.ensure_spare(data.len());
        buf.spare_mut()[..data.len()].copy_from_slice(data);
        buf.commit(data.len());
    }

    #[test]
    fn commit_then_consume_roundtrip() {
        let mut buf = ChunkBuffer::with_capacity(8);
        fill(&mut buf, b"abcdef");
        assert_eq!(buf.unread(), b"abcdef");
        buf.consume(2);
        assert_eq!(buf.unread(), b"cdef");
        buf.consume(4);
        assert!(buf.is_empty());
        // fully drained buffers rewind, so the whole capacity is spare again
        assert_eq!(buf.spare(), 8);
    }

    #[test]
    fn growth_preserves_unread_bytes() {
        let mut buf = ChunkBuffer::with_capacity(4);
        fill(&mut buf, b"abcd");
        buf.ensure_spare(10);
        assert_eq!(buf.unread(), b"abcd");
        assert!(buf.spare() >= 10);
        fill(&mut buf, b"efghij");
        assert_eq!(buf.unread(), b"abcdefghij");
    }

    #[test]
    fn compaction_moves_tail_to_front() {
        let mut buf = ChunkBuffer::with_capacity(8);
        fill(&mut buf, b"abcdefgh");
        buf.consume(6); // past half capacity: compacts
        assert_eq!(buf.unread(), b"gh");
        assert_eq!(buf.spare(), 6);
    }

    #[test]
    fn ensure_spare_compacts_before_growing() {
        let mut buf = ChunkBuffer::with_capacity(8);
        fill(&mut buf, b"abcd");
        buf.consume(3);
        // 4 spare, 3 reclaimable by compaction: 7 >= 6, no reallocation
        buf.ensure_spare(6);
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.unread(), b"d");
    }

    #[test]
    fn reset_drops_staged_bytes() {
        let mut buf = ChunkBuffer::with_capacity(8);
        fill(&mut buf, b"abcd");
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.spare(), 8);
    }

    #[test]
    fn zero_capacity_grows_to_minimum() {
        let mut buf = ChunkBuffer::with_capacity(0);
        buf.ensure_spare(1);
        assert!(buf.capacity() >= 1);
    }
}
