//! Compressed input stream engine.
//!
//! [`CompressedInputStream`] satisfies arbitrary-sized logical reads from two
//! staging areas: raw compressed bytes fetched from the raw stream, and
//! decompressed bytes produced by codec steps. A `read` first serves staged
//! decompressed bytes, then alternates raw refills and decompress steps until
//! the caller's buffer is full or end-of-stream is reached.
//!
//! End-of-stream means the codec reported `Finished` and the decompressed
//! staging is drained. Physical EOF while the codec is still mid-stream is a
//! truncation error, never a silent EOF; the only exception is a raw stream
//! that was empty from the very first read, which reads as an empty logical
//! stream. Bytes following the codec's logical end are left alone: the engine
//! stops stepping the codec and reports end-of-stream (see `DeflateCodec` for
//! the single-stream policy this leans on).

use log::{debug, warn};

use crate::chunk::ChunkBuffer;
use crate::codec::{Codec, StreamStatus};
use crate::error::{Error, Result};
use crate::raw::{RawInput, SharedRaw};
use crate::stream::{check_capacity, lock_raw, StreamState, DEFAULT_CHUNK_CAPACITY};

pub struct CompressedInputStream<R: RawInput> {
    codec: Box<dyn Codec>,
    raw: SharedRaw<R>,
    /// Raw compressed bytes not yet fed to the codec.
    compressed: ChunkBuffer,
    /// Decompressed bytes not yet delivered to the caller.
    decompressed: ChunkBuffer,
    /// Decompressed bytes delivered so far.
    pos: u64,
    /// The raw stream returned 0 (physical EOF).
    raw_eof: bool,
    /// At least one compressed byte was ever staged.
    saw_input: bool,
    /// The codec reported `Finished`.
    finished: bool,
    /// `finished` and both staging areas drained: reads return 0 from now on.
    eos: bool,
    state: StreamState,
}

impl<R: RawInput> CompressedInputStream<R> {
    /// Create a compressed input stream wrapping the given raw stream.
    /// Closing the returned stream implicitly closes the raw stream.
    pub fn new(codec: Box<dyn Codec>, raw: SharedRaw<R>) -> Result<Self> {
        Self::with_capacity(codec, raw, DEFAULT_CHUNK_CAPACITY)
    }

    /// As [`new`](Self::new) with an explicit staging capacity (used for both
    /// staging areas). Fails with `InvalidArgument` when `capacity` is zero.
    pub fn with_capacity(codec: Box<dyn Codec>, raw: SharedRaw<R>, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        debug!("open compressed input stream, codec={}", codec.name());
        Ok(Self {
            codec,
            raw,
            compressed: ChunkBuffer::with_capacity(capacity),
            decompressed: ChunkBuffer::with_capacity(capacity),
            pos: 0,
            raw_eof: false,
            saw_input: false,
            finished: false,
            eos: false,
            state: StreamState::Open,
        })
    }

    /// Read up to `out.len()` decompressed bytes into `out`. Returns fewer
    /// than requested only at end-of-stream, and 0 on every call after it.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<usize> {
        self.state.ensure_open()?;
        let res = self.read_inner(out);
        if res.is_err() {
            self.state = StreamState::Failed;
        }
        res
    }

    /// Read up to `nbytes` decompressed bytes into a fresh buffer.
    pub fn read(&mut self, nbytes: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; nbytes];
        let n = self.read_into(&mut out)?;
        out.truncate(n);
        Ok(out)
    }

    /// Logical (decompressed) byte offset delivered so far.
    pub fn tell(&self) -> Result<u64> {
        self.state.ensure_open()?;
        Ok(self.pos)
    }

    /// Release codec staging and close the underlying raw stream. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.state = StreamState::Closed;
        self.compressed.reset();
        self.decompressed.reset();
        lock_raw(&self.raw)?.close()
    }

    /// Best-effort teardown mirroring the output stream's `abort`: secondary
    /// failures are logged, never raised.
    pub fn abort(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.state = StreamState::Closed;
        self.compressed.reset();
        self.decompressed.reset();
        if let Err(e) = lock_raw(&self.raw).and_then(|mut r| r.close()) {
            warn!("abort: raw stream close failed: {e}");
        }
        Ok(())
    }

    pub fn closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    /// The wrapped raw stream handle.
    pub fn raw(&self) -> SharedRaw<R> {
        self.raw.clone()
    }

    fn read_inner(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        loop {
            // Serve already-decompressed bytes first.
            let avail = self.decompressed.unread_len();
            if avail > 0 {
                let n = avail.min(out.len() - filled);
                out[filled..filled + n].copy_from_slice(&self.decompressed.unread()[..n]);
                self.decompressed.consume(n);
                filled += n;
            }
            if filled == out.len() || self.eos {
                break;
            }
            if self.finished {
                // Codec done and staging just drained above.
                self.eos = true;
                continue;
            }

            // Stage more compressed bytes when none are pending.
            if self.compressed.is_empty() && !self.raw_eof {
                self.refill_compressed()?;
            }
            if self.compressed.is_empty() && self.raw_eof && !self.saw_input {
                // The raw stream held no bytes at all: an empty logical stream.
                self.eos = true;
                continue;
            }

            // One codec step.
            if self.decompressed.spare() == 0 {
                self.decompressed.ensure_spare(1);
            }
            let step = self
                .codec
                .decompress(self.compressed.unread(), self.decompressed.spare_mut())?;
            self.compressed.consume(step.bytes_consumed);
            self.decompressed.commit(step.bytes_produced);
            match step.status {
                StreamStatus::Finished => self.finished = true,
                StreamStatus::NeedsMoreOutput => {
                    let want = self.decompressed.capacity().max(1);
                    self.decompressed.ensure_spare(want);
                }
                StreamStatus::NeedsMoreInput => {
                    if self.raw_eof && self.compressed.is_empty() && step.bytes_produced == 0 {
                        return Err(Error::Codec(format!(
                            "truncated compressed stream ({})",
                            self.codec.name()
                        )));
                    }
                }
            }
        }
        self.pos += filled as u64;
        Ok(filled)
    }

    fn refill_compressed(&mut self) -> Result<()> {
        self.compressed.ensure_spare(1);
        let n = lock_raw(&self.raw)?.read(self.compressed.spare_mut())?;
        if n == 0 {
            self.raw_eof = true;
        } else {
            self.compressed.commit(n);
            self.saw_input = true;
        }
        Ok(())
    }
}

impl<R: RawInput> Drop for CompressedInputStream<R> {
    fn drop(&mut self) {
        if self.state != StreamState::Closed {
            let _ = self.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::deflate::DeflateCodec;
    use crate::raw::{shared, ReaderStream, WriterStream};
    use crate::stream::compress::CompressedOutputStream;
    use std::io::Cursor;

    fn compress(data: &[u8]) -> Vec<u8> {
        let raw = shared(WriterStream::new(Vec::new()));
        let mut s =
            CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), raw.clone()).unwrap();
        s.write(data).unwrap();
        s.close().unwrap();
        let bytes = raw.lock().unwrap().get_ref().clone();
        bytes
    }

    fn reader(bytes: Vec<u8>) -> CompressedInputStream<ReaderStream<Cursor<Vec<u8>>>> {
        let raw = shared(ReaderStream::new(Cursor::new(bytes)));
        CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap()
    }

    #[test]
    fn empty_raw_stream_reads_as_empty() {
        let mut s = reader(Vec::new());
        assert_eq!(s.read(16).unwrap(), b"");
        assert_eq!(s.read(16).unwrap(), b"");
        assert_eq!(s.tell().unwrap(), 0);
    }

    #[test]
    fn empty_logical_stream_reads_as_empty() {
        let mut s = reader(compress(b""));
        assert_eq!(s.read(16).unwrap(), b"");
        assert_eq!(s.tell().unwrap(), 0);
    }

    #[test]
    fn trailing_bytes_after_logical_end_are_ignored() {
        let mut bytes = compress(b"payload");
        bytes.extend_from_slice(b"garbage after the end marker");
        let mut s = reader(bytes);
        assert_eq!(s.read(64).unwrap(), b"payload");
        assert_eq!(s.read(64).unwrap(), b"");
        assert_eq!(s.tell().unwrap(), 7);
    }

    #[test]
    fn zero_length_read_is_a_no_op() {
        let mut s = reader(compress(b"abc"));
        assert_eq!(s.read(0).unwrap(), b"");
        assert_eq!(s.tell().unwrap(), 0);
        assert_eq!(s.read(10).unwrap(), b"abc");
    }

    #[test]
    fn tiny_staging_capacity_still_decompresses() {
        let bytes = compress(&vec![42u8; 50_000]);
        let raw = shared(ReaderStream::new(Cursor::new(bytes)));
        let mut s =
            CompressedInputStream::with_capacity(Box::new(DeflateCodec::zlib()), raw, 1).unwrap();
        let mut total = 0;
        loop {
            let chunk = s.read(4096).unwrap();
            if chunk.is_empty() {
                break;
            }
            assert!(chunk.iter().all(|&b| b == 42));
            total += chunk.len();
        }
        assert_eq!(total, 50_000);
    }
}
