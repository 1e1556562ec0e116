//! Compressed output stream engine.
//!
//! [`CompressedOutputStream`] converts a sequence of logical writes into
//! codec compress steps and raw writes. Compressed bytes accumulate in one
//! [`ChunkBuffer`]; whenever the buffer fills (the high-water mark is its
//! capacity) or the codec reports it needs more output room, the staged bytes
//! are flushed to the raw stream and staging restarts at zero. The buffer
//! grows only when it is empty and still smaller than a single codec step's
//! minimum output.
//!
//! The logical position is the count of *uncompressed* bytes accepted, which
//! advances by the full length of a `write` only after the codec has consumed
//! all of it.

use log::{debug, warn};

use crate::chunk::ChunkBuffer;
use crate::codec::{Codec, StreamStatus};
use crate::error::Result;
use crate::raw::{RawOutput, SharedRaw};
use crate::stream::{check_capacity, lock_raw, StreamState, DEFAULT_CHUNK_CAPACITY};

pub struct CompressedOutputStream<W: RawOutput> {
    codec: Box<dyn Codec>,
    raw: SharedRaw<W>,
    staging: ChunkBuffer,
    /// Uncompressed bytes accepted so far.
    pos: u64,
    state: StreamState,
}

impl<W: RawOutput> CompressedOutputStream<W> {
    /// Create a compressed output stream wrapping the given raw stream.
    /// Closing the returned stream implicitly closes the raw stream.
    pub fn new(codec: Box<dyn Codec>, raw: SharedRaw<W>) -> Result<Self> {
        Self::with_capacity(codec, raw, DEFAULT_CHUNK_CAPACITY)
    }

    /// As [`new`](Self::new) with an explicit staging capacity. Fails with
    /// `InvalidArgument` when `capacity` is zero.
    pub fn with_capacity(codec: Box<dyn Codec>, raw: SharedRaw<W>, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        debug!("open compressed output stream, codec={}", codec.name());
        Ok(Self {
            codec,
            raw,
            staging: ChunkBuffer::with_capacity(capacity),
            pos: 0,
            state: StreamState::Open,
        })
    }

    /// Feed `data` through the codec until every byte is consumed. On codec
    /// or raw-stream failure the stream enters the failed state and only
    /// `close`/`abort` remain usable.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.state.ensure_open()?;
        let res = self.write_inner(data);
        if res.is_err() {
            self.state = StreamState::Failed;
        }
        res
    }

    /// Drain codec-internal buffered output and push everything staged to the
    /// raw stream, without finishing the codec or closing anything. No-op if
    /// nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        let res = self.drain_codec();
        if res.is_err() {
            self.state = StreamState::Failed;
        }
        res
    }

    /// Finish the codec (emitting its trailer), drain remaining compressed
    /// output, then close the raw stream. The second call is a no-op with no
    /// further side effects. On a failed stream the finish step is skipped —
    /// a valid trailer can no longer be produced — and the raw stream is
    /// closed as-is.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            StreamState::Closed => Ok(()),
            StreamState::Failed => {
                self.state = StreamState::Closed;
                self.staging.reset();
                lock_raw(&self.raw)?.close()
            }
            StreamState::Open => {
                let finished = self.finish_codec();
                self.state = StreamState::Closed;
                match finished {
                    Ok(()) => lock_raw(&self.raw)?.close(),
                    Err(e) => {
                        // Surface the finish failure; still release the sink.
                        if let Err(close_err) = lock_raw(&self.raw).and_then(|mut r| r.close()) {
                            warn!("close after failed finish: raw close also failed: {close_err}");
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Best-effort release: staged bytes are dropped, the raw stream is
    /// closed, and secondary failures are logged rather than raised. Meant
    /// for teardown after an unrecoverable upstream error, where silently
    /// producing a truncated-but-seemingly-valid output would be worse than
    /// producing none.
    pub fn abort(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.state = StreamState::Closed;
        self.staging.reset();
        if let Err(e) = lock_raw(&self.raw).and_then(|mut r| r.close()) {
            warn!("abort: raw stream close failed: {e}");
        }
        Ok(())
    }

    /// Logical (uncompressed) byte offset accepted so far.
    pub fn tell(&self) -> Result<u64> {
        self.state.ensure_open()?;
        Ok(self.pos)
    }

    pub fn closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    /// The wrapped raw stream handle. Does not transfer ownership; the raw
    /// stream stays shared with the engine.
    pub fn raw(&self) -> SharedRaw<W> {
        self.raw.clone()
    }

    fn write_inner(&mut self, data: &[u8]) -> Result<()> {
        let mut consumed = 0;
        while consumed < data.len() {
            if self.staging.spare() == 0 {
                self.flush_staging()?;
            }
            let step = self
                .codec
                .compress(&data[consumed..], self.staging.spare_mut(), false)?;
            self.staging.commit(step.bytes_produced);
            consumed += step.bytes_consumed;
            if step.status == StreamStatus::NeedsMoreOutput
                && self.staging.is_empty()
                && step.bytes_produced == 0
            {
                // Even a fully flushed buffer is smaller than one codec step.
                self.staging.ensure_spare(self.staging.capacity().max(1) * 2);
            }
        }
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Empty-input compress steps until the codec has nothing pending, then
    /// push staged bytes to the raw stream.
    fn drain_codec(&mut self) -> Result<()> {
        loop {
            if self.staging.spare() == 0 {
                self.flush_staging()?;
            }
            let step = self.codec.compress(&[], self.staging.spare_mut(), false)?;
            self.staging.commit(step.bytes_produced);
            if step.status == StreamStatus::NeedsMoreOutput {
                continue;
            }
            if step.bytes_produced == 0 {
                break;
            }
        }
        self.flush_staging()
    }

    /// Terminal compress steps (`finish == true`) until the codec reports
    /// `Finished`, flushing staged bytes as they accumulate.
    fn finish_codec(&mut self) -> Result<()> {
        loop {
            if self.staging.spare() == 0 {
                self.flush_staging()?;
            }
            let step = self.codec.compress(&[], self.staging.spare_mut(), true)?;
            self.staging.commit(step.bytes_produced);
            match step.status {
                StreamStatus::Finished => break,
                StreamStatus::NeedsMoreOutput => continue,
                StreamStatus::NeedsMoreInput => {
                    // A finishing codec asking for input has nothing left.
                    if step.bytes_produced == 0 {
                        break;
                    }
                }
            }
        }
        self.flush_staging()
    }

    fn flush_staging(&mut self) -> Result<()> {
        if self.staging.is_empty() {
            return Ok(());
        }
        lock_raw(&self.raw)?.write(self.staging.unread())?;
        self.staging.reset();
        Ok(())
    }
}

impl<W: RawOutput> Drop for CompressedOutputStream<W> {
    /// Dropping an open stream aborts it; an explicit `close` is the only way
    /// to get a well-terminated compressed stream.
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
    use crate::raw::{shared, WriterStream};

    fn sink() -> SharedRaw<WriterStream<Vec<u8>>> {
        shared(WriterStream::new(Vec::new()))
    }

    #[test]
    fn tell_counts_uncompressed_bytes() {
        let raw = sink();
        let mut s = CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap();
        assert_eq!(s.tell().unwrap(), 0);
        s.write(b"hello").unwrap();
        s.write(b" world").unwrap();
        assert_eq!(s.tell().unwrap(), 11);
        s.close().unwrap();
    }

    #[test]
    fn flush_with_nothing_pending_writes_nothing() {
        let raw = sink();
        let mut s =
            CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), raw.clone()).unwrap();
        s.write(b"abc").unwrap();
        s.flush().unwrap();
        let after_first = raw.lock().unwrap().get_ref().len();
        s.flush().unwrap();
        assert_eq!(raw.lock().unwrap().get_ref().len(), after_first);
        s.close().unwrap();
    }

    #[test]
    fn close_marks_raw_closed() {
        let raw = sink();
        let mut s =
            CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), raw.clone()).unwrap();
        s.write(b"data").unwrap();
        s.close().unwrap();
        assert!(s.closed());
        assert!(raw.lock().unwrap().closed());
    }

    #[test]
    fn tiny_staging_capacity_still_compresses() {
        let raw = sink();
        let mut s = CompressedOutputStream::with_capacity(
            Box::new(DeflateCodec::zlib()),
            raw.clone(),
            1,
        )
        .unwrap();
        let data = vec![7u8; 10_000];
        s.write(&data).unwrap();
        s.close().unwrap();
        assert!(!raw.lock().unwrap().get_ref().is_empty());
    }

    #[test]
    fn drop_without_close_closes_raw() {
        let raw = sink();
        {
            let mut s =
                CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), raw.clone()).unwrap();
            s.write(b"partial").unwrap();
        }
        assert!(raw.lock().unwrap().closed());
    }
}
