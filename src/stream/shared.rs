//! Serialized-access wrapper for one compressed input stream.
//!
//! [`SharedCompressedInputStream`] guards a [`CompressedInputStream`] with a
//! mutual-exclusion discipline: `read`, `tell`, `close`, and `abort` issued
//! by concurrent callers execute one at a time, each holding the lock for its
//! whole duration, so no two operations interleave partial effects on the
//! engine state. A call arriving while another is in flight blocks until the
//! in-flight call completes — no timeout, no priority. This serializes
//! access; it does not parallelize decompression.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::raw::{RawInput, SharedRaw};
use crate::stream::decompress::CompressedInputStream;

pub struct SharedCompressedInputStream<R: RawInput> {
    inner: Arc<Mutex<CompressedInputStream<R>>>,
}

impl<R: RawInput> Clone for SharedCompressedInputStream<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RawInput> SharedCompressedInputStream<R> {
    pub fn new(stream: CompressedInputStream<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CompressedInputStream<R>>> {
        self.inner
            .lock()
            .map_err(|_| Error::InvalidState("stream mutex poisoned".into()))
    }

    /// Atomic [`CompressedInputStream::read_into`].
    pub fn read_into(&self, out: &mut [u8]) -> Result<usize> {
        self.lock()?.read_into(out)
    }

    /// Atomic [`CompressedInputStream::read`].
    pub fn read(&self, nbytes: usize) -> Result<Vec<u8>> {
        self.lock()?.read(nbytes)
    }

    /// Atomic [`CompressedInputStream::tell`].
    pub fn tell(&self) -> Result<u64> {
        self.lock()?.tell()
    }

    /// Atomic [`CompressedInputStream::close`].
    pub fn close(&self) -> Result<()> {
        self.lock()?.close()
    }

    /// Atomic [`CompressedInputStream::abort`].
    pub fn abort(&self) -> Result<()> {
        self.lock()?.abort()
    }

    /// Whether the stream has been closed or aborted. Reports `true` when the
    /// lock is poisoned: a stream whose last holder panicked mid-operation is
    /// unusable either way.
    pub fn closed(&self) -> bool {
        self.lock().map(|s| s.closed()).unwrap_or(true)
    }

    /// The wrapped raw stream handle.
    pub fn raw(&self) -> Result<SharedRaw<R>> {
        Ok(self.lock()?.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::deflate::DeflateCodec;
    use crate::raw::{shared, ReaderStream, WriterStream};
    use crate::stream::compress::CompressedOutputStream;
    use std::io::Cursor;

    fn shared_reader(data: &[u8]) -> SharedCompressedInputStream<ReaderStream<Cursor<Vec<u8>>>> {
        let sink = shared(WriterStream::new(Vec::new()));
        let mut out =
            CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink.clone()).unwrap();
        out.write(data).unwrap();
        out.close().unwrap();
        let bytes = sink.lock().unwrap().get_ref().clone();
        let raw = shared(ReaderStream::new(Cursor::new(bytes)));
        SharedCompressedInputStream::new(
            CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap(),
        )
    }

    #[test]
    fn clones_share_one_cursor() {
        let a = shared_reader(b"0123456789");
        let b = a.clone();
        assert_eq!(a.read(4).unwrap(), b"0123");
        assert_eq!(b.read(4).unwrap(), b"4567");
        assert_eq!(a.tell().unwrap(), 8);
        assert_eq!(b.read(10).unwrap(), b"89");
    }

    #[test]
    fn close_through_any_clone() {
        let a = shared_reader(b"x");
        let b = a.clone();
        b.close().unwrap();
        assert!(a.closed());
        assert!(a.read(1).unwrap_err().is_invalid_state());
        // close stays idempotent across clones
        a.close().unwrap();
    }
}
