//! The raw byte-stream capability consumed by the stream engines.
//!
//! [`RawInput`] and [`RawOutput`] are the narrow interfaces a physical byte
//! source/sink must expose: `read`/`write`, a physical `tell`, and an
//! idempotent `close`. The engines hold the raw stream behind a
//! reference-counted handle ([`SharedRaw`]) so other holders may retain it —
//! for example to inspect bytes written so far — concurrently with the
//! engine. The engine serializes only its own calls to the raw stream.
//!
//! [`WriterStream`] and [`ReaderStream`] adapt any `std::io::Write` /
//! `std::io::Read` into these capabilities, tracking the physical offset.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Reference-counted handle through which a raw stream is shared between an
/// engine and any other holder.
pub type SharedRaw<S> = Arc<Mutex<S>>;

/// Wrap a raw stream in a [`SharedRaw`] handle.
pub fn shared<S>(stream: S) -> SharedRaw<S> {
    Arc::new(Mutex::new(stream))
}

/// Byte sink capability: physical writes, a physical offset, idempotent close.
pub trait RawOutput: Send {
    /// Write all of `data` or fail. Partial physical writes are the
    /// implementation's problem to retry or reject.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Physical byte offset: total bytes accepted so far.
    fn tell(&self) -> Result<u64>;

    /// Release the sink. Second and later calls are no-ops.
    fn close(&mut self) -> Result<()>;

    fn closed(&self) -> bool;
}

/// Byte source capability: physical reads (0 = EOF), offset, idempotent close.
pub trait RawInput: Send {
    /// Read up to `out.len()` bytes; returns 0 only at physical EOF.
    fn read(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Physical byte offset: total bytes delivered so far.
    fn tell(&self) -> Result<u64>;

    fn close(&mut self) -> Result<()>;

    fn closed(&self) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// std::io adapters
// ─────────────────────────────────────────────────────────────────────────────

/// [`RawOutput`] over any `std::io::Write`.
#[derive(Debug)]
pub struct WriterStream<W> {
    inner: W,
    pos: u64,
    closed: bool,
}

impl<W: Write + Send> WriterStream<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pos: 0,
            closed: false,
        }
    }

    /// Borrow the wrapped writer, e.g. to inspect an in-memory sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> RawOutput for WriterStream<W> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("raw output stream is closed".into()));
        }
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    fn tell(&self) -> Result<u64> {
        Ok(self.pos)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.inner.flush()?;
        self.closed = true;
        Ok(())
    }

    fn closed(&self) -> bool {
        self.closed
    }
}

/// [`RawInput`] over any `std::io::Read`.
#[derive(Debug)]
pub struct ReaderStream<R> {
    inner: R,
    pos: u64,
    closed: bool,
}

impl<R: Read + Send> ReaderStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pos: 0,
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> RawInput for ReaderStream<R> {
    fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::InvalidState("raw input stream is closed".into()));
        }
        let n = self.inner.read(out)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&self) -> Result<u64> {
        Ok(self.pos)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writer_tracks_position() {
        let mut w = WriterStream::new(Vec::new());
        w.write(b"abc").unwrap();
        w.write(b"de").unwrap();
        assert_eq!(w.tell().unwrap(), 5);
        assert_eq!(w.get_ref().as_slice(), b"abcde");
    }

    #[test]
    fn writer_close_is_idempotent_and_final() {
        let mut w = WriterStream::new(Vec::new());
        w.write(b"x").unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert!(w.closed());
        assert!(w.write(b"y").unwrap_err().is_invalid_state());
    }

    #[test]
    fn reader_reports_eof_as_zero() {
        let mut r = ReaderStream::new(Cursor::new(b"ab".to_vec()));
        let mut buf = [0u8; 4];
        assert_eq!(r.read(&mut buf).unwrap(), 2);
        assert_eq!(r.read(&mut buf).unwrap(), 0);
        assert_eq!(r.tell().unwrap(), 2);
    }

    #[test]
    fn reader_read_after_close_fails() {
        let mut r = ReaderStream::new(Cursor::new(Vec::new()));
        r.close().unwrap();
        let mut buf = [0u8; 1];
        assert!(r.read(&mut buf).unwrap_err().is_invalid_state());
    }
}
