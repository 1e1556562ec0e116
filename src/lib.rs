//! compstream — compressed stream adapters.
//!
//! Lets ordinary byte-oriented readers and writers transparently consume or
//! produce compressed data. A caller issues logical `read`/`write`/`tell`/
//! `close` operations; the engines reconcile those with a stateful codec's
//! step-wise processing contract and a raw byte stream's physical I/O.
//!
//! - [`CompressedOutputStream`] — logical writes in, compressed raw writes out
//! - [`CompressedInputStream`] — compressed raw reads in, logical reads out
//! - [`SharedCompressedInputStream`] — one input stream, many threads
//! - [`Codec`] — the pluggable step-wise compression capability
//! - [`DeflateCodec`] — flate2-backed implementation (zlib / raw DEFLATE)
//! - [`RawInput`] / [`RawOutput`] — the pluggable raw byte stream capability
//!
//! ```
//! use compstream::{
//!     shared, CompressedInputStream, CompressedOutputStream, DeflateCodec, ReaderStream,
//!     WriterStream,
//! };
//! use std::io::Cursor;
//!
//! # fn main() -> compstream::Result<()> {
//! let sink = shared(WriterStream::new(Vec::new()));
//! let mut writer = CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink.clone())?;
//! writer.write(b"hello world")?;
//! writer.close()?;
//!
//! let compressed = sink.lock().unwrap().get_ref().clone();
//! let source = shared(ReaderStream::new(Cursor::new(compressed)));
//! let mut reader = CompressedInputStream::new(Box::new(DeflateCodec::zlib()), source)?;
//! assert_eq!(reader.read(64)?, b"hello world");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod chunk;
pub mod codec;
pub mod codecs;
pub mod error;
pub mod raw;
pub mod stream;

pub use chunk::ChunkBuffer;
pub use codec::{Codec, StepResult, StreamStatus};
pub use codecs::DeflateCodec;
pub use error::{Error, Result};
pub use raw::{shared, RawInput, RawOutput, ReaderStream, SharedRaw, WriterStream};
pub use stream::compress::CompressedOutputStream;
pub use stream::decompress::CompressedInputStream;
pub use stream::shared::SharedCompressedInputStream;
pub use stream::DEFAULT_CHUNK_CAPACITY;
