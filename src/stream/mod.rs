//! Stream engines: logical byte-stream semantics over a step-wise codec.
//!
//! - [`compress::CompressedOutputStream`] — turns logical writes into codec
//!   compress steps and raw writes.
//! - [`decompress::CompressedInputStream`] — turns raw reads and codec
//!   decompress steps into arbitrary-sized logical reads.
//! - [`shared::SharedCompressedInputStream`] — serialized-access wrapper for
//!   one input stream used from multiple threads.

pub mod compress;
pub mod decompress;
pub mod shared;

use std::sync::MutexGuard;

use crate::error::{Error, Result};
use crate::raw::SharedRaw;

/// Default staging buffer capacity for both engines (64 KiB).
pub const DEFAULT_CHUNK_CAPACITY: usize = 64 * 1024;

/// Lifecycle of one stream engine.
///
/// `Failed` is entered on the first unrecovered codec or I/O error; from
/// there only `close`/`abort` are usable, everything else is
/// [`Error::InvalidState`]. `Closed` is terminal and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamState {
    Open,
    Failed,
    Closed,
}

impl StreamState {
    pub(crate) fn ensure_open(self) -> Result<()> {
        match self {
            StreamState::Open => Ok(()),
            StreamState::Failed => Err(Error::InvalidState(
                "stream failed; only close/abort are usable".into(),
            )),
            StreamState::Closed => Err(Error::InvalidState("stream is closed".into())),
        }
    }
}

/// Acquire the shared raw stream. A mutex poisoned by a panicked peer means
/// the raw stream's integrity is unknown; surface that as `InvalidState`.
pub(crate) fn lock_raw<S>(raw: &SharedRaw<S>) -> Result<MutexGuard<'_, S>> {
    raw.lock()
        .map_err(|_| Error::InvalidState("raw stream mutex poisoned".into()))
}

/// Reject a zero scratch capacity at construction time.
pub(crate) fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::InvalidArgument(
            "chunk buffer capacity must be non-zero".into(),
        ));
    }
    Ok(())
}
