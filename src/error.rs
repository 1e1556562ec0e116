//! Unified error type for the compressed stream adapters.
//!
//! All fallible operations in this crate return [`Result`]. The taxonomy is
//! deliberately small:
//!
//! - [`Error::InvalidArgument`] — bad construction parameters
//! - [`Error::InvalidState`] — operation on a closed, aborted, or failed stream
//! - [`Error::Codec`] — compression/decompression failure, including malformed
//!   or truncated compressed input
//! - [`Error::Io`] — failure of the underlying raw byte stream
//!
//! Codec and raw-stream errors surface immediately to the caller of the
//! triggering operation; nothing is retried at this layer. The one exception
//! is `abort`, which exists for best-effort teardown and only logs secondary
//! failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A constructor was handed an unusable parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The stream can no longer service this operation. After `close` or
    /// `abort`, and after any unrecovered failure, only `close`/`abort`
    /// remain usable.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The codec rejected its input or failed to make progress.
    #[error("codec error: {0}")]
    Codec(String),

    /// The underlying raw stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for [`Error::InvalidState`]; used by tests asserting the
    /// closed-stream contract.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }

    /// True for [`Error::Codec`].
    pub fn is_codec(&self) -> bool {
        matches!(self, Error::Codec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = Error::InvalidState("stream is closed".into());
        assert_eq!(err.to_string(), "invalid state: stream is closed");
        assert!(err.is_invalid_state());
        assert!(!err.is_codec());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
