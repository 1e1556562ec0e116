//! The step-wise codec capability consumed by the stream engines.
//!
//! A [`Codec`] is a stateful compression/decompression algorithm exposing
//! bounded, chunked processing: every call consumes some prefix of `input`,
//! produces some prefix of `output`, and reports via [`StreamStatus`] what it
//! needs next. The engines in [`crate::stream`] own exactly one codec per
//! stream and drive it in a loop; they never share a codec across streams.
//!
//! Any algorithm conforming to this contract can be substituted — the crate
//! ships a flate2-backed implementation in [`crate::codecs::deflate`].

use crate::error::Result;

/// What the codec needs (or has reached) after a processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The step consumed everything useful from `input`; feed more data
    /// (or, for compression, call again with `finish == true`).
    NeedsMoreInput,
    /// The step stopped because `output` is too small to hold what the codec
    /// has pending. Drain or enlarge the output region and call again.
    NeedsMoreOutput,
    /// The logical end of the stream has been produced (compression: the
    /// trailer is fully written; decompression: the end marker was decoded).
    Finished,
}

/// Byte accounting for one codec step.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    /// Bytes consumed from the front of `input`.
    pub bytes_consumed: usize,
    /// Bytes produced into the front of `output`.
    pub bytes_produced: usize,
    /// What to do next.
    pub status: StreamStatus,
}

/// Stateful, single-stream-lifetime compression/decompression capability.
///
/// Once processing has begun, internal state strictly advances with each step;
/// a codec instance is not reusable across unrelated streams without
/// [`reset`](Codec::reset).
///
/// # Draining
///
/// A `compress` call with an *empty* `input` and `finish == false` is a drain
/// request: the codec must move internally buffered output into `output` so
/// that an independent decoder can reproduce every byte accepted so far. Once
/// nothing is pending it reports `bytes_produced == 0`. This is how the
/// output engine implements `flush` without terminating the stream.
pub trait Codec: Send {
    /// Short human-readable algorithm name (for diagnostics and logging).
    fn name(&self) -> &str;

    /// One compression step. With `finish == true` the codec begins (or
    /// continues) emitting its trailer; callers repeat until
    /// [`StreamStatus::Finished`].
    fn compress(&mut self, input: &[u8], output: &mut [u8], finish: bool) -> Result<StepResult>;

    /// One decompression step. Malformed input is an error, never silent EOF.
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StepResult>;

    /// Reinitialize all internal state so the instance can serve a new,
    /// unrelated stream.
    fn reset(&mut self) -> Result<()>;
}
