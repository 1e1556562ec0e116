//! DEFLATE codec backed by flate2's low-level state machines.
//!
//! [`DeflateCodec`] adapts `flate2::Compress` / `flate2::Decompress` to the
//! step-wise [`Codec`] contract. Two variants exist: zlib-wrapped
//! ([`DeflateCodec::zlib`], RFC 1950 header + adler32 trailer) and raw
//! DEFLATE ([`DeflateCodec::raw`], RFC 1951). Both end every stream with an
//! explicit final block, so the decompress side reports
//! [`StreamStatus::Finished`] at the logical end and the input engine can
//! distinguish a clean end from truncation.
//!
//! Trailing-bytes policy: this codec decodes exactly one stream and stops at
//! its end marker; it never continues into concatenated streams. Callers who
//! need concatenation reset the codec and decode again.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::codec::{Codec, StepResult, StreamStatus};
use crate::error::{Error, Result};

pub struct DeflateCodec {
    compress: Compress,
    decompress: Decompress,
    zlib_header: bool,
    /// Input accepted since the last completed drain or finish. zlib's Sync
    /// flush emits a fresh empty-block marker even when nothing is pending,
    /// so an idle codec must answer drain requests itself.
    pending: bool,
}

impl DeflateCodec {
    /// zlib-wrapped DEFLATE at the default compression level.
    pub fn zlib() -> Self {
        Self::with_level(Compression::default(), true)
    }

    /// Raw DEFLATE (no container) at the default compression level.
    pub fn raw() -> Self {
        Self::with_level(Compression::default(), false)
    }

    pub fn with_level(level: Compression, zlib_header: bool) -> Self {
        Self {
            compress: Compress::new(level, zlib_header),
            decompress: Decompress::new(zlib_header),
            zlib_header,
            pending: false,
        }
    }

    /// `Ok`/`BufError` say nothing about *why* zlib stopped; recover the
    /// direction from the byte accounting: leftover input means the output
    /// region filled, a full output region means the same, anything else
    /// means more input is wanted.
    fn interpret(
        status: Status,
        consumed: usize,
        input_len: usize,
        produced: usize,
        output_len: usize,
    ) -> StreamStatus {
        match status {
            Status::StreamEnd => StreamStatus::Finished,
            Status::Ok | Status::BufError => {
                if consumed < input_len || (produced == output_len && output_len > 0) {
                    StreamStatus::NeedsMoreOutput
                } else {
                    StreamStatus::NeedsMoreInput
                }
            }
        }
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &str {
        if self.zlib_header {
            "zlib"
        } else {
            "deflate"
        }
    }

    fn compress(&mut self, input: &[u8], output: &mut [u8], finish: bool) -> Result<StepResult> {
        // Empty input without finish is a drain request (see the trait
        // contract): a sync flush pushes everything pending out of zlib's
        // window so an independent decoder can reproduce all bytes so far.
        // zlib does not answer "nothing pending" itself — a Sync step on an
        // idle stream still emits a marker block — so that case is handled
        // here without touching zlib.
        let draining = !finish && input.is_empty();
        if draining && !self.pending {
            return Ok(StepResult {
                bytes_consumed: 0,
                bytes_produced: 0,
                status: StreamStatus::NeedsMoreInput,
            });
        }
        let flush = if finish {
            FlushCompress::Finish
        } else if draining {
            FlushCompress::Sync
        } else {
            FlushCompress::None
        };
        let before_in = self.compress.total_in();
        let before_out = self.compress.total_out();
        let status = self
            .compress
            .compress(input, output, flush)
            .map_err(|e| Error::Codec(format!("deflate: {e}")))?;
        let consumed = (self.compress.total_in() - before_in) as usize;
        let produced = (self.compress.total_out() - before_out) as usize;
        let status = Self::interpret(status, consumed, input.len(), produced, output.len());
        if !input.is_empty() {
            self.pending = true;
        }
        // A drain that ran to completion (or a finished stream) leaves
        // nothing buffered.
        if status == StreamStatus::Finished || (draining && status == StreamStatus::NeedsMoreInput)
        {
            self.pending = false;
        }
        Ok(StepResult {
            bytes_consumed: consumed,
            bytes_produced: produced,
            status,
        })
    }

    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StepResult> {
        let before_in = self.decompress.total_in();
        let before_out = self.decompress.total_out();
        let status = self
            .decompress
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| Error::Codec(format!("inflate: {e}")))?;
        let consumed = (self.decompress.total_in() - before_in) as usize;
        let produced = (self.decompress.total_out() - before_out) as usize;
        Ok(StepResult {
            bytes_consumed: consumed,
            bytes_produced: produced,
            status: Self::interpret(status, consumed, input.len(), produced, output.len()),
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.compress.reset();
        self.decompress.reset(self.zlib_header);
        self.pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the codec the way an engine would: bounded output regions,
    /// repeat on NeedsMoreOutput.
    fn compress_all(codec: &mut DeflateCodec, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut scratch = [0u8; 97]; // deliberately awkward size
        let mut consumed = 0;
        while consumed < data.len() {
            let step = codec.compress(&data[consumed..], &mut scratch, false).unwrap();
            consumed += step.bytes_consumed;
            out.extend_from_slice(&scratch[..step.bytes_produced]);
        }
        loop {
            let step = codec.compress(&[], &mut scratch, true).unwrap();
            out.extend_from_slice(&scratch[..step.bytes_produced]);
            if step.status == StreamStatus::Finished {
                break;
            }
        }
        out
    }

    fn decompress_all(codec: &mut DeflateCodec, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut scratch = [0u8; 131];
        let mut consumed = 0;
        loop {
            let step = codec
                .decompress(&data[consumed..], &mut scratch)
                .unwrap();
            consumed += step.bytes_consumed;
            out.extend_from_slice(&scratch[..step.bytes_produced]);
            if step.status == StreamStatus::Finished {
                break;
            }
        }
        out
    }

    #[test]
    fn step_roundtrip_zlib() {
        let data: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let mut codec = DeflateCodec::zlib();
        let compressed = compress_all(&mut codec, &data);
        codec.reset().unwrap();
        assert_eq!(decompress_all(&mut codec, &compressed), data);
    }

    #[test]
    fn step_roundtrip_raw_deflate() {
        let data = b"raw deflate carries no container at all".repeat(50);
        let mut codec = DeflateCodec::raw();
        let compressed = compress_all(&mut codec, &data);
        codec.reset().unwrap();
        assert_eq!(decompress_all(&mut codec, &compressed), data);
    }

    #[test]
    fn reset_allows_a_second_stream() {
        let mut codec = DeflateCodec::zlib();
        let first = compress_all(&mut codec, b"first stream");
        codec.reset().unwrap();
        let second = compress_all(&mut codec, b"second stream");
        codec.reset().unwrap();
        assert_eq!(decompress_all(&mut codec, &first), b"first stream");
        codec.reset().unwrap();
        assert_eq!(decompress_all(&mut codec, &second), b"second stream");
    }

    #[test]
    fn corrupt_input_is_an_error() {
        let mut codec = DeflateCodec::zlib();
        let mut scratch = [0u8; 64];
        // 0x00 0x01 is not a valid zlib header
        let err = codec.decompress(&[0x00, 0x01, 0x02, 0x03], &mut scratch);
        assert!(err.is_err());
        assert!(err.unwrap_err().is_codec());
    }

    #[test]
    fn drain_emits_pending_and_then_nothing() {
        let mut codec = DeflateCodec::zlib();
        let mut scratch = [0u8; 256];
        let step = codec.compress(b"pending data", &mut scratch, false).unwrap();
        assert_eq!(step.bytes_consumed, 12);
        // drain once: sync flush emits what zlib buffered
        let drained = codec.compress(&[], &mut scratch, false).unwrap();
        assert!(drained.bytes_produced > 0);
        // drain again: nothing pending
        let empty = codec.compress(&[], &mut scratch, false).unwrap();
        assert_eq!(empty.bytes_produced, 0);
    }

    #[test]
    fn idle_drains_terminate_with_nothing_produced() {
        let mut codec = DeflateCodec::zlib();
        let mut scratch = [0u8; 64];
        // a fresh codec has nothing to flush
        let step = codec.compress(&[], &mut scratch, false).unwrap();
        assert_eq!(step.bytes_produced, 0);
        assert_eq!(step.status, StreamStatus::NeedsMoreInput);
        // accept input, drain it, then drain repeatedly: no sync marker may
        // be emitted once the codec is idle again
        codec.compress(b"some bytes", &mut scratch, false).unwrap();
        while codec.compress(&[], &mut scratch, false).unwrap().bytes_produced > 0 {}
        for _ in 0..4 {
            let step = codec.compress(&[], &mut scratch, false).unwrap();
            assert_eq!(step.bytes_produced, 0);
        }
    }

    #[test]
    fn names_distinguish_variants() {
        assert_eq!(DeflateCodec::zlib().name(), "zlib");
        assert_eq!(DeflateCodec::raw().name(), "deflate");
    }
}
