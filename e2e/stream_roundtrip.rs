//! E2E Test Suite 01: Stream Round-Trips
//!
//! Validates the core promise of the stream engines: for any byte sequence
//! and any write-chunking pattern, writing through the output stream and
//! reading back through the input stream in arbitrary slice sizes reproduces
//! the original bytes exactly. Also covers logical positions, flush
//! visibility, and a file-backed round-trip.

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use compstream::{
    shared, CompressedInputStream, CompressedOutputStream, DeflateCodec, RawOutput, ReaderStream,
    SharedRaw, WriterStream,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

type MemSink = SharedRaw<WriterStream<Vec<u8>>>;
type MemReader = CompressedInputStream<ReaderStream<Cursor<Vec<u8>>>>;

fn writer(sink: &MemSink) -> CompressedOutputStream<WriterStream<Vec<u8>>> {
    CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink.clone()).unwrap()
}

fn reader(bytes: Vec<u8>) -> MemReader {
    let raw = shared(ReaderStream::new(Cursor::new(bytes)));
    CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap()
}

/// Compress `data`, writing it in the given slice lengths (the final slice is
/// whatever remains), and return the raw compressed bytes.
fn compress_chunked(data: &[u8], chunks: &[usize]) -> Vec<u8> {
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out = writer(&sink);
    let mut off = 0;
    for &n in chunks {
        let end = (off + n).min(data.len());
        out.write(&data[off..end]).unwrap();
        off = end;
    }
    out.write(&data[off..]).unwrap();
    assert_eq!(out.tell().unwrap(), data.len() as u64);
    out.close().unwrap();
    let bytes = sink.lock().unwrap().get_ref().clone();
    bytes
}

/// Read the whole stream back in the given slice lengths, cycling through the
/// pattern until end-of-stream.
fn read_chunked(bytes: Vec<u8>, pattern: &[usize]) -> Vec<u8> {
    let mut input = reader(bytes);
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        let n = pattern[i % pattern.len()].max(1);
        i += 1;
        let chunk = input.read(n).unwrap();
        if chunk.is_empty() {
            break;
        }
        out.extend_from_slice(&chunk);
    }
    assert_eq!(input.tell().unwrap(), out.len() as u64);
    // a further read past end-of-stream stays at 0, without error
    assert_eq!(input.read(1).unwrap(), b"");
    input.close().unwrap();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: The "hello world" example, byte for byte
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_hello_world_split_writes_and_reads() {
    let compressed = compress_chunked(b"hello world", &[5]); // "hello" + " world"
    let mut input = reader(compressed);

    assert_eq!(input.read(3).unwrap(), b"hel");
    assert_eq!(input.read(3).unwrap(), b"lo ");
    assert_eq!(input.read(3).unwrap(), b"wor");
    assert_eq!(input.read(100).unwrap(), b"ld");
    assert_eq!(input.read(100).unwrap(), b"");
    assert_eq!(input.tell().unwrap(), 11);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: Round-trip across random chunking patterns
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_random_chunking() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    // Mix of compressible structure and noise.
    let mut data = Vec::with_capacity(200_000);
    while data.len() < 200_000 {
        if rng.gen_bool(0.5) {
            data.extend_from_slice(b"abcdefgh".repeat(rng.gen_range(1..64)).as_slice());
        } else {
            data.extend((0..rng.gen_range(1..512)).map(|_| rng.gen::<u8>()));
        }
    }

    for trial in 0..8 {
        let write_chunks: Vec<usize> =
            (0..rng.gen_range(1..40)).map(|_| rng.gen_range(0..9000)).collect();
        let read_pattern: Vec<usize> =
            (0..rng.gen_range(1..10)).map(|_| rng.gen_range(1..7000)).collect();
        let compressed = compress_chunked(&data, &write_chunks);
        let back = read_chunked(compressed, &read_pattern);
        assert_eq!(back, data, "mismatch in trial {trial}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: Incompressible data forces staging flushes and growth
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_incompressible_data_small_staging() {
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<u8> = (0..300_000).map(|_| rng.gen()).collect();

    let sink = shared(WriterStream::new(Vec::new()));
    let mut out =
        CompressedOutputStream::with_capacity(Box::new(DeflateCodec::zlib()), sink.clone(), 256)
            .unwrap();
    for chunk in data.chunks(10_007) {
        out.write(chunk).unwrap();
    }
    out.close().unwrap();

    let compressed = sink.lock().unwrap().get_ref().clone();
    // incompressible input: compressed output is in the same ballpark
    assert!(compressed.len() > data.len() / 2);

    let raw = shared(ReaderStream::new(Cursor::new(compressed)));
    let mut input =
        CompressedInputStream::with_capacity(Box::new(DeflateCodec::zlib()), raw, 256).unwrap();
    let mut back = Vec::new();
    loop {
        let chunk = input.read(8192).unwrap();
        if chunk.is_empty() {
            break;
        }
        back.extend_from_slice(&chunk);
    }
    assert_eq!(back, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: Flush visibility before close
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_flush_makes_bytes_visible_to_independent_reader() {
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out = writer(&sink);
    out.write(b"visible before close").unwrap();
    out.flush().unwrap();

    // Decode the raw stream's current contents with an independent inflater;
    // the stream is unterminated but a sync flush makes the payload whole.
    let so_far = sink.lock().unwrap().get_ref().clone();
    let mut inflater = flate2::Decompress::new(true);
    let mut decoded = vec![0u8; 256];
    inflater
        .decompress(&so_far, &mut decoded, flate2::FlushDecompress::None)
        .unwrap();
    let n = inflater.total_out() as usize;
    assert_eq!(&decoded[..n], b"visible before close");

    // the stream keeps working after the flush
    out.write(b", and more").unwrap();
    out.close().unwrap();
    let all = sink.lock().unwrap().get_ref().clone();
    let mut input = reader(all);
    assert_eq!(input.read(100).unwrap(), b"visible before close, and more");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: Raw handles stay usable alongside the engines
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_raw_accessor_shares_the_stream() {
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out = writer(&sink);
    out.write(b"abc").unwrap();
    let handle = out.raw();
    out.close().unwrap();
    // the handle returned by raw() is the same stream the constructor got
    assert!(std::sync::Arc::ptr_eq(&handle, &sink));
    let guard = handle.lock().unwrap();
    assert!(guard.closed());
    assert!(guard.tell().unwrap() > 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: Raw-deflate codec round-trip (no zlib container)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_raw_deflate_codec() {
    let data = b"container-free round trip".repeat(1000);
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out = CompressedOutputStream::new(Box::new(DeflateCodec::raw()), sink.clone()).unwrap();
    out.write(&data).unwrap();
    out.close().unwrap();

    let compressed = sink.lock().unwrap().get_ref().clone();
    let raw = shared(ReaderStream::new(Cursor::new(compressed)));
    let mut input = CompressedInputStream::new(Box::new(DeflateCodec::raw()), raw).unwrap();
    let mut back = Vec::new();
    loop {
        let chunk = input.read(4096).unwrap();
        if chunk.is_empty() {
            break;
        }
        back.extend_from_slice(&chunk);
    }
    assert_eq!(back, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 7: File-backed round-trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_file_backed_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.z");
    let data = b"bytes that went through a real file".repeat(4096);

    {
        let file = std::fs::File::create(&path).unwrap();
        let sink = shared(WriterStream::new(file));
        let mut out =
            CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink).unwrap();
        for chunk in data.chunks(30_000) {
            out.write(chunk).unwrap();
        }
        out.close().unwrap();
    }

    let file = std::fs::File::open(&path).unwrap();
    let raw = shared(ReaderStream::new(file));
    let mut input = CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap();
    let mut back = Vec::new();
    loop {
        let chunk = input.read(65_536).unwrap();
        if chunk.is_empty() {
            break;
        }
        back.extend_from_slice(&chunk);
    }
    assert_eq!(back, data);
    assert_eq!(input.tell().unwrap(), data.len() as u64);
    input.close().unwrap();
}
