//! E2E Test Suite 02: Concurrent Readers
//!
//! Validates the serialized-access wrapper: multiple threads hammering one
//! shared input stream observe reads as atomic — every returned chunk is a
//! contiguous run of the decompressed stream, nothing is lost or duplicated,
//! and close/abort stay idempotent across threads.

use std::io::Cursor;
use std::thread;

use compstream::{
    shared, CompressedInputStream, CompressedOutputStream, DeflateCodec, ReaderStream,
    SharedCompressedInputStream, WriterStream,
};

fn compress(data: &[u8]) -> Vec<u8> {
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out =
        CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink.clone()).unwrap();
    out.write(data).unwrap();
    out.close().unwrap();
    let bytes = sink.lock().unwrap().get_ref().clone();
    bytes
}

fn shared_reader(bytes: Vec<u8>) -> SharedCompressedInputStream<ReaderStream<Cursor<Vec<u8>>>> {
    let raw = shared(ReaderStream::new(Cursor::new(bytes)));
    SharedCompressedInputStream::new(
        CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: Four threads drain the stream exactly once
// ─────────────────────────────────────────────────────────────────────────────

/// Locate `chunk` in `data`: the payload is a run of big-endian u64 counters,
/// so an aligned 8-byte window inside the chunk names its absolute offset.
/// Returns the offset when the chunk is a contiguous slice of `data`.
fn locate(data: &[u8], chunk: &[u8]) -> Option<usize> {
    for phase in 0..8usize {
        if chunk.len() < phase + 8 {
            break;
        }
        let counter = u64::from_be_bytes(chunk[phase..phase + 8].try_into().unwrap());
        let start = match (counter as usize).checked_mul(8).and_then(|p| p.checked_sub(phase)) {
            Some(s) => s,
            None => continue,
        };
        if start + chunk.len() <= data.len() && &data[start..start + chunk.len()] == chunk {
            return Some(start);
        }
    }
    None
}

#[test]
fn test_concurrent_readers_drain_without_loss() {
    // counter payload: every chunk can be located in the source
    let data: Vec<u8> = (0..62_500u64).flat_map(|i| i.to_be_bytes()).collect();
    let stream = shared_reader(compress(&data));

    let mut handles = Vec::new();
    for t in 0..4usize {
        let stream = stream.clone();
        handles.push(thread::spawn(move || {
            let mut chunks: Vec<Vec<u8>> = Vec::new();
            let mut sizes = [333usize, 1024, 4096, 13_001].iter().cycle().skip(t);
            loop {
                let chunk = stream.read(*sizes.next().unwrap()).unwrap();
                if chunk.is_empty() {
                    break;
                }
                chunks.push(chunk);
            }
            chunks
        }));
    }

    let mut covered = vec![false; data.len()];
    for handle in handles {
        for chunk in handle.join().unwrap() {
            // each read is atomic, so every chunk must be a contiguous slice
            // of the original payload
            let start = locate(&data, &chunk)
                .expect("read returned bytes that are not a contiguous source slice");
            for flag in &mut covered[start..start + chunk.len()] {
                assert!(!*flag, "byte delivered twice");
                *flag = true;
            }
        }
    }
    assert!(covered.iter().all(|&c| c), "bytes lost between readers");
    assert_eq!(stream.tell().unwrap(), data.len() as u64);
    stream.close().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: Close racing reads never corrupts state
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_close_races_with_reads() {
    let data = vec![9u8; 100_000];
    let stream = shared_reader(compress(&data));

    let reader = {
        let stream = stream.clone();
        thread::spawn(move || loop {
            match stream.read(4096) {
                Ok(chunk) if chunk.is_empty() => break,
                Ok(_) => continue,
                // a concurrent close surfaces as InvalidState, never a panic
                Err(e) => {
                    assert!(e.is_invalid_state());
                    break;
                }
            }
        })
    };
    let closer = {
        let stream = stream.clone();
        thread::spawn(move || stream.close().unwrap())
    };

    reader.join().unwrap();
    closer.join().unwrap();
    assert!(stream.closed());
    // close stays idempotent after the race
    stream.close().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: Concurrent closes and aborts are all quiet
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_concurrent_close_and_abort() {
    let stream = shared_reader(compress(b"tiny"));
    let mut handles = Vec::new();
    for i in 0..8 {
        let stream = stream.clone();
        handles.push(thread::spawn(move || {
            if i % 2 == 0 {
                stream.close().unwrap();
            } else {
                stream.abort().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(stream.closed());
}
