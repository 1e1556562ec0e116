//! Criterion benchmarks for the compressed stream engines.
//!
//! Run with:
//!   cargo bench --bench stream
//!
//! Measures streaming write and read throughput over an in-memory raw stream
//! with the zlib DeflateCodec, across a few logical chunk sizes.

use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use compstream::{
    shared, CompressedInputStream, CompressedOutputStream, DeflateCodec, ReaderStream,
    WriterStream,
};

fn payload(len: usize) -> Vec<u8> {
    // mildly compressible: repeated text with a counter woven in
    let mut data = Vec::with_capacity(len);
    let mut i = 0u64;
    while data.len() < len {
        data.extend_from_slice(b"The quick brown fox jumps over the lazy dog. ");
        data.extend_from_slice(&i.to_le_bytes());
        i += 1;
    }
    data.truncate(len);
    data
}

fn compress_all(data: &[u8], chunk: usize) -> Vec<u8> {
    let sink = shared(WriterStream::new(Vec::new()));
    let mut out =
        CompressedOutputStream::new(Box::new(DeflateCodec::zlib()), sink.clone()).unwrap();
    for piece in data.chunks(chunk) {
        out.write(piece).unwrap();
    }
    out.close().unwrap();
    let bytes = sink.lock().unwrap().get_ref().clone();
    bytes
}

fn bench_stream_write_read(c: &mut Criterion) {
    let data = payload(4 * 1024 * 1024);
    let mut group = c.benchmark_group("stream_write_read");

    for &chunk in &[4_096usize, 65_536, 1_048_576] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("write", chunk), &chunk, |b, &chunk| {
            b.iter(|| compress_all(&data, chunk))
        });

        let compressed = compress_all(&data, chunk);
        group.bench_with_input(
            BenchmarkId::new("read", chunk),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    let raw = shared(ReaderStream::new(Cursor::new(compressed.clone())));
                    let mut input =
                        CompressedInputStream::new(Box::new(DeflateCodec::zlib()), raw).unwrap();
                    let mut total = 0usize;
                    loop {
                        let piece = input.read(chunk).unwrap();
                        if piece.is_empty() {
                            break;
                        }
                        total += piece.len();
                    }
                    total
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stream_write_read);
criterion_main!(benches);
