//! Chunk storage benchmarks.
//!
//! Measures the write path (pack + checksum + buffered file I/O), the
//! read path (mmap + framing + CRC verify + decode), and the full
//! roundtrip, across batch sizes.
//!
//! ```bash
//! cargo bench -p chunkhouse-storage
//! cargo bench -p chunkhouse-storage -- --save-baseline main
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use chunkhouse_core::XorChunk;
use chunkhouse_storage::{ChunkMeta, ChunkReader, ChunkRef, ChunkWriter};

fn test_metas(count: usize, payload_size: usize) -> Vec<ChunkMeta> {
    (0..count)
        .map(|i| {
            let payload: Vec<u8> = (0..payload_size).map(|b| ((b + i) % 251) as u8).collect();
            ChunkMeta::new(
                Box::new(XorChunk::from_bytes(&payload).unwrap()),
                i as i64 * 1000,
                i as i64 * 1000 + 999,
            )
        })
        .collect()
}

fn write_dir(count: usize, payload_size: usize) -> (TempDir, Vec<ChunkRef>) {
    let dir = TempDir::new().unwrap();
    let mut writer = ChunkWriter::new(dir.path(), 0).unwrap();
    let mut metas = test_metas(count, payload_size);
    writer.write_chunks(&mut metas).unwrap();
    writer.close().unwrap();
    let refs = metas.iter().map(|m| m.reference).collect();
    (dir, refs)
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_write");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let dir = TempDir::new().unwrap();
                let mut writer = ChunkWriter::new(dir.path(), 0).unwrap();
                let mut metas = test_metas(count, 256);
                writer.write_chunks(&mut metas).unwrap();
                writer.close().unwrap();
                black_box(metas);
            });
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_read");

    for count in [100, 1_000, 10_000] {
        let (dir, refs) = write_dir(count, 256);
        let reader = ChunkReader::open(dir.path(), None).unwrap();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &refs, |b, refs| {
            b.iter(|| {
                for &r in refs {
                    black_box(reader.chunk(r).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_roundtrip");

    for count in [100, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let dir = TempDir::new().unwrap();
                let mut writer = ChunkWriter::new(dir.path(), 0).unwrap();
                let mut metas = test_metas(count, 256);
                writer.write_chunks(&mut metas).unwrap();
                writer.close().unwrap();

                let reader = ChunkReader::open(dir.path(), None).unwrap();
                for meta in &metas {
                    black_box(reader.chunk(meta.reference).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_roundtrip);
criterion_main!(benches);
