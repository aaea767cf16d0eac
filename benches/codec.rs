//! Benchmarks for zflate compression and decompression throughput.
//!
//! Tests various data patterns, sizes and levels, with flate2 as a baseline.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use zflate::{compress, decompress, CompressionLevel, DeflateConfig, Strategy, Wrap};

/// Generate random (incompressible) data
fn generate_random_data(size: usize) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut data = Vec::with_capacity(size);
    let mut hasher = DefaultHasher::new();

    for i in 0..size {
        i.hash(&mut hasher);
        data.push((hasher.finish() & 0xFF) as u8);
    }
    data
}

/// Generate repetitive (highly compressible) data
fn generate_repetitive_data(size: usize) -> Vec<u8> {
    b"ABCDABCDABCDABCD".iter().cycle().take(size).copied().collect()
}

/// Generate log-like text (moderate compression, long matches)
fn generate_text_data(size: usize) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let levels = ["INFO", "DEBUG", "WARN", "TRACE"];
    let modules = ["deflate::block", "inflate::fast", "session", "huffman::encoder"];
    let mut data = Vec::with_capacity(size + 128);
    let mut hasher = DefaultHasher::new();
    let mut line = 0u64;
    while data.len() < size {
        line.hash(&mut hasher);
        let h = hasher.finish();
        let entry = format!(
            "2024-05-{:02}T12:{:02}:{:02} {} {}: request {} took {}us\n",
            h % 28 + 1,
            (h >> 8) % 60,
            (h >> 16) % 60,
            levels[(h >> 24) as usize % levels.len()],
            modules[(h >> 32) as usize % modules.len()],
            h >> 40,
            (h >> 48) % 5000
        );
        data.extend_from_slice(entry.as_bytes());
        line += 1;
    }
    data.truncate(size);
    data
}

fn zlib_with_flate2(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn bench_compression_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_levels");
    let size = 256 * 1024;
    let data = generate_text_data(size);

    group.throughput(Throughput::Bytes(size as u64));

    for level in [0u8, 1, 3, 6, 9] {
        group.bench_with_input(BenchmarkId::new("zflate", level), &data, |b, data| {
            b.iter(|| compress(data, CompressionLevel::from_level(level), Wrap::Zlib).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("flate2", level), &data, |b, data| {
            b.iter(|| zlib_with_flate2(data, level as u32));
        });
    }

    group.finish();
}

fn bench_data_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_patterns");
    let size = 256 * 1024;

    let inputs = [
        ("random", generate_random_data(size)),
        ("repetitive", generate_repetitive_data(size)),
        ("text", generate_text_data(size)),
    ];

    group.throughput(Throughput::Bytes(size as u64));

    for (name, data) in &inputs {
        group.bench_with_input(BenchmarkId::new("compress", name), data, |b, data| {
            b.iter(|| compress(data, CompressionLevel::Level6, Wrap::Raw).unwrap());
        });
        let compressed = compress(data, CompressionLevel::Level6, Wrap::Raw).unwrap();
        group.bench_with_input(BenchmarkId::new("decompress", name), &compressed, |b, compressed| {
            b.iter(|| decompress(compressed, Wrap::Raw).unwrap());
        });
    }

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    let size = 256 * 1024;
    let data = generate_text_data(size);

    group.throughput(Throughput::Bytes(size as u64));

    for (name, strategy) in [
        ("default", Strategy::Default),
        ("filtered", Strategy::Filtered),
        ("huffman_only", Strategy::HuffmanOnly),
        ("rle", Strategy::Rle),
        ("fixed", Strategy::Fixed),
    ] {
        let config = DeflateConfig { strategy, ..DeflateConfig::default() };
        group.bench_with_input(BenchmarkId::new("compress", name), &data, |b, data| {
            b.iter(|| zflate::compress_with(data, &config).unwrap());
        });
    }

    group.finish();
}

fn bench_decompress_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress_sizes");

    for size in [1024, 64 * 1024, 1024 * 1024] {
        let data = generate_text_data(size);
        let compressed = zlib_with_flate2(&data, 6);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("zflate", size), &compressed, |b, compressed| {
            b.iter(|| decompress(compressed, Wrap::Zlib).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("libdeflater", size), &compressed, |b, compressed| {
            let mut decompressor = libdeflater::Decompressor::new();
            let mut out = vec![0u8; size];
            b.iter(|| decompressor.zlib_decompress(compressed, &mut out).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compression_levels,
    bench_data_patterns,
    bench_strategies,
    bench_decompress_sizes,
);
criterion_main!(benches);
