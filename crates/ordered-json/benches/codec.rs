//! Codec throughput benchmarks.
//!
//! ## Groups
//!
//! - `escape/*`: string escaping of ASCII, CJK and invalid UTF-8 input
//! - `encode/*`: record and value-tree encoding
//! - `decode/*`: untyped and record decoding
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench codec
//! cargo bench --bench codec -- "decode"  # specific group
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ordered_json::{decode, decode_into, encode, write_string_bytes, Marshal, Unmarshal};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Marshal, Unmarshal, Default, Clone)]
#[json(rename_all = "camelCase")]
struct Transfer {
    pub hash: String,
    pub block_index: u32,
    pub amount: i64,
    #[json(string)]
    pub fee: i64,
    pub script: Vec<u8>,
    #[json(omitempty)]
    pub memo: String,
}

fn transfers(count: usize) -> Vec<Transfer> {
    (0..count)
        .map(|i| Transfer {
            hash: format!("0x{:064x}", i * 7919),
            block_index: i as u32,
            amount: (i as i64) * 100_000_000,
            fee: 1_000_000 + i as i64,
            script: (0..40).map(|b| (b * i) as u8).collect(),
            memo: if i % 3 == 0 {
                "\u{4F60}\u{597D} <transfer>".to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

// =============================================================================
// Escaping
// =============================================================================

fn escape_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape");
    let inputs: [(&str, Vec<u8>); 3] = [
        ("ascii", "plain text with <tags> & quotes \"".repeat(64).into_bytes()),
        ("cjk", "\u{6D4B}\u{8BD5}\u{6570}\u{636E}".repeat(128).into_bytes()),
        ("invalid", b"ok\xff\xfe\xe6\xb5".repeat(128)),
    ];
    for (name, input) in &inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("bytes", name), input, |b, input| {
            let mut out = Vec::with_capacity(input.len() * 6);
            b.iter(|| {
                out.clear();
                write_string_bytes(&mut out, black_box(input), true);
                black_box(out.len())
            });
        });
    }
    group.finish();
}

// =============================================================================
// Encoding / decoding
// =============================================================================

fn encode_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for count in [1, 64, 1024] {
        let data = transfers(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("records", count), &data, |b, data| {
            b.iter(|| encode(black_box(data)).unwrap());
        });
    }
    let tree = decode(&encode(&transfers(64)).unwrap()).unwrap();
    group.bench_function("value_tree", |b| {
        b.iter(|| encode(black_box(&tree)).unwrap());
    });
    group.finish();
}

fn decode_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for count in [1, 64, 1024] {
        let bytes = encode(&transfers(count)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("value", count), &bytes, |b, bytes| {
            b.iter(|| decode(black_box(bytes)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("records", count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut out: Vec<Transfer> = Vec::new();
                decode_into(black_box(bytes), &mut out).unwrap();
                out
            });
        });
    }
    group.finish();
}

criterion_group!(benches, escape_benchmarks, encode_benchmarks, decode_benchmarks);
criterion_main!(benches);
