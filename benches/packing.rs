//! Packed-array and block-codec benchmarks
//!
//! Run with: cargo bench --bench packing

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io::Cursor;

use intpack::{
    BlockPackedReaderIterator, BlockPackedWriter, Mutable, Packed64, Reader, VERSION_CURRENT,
    mutable_for,
};

const VALUE_COUNT: usize = 1 << 20;

fn build_packed(bits_per_value: u32) -> Packed64 {
    let mut arr = Packed64::new(VALUE_COUNT, bits_per_value);
    let mask = if bits_per_value == 64 {
        u64::MAX
    } else {
        (1u64 << bits_per_value) - 1
    };
    for i in 0..VALUE_COUNT {
        arr.set(i, (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) & mask);
    }
    arr
}

fn bench_random_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed64_get");
    for bpv in [3u32, 7, 12, 20, 64] {
        let arr = build_packed(bpv);
        group.throughput(Throughput::Elements(VALUE_COUNT as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bpv), &arr, |b, arr| {
            b.iter(|| {
                let mut sum = 0u64;
                for i in 0..VALUE_COUNT {
                    sum = sum.wrapping_add(arr.get(black_box(i)));
                }
                sum
            })
        });
    }
    group.finish();
}

fn bench_bulk_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed64_get_bulk");
    for bpv in [3u32, 7, 12, 20] {
        let arr = build_packed(bpv);
        let mut dest = vec![0u64; VALUE_COUNT];
        group.throughput(Throughput::Elements(VALUE_COUNT as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bpv), &arr, |b, arr| {
            b.iter(|| {
                let mut read = 0;
                while read < VALUE_COUNT {
                    read += arr.get_bulk(read, black_box(&mut dest[read..]));
                }
                read
            })
        });
    }
    group.finish();
}

fn bench_factory_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");
    for bpv in [8u32, 13, 32] {
        group.throughput(Throughput::Elements(VALUE_COUNT as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bpv), &bpv, |b, &bpv| {
            let mut arr = mutable_for(VALUE_COUNT, bpv);
            b.iter(|| arr.fill(0, VALUE_COUNT, black_box(42)))
        });
    }
    group.finish();
}

fn bench_block_stream(c: &mut Criterion) {
    let mut writer = BlockPackedWriter::new(Vec::new(), 128);
    for i in 0..VALUE_COUNT {
        writer.add(1_000_000 + i as i64).unwrap();
    }
    let encoded = writer.finish().unwrap();

    let mut group = c.benchmark_group("block_packed");
    group.throughput(Throughput::Elements(VALUE_COUNT as u64));
    group.bench_function("next_values", |b| {
        b.iter(|| {
            let mut it = BlockPackedReaderIterator::new(
                Cursor::new(encoded.as_slice()),
                VERSION_CURRENT,
                128,
                VALUE_COUNT as u64,
            );
            let mut sum = 0i64;
            while it.ord() < VALUE_COUNT as u64 {
                for &v in it.next_values(128).unwrap() {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        })
    });
    group.bench_function("skip_to_end", |b| {
        b.iter(|| {
            let mut it = BlockPackedReaderIterator::new(
                Cursor::new(encoded.as_slice()),
                VERSION_CURRENT,
                128,
                VALUE_COUNT as u64,
            );
            it.skip(VALUE_COUNT as u64 - 1).unwrap();
            it.next().unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_random_access,
    bench_bulk_decode,
    bench_factory_fill,
    bench_block_stream
);
criterion_main!(benches);
