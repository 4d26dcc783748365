#[macro_use]
extern crate criterion;
extern crate bfuse;
extern crate rand;

use bfuse::{BinaryFuse8, BinaryFuse8Ref, Filter};
use criterion::{BenchmarkId, Criterion, Throughput};
use rand::Rng;

const SAMPLE_SIZE: u32 = 500_000;

fn sample_filter() -> BinaryFuse8 {
    let mut rng = rand::thread_rng();
    let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();
    let mut filter = BinaryFuse8::allocate(keys.len()).unwrap();
    filter.populate(&keys).unwrap();
    filter
}

/// Flat encoding against the serde-bincode encoding of the same filter.
fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinaryFuse8/encode");
    let group = group.sample_size(10);

    let filter = sample_filter();
    let config = bincode::config::standard();
    group.throughput(Throughput::Bytes(filter.size_in_bytes() as u64));

    let mut out = vec![0u8; filter.serialized_len()];
    group.bench_function(BenchmarkId::new("write-to", SAMPLE_SIZE), |b| {
        b.iter(|| filter.write_to(&mut out).unwrap());
    });
    group.bench_function(BenchmarkId::new("serde", SAMPLE_SIZE), |b| {
        b.iter(|| bincode::serde::encode_to_vec(&filter, config).unwrap());
    });
}

fn decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinaryFuse8/decode");
    let group = group.sample_size(10);

    let filter = sample_filter();
    let config = bincode::config::standard();
    let flat = filter.to_bytes();
    let encoded = bincode::serde::encode_to_vec(&filter, config).unwrap();
    group.throughput(Throughput::Bytes(flat.len() as u64));

    group.bench_with_input(BenchmarkId::new("view", SAMPLE_SIZE), &flat, |b, flat| {
        b.iter(|| BinaryFuse8Ref::from_bytes(flat).unwrap());
    });
    group.bench_with_input(BenchmarkId::new("copy", SAMPLE_SIZE), &flat, |b, flat| {
        b.iter(|| BinaryFuse8::from_bytes(flat).unwrap());
    });
    group.bench_with_input(
        BenchmarkId::new("serde", SAMPLE_SIZE),
        &encoded,
        |b, encoded| {
            b.iter(|| {
                bincode::serde::decode_from_slice::<BinaryFuse8, _>(encoded, config).unwrap()
            });
        },
    );
}

fn contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinaryFuse8/contains");

    let filter = sample_filter();
    let flat = filter.to_bytes();
    let view = BinaryFuse8Ref::from_bytes(&flat).unwrap();
    let probes: Vec<u64> = {
        let mut rng = rand::thread_rng();
        (0..1_024).map(|_| rng.gen()).collect()
    };
    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("owned", |b| {
        b.iter(|| probes.iter().filter(|key| filter.contains(key)).count());
    });
    group.bench_function("view", |b| {
        b.iter(|| probes.iter().filter(|key| view.contains(key)).count());
    });
}

criterion_group!(bfuse8, encode, decode, contains);
criterion_main!(bfuse8);
