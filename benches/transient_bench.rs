//! Benchmark for TransientVector.
//!
//! Compares batch operations through a transient against the persistent
//! equivalents and standard library `Vec`.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use flexvec::{PersistentVector, TransientVector};
use std::hint::black_box;

fn benchmark_transient_push_back(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_push_back");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientVector::<i32>::new();
                    for index in 0..size {
                        transient.push_back(black_box(index));
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut vector = PersistentVector::<i32>::new();
                    for index in 0..size {
                        vector = vector.push_back(black_box(index));
                    }
                    black_box(vector)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = Vec::new();
                for index in 0..size {
                    vector.push(black_box(index));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

fn benchmark_transient_update(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_update");

    for size in [1_000, 10_000, 100_000] {
        let vector: PersistentVector<usize> = (0..size).collect();

        group.bench_with_input(
            BenchmarkId::new("TransientVector", size),
            &vector,
            |bencher, vector| {
                bencher.iter_batched(
                    || vector.transient(),
                    |mut transient| {
                        for index in 0..vector.len() {
                            transient.update(black_box(index), 0);
                        }
                        black_box(transient.persistent())
                    },
                    BatchSize::SmallInput,
                );
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &vector,
            |bencher, vector| {
                bencher.iter(|| {
                    let mut current = vector.clone();
                    for index in 0..vector.len() {
                        current = current.update(black_box(index), 0).unwrap();
                    }
                    black_box(current)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_transient_push_back,
    benchmark_transient_update
);
criterion_main!(benches);
