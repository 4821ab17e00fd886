//! Benchmarks for the worker pool.
//!
//! Benchmarks cover:
//! - Submit/wait throughput across worker counts
//! - Burst drain with a fixed pool vs an autoscaled pool
//! - Single-task round-trip latency through the result callback

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use rand::Rng;
use tidepool::{PoolConfig, WorkerPool};

// ============================================================================
// Helper Functions
// ============================================================================

/// Small CPU-bound task body.
fn busy_work(units: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..units {
        acc = acc.wrapping_add(black_box(i));
    }
    acc
}

// ============================================================================
// Throughput Benchmarks
// ============================================================================

fn bench_submit_wait_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_wait_throughput");
    const TASKS: u64 = 1_000;

    for workers in [1, 2, num_cpus::get().max(4)] {
        group.throughput(Throughput::Elements(TASKS));
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                let pool = WorkerPool::<u64>::new(workers, PoolConfig::new())
                    .expect("Failed to create pool");
                b.iter(|| {
                    for n in 0..TASKS {
                        pool.submit(move || Ok(black_box(n))).unwrap();
                    }
                    pool.wait();
                });
                pool.release();
            },
        );
    }
    group.finish();
}

// ============================================================================
// Scenario Benchmarks
// ============================================================================

fn bench_burst_drain_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst_drain");
    const TASKS: usize = 500;

    // Pre-draw jittered task sizes so every strategy sees the same load.
    let mut rng = rand::rng();
    let units: Arc<Vec<u64>> = Arc::new(
        (0..TASKS)
            .map(|_| rng.random_range(500..1500))
            .collect(),
    );

    group.throughput(Throughput::Elements(TASKS as u64));

    group.bench_function("fixed_8", |b| {
        let pool = WorkerPool::<u64>::new(8, PoolConfig::new()).expect("Failed to create pool");
        b.iter(|| {
            for i in 0..TASKS {
                let units = Arc::clone(&units);
                pool.submit(move || Ok(busy_work(units[i]))).unwrap();
            }
            pool.wait();
        });
        pool.release();
    });

    group.bench_function("autoscaled_1_to_8", |b| {
        let pool = WorkerPool::<u64>::new(
            8,
            PoolConfig::new()
                .with_min_workers(1)
                .with_adjust_interval(Duration::from_millis(5)),
        )
        .expect("Failed to create pool");
        b.iter(|| {
            for i in 0..TASKS {
                let units = Arc::clone(&units);
                pool.submit(move || Ok(busy_work(units[i]))).unwrap();
            }
            pool.wait();
        });
        pool.release();
    });

    group.finish();
}

// ============================================================================
// Latency Benchmarks
// ============================================================================

fn bench_submit_to_callback_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_roundtrip");

    group.bench_function("submit_to_callback", |b| {
        let (done_tx, done_rx) = unbounded();
        let pool = WorkerPool::new(
            2,
            PoolConfig::new().with_result_callback(move |n: u64| {
                let _ = done_tx.send(n);
            }),
        )
        .expect("Failed to create pool");

        b.iter(|| {
            pool.submit(|| Ok(1)).unwrap();
            black_box(done_rx.recv().unwrap());
        });
        pool.release();
    });

    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(throughput_benches, bench_submit_wait_throughput);
criterion_group!(scenario_benches, bench_burst_drain_strategies);
criterion_group!(latency_benches, bench_submit_to_callback_roundtrip);

criterion_main!(throughput_benches, scenario_benches, latency_benches);
