//! Basic benchmarks for the `fixed_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use fixed_pool::FixedPool;
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

const ARENA_LEN: usize = 64 * 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("fixed_basic");

    let allocs_op = allocs.operation("build");
    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let mut arena = vec![0_u8; ARENA_LEN];

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    FixedPool::builder()
                        .step(nz!(64))
                        .build(black_box(&mut arena))
                        .unwrap(),
                ));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("alloc_free_pair");
    group.bench_function("alloc_free_pair", |b| {
        // The freed slot becomes the prediction hint, so every round of this
        // pair stays on the O(1) path.
        b.iter_custom(|iters| {
            let mut arena = vec![0_u8; ARENA_LEN];
            let mut pool = FixedPool::builder()
                .step(nz!(64))
                .build(&mut arena)
                .unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(pool.alloc().unwrap());
                pool.free(slot).unwrap();
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("alloc_scan_worst_case");
    group.bench_function("alloc_scan_worst_case", |b| {
        // Fill the pool, then free the highest and the lowest slot each
        // round. Reallocating the lowest slot consumes the hint, so the
        // second allocation must scan the full bitmap to reach the highest.
        b.iter_custom(|iters| {
            let mut arena = vec![0_u8; ARENA_LEN];
            let mut pool = FixedPool::builder()
                .step(nz!(64))
                .build(&mut arena)
                .unwrap();

            let mut first = None;
            let mut last = None;
            while let Some(slot) = pool.alloc() {
                first.get_or_insert(slot);
                last = Some(slot);
            }
            let (first, last) = (first.unwrap(), last.unwrap());

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                pool.free(last).unwrap();
                pool.free(first).unwrap();

                _ = black_box(pool.alloc().unwrap());
                _ = black_box(pool.alloc().unwrap());
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("fixed_slow");

    let allocs_op = allocs.operation("fill_after_clear");
    group.bench_function("fill_after_clear", |b| {
        b.iter_custom(|iters| {
            let mut arena = vec![0_u8; ARENA_LEN];
            let mut pool = FixedPool::builder()
                .step(nz!(64))
                .build(&mut arena)
                .unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                pool.clear();

                while let Some(slot) = pool.alloc() {
                    _ = black_box(slot);
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
