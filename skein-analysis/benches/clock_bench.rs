//! Vector clock operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skein_analysis::clock::VectorClock;
use skein_core::types::RoutineId;

fn build_clock(routines: usize, seed: u32) -> VectorClock {
    let mut vc = VectorClock::new(routines);
    for i in 0..routines {
        let bumps = (seed.wrapping_mul(i as u32 + 1)) % 16;
        for _ in 0..bumps {
            vc.inc(RoutineId::from_index(i)).unwrap();
        }
    }
    vc
}

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock_sync");
    for &routines in &[8usize, 64, 512] {
        let a = build_clock(routines, 3);
        let b = build_clock(routines, 7);
        group.bench_function(format!("routines_{routines}"), |bencher| {
            bencher.iter(|| {
                let mut left = a.clone();
                left.sync(black_box(&b)).unwrap();
                left
            })
        });
    }
    group.finish();
}

fn bench_happens_before(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock_happens_before");
    for &routines in &[8usize, 64, 512] {
        let a = build_clock(routines, 3);
        let b = build_clock(routines, 7);
        group.bench_function(format!("routines_{routines}"), |bencher| {
            bencher.iter(|| black_box(&a).happens_before(black_box(&b)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sync, bench_happens_before);
criterion_main!(benches);
