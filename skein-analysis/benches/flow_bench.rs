//! Max-flow benchmark: the bipartite network the wait-group and
//! unlock-before-lock analyses build.

use criterion::{criterion_group, criterion_main, Criterion};
use skein_analysis::detectors::flow::BipartiteFlow;

fn bench_dense_bipartite(c: &mut Criterion) {
    let mut group = c.benchmark_group("bipartite_flow");
    for &n in &[8usize, 32, 128] {
        group.bench_function(format!("dense_{n}x{n}"), |bencher| {
            bencher.iter(|| {
                let capacities = vec![1u32; n];
                let mut network = BipartiteFlow::new(n, &capacities);
                for demand in 0..n {
                    for supply in 0..n {
                        network.connect(demand, supply);
                    }
                }
                network.run().unwrap().max_flow
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dense_bipartite);
criterion_main!(benches);
