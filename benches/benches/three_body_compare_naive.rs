// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_dualtree::{PointSet, ThreeBody, ThreeBodyConfig, Tolerance, naive};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn gen_uniform(n: usize, dim: usize, scale: f64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(0xDEAD_BEEF_0BAD_CAFE);
    let coords = (0..n * dim).map(|_| rng.random::<f64>() * scale).collect();
    PointSet::new(dim, coords).unwrap()
}

fn bench_three_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("three_body");
    group.sample_size(10);
    for &n in &[100_usize, 300] {
        let points = gen_uniform(n, 3, 10.0);
        group.throughput(Throughput::Elements(n as u64));
        for &rel in &[0.01, 0.1] {
            let config = ThreeBodyConfig::new(1.0)
                .with_tolerance(Tolerance::relative(rel))
                .with_leaf_size(8);
            let tb = ThreeBody::new(points.clone(), config).unwrap();
            group.bench_function(format!("tree_rel{rel}_n{n}"), |b| {
                b.iter(|| black_box(tb.potentials().values[0]));
            });
        }
        group.bench_function(format!("naive_n{n}"), |b| {
            b.iter(|| black_box(naive::three_body(&points, 1.0)[0].value));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_three_body);
criterion_main!(benches);
