// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_dualtree::{Kde, KdeConfig, Kernel, PointSet, Tolerance, naive};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn gen_uniform(n: usize, dim: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..n * dim).map(|_| rng.random::<f64>()).collect();
    PointSet::new(dim, coords).unwrap()
}

fn bench_monochromatic(c: &mut Criterion) {
    let mut group = c.benchmark_group("kde_monochromatic");
    group.sample_size(10);
    for &n in &[1_000_usize, 5_000] {
        let points = gen_uniform(n, 3, 0xFACE_FEED_CAFE_BABE);
        group.throughput(Throughput::Elements(n as u64));
        for (name, kernel) in [("gaussian", Kernel::Gaussian), ("epanechnikov", Kernel::Epanechnikov)] {
            for &rel in &[0.01, 0.1] {
                let config = KdeConfig::new(0.1)
                    .with_kernel(kernel)
                    .with_tolerance(Tolerance::relative(rel));
                let kde = Kde::new(points.clone(), config).unwrap();
                group.bench_function(format!("tree_{name}_rel{rel}_n{n}"), |b| {
                    b.iter(|| black_box(kde.estimate_reference().values[0]));
                });
            }
            group.bench_function(format!("naive_{name}_n{n}"), |b| {
                b.iter(|| black_box(naive::kde(&points, None, &points, kernel, 0.1).unwrap()[0]));
            });
        }
    }
    group.finish();
}

fn bench_bichromatic(c: &mut Criterion) {
    let mut group = c.benchmark_group("kde_bichromatic");
    group.sample_size(10);
    let references = gen_uniform(20_000, 5, 0xBADC_F00D_1234_5678);
    let queries = gen_uniform(2_000, 5, 0x1234_5678_9ABC_DEF0);
    let config = KdeConfig::new(0.2).with_tolerance(Tolerance::relative(0.05));
    let kde = Kde::new(references, config).unwrap();
    group.throughput(Throughput::Elements(2_000));
    group.bench_function("tree_gaussian_d5", |b| {
        b.iter(|| black_box(kde.estimate(queries.clone()).unwrap().values[0]));
    });
    group.finish();
}

criterion_group!(benches, bench_monochromatic, bench_bichromatic);
criterion_main!(benches);
