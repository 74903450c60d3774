// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_kdtree::{KdTree, PointSet};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn gen_uniform(n: usize, dim: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..n * dim).map(|_| rng.random::<f64>()).collect();
    PointSet::new(dim, coords).unwrap()
}

fn gen_clustered(n: usize, dim: usize, clusters: usize, spread: f64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<f64> = (0..clusters * dim)
        .map(|_| rng.random_range(0.0..100.0))
        .collect();
    let mut coords = Vec::with_capacity(n * dim);
    for i in 0..n {
        let c = i % clusters;
        for d in 0..dim {
            coords.push(centers[c * dim + d] + (rng.random::<f64>() - 0.5) * spread);
        }
    }
    PointSet::new(dim, coords).unwrap()
}

fn bench_uniform(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_uniform");
    for &dim in &[2_usize, 3, 5] {
        for &n in &[1_000_usize, 10_000, 100_000] {
            let points = gen_uniform(n, dim, 0xCAFE_F00D_DEAD_BEEF);
            group.throughput(Throughput::Elements(n as u64));
            group.bench_function(format!("d{dim}_n{n}"), |b| {
                b.iter_batched(
                    || points.clone(),
                    |points| {
                        let tree: KdTree<()> = KdTree::build(points, 20).unwrap();
                        black_box(tree.num_nodes());
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_leaf_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_leaf_size");
    let points = gen_clustered(50_000, 3, 16, 2.0);
    group.throughput(Throughput::Elements(50_000));
    for &leaf in &[1_usize, 8, 20, 64] {
        group.bench_function(format!("clustered_leaf{leaf}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let tree: KdTree<()> = KdTree::build(points, leaf).unwrap();
                    black_box(tree.depth());
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_uniform, bench_leaf_size);
criterion_main!(benches);
