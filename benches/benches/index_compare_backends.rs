// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use skyline_index::{
    DynPoint, HyperBox, IndexGeneric, KdTree, Linear, QuadTree, RStarTree, RTree, SpatialBackend,
};

fn gen_points(n: usize, seed: u64) -> Vec<(DynPoint<f64>, u32)> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let p = DynPoint::from_slice(&[
                rng.gen::<f64>() * 1000.0,
                rng.gen::<f64>() * 1000.0,
            ]);
            (p, i as u32)
        })
        .collect()
}

fn bench_backend<B>(c: &mut Criterion, name: &str)
where
    B: SpatialBackend<f64, Vec<f64>> + Default,
{
    let mut group = c.benchmark_group(format!("index_{name}"));
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 7);
        let query = HyperBox::new(
            DynPoint::from_slice(&[100.0, 100.0]),
            DynPoint::from_slice(&[400.0, 400.0]),
        );
        let origin = DynPoint::from_slice(&[500.0, 500.0]);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("insert_n{n}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let mut idx: IndexGeneric<f64, Vec<f64>, u32, B> = IndexGeneric::new();
                    for (p, v) in points {
                        let _ = idx.insert(p, v);
                    }
                    black_box(idx.len());
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("bulk_load_n{n}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let idx: IndexGeneric<f64, Vec<f64>, u32, B> =
                        IndexGeneric::bulk_load(points).unwrap();
                    black_box(idx.len());
                },
                BatchSize::SmallInput,
            )
        });

        let loaded: IndexGeneric<f64, Vec<f64>, u32, B> =
            IndexGeneric::bulk_load(points.clone()).unwrap();

        group.bench_function(format!("range_n{n}"), |b| {
            b.iter(|| {
                let hits = loaded.range(&query).unwrap().count();
                black_box(hits);
            })
        });

        group.bench_function(format!("nearest10_n{n}"), |b| {
            b.iter(|| {
                let found = loaded.nearest(&origin, 10).unwrap().count();
                black_box(found);
            })
        });
    }
    group.finish();
}

fn bench_index_compare_backends(c: &mut Criterion) {
    bench_backend::<Linear<f64>>(c, "linear");
    bench_backend::<RTree<f64>>(c, "rtree");
    bench_backend::<RStarTree<f64>>(c, "rstar");
    bench_backend::<KdTree<f64>>(c, "kdtree");
    bench_backend::<QuadTree<f64>>(c, "quadtree");
}

criterion_group!(benches, bench_index_compare_backends);
criterion_main!(benches);
