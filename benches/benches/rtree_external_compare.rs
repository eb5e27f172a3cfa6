// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use skyline_index::{DynPoint, HyperBox, RTreeIndex};

use rstar::{RTree, AABB};

fn gen_points(n: usize, seed: u64) -> Vec<[f64; 2]> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| [rng.gen::<f64>() * 1000.0, rng.gen::<f64>() * 1000.0])
        .collect()
}

fn bench_rtree_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare");
    for &n in &[1_000usize, 10_000] {
        let raw = gen_points(n, 13);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("skyline_build_query_n{n}"), |b| {
            b.iter_batched(
                || {
                    raw.iter()
                        .enumerate()
                        .map(|(i, p)| (DynPoint::from_slice(p), i as u32))
                        .collect::<Vec<_>>()
                },
                |points| {
                    let idx: RTreeIndex<f64, u32> = RTreeIndex::bulk_load(points).unwrap();
                    let query = HyperBox::new(
                        DynPoint::from_slice(&[100.0, 100.0]),
                        DynPoint::from_slice(&[500.0, 500.0]),
                    );
                    let hits = idx.range(&query).unwrap().count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rstar_build_query_n{n}"), |b| {
            b.iter_batched(
                || raw.clone(),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let envelope = AABB::from_corners([100.0, 100.0], [500.0, 500.0]);
                    let hits = tree.locate_in_envelope(&envelope).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare);
criterion_main!(benches);
