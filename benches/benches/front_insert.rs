// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use skyline_front::{Front, LinearFront};
use skyline_index::DynPoint;

fn gen_points(n: usize, dims: usize, seed: u64) -> Vec<DynPoint<f64>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let coords: Vec<f64> = (0..dims).map(|_| rng.gen::<f64>() * 100.0).collect();
            DynPoint::from_slice(&coords)
        })
        .collect()
}

fn bench_front_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_insert");
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 2, 3);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("rtree_n{n}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let mut front: Front<f64, u32> = Front::new(2);
                    for (i, p) in points.into_iter().enumerate() {
                        let _ = front.insert(p, i as u32);
                    }
                    black_box(front.len());
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("linear_n{n}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let mut front: LinearFront<f64, u32> = LinearFront::new(2);
                    for (i, p) in points.into_iter().enumerate() {
                        let _ = front.insert(p, i as u32);
                    }
                    black_box(front.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_hypervolume(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypervolume");
    for &dims in &[2usize, 3, 4] {
        let mut front: Front<f64, u32> = Front::new(dims);
        for (i, p) in gen_points(2_000, dims, 5).into_iter().enumerate() {
            let _ = front.insert(p, i as u32);
        }
        let reference = DynPoint::from_slice(&vec![101.0; dims]);
        let reference_alt = DynPoint::from_slice(&vec![102.0; dims]);
        group.bench_function(format!("exact_d{dims}_n{}", front.len()), |b| {
            // alternate references so every call misses the indicator cache
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let r = if flip { &reference } else { &reference_alt };
                let hv = front.hypervolume(black_box(r)).unwrap();
                black_box(hv);
            })
        });

        group.bench_function(format!("monte_carlo_d{dims}"), |b| {
            let mut rng = SmallRng::seed_from_u64(11);
            b.iter(|| {
                let (est, half) = front
                    .hypervolume_mc(&reference, 10_000, &mut rng)
                    .unwrap();
                black_box((est, half));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_front_insert, bench_hypervolume);
criterion_main!(benches);
