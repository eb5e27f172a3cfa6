// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Archive layering.
//!
//! Feed random candidates into a small bounded archive and print how they
//! settle into dominance ranks.
//!
//! Run:
//! - `cargo run -p skyline_demos --example archive_layers`

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use skyline_front::Archive;
use skyline_index::DynPoint;

fn main() {
    let mut rng = SmallRng::seed_from_u64(17);
    let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 12);

    for i in 0..200u32 {
        let point = DynPoint::from_slice(&[
            rng.gen_range(0..30) as f64,
            rng.gen_range(0..30) as f64,
        ]);
        archive.insert(point, i).unwrap();
    }

    println!(
        "archive holds {} of 200 candidates in {} fronts (capacity {})",
        archive.len(),
        archive.depth(),
        archive.capacity()
    );
    for (rank, front) in archive.fronts().iter().enumerate() {
        println!("front {rank}: {} points", front.len());
    }
    println!("{archive}");

    assert!(archive.len() <= archive.capacity());
    let ideal = archive.ideal().unwrap();
    println!("frontier ideal point: {ideal}");
}
