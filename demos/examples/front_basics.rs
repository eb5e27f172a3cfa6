// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Front basics.
//!
//! Build a small bi-objective front, watch dominated candidates bounce off,
//! and read a few indicators.
//!
//! Run:
//! - `cargo run -p skyline_demos --example front_basics`

use skyline_front::{Admission, Front};
use skyline_index::DynPoint;

fn p(x: f64, y: f64) -> DynPoint<f64> {
    DynPoint::from_slice(&[x, y])
}

fn main() {
    let mut front: Front<f64, &str> = Front::new(2);
    for (point, name) in [
        (p(1.0, 5.0), "cheap-but-slow"),
        (p(2.0, 3.0), "balanced"),
        (p(3.0, 1.0), "fast-but-pricey"),
    ] {
        front.insert(point, name).unwrap();
    }

    // A dominated candidate is rejected and names its blocker.
    match front.insert(p(4.0, 4.0), "worse-everywhere").unwrap() {
        Admission::Rejected { by, .. } => println!("(4, 4) rejected by {by}"),
        Admission::Inserted { .. } => unreachable!(),
    }

    // A dominating candidate displaces what it beats.
    match front.insert(p(2.0, 2.0), "strictly-better").unwrap() {
        Admission::Inserted { displaced, .. } => {
            for (point, name) in &displaced {
                println!("{point} ({name}) displaced");
            }
        }
        Admission::Rejected { .. } => unreachable!(),
    }

    println!("front:\n{front}");
    println!("ideal: {}", front.ideal().unwrap());
    println!("nadir: {}", front.nadir().unwrap());

    let reference = p(5.0, 6.0);
    println!("hypervolume to {reference}: {}", front.hypervolume(&reference).unwrap());
    assert_eq!(front.hypervolume(&reference).unwrap(), 15.0);

    let stats = front.uniformity().unwrap();
    println!(
        "nearest-neighbour spacing: min {:.3}, mean {:.3}, std-dev {:.3}",
        stats.min, stats.mean, stats.std_dev
    );
}
