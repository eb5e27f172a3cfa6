// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal index usage: insert points, run a range and a nearest query.
//!
//! Run:
//! - `cargo run -p skyline_index --example basic_index`

use skyline_index::{DynPoint, HyperBox, RTreeIndex};

fn main() {
    let mut idx: RTreeIndex<f64, &str> = RTreeIndex::new();
    idx.insert(DynPoint::from_slice(&[1.0, 5.0]), "a").unwrap();
    idx.insert(DynPoint::from_slice(&[2.0, 3.0]), "b").unwrap();
    idx.insert(DynPoint::from_slice(&[3.0, 1.0]), "c").unwrap();
    idx.insert(DynPoint::from_slice(&[4.0, 4.0]), "d").unwrap();

    let query = HyperBox::new(
        DynPoint::from_slice(&[0.0, 0.0]),
        DynPoint::from_slice(&[3.0, 3.0]),
    );
    println!("in [(0,0),(3,3)]:");
    for (_, point, value) in idx.range(&query).unwrap() {
        println!("  {point} {value}");
    }

    println!("two nearest to (0,0):");
    for (_, point, value, dist) in idx.nearest(&DynPoint::from_slice(&[0.0, 0.0]), 2).unwrap() {
        println!("  {point} {value} (distance {dist:.3})");
    }
}
