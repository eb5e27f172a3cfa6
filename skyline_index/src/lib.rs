// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=skyline_index --heading-base-level=0

//! Skyline Index: multi-dimensional point containers with interchangeable
//! spatial backends.
//!
//! Skyline Index stores `(point, value)` elements and answers point, range,
//! nearest-neighbour, and predicate queries. It is the storage layer under
//! `skyline_front`'s Pareto containers, but stands on its own as a small
//! d-dimensional point index.
//!
//! - [`Point`] is a value object over any [`Scalar`] with elementwise
//!   arithmetic and the Pareto dominance predicates.
//! - [`IndexGeneric`] wraps a pluggable [`SpatialBackend`]; pick one of the
//!   aliases [`RTreeIndex`], [`RStarIndex`], [`KdTreeIndex`],
//!   [`QuadTreeIndex`], or [`LinearIndex`].
//! - Queries return lazy iterators that borrow the index; the borrow checker
//!   rules out mutation while one is live.
//!
//! # Example
//!
//! ```rust
//! use skyline_index::{DynPoint, HyperBox, RTreeIndex};
//!
//! let mut idx: RTreeIndex<f64, u32> = RTreeIndex::new();
//! idx.insert(DynPoint::from_slice(&[1.0, 5.0]), 10)?;
//! idx.insert(DynPoint::from_slice(&[2.0, 3.0]), 20)?;
//! idx.insert(DynPoint::from_slice(&[3.0, 1.0]), 30)?;
//!
//! // Two nearest neighbours of the origin, nearest first.
//! let near: Vec<u32> = idx
//!     .nearest(&DynPoint::from_slice(&[0.0, 0.0]), 2)?
//!     .map(|(_, _, v, _)| *v)
//!     .collect();
//! assert_eq!(near, vec![30, 20]);
//!
//! // Everything inside a closed box.
//! let query = HyperBox::new(
//!     DynPoint::from_slice(&[0.0, 0.0]),
//!     DynPoint::from_slice(&[3.0, 3.0]),
//! );
//! assert_eq!(idx.range(&query)?.count(), 2);
//! # Ok::<(), skyline_index::Error>(())
//! ```
//!
//! ## Choosing a backend
//!
//! - [`LinearIndex`]: simplest and smallest, linear scans. Good for tiny
//!   containers, and the oracle the tree backends are tested against.
//! - [`RTreeIndex`]: balanced bounding-box tree with quadratic splits; the
//!   default general-purpose choice.
//! - [`RStarIndex`]: R-tree variant with forced reinsertion and
//!   margin-driven splits; better box quality under heavy mutation.
//! - [`KdTreeIndex`]: binary space partitioning; cheap builds, tombstoned
//!   erase with periodic rebuilds.
//! - [`QuadTreeIndex`]: 2^d-way subdivision; shines in low dimensions.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Debug builds
//! may assert.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod error;
pub mod index;
pub mod point;
pub mod query;
pub mod types;

pub use backend::SpatialBackend;
pub use backends::{KdTree, Linear, QuadTree, RStarTree, RTree};
pub use error::{Error, Result};
pub use index::{
    IndexGeneric, KdTreeIndex, Key, LinearIndex, Nearest, QuadTreeIndex, RStarIndex, RTreeIndex,
};
pub use point::{Coords, Direction, DynPoint, FixedPoint, Point};
pub use query::{Filter, HyperBox, Predicate};
pub use types::{Distance, Scalar};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn insert_query_erase_round_trip() {
        let mut idx: RTreeIndex<f64, u32> = RTreeIndex::new();
        let key = idx.insert(DynPoint::from_slice(&[1.0, 2.0]), 1).unwrap();
        idx.insert(DynPoint::from_slice(&[4.0, 4.0]), 2).unwrap();

        let hits: Vec<u32> = idx
            .range(&HyperBox::new(
                DynPoint::from_slice(&[0.0, 0.0]),
                DynPoint::from_slice(&[2.0, 2.0]),
            ))
            .unwrap()
            .map(|(_, _, v)| *v)
            .collect();
        assert_eq!(hits, alloc::vec![1]);

        assert!(idx.erase(key));
        assert!(!idx.contains(&DynPoint::from_slice(&[1.0, 2.0])));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn fixed_dimension_storage_works_end_to_end() {
        use crate::backends::Linear;
        type P3 = FixedPoint<f64, 3>;
        let mut idx: IndexGeneric<f64, [f64; 3], i8, Linear<f64, [f64; 3]>> =
            IndexGeneric::new();
        idx.insert(P3::from_slice(&[1.0, 2.0, 3.0]), 1).unwrap();
        idx.insert(P3::from_slice(&[2.0, 2.0, 2.0]), 2).unwrap();
        let near: Vec<i8> = idx
            .nearest(&P3::from_slice(&[0.0, 0.0, 0.0]), 1)
            .unwrap()
            .map(|(_, _, v, _)| *v)
            .collect();
        assert_eq!(near, alloc::vec![2]);
    }
}
