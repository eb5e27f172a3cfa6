// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=skyline_front --heading-base-level=0

//! Skyline Front: Pareto fronts and bounded archives over `skyline_index`.
//!
//! A [`Front`] is a spatial container that keeps only mutually non-dominated
//! points under a per-axis optimisation direction. Inserting a dominated
//! candidate is rejected with the blocking point; inserting a dominating
//! candidate displaces what it beats. Fronts compute the usual quality
//! indicators (hypervolume, IGD and friends, ε, coverage), with exact
//! hypervolume up to three dimensions, the WFG recursion above, and a
//! Monte-Carlo estimator for wide fronts.
//!
//! An [`Archive`] layers fronts by dominance rank under a soft capacity:
//! points displaced from a front cascade one rank deeper, and overflow
//! evicts the least crowded element of the deepest front.
//!
//! # Example
//!
//! ```rust
//! use skyline_front::{Admission, Front};
//! use skyline_index::DynPoint;
//!
//! let p = |x: f64, y: f64| DynPoint::from_slice(&[x, y]);
//!
//! let mut front: Front<f64, &str> = Front::new(2);
//! front.insert(p(1.0, 5.0), "a")?;
//! front.insert(p(2.0, 3.0), "b")?;
//! front.insert(p(3.0, 1.0), "c")?;
//!
//! // (4,4) is dominated by (2,3) and bounces off.
//! assert!(matches!(
//!     front.insert(p(4.0, 4.0), "d")?,
//!     Admission::Rejected { .. }
//! ));
//!
//! // (2,2) beats (2,3) and takes its place.
//! match front.insert(p(2.0, 2.0), "e")? {
//!     Admission::Inserted { displaced, .. } => assert_eq!(displaced.len(), 1),
//!     Admission::Rejected { .. } => unreachable!(),
//! }
//!
//! assert_eq!(front.hypervolume(&p(5.0, 6.0))?, 15.0);
//! # Ok::<(), skyline_index::Error>(())
//! ```
//!
//! Both containers are generic over the spatial backend; the `RTree*`,
//! `RStar*`, `KdTree*`, `QuadTree*`, and `Linear*` aliases pick one.

#![no_std]

extern crate alloc;

pub mod archive;
pub mod front;
pub mod indicators;

pub use archive::{
    Archive, ArchiveGeneric, KdTreeArchive, LinearArchive, QuadTreeArchive, RStarArchive,
    RTreeArchive, DEFAULT_CAPACITY,
};
pub use front::{
    Admission, Front, FrontGeneric, KdTreeFront, LinearFront, QuadTreeFront, RStarFront,
    RTreeFront,
};
pub use indicators::DistanceStats;

#[cfg(test)]
mod tests {
    use super::*;
    use skyline_index::DynPoint;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    #[test]
    fn front_and_archive_compose() {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(3.0, 1.0), 1).unwrap();

        let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 4);
        for (_, p, v) in front.iter() {
            archive.insert(p.clone(), *v).unwrap();
        }
        archive.insert(p2(4.0, 4.0), 2).unwrap();
        assert_eq!(archive.depth(), 2);
        assert_eq!(archive.rank_of(&p2(4.0, 4.0)), Some(1));
    }
}
