// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pareto archive: a bounded stack of fronts layered by dominance rank.

use alloc::vec::Vec;
use core::fmt;

use skyline_index::backends::{KdTree, Linear, QuadTree, RStarTree, RTree};
use skyline_index::{Coords, Distance, Error, Key, Point, Result, Scalar, SpatialBackend};

use crate::front::{Admission, FrontGeneric};

/// Capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 1000;

/// A capacity-bounded sequence of fronts `F0, F1, …` sharing one direction.
///
/// `F0` is the true frontier; every point of a deeper front is dominated by
/// at least one point of every shallower front. Admission cascades displaced
/// points downward, and overflow evicts the least crowded element of the
/// deepest front. Cloning is deep.
#[derive(Clone)]
pub struct ArchiveGeneric<T: Scalar, C: Coords<T>, V, B: SpatialBackend<T, C>> {
    fronts: Vec<FrontGeneric<T, C, V, B>>,
    minimise: Vec<bool>,
    capacity: usize,
}

/// Archive backed by a linear scan.
pub type LinearArchive<T, V> = ArchiveGeneric<T, Vec<T>, V, Linear<T, Vec<T>>>;

/// Archive backed by an R-tree.
pub type RTreeArchive<T, V> = ArchiveGeneric<T, Vec<T>, V, RTree<T, Vec<T>>>;

/// Archive backed by an R*-tree.
pub type RStarArchive<T, V> = ArchiveGeneric<T, Vec<T>, V, RStarTree<T, Vec<T>>>;

/// Archive backed by a kd-tree.
pub type KdTreeArchive<T, V> = ArchiveGeneric<T, Vec<T>, V, KdTree<T, Vec<T>>>;

/// Archive backed by a quadtree.
pub type QuadTreeArchive<T, V> = ArchiveGeneric<T, Vec<T>, V, QuadTree<T, Vec<T>>>;

/// Default archive flavour.
pub type Archive<T, V> = RTreeArchive<T, V>;

impl<T, C, V, B> ArchiveGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    /// Archive minimising every axis, with the default capacity.
    pub fn new(dimensions: usize) -> Self {
        Self::with_capacity(dimensions, DEFAULT_CAPACITY)
    }

    /// Archive minimising every axis.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self::with_direction(&alloc::vec![true; dimensions], capacity)
    }

    /// Archive with a per-axis direction; `true` minimises that axis.
    pub fn with_direction(direction: &[bool], capacity: usize) -> Self {
        Self {
            fronts: Vec::new(),
            minimise: direction.to_vec(),
            capacity,
        }
    }

    /// Per-axis direction vector.
    #[inline]
    pub fn direction(&self) -> &[bool] {
        &self.minimise
    }

    /// Number of objectives.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.minimise.len()
    }

    /// Soft element bound enforced after every admission.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total elements across all fronts.
    pub fn len(&self) -> usize {
        self.fronts.iter().map(FrontGeneric::len).sum()
    }

    /// Whether the archive stores nothing.
    pub fn is_empty(&self) -> bool {
        self.fronts.iter().all(FrontGeneric::is_empty)
    }

    /// Number of fronts currently layered.
    pub fn depth(&self) -> usize {
        self.fronts.len()
    }

    /// Front at a given rank.
    pub fn front(&self, rank: usize) -> Option<&FrontGeneric<T, C, V, B>> {
        self.fronts.get(rank)
    }

    /// All fronts, shallowest first.
    pub fn fronts(&self) -> &[FrontGeneric<T, C, V, B>] {
        &self.fronts
    }

    /// Rank of the front holding an element at exactly `point`.
    pub fn rank_of(&self, point: &Point<T, C>) -> Option<usize> {
        self.fronts.iter().position(|f| f.contains(point))
    }

    /// Union view over all fronts as `(rank, point, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Point<T, C>, &V)> + '_ {
        self.fronts.iter().enumerate().flat_map(|(rank, front)| {
            front.iter().map(move |(_, point, value)| (rank, point, value))
        })
    }

    /// Whether the archive's frontier weakly dominates `p`.
    pub fn dominates(&self, p: &Point<T, C>) -> bool {
        self.fronts.first().map(|f| f.dominates(p)).unwrap_or(false)
    }

    /// Whether `p` weakly dominates a point of the archive's frontier.
    pub fn is_dominated_by(&self, p: &Point<T, C>) -> bool {
        self.fronts
            .first()
            .map(|f| f.is_dominated_by(p))
            .unwrap_or(false)
    }

    /// Componentwise best of the frontier.
    pub fn ideal(&self) -> Result<Point<T, C>> {
        self.fronts.first().ok_or(Error::EmptyContainer)?.ideal()
    }

    /// Componentwise worst of the frontier.
    pub fn nadir(&self) -> Result<Point<T, C>> {
        self.fronts.first().ok_or(Error::EmptyContainer)?.nadir()
    }

    /// Drop every element; direction and capacity stay.
    pub fn clear(&mut self) {
        self.fronts.clear();
    }
}

impl<T, C, V, B> ArchiveGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C> + Default,
{
    /// Admit a candidate. It enters the shallowest front that accepts it;
    /// displaced points cascade deeper, never shallower. If the archive then
    /// exceeds its capacity, the least crowded elements of the deepest front
    /// are evicted until it fits. Returns the rank the candidate entered at.
    pub fn insert(&mut self, point: Point<T, C>, value: V) -> Result<usize> {
        if self.capacity == 0 {
            return Err(Error::InvalidArgument("archive capacity must be at least 1"));
        }
        if point.dimensions() != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                actual: point.dimensions(),
            });
        }
        let rank = self.admit(0, point, value)?;
        self.enforce_capacity();
        Ok(rank)
    }

    fn admit(&mut self, start_rank: usize, point: Point<T, C>, value: V) -> Result<usize> {
        let mut rank = start_rank;
        let mut point = point;
        let mut value = value;
        loop {
            if rank == self.fronts.len() {
                self.fronts
                    .push(FrontGeneric::with_direction(&self.minimise));
            }
            match self.fronts[rank].insert(point, value)? {
                Admission::Inserted { displaced, .. } => {
                    for (p, v) in displaced {
                        self.admit(rank + 1, p, v)?;
                    }
                    return Ok(rank);
                }
                Admission::Rejected {
                    point: p, value: v, ..
                } => {
                    point = p;
                    value = v;
                    rank += 1;
                }
            }
        }
    }

    fn enforce_capacity(&mut self) {
        while self.len() > self.capacity {
            let Some(deepest) = self.fronts.last_mut() else {
                return;
            };
            match min_crowding_key(deepest) {
                Some(key) => {
                    deepest.erase(key);
                }
                None => return,
            }
            while self.fronts.last().map(|f| f.is_empty()).unwrap_or(false) {
                self.fronts.pop();
            }
        }
    }
}

/// The element with the smallest crowding distance, ties broken toward the
/// earliest-inserted element. Crowding distance is the NSGA-II sum of
/// normalised neighbour gaps per axis; extreme points count as infinitely
/// crowded-distant, and axes with zero spread contribute nothing.
fn min_crowding_key<T, C, V, B>(front: &FrontGeneric<T, C, V, B>) -> Option<Key>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    let elements: Vec<(Key, Point<T, C>)> =
        front.iter().map(|(key, p, _)| (key, p.clone())).collect();
    let n = elements.len();
    if n == 0 {
        return None;
    }
    let mut crowding = alloc::vec![T::Dist::zero(); n];
    for axis in 0..front.dimensions() {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            elements[a]
                .1
                .get(axis)
                .partial_cmp(&elements[b].1.get(axis))
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        let lo = elements[order[0]].1.get(axis).to_dist();
        let hi = elements[order[n - 1]].1.get(axis).to_dist();
        let range = hi - lo;
        if range <= T::Dist::zero() {
            continue;
        }
        crowding[order[0]] = T::Dist::infinity();
        crowding[order[n - 1]] = T::Dist::infinity();
        for k in 1..n - 1 {
            let prev = elements[order[k - 1]].1.get(axis).to_dist();
            let next = elements[order[k + 1]].1.get(axis).to_dist();
            crowding[order[k]] = crowding[order[k]] + (next - prev) / range;
        }
    }

    let mut best = 0usize;
    for i in 1..n {
        let better = match crowding[i].partial_cmp(&crowding[best]) {
            Some(core::cmp::Ordering::Less) => true,
            Some(core::cmp::Ordering::Greater) => false,
            _ => elements[i].0 < elements[best].0,
        };
        if better {
            best = i;
        }
    }
    Some(elements[best].0)
}

impl<T, C, V, B> fmt::Display for ArchiveGeneric<T, C, V, B>
where
    T: Scalar + fmt::Display,
    C: Coords<T>,
    V: fmt::Display,
    B: SpatialBackend<T, C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, point, value) in self.iter() {
            writeln!(f, "{rank} {point} {value}")?;
        }
        Ok(())
    }
}

impl<T, C, V, B> fmt::Debug for ArchiveGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveGeneric")
            .field("len", &self.len())
            .field("depth", &self.depth())
            .field("capacity", &self.capacity)
            .field("minimise", &self.minimise)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyline_index::DynPoint;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    fn front_points<B: SpatialBackend<f64, Vec<f64>>>(
        front: &FrontGeneric<f64, Vec<f64>, u32, B>,
    ) -> Vec<(f64, f64)> {
        let mut pts: Vec<(f64, f64)> = front
            .iter()
            .map(|(_, p, _)| (p.get(0), p.get(1)))
            .collect();
        pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        pts
    }

    fn assert_invariants<B: SpatialBackend<f64, Vec<f64>>>(
        archive: &ArchiveGeneric<f64, Vec<f64>, u32, B>,
    ) {
        assert!(archive.len() <= archive.capacity());
        let fronts = archive.fronts();
        for (rank, front) in fronts.iter().enumerate() {
            // internal non-dominance
            let points: Vec<DynPoint<f64>> = front.iter().map(|(_, p, _)| p.clone()).collect();
            for a in &points {
                for b in &points {
                    if a != b {
                        assert!(a.non_dominates(b, true));
                    }
                }
            }
            // every point of a deeper front is dominated by every shallower front
            for shallower in &fronts[..rank] {
                for p in &points {
                    assert!(shallower.dominates(p), "rank {rank} point {p} undominated");
                }
            }
        }
    }

    #[test]
    fn layered_admission_and_bounded_eviction() {
        let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 5);
        let points = [
            (1.0, 5.0),
            (2.0, 3.0),
            (3.0, 1.0),
            (4.0, 4.0),
            (5.0, 2.0),
            (2.0, 4.0),
            (3.0, 3.0),
        ];
        for (i, &(x, y)) in points.iter().enumerate() {
            archive.insert(p2(x, y), i as u32).unwrap();
            assert_invariants(&archive);
        }

        assert_eq!(archive.len(), 5);
        assert_eq!(archive.depth(), 2);
        assert_eq!(
            front_points(archive.front(0).unwrap()),
            alloc::vec![(1.0, 5.0), (2.0, 3.0), (3.0, 1.0)]
        );
        // (2,4) displaced (4,4) into a third front, which the capacity bound
        // then emptied; (3,3) was admitted and immediately evicted as the
        // least crowded element of the deepest front
        assert_eq!(
            front_points(archive.front(1).unwrap()),
            alloc::vec![(2.0, 4.0), (5.0, 2.0)]
        );

        // a point dominated by every layer opens (and loses) a tail front
        archive.insert(p2(6.0, 6.0), 7).unwrap();
        assert_eq!(archive.len(), 5);
        assert_eq!(archive.depth(), 2);
        assert!(!archive.iter().any(|(_, p, _)| *p == p2(6.0, 6.0)));
        assert_invariants(&archive);
    }

    #[test]
    fn displaced_points_cascade_deeper() {
        let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 100);
        archive.insert(p2(4.0, 4.0), 0).unwrap();
        archive.insert(p2(5.0, 5.0), 1).unwrap();
        assert_eq!(archive.rank_of(&p2(4.0, 4.0)), Some(0));
        assert_eq!(archive.rank_of(&p2(5.0, 5.0)), Some(1));
        // (3,3) dominates both: they each fall one rank
        assert_eq!(archive.insert(p2(3.0, 3.0), 2).unwrap(), 0);
        assert_eq!(archive.rank_of(&p2(3.0, 3.0)), Some(0));
        assert_eq!(archive.rank_of(&p2(4.0, 4.0)), Some(1));
        assert_eq!(archive.rank_of(&p2(5.0, 5.0)), Some(2));
        assert_invariants(&archive);
    }

    #[test]
    fn zero_capacity_is_an_invalid_argument() {
        let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 0);
        assert!(matches!(
            archive.insert(p2(1.0, 1.0), 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn random_workload_preserves_invariants() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(21);
        let mut archive: RStarArchive<f64, u32> = RStarArchive::with_capacity(2, 30);
        for i in 0..500u32 {
            let p = p2(rng.gen_range(0..25) as f64, rng.gen_range(0..25) as f64);
            archive.insert(p, i).unwrap();
        }
        assert!(archive.len() <= 30);
        // spot-check the invariants on the final state
        let fronts = archive.fronts();
        for (rank, front) in fronts.iter().enumerate() {
            let points: Vec<DynPoint<f64>> = front.iter().map(|(_, p, _)| p.clone()).collect();
            for a in &points {
                for b in &points {
                    if a != b {
                        assert!(a.non_dominates(b, true));
                    }
                }
                for shallower in &fronts[..rank] {
                    assert!(shallower.dominates(a));
                }
            }
        }
    }

    #[test]
    fn union_view_reports_ranks() {
        let mut archive: Archive<f64, u32> = Archive::with_capacity(2, 10);
        archive.insert(p2(1.0, 1.0), 0).unwrap();
        archive.insert(p2(2.0, 2.0), 1).unwrap();
        archive.insert(p2(3.0, 3.0), 2).unwrap();
        let ranks: Vec<usize> = archive.iter().map(|(rank, _, _)| rank).collect();
        assert_eq!(ranks, alloc::vec![0, 1, 2]);
        assert_eq!(archive.ideal().unwrap(), p2(1.0, 1.0));
        assert_eq!(archive.rank_of(&p2(9.0, 9.0)), None);
    }
}
