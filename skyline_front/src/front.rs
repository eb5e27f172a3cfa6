// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pareto front: a spatial container that keeps only non-dominated points.

use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::str::FromStr;

use skyline_index::backends::{KdTree, Linear, QuadTree, RStarTree, RTree};
use skyline_index::{
    Coords, Error, Filter, HyperBox, IndexGeneric, Key, Nearest, Point, Result, Scalar,
    SpatialBackend,
};

use crate::indicators::IndicatorCache;

/// Outcome of a front insertion.
pub enum Admission<T: Scalar, C: Coords<T>, V> {
    /// The point joined the front; `displaced` holds the elements it pushed
    /// out, in slot order.
    Inserted {
        /// Handle of the new element.
        key: Key,
        /// Elements the new point dominated, now removed.
        displaced: Vec<(Point<T, C>, V)>,
    },
    /// The point is dominated by `by`; the element is handed back untouched.
    Rejected {
        /// The rejected point.
        point: Point<T, C>,
        /// The rejected value.
        value: V,
        /// An existing front point dominating the candidate.
        by: Point<T, C>,
    },
}

impl<T: Scalar, C: Coords<T>, V> Admission<T, C, V> {
    /// Whether the point was admitted.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Admission::Inserted { .. })
    }
}

/// A Pareto front over a spatial index and a per-axis direction vector.
///
/// Invariant: no stored point dominates another under the front's direction.
/// Inserts enforce it incrementally with two box queries. Cloning is deep.
#[derive(Clone)]
pub struct FrontGeneric<T: Scalar, C: Coords<T>, V, B: SpatialBackend<T, C>> {
    pub(crate) index: IndexGeneric<T, C, V, B>,
    pub(crate) minimise: Vec<bool>,
    pub(crate) cache: RefCell<IndicatorCache<T, C>>,
}

/// Front backed by a linear scan.
pub type LinearFront<T, V> = FrontGeneric<T, Vec<T>, V, Linear<T, Vec<T>>>;

/// Front backed by an R-tree.
pub type RTreeFront<T, V> = FrontGeneric<T, Vec<T>, V, RTree<T, Vec<T>>>;

/// Front backed by an R*-tree.
pub type RStarFront<T, V> = FrontGeneric<T, Vec<T>, V, RStarTree<T, Vec<T>>>;

/// Front backed by a kd-tree.
pub type KdTreeFront<T, V> = FrontGeneric<T, Vec<T>, V, KdTree<T, Vec<T>>>;

/// Front backed by a quadtree.
pub type QuadTreeFront<T, V> = FrontGeneric<T, Vec<T>, V, QuadTree<T, Vec<T>>>;

/// Default front flavour.
pub type Front<T, V> = RTreeFront<T, V>;

impl<T, C, V, B> FrontGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C> + Default,
{
    /// Front that minimises every axis.
    pub fn new(dimensions: usize) -> Self {
        Self::with_uniform_direction(dimensions, true)
    }

    /// Front with one broadcast direction for all axes.
    pub fn with_uniform_direction(dimensions: usize, minimise: bool) -> Self {
        Self::with_direction(&alloc::vec![minimise; dimensions])
    }

    /// Front with a per-axis direction; `true` means minimise that axis.
    pub fn with_direction(direction: &[bool]) -> Self {
        Self::with_backend(B::default(), direction)
    }

    /// Rebuild a front from its [`fmt::Display`] text form, one `point value`
    /// pair per line.
    pub fn parse_lines(text: &str, direction: &[bool]) -> Result<Self>
    where
        T: FromStr,
        V: FromStr,
    {
        let mut front = Self::with_direction(direction);
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let close = line
                .find(')')
                .ok_or(Error::InvalidArgument("front line needs a point literal"))?;
            let point: Point<T, C> = line[..=close].parse()?;
            let value: V = line[close + 1..]
                .trim()
                .parse()
                .map_err(|_| Error::InvalidArgument("malformed element value"))?;
            front.insert(point, value)?;
        }
        Ok(front)
    }
}

impl<T, C, V, B> FrontGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    /// Front around a pre-configured backend.
    pub fn with_backend(backend: B, direction: &[bool]) -> Self {
        if let Some(d) = C::STATIC_DIMENSIONS {
            debug_assert_eq!(direction.len(), d, "direction length must match dimension");
        }
        Self {
            index: IndexGeneric::with_backend(backend),
            minimise: direction.to_vec(),
            cache: RefCell::new(IndicatorCache::default()),
        }
    }

    /// Per-axis direction vector; `true` minimises the axis.
    #[inline]
    pub fn direction(&self) -> &[bool] {
        &self.minimise
    }

    /// Whether `axis` is minimised.
    #[inline]
    pub fn is_minimised(&self, axis: usize) -> bool {
        self.minimise[axis]
    }

    /// Number of objectives.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.minimise.len()
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the front is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Mutation counter of the underlying index.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.index.generation()
    }

    pub(crate) fn check_dims(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                actual,
            });
        }
        Ok(())
    }

    /// Closed box holding every point that could weakly dominate `p`.
    pub(crate) fn better_box(&self, p: &Point<T, C>) -> HyperBox<T, C> {
        let mut lo = p.clone();
        let mut hi = p.clone();
        for (axis, &minimise) in self.minimise.iter().enumerate() {
            if minimise {
                lo.set(axis, T::min_value());
            } else {
                hi.set(axis, T::max_value());
            }
        }
        HyperBox::new(lo, hi)
    }

    /// Closed box holding every point that `p` could weakly dominate.
    pub(crate) fn worse_box(&self, p: &Point<T, C>) -> HyperBox<T, C> {
        let mut lo = p.clone();
        let mut hi = p.clone();
        for (axis, &minimise) in self.minimise.iter().enumerate() {
            if minimise {
                hi.set(axis, T::max_value());
            } else {
                lo.set(axis, T::min_value());
            }
        }
        HyperBox::new(lo, hi)
    }

    /// Insert a candidate. Dominated candidates come back in
    /// [`Admission::Rejected`] together with a blocking point; admitted ones
    /// report the elements they displaced.
    pub fn insert(&mut self, point: Point<T, C>, value: V) -> Result<Admission<T, C, V>> {
        self.check_dims(point.dimensions())?;

        let blocking = self
            .index
            .range(&self.better_box(&point))?
            .find(|(_, candidate, _)| candidate.dominates(&point, self.minimise.as_slice()))
            .map(|(_, candidate, _)| candidate.clone());
        if let Some(by) = blocking {
            return Ok(Admission::Rejected { point, value, by });
        }

        let doomed: Vec<Key> = self
            .index
            .range(&self.worse_box(&point))?
            .filter(|(_, candidate, _)| point.dominates(candidate, self.minimise.as_slice()))
            .map(|(key, _, _)| key)
            .collect();
        let mut displaced = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Some(element) = self.index.take(key) {
                displaced.push(element);
            }
        }

        let key = self.index.insert(point, value)?;
        Ok(Admission::Inserted { key, displaced })
    }

    /// Whether some front point weakly dominates `p`.
    pub fn dominates(&self, p: &Point<T, C>) -> bool {
        self.index
            .range(&self.better_box(p))
            .map(|mut hits| {
                hits.any(|(_, candidate, _)| candidate.dominates(p, self.minimise.as_slice()))
            })
            .unwrap_or(false)
    }

    /// Whether `p` weakly dominates some front point.
    pub fn is_dominated_by(&self, p: &Point<T, C>) -> bool {
        self.index
            .range(&self.worse_box(p))
            .map(|mut hits| {
                hits.any(|(_, candidate, _)| p.dominates(candidate, self.minimise.as_slice()))
            })
            .unwrap_or(false)
    }

    /// Whether `p` neither dominates nor is dominated by the front.
    pub fn non_dominated_with(&self, p: &Point<T, C>) -> bool {
        !self.dominates(p) && !self.is_dominated_by(p)
    }

    /// Componentwise best across the front.
    pub fn ideal(&self) -> Result<Point<T, C>> {
        self.extremum(true)
    }

    /// Componentwise worst among the front's (non-dominated) points.
    pub fn nadir(&self) -> Result<Point<T, C>> {
        self.extremum(false)
    }

    /// Componentwise worst across the underlying index. Equals [`Self::nadir`]
    /// while the front invariant holds.
    pub fn worst(&self) -> Result<Point<T, C>> {
        self.extremum(false)
    }

    fn extremum(&self, best: bool) -> Result<Point<T, C>> {
        let mut out: Option<Point<T, C>> = None;
        for (_, p, _) in self.index.iter() {
            match &mut out {
                None => out = Some(p.clone()),
                Some(acc) => {
                    for (axis, &minimise) in self.minimise.iter().enumerate() {
                        let towards_min = minimise == best;
                        let v = p.get(axis);
                        let keep = if towards_min {
                            v < acc.get(axis)
                        } else {
                            v > acc.get(axis)
                        };
                        if keep {
                            acc.set(axis, v);
                        }
                    }
                }
            }
        }
        out.ok_or(Error::EmptyContainer)
    }

    /// Best stored coordinate on one axis.
    pub fn ideal_value(&self, axis: usize) -> Result<T> {
        self.ideal().map(|p| p.get(axis))
    }

    /// Worst stored coordinate on one axis.
    pub fn nadir_value(&self, axis: usize) -> Result<T> {
        self.nadir().map(|p| p.get(axis))
    }

    /// Erase every element at exactly `point`.
    pub fn erase_point(&mut self, point: &Point<T, C>) -> Result<usize> {
        self.index.erase_point(point)
    }

    /// Erase one element by key.
    pub fn erase(&mut self, key: Key) -> bool {
        self.index.erase(key)
    }

    /// Erase one element by key and hand it back.
    pub fn take(&mut self, key: Key) -> Option<(Point<T, C>, V)> {
        self.index.take(key)
    }

    /// Element behind a key, unless stale.
    pub fn get(&self, key: Key) -> Option<(&Point<T, C>, &V)> {
        self.index.get(key)
    }

    /// All elements at exactly `point`.
    pub fn find<'a>(
        &'a self,
        point: &Point<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.index.find(point)
    }

    /// Whether an element sits at exactly `point`.
    pub fn contains(&self, point: &Point<T, C>) -> bool {
        self.index.contains(point)
    }

    /// The `k` nearest elements to `point`, nearest first.
    pub fn nearest<'a>(&'a self, point: &Point<T, C>, k: usize) -> Result<Nearest<'a, T, C, V, B>> {
        self.index.nearest(point, k)
    }

    /// Elements inside a closed box.
    pub fn range<'a>(
        &'a self,
        query: &HyperBox<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.index.range(query)
    }

    /// Elements outside a closed box.
    pub fn disjoint<'a>(
        &'a self,
        query: &HyperBox<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.index.disjoint(query)
    }

    /// Elements passing a conjunction of predicates.
    pub fn satisfies<'a>(
        &'a self,
        filter: &Filter<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.index.satisfies(filter)
    }

    /// All elements, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Point<T, C>, &V)> + '_ {
        self.index.iter()
    }

    /// Drop every element; the direction stays.
    pub fn clear(&mut self) {
        self.index.clear();
    }
}

impl<T, C, V, B> fmt::Display for FrontGeneric<T, C, V, B>
where
    T: Scalar + fmt::Display,
    C: Coords<T>,
    V: fmt::Display,
    B: SpatialBackend<T, C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, point, value) in self.iter() {
            writeln!(f, "{point} {value}")?;
        }
        Ok(())
    }
}

impl<T, C, V, B> fmt::Debug for FrontGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontGeneric")
            .field("len", &self.len())
            .field("minimise", &self.minimise)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
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

    #[test]
    fn insert_filters_dominated_candidates() {
        // S1: {(1,5),(2,3),(3,1),(4,4)} -> front {(1,5),(2,3),(3,1)}
        let mut front: Front<f64, u32> = Front::new(2);
        assert!(front.insert(p2(1.0, 5.0), 0).unwrap().is_inserted());
        assert!(front.insert(p2(2.0, 3.0), 1).unwrap().is_inserted());
        assert!(front.insert(p2(3.0, 1.0), 2).unwrap().is_inserted());
        match front.insert(p2(4.0, 4.0), 3).unwrap() {
            Admission::Rejected { point, by, .. } => {
                assert_eq!(point, p2(4.0, 4.0));
                assert_eq!(by, p2(2.0, 3.0));
            }
            Admission::Inserted { .. } => panic!("(4,4) must be rejected"),
        }
        assert_eq!(
            front_points(&front),
            alloc::vec![(1.0, 5.0), (2.0, 3.0), (3.0, 1.0)]
        );
    }

    #[test]
    fn insert_displaces_what_it_dominates() {
        // S2: inserting (2,2) removes (2,3)
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(2.0, 3.0), 1).unwrap();
        front.insert(p2(3.0, 1.0), 2).unwrap();
        match front.insert(p2(2.0, 2.0), 3).unwrap() {
            Admission::Inserted { displaced, .. } => {
                assert_eq!(displaced.len(), 1);
                assert_eq!(displaced[0].0, p2(2.0, 3.0));
                assert_eq!(displaced[0].1, 1);
            }
            Admission::Rejected { .. } => panic!("(2,2) must be admitted"),
        }
        assert_eq!(
            front_points(&front),
            alloc::vec![(1.0, 5.0), (2.0, 2.0), (3.0, 1.0)]
        );
    }

    #[test]
    fn no_pair_in_a_random_front_is_dominated() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(3);
        let mut front: RStarFront<f64, u32> = RStarFront::new(3);
        for i in 0..300u32 {
            let p = DynPoint::from_slice(&[
                rng.gen_range(0..40) as f64,
                rng.gen_range(0..40) as f64,
                rng.gen_range(0..40) as f64,
            ]);
            front.insert(p, i).unwrap();
        }
        let points: Vec<DynPoint<f64>> = front.iter().map(|(_, p, _)| p.clone()).collect();
        for a in &points {
            for b in &points {
                if a != b {
                    assert!(a.non_dominates(b, true), "{a} and {b} must be incomparable");
                }
            }
        }
    }

    #[test]
    fn maximisation_flips_the_filter() {
        let mut front: Front<f64, u32> = Front::with_uniform_direction(2, false);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        assert!(front.insert(p2(2.0, 6.0), 1).unwrap().is_inserted());
        // (1,5) is dominated under maximisation and must be gone
        assert_eq!(front_points(&front), alloc::vec![(2.0, 6.0)]);
        assert!(!front.insert(p2(1.0, 5.0), 2).unwrap().is_inserted());
    }

    #[test]
    fn mixed_directions() {
        // minimise axis 0, maximise axis 1
        let mut front: Front<f64, u32> = Front::with_direction(&[true, false]);
        front.insert(p2(2.0, 4.0), 0).unwrap();
        assert!(front.insert(p2(1.0, 5.0), 1).unwrap().is_inserted());
        assert_eq!(front_points(&front), alloc::vec![(1.0, 5.0)]);
        assert!(!front.insert(p2(3.0, 5.0), 2).unwrap().is_inserted());
        assert!(front.insert(p2(0.5, 2.0), 3).unwrap().is_inserted());
        assert_eq!(front_points(&front), alloc::vec![(0.5, 2.0), (1.0, 5.0)]);
    }

    #[test]
    fn front_level_dominance_queries() {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(3.0, 1.0), 1).unwrap();
        assert!(front.dominates(&p2(4.0, 2.0)));
        assert!(front.is_dominated_by(&p2(0.0, 0.0)));
        assert!(front.non_dominated_with(&p2(2.0, 3.0)));
        assert!(!front.dominates(&p2(2.0, 3.0)));
    }

    #[test]
    fn ideal_nadir_worst() {
        let mut front: Front<f64, u32> = Front::new(2);
        assert_eq!(front.ideal().err(), Some(Error::EmptyContainer));
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(2.0, 3.0), 1).unwrap();
        front.insert(p2(3.0, 1.0), 2).unwrap();
        assert_eq!(front.ideal().unwrap(), p2(1.0, 1.0));
        assert_eq!(front.nadir().unwrap(), p2(3.0, 5.0));
        assert_eq!(front.worst().unwrap(), p2(3.0, 5.0));
        assert_eq!(front.ideal_value(1).unwrap(), 1.0);
    }

    #[test]
    fn equal_points_coexist() {
        let mut front: Front<f64, u32> = Front::new(2);
        assert!(front.insert(p2(1.0, 1.0), 0).unwrap().is_inserted());
        assert!(front.insert(p2(1.0, 1.0), 1).unwrap().is_inserted());
        assert_eq!(front.len(), 2);
    }

    #[test]
    fn stream_and_reparse_round_trip() {
        let mut front: Front<f64, i64> = Front::new(2);
        front.insert(p2(1.0, 5.0), 10).unwrap();
        front.insert(p2(2.0, 3.0), 20).unwrap();
        front.insert(p2(3.0, 1.0), 30).unwrap();
        let text = front.to_string();
        let back: Front<f64, i64> = Front::parse_lines(&text, &[true, true]).unwrap();
        assert_eq!(back.len(), front.len());
        let mut a: Vec<(i64, i64, i64)> = front
            .iter()
            .map(|(_, p, v)| (p.get(0) as i64, p.get(1) as i64, *v))
            .collect();
        let mut b: Vec<(i64, i64, i64)> = back
            .iter()
            .map(|(_, p, v)| (p.get(0) as i64, p.get(1) as i64, *v))
            .collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn generation_counts_front_mutations() {
        let mut front: Front<f64, u32> = Front::new(2);
        let g0 = front.generation();
        front.insert(p2(1.0, 1.0), 0).unwrap();
        assert!(front.generation() > g0);
        let g1 = front.generation();
        front.erase_point(&p2(1.0, 1.0)).unwrap();
        assert!(front.generation() > g1);
    }
}
