// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hyperboxes and query predicates.

use alloc::vec::Vec;

use crate::point::{Coords, Point};
use crate::types::{max_s, min_s, Distance, Scalar};

/// Closed axis-aligned box in d dimensions, given by its two corner points.
///
/// A box whose min exceeds its max on any axis is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperBox<T: Scalar, C: Coords<T> = Vec<T>> {
    min: Point<T, C>,
    max: Point<T, C>,
}

impl<T: Scalar, C: Coords<T>> HyperBox<T, C> {
    /// Box between two corner points.
    pub fn new(min: Point<T, C>, max: Point<T, C>) -> Self {
        debug_assert_eq!(min.dimensions(), max.dimensions());
        Self { min, max }
    }

    /// Degenerate box covering a single point.
    pub fn from_point(p: &Point<T, C>) -> Self {
        Self::new(p.clone(), p.clone())
    }

    /// Box covering the whole space.
    pub fn everything(dimensions: usize) -> Self {
        Self::new(
            Point::splat(dimensions, T::min_value()),
            Point::splat(dimensions, T::max_value()),
        )
    }

    /// Lower corner.
    #[inline]
    pub fn min(&self) -> &Point<T, C> {
        &self.min
    }

    /// Upper corner.
    #[inline]
    pub fn max(&self) -> &Point<T, C> {
        &self.max
    }

    /// Number of axes.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.min.dimensions()
    }

    /// True if min exceeds max on some axis.
    pub fn is_empty(&self) -> bool {
        self.min
            .iter()
            .zip(self.max.iter())
            .any(|(lo, hi)| lo > hi)
    }

    /// Whether the closed box contains `p`.
    pub fn contains(&self, p: &Point<T, C>) -> bool {
        debug_assert_eq!(self.dimensions(), p.dimensions());
        self.min
            .iter()
            .zip(self.max.iter())
            .zip(p.iter())
            .all(|((lo, hi), v)| lo <= v && v <= hi)
    }

    /// Whether two closed boxes share at least one point.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Corner-wise intersection; empty when the boxes are disjoint.
    pub fn intersection(&self, other: &Self) -> Self {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut min = self.min.clone();
        let mut max = self.max.clone();
        for axis in 0..self.dimensions() {
            min.set(axis, max_s(min.get(axis), other.min.get(axis)));
            max.set(axis, min_s(max.get(axis), other.max.get(axis)));
        }
        Self::new(min, max)
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Self) -> Self {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut min = self.min.clone();
        let mut max = self.max.clone();
        for axis in 0..self.dimensions() {
            min.set(axis, min_s(min.get(axis), other.min.get(axis)));
            max.set(axis, max_s(max.get(axis), other.max.get(axis)));
        }
        Self::new(min, max)
    }

    /// Grow in place to enclose `p`.
    pub fn extend(&mut self, p: &Point<T, C>) {
        debug_assert_eq!(self.dimensions(), p.dimensions());
        for axis in 0..self.dimensions() {
            self.min.set(axis, min_s(self.min.get(axis), p.get(axis)));
            self.max.set(axis, max_s(self.max.get(axis), p.get(axis)));
        }
    }

    /// Product of the edge lengths, in distance space. Empty boxes have
    /// volume zero.
    pub fn volume(&self) -> T::Dist {
        let mut acc = T::Dist::one();
        for (lo, hi) in self.min.iter().zip(self.max.iter()) {
            let w = (hi.to_dist() - lo.to_dist()).max(T::Dist::zero());
            acc = acc * w;
        }
        acc
    }

    /// Sum of the edge lengths (the margin of the R*-tree literature).
    pub fn margin(&self) -> T::Dist {
        let mut acc = T::Dist::zero();
        for (lo, hi) in self.min.iter().zip(self.max.iter()) {
            acc = acc + (hi.to_dist() - lo.to_dist()).max(T::Dist::zero());
        }
        acc
    }

    /// Shared volume with another box.
    pub fn overlap(&self, other: &Self) -> T::Dist {
        self.intersection(other).volume()
    }

    /// Euclidean distance from `p` to the box; zero inside.
    pub fn distance_to_point(&self, p: &Point<T, C>) -> T::Dist {
        debug_assert_eq!(self.dimensions(), p.dimensions());
        let mut acc = T::Dist::zero();
        for ((lo, hi), v) in self.min.iter().zip(self.max.iter()).zip(p.iter()) {
            let v = v.to_dist();
            let gap = if v < lo.to_dist() {
                lo.to_dist() - v
            } else if v > hi.to_dist() {
                v - hi.to_dist()
            } else {
                T::Dist::zero()
            };
            acc = acc + gap * gap;
        }
        acc.sqrt()
    }

    /// Copy with the lower corner raised to `value` on one axis.
    pub fn with_min_axis(&self, axis: usize, value: T) -> Self {
        let mut out = self.clone();
        out.min.set(axis, value);
        out
    }

    /// Copy with the upper corner lowered to `value` on one axis.
    pub fn with_max_axis(&self, axis: usize, value: T) -> Self {
        let mut out = self.clone();
        out.max.set(axis, value);
        out
    }

    /// Midpoint of the box, in distance space.
    pub fn center(&self) -> Vec<T::Dist> {
        let half = T::Dist::one() / (T::Dist::one() + T::Dist::one());
        self.min
            .iter()
            .zip(self.max.iter())
            .map(|(lo, hi)| (lo.to_dist() + hi.to_dist()) * half)
            .collect()
    }
}

/// A single query predicate over an element's point.
#[derive(Clone, Debug)]
pub enum Predicate<T: Scalar, C: Coords<T> = Vec<T>> {
    /// Coordinate on `axis` is at least `value`.
    MinBound {
        /// Constrained axis.
        axis: usize,
        /// Inclusive lower bound.
        value: T,
    },
    /// Coordinate on `axis` is at most `value`.
    MaxBound {
        /// Constrained axis.
        axis: usize,
        /// Inclusive upper bound.
        value: T,
    },
    /// Point lies inside a closed box.
    InBox(HyperBox<T, C>),
    /// Point weakly dominates `reference` under `minimise`.
    Dominates {
        /// Reference point being dominated.
        reference: Point<T, C>,
        /// Per-axis direction, `true` = minimise.
        minimise: Vec<bool>,
    },
    /// Point is weakly dominated by `reference` under `minimise`.
    DominatedBy {
        /// Reference point doing the dominating.
        reference: Point<T, C>,
        /// Per-axis direction, `true` = minimise.
        minimise: Vec<bool>,
    },
}

impl<T: Scalar, C: Coords<T>> Predicate<T, C> {
    /// Whether `p` satisfies this predicate.
    pub fn matches(&self, p: &Point<T, C>) -> bool {
        match self {
            Predicate::MinBound { axis, value } => p.get(*axis) >= *value,
            Predicate::MaxBound { axis, value } => p.get(*axis) <= *value,
            Predicate::InBox(hb) => hb.contains(p),
            Predicate::Dominates {
                reference,
                minimise,
            } => p.dominates(reference, minimise.as_slice()),
            Predicate::DominatedBy {
                reference,
                minimise,
            } => reference.dominates(p, minimise.as_slice()),
        }
    }

    /// Tighten `search` to the region where this predicate can hold.
    /// Dominance predicates tighten to the closed "better"/"worse" hyperbox,
    /// a superset of the true region; `matches` stays authoritative.
    fn tighten(&self, search: &mut HyperBox<T, C>) {
        match self {
            Predicate::MinBound { axis, value } => {
                let lo = max_s(search.min.get(*axis), *value);
                search.min.set(*axis, lo);
            }
            Predicate::MaxBound { axis, value } => {
                let hi = min_s(search.max.get(*axis), *value);
                search.max.set(*axis, hi);
            }
            Predicate::InBox(hb) => {
                *search = search.intersection(hb);
            }
            Predicate::Dominates {
                reference,
                minimise,
            } => {
                for axis in 0..search.dimensions() {
                    if minimise[axis] {
                        let hi = min_s(search.max.get(axis), reference.get(axis));
                        search.max.set(axis, hi);
                    } else {
                        let lo = max_s(search.min.get(axis), reference.get(axis));
                        search.min.set(axis, lo);
                    }
                }
            }
            Predicate::DominatedBy {
                reference,
                minimise,
            } => {
                for axis in 0..search.dimensions() {
                    if minimise[axis] {
                        let lo = max_s(search.min.get(axis), reference.get(axis));
                        search.min.set(axis, lo);
                    } else {
                        let hi = min_s(search.max.get(axis), reference.get(axis));
                        search.max.set(axis, hi);
                    }
                }
            }
        }
    }
}

/// A conjunction of predicates. The empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct Filter<T: Scalar, C: Coords<T> = Vec<T>> {
    predicates: Vec<Predicate<T, C>>,
}

impl<T: Scalar, C: Coords<T>> Filter<T, C> {
    /// Empty filter.
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Filter over a list of predicates.
    pub fn all(predicates: Vec<Predicate<T, C>>) -> Self {
        Self { predicates }
    }

    /// Add one more predicate to the conjunction.
    pub fn and(mut self, predicate: Predicate<T, C>) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// The predicates in this filter.
    pub fn predicates(&self) -> &[Predicate<T, C>] {
        &self.predicates
    }

    /// Whether `p` satisfies every predicate.
    pub fn matches(&self, p: &Point<T, C>) -> bool {
        self.predicates.iter().all(|pred| pred.matches(p))
    }

    /// Smallest box the conjunction can match inside, for tree pruning.
    pub fn bounding_box(&self, dimensions: usize) -> HyperBox<T, C> {
        let mut search = HyperBox::everything(dimensions);
        for pred in &self.predicates {
            pred.tighten(&mut search);
        }
        search
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::DynPoint;
    use alloc::vec;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    fn b2(lo: (f64, f64), hi: (f64, f64)) -> HyperBox<f64> {
        HyperBox::new(p2(lo.0, lo.1), p2(hi.0, hi.1))
    }

    #[test]
    fn closed_box_contains_its_boundary() {
        let hb = b2((0.0, 0.0), (3.0, 3.0));
        assert!(hb.contains(&p2(0.0, 0.0)));
        assert!(hb.contains(&p2(3.0, 3.0)));
        assert!(hb.contains(&p2(1.5, 2.0)));
        assert!(!hb.contains(&p2(3.1, 1.0)));
    }

    #[test]
    fn intersection_union_volume() {
        let a = b2((0.0, 0.0), (2.0, 2.0));
        let b = b2((1.0, 1.0), (3.0, 3.0));
        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), b2((1.0, 1.0), (2.0, 2.0)));
        assert_eq!(a.union(&b), b2((0.0, 0.0), (3.0, 3.0)));
        assert_eq!(a.volume(), 4.0);
        assert_eq!(a.overlap(&b), 1.0);
        assert_eq!(a.margin(), 4.0);
        let disjoint = b2((5.0, 5.0), (6.0, 6.0));
        assert!(!a.intersects(&disjoint));
        assert_eq!(a.overlap(&disjoint), 0.0);
    }

    #[test]
    fn distance_to_point() {
        let hb = b2((0.0, 0.0), (2.0, 2.0));
        assert_eq!(hb.distance_to_point(&p2(1.0, 1.0)), 0.0);
        assert_eq!(hb.distance_to_point(&p2(5.0, 2.0)), 3.0);
        assert_eq!(hb.distance_to_point(&p2(5.0, 6.0)), 5.0);
    }

    #[test]
    fn filter_matches_and_bounding_box() {
        let filter: Filter<f64> = Filter::new()
            .and(Predicate::MaxBound { axis: 0, value: 3.0 })
            .and(Predicate::MinBound { axis: 1, value: 1.0 });
        assert!(filter.matches(&p2(2.0, 1.5)));
        assert!(!filter.matches(&p2(4.0, 1.5)));
        assert!(!filter.matches(&p2(2.0, 0.5)));

        let hb = filter.bounding_box(2);
        assert_eq!(hb.max().get(0), 3.0);
        assert_eq!(hb.min().get(1), 1.0);
        assert_eq!(hb.min().get(0), f64::NEG_INFINITY);
    }

    #[test]
    fn dominance_predicates_tighten_to_the_better_box() {
        let filter: Filter<f64> = Filter::new().and(Predicate::Dominates {
            reference: p2(2.0, 3.0),
            minimise: vec![true, true],
        });
        // candidates must lie at or below the reference on both axes
        let hb = filter.bounding_box(2);
        assert_eq!(hb.max().get(0), 2.0);
        assert_eq!(hb.max().get(1), 3.0);
        assert!(filter.matches(&p2(1.0, 3.0)));
        // the reference itself does not dominate itself
        assert!(!filter.matches(&p2(2.0, 3.0)));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter: Filter<f64> = Filter::new();
        assert!(filter.matches(&p2(9.0, -9.0)));
        assert!(!filter.bounding_box(2).is_empty());
    }
}
