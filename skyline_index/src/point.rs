// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-dimensional points and the dominance algebra.
//!
//! A [`Point`] is a value object: equality is elementwise, arithmetic is
//! elementwise with scalar broadcast, and the dominance predicates compare
//! two points under a per-axis optimisation direction.

use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::str::FromStr;

use crate::error::Error;
use crate::types::{Distance, Scalar};

/// Coordinate storage behind a point: a fixed-size array or a growable vector.
///
/// The fixed variant pins the dimension at compile time; the dynamic variant
/// picks it up at construction. Both expose the same slice view so the whole
/// algebra is written once.
pub trait Coords<T: Scalar>: Clone + PartialEq + Debug {
    /// Compile-time dimension, if the storage fixes one.
    const STATIC_DIMENSIONS: Option<usize>;

    /// Storage of `dimensions` copies of `value`.
    fn splat(dimensions: usize, value: T) -> Self;

    /// Storage copied from a slice.
    fn from_slice(values: &[T]) -> Self;

    /// Read view of the coordinates.
    fn as_slice(&self) -> &[T];

    /// Write view of the coordinates.
    fn as_mut_slice(&mut self) -> &mut [T];
}

impl<T: Scalar> Coords<T> for Vec<T> {
    const STATIC_DIMENSIONS: Option<usize> = None;

    fn splat(dimensions: usize, value: T) -> Self {
        alloc::vec![value; dimensions]
    }

    fn from_slice(values: &[T]) -> Self {
        values.to_vec()
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Scalar, const D: usize> Coords<T> for [T; D] {
    const STATIC_DIMENSIONS: Option<usize> = Some(D);

    fn splat(dimensions: usize, value: T) -> Self {
        debug_assert_eq!(dimensions, D, "fixed-dimension storage is {D}-dimensional");
        [value; D]
    }

    fn from_slice(values: &[T]) -> Self {
        debug_assert_eq!(values.len(), D, "fixed-dimension storage is {D}-dimensional");
        core::array::from_fn(|i| values[i])
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

/// Per-axis optimisation direction, broadcastable from a single bool.
///
/// `true` means "minimise this axis". Pass `true` for the common
/// minimise-everything case or a `&[bool]` for mixed directions.
pub trait Direction: Copy {
    /// Whether axis `axis` is minimised.
    fn is_minimised(self, axis: usize) -> bool;
}

impl Direction for bool {
    #[inline]
    fn is_minimised(self, _axis: usize) -> bool {
        self
    }
}

impl Direction for &[bool] {
    #[inline]
    fn is_minimised(self, axis: usize) -> bool {
        self[axis]
    }
}

/// A d-dimensional point over scalar `T` with storage `C`.
#[derive(Clone, Debug, PartialEq)]
pub struct Point<T: Scalar, C: Coords<T> = Vec<T>> {
    coords: C,
    _elem: PhantomData<T>,
}

/// Point with runtime dimension (vector storage).
pub type DynPoint<T> = Point<T, Vec<T>>;

/// Point with compile-time dimension (array storage).
pub type FixedPoint<T, const D: usize> = Point<T, [T; D]>;

impl<T: Scalar, C: Coords<T>> Point<T, C> {
    /// Wrap existing coordinate storage.
    pub fn new(coords: C) -> Self {
        Self {
            coords,
            _elem: PhantomData,
        }
    }

    /// Zero-filled point with `dimensions` axes.
    pub fn zeros(dimensions: usize) -> Self {
        Self::new(C::splat(dimensions, T::zero()))
    }

    /// Point with `value` on every axis.
    pub fn splat(dimensions: usize, value: T) -> Self {
        Self::new(C::splat(dimensions, value))
    }

    /// Point copied from a slice of coordinates.
    pub fn from_slice(values: &[T]) -> Self {
        Self::new(C::from_slice(values))
    }

    /// Copy into a different storage variant of the same scalar.
    pub fn with_storage<C2: Coords<T>>(&self) -> Point<T, C2> {
        Point::from_slice(self.values())
    }

    /// Number of axes.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.coords.as_slice().len()
    }

    /// Coordinate on `axis`. Out-of-range axes are a precondition violation.
    #[inline]
    pub fn get(&self, axis: usize) -> T {
        self.coords.as_slice()[axis]
    }

    /// Overwrite the coordinate on `axis`.
    #[inline]
    pub fn set(&mut self, axis: usize, value: T) {
        self.coords.as_mut_slice()[axis] = value;
    }

    /// All coordinates as a slice.
    #[inline]
    pub fn values(&self) -> &[T] {
        self.coords.as_slice()
    }

    /// Iterate over the coordinates.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.coords.as_slice().iter().copied()
    }

    /// Weak Pareto dominance: no worse than `other` on every axis and
    /// strictly better on at least one. A point never dominates itself, and
    /// zero-dimensional points dominate nothing.
    pub fn dominates<D: Direction>(&self, other: &Self, direction: D) -> bool {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut better_at_any = false;
        for (axis, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            if direction.is_minimised(axis) {
                if a > b {
                    return false;
                }
                if a < b {
                    better_at_any = true;
                }
            } else {
                if a < b {
                    return false;
                }
                if a > b {
                    better_at_any = true;
                }
            }
        }
        better_at_any
    }

    /// Strong Pareto dominance: strictly better than `other` on every axis.
    pub fn strongly_dominates<D: Direction>(&self, other: &Self, direction: D) -> bool {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        if self.dimensions() == 0 {
            return false;
        }
        for (axis, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            let strictly_better = if direction.is_minimised(axis) {
                a < b
            } else {
                a > b
            };
            if !strictly_better {
                return false;
            }
        }
        true
    }

    /// Mutual non-dominance: neither point dominates the other. Equal points
    /// are non-dominated.
    pub fn non_dominates<D: Direction>(&self, other: &Self, direction: D) -> bool {
        !self.dominates(other, direction) && !other.dominates(self, direction)
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> T::Dist {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut acc = T::Dist::zero();
        for (a, b) in self.iter().zip(other.iter()) {
            let d = a.to_dist() - b.to_dist();
            acc = acc + d * d;
        }
        acc.sqrt()
    }

    /// Euclidean distance from `other` to the hyperbox this point weakly
    /// dominates. Axes where `other` is already on the dominated side
    /// contribute nothing; the rest are clamped to the improving difference.
    pub fn distance_to_dominated_box<D: Direction>(&self, other: &Self, direction: D) -> T::Dist {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut acc = T::Dist::zero();
        for (axis, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            let term = if direction.is_minimised(axis) {
                a.to_dist() - b.to_dist()
            } else {
                b.to_dist() - a.to_dist()
            };
            let term = term.max(T::Dist::zero());
            acc = acc + term * term;
        }
        acc.sqrt()
    }

    /// Quadrant of `p` relative to this point: bit `k` of the result is set
    /// iff `p[k] <= self[k]`. Indexes the 2^d subtrees of a quadtree node.
    pub fn quadrant(&self, p: &Self) -> usize {
        debug_assert_eq!(self.dimensions(), p.dimensions());
        debug_assert!(self.dimensions() < usize::BITS as usize);
        let mut quad = 0usize;
        for (axis, (pivot, v)) in self.iter().zip(p.iter()).enumerate() {
            if v <= pivot {
                quad |= 1 << axis;
            }
        }
        quad
    }
}

impl<T: Scalar, C: Coords<T>> From<C> for Point<T, C> {
    fn from(coords: C) -> Self {
        Self::new(coords)
    }
}

impl<T: Scalar, C: Coords<T>> core::ops::Index<usize> for Point<T, C> {
    type Output = T;

    #[inline]
    fn index(&self, axis: usize) -> &T {
        &self.coords.as_slice()[axis]
    }
}

impl<T: Scalar, C: Coords<T>> core::ops::IndexMut<usize> for Point<T, C> {
    #[inline]
    fn index_mut(&mut self, axis: usize) -> &mut T {
        &mut self.coords.as_mut_slice()[axis]
    }
}

macro_rules! point_elementwise_op {
    ($op_trait:ident :: $op_fn:ident, $assign_trait:ident :: $assign_fn:ident, $scalar_fn:ident) => {
        impl<T: Scalar, C: Coords<T>> core::ops::$assign_trait<&Point<T, C>> for Point<T, C> {
            fn $assign_fn(&mut self, rhs: &Point<T, C>) {
                debug_assert_eq!(self.dimensions(), rhs.dimensions());
                for (a, b) in self
                    .coords
                    .as_mut_slice()
                    .iter_mut()
                    .zip(rhs.coords.as_slice())
                {
                    *a = T::$scalar_fn(*a, *b);
                }
            }
        }

        impl<T: Scalar, C: Coords<T>> core::ops::$op_trait<&Point<T, C>> for &Point<T, C> {
            type Output = Point<T, C>;

            fn $op_fn(self, rhs: &Point<T, C>) -> Point<T, C> {
                let mut out = self.clone();
                core::ops::$assign_trait::$assign_fn(&mut out, rhs);
                out
            }
        }

        impl<T: Scalar, C: Coords<T>> core::ops::$assign_trait<T> for Point<T, C> {
            fn $assign_fn(&mut self, rhs: T) {
                for a in self.coords.as_mut_slice().iter_mut() {
                    *a = T::$scalar_fn(*a, rhs);
                }
            }
        }

        impl<T: Scalar, C: Coords<T>> core::ops::$op_trait<T> for &Point<T, C> {
            type Output = Point<T, C>;

            fn $op_fn(self, rhs: T) -> Point<T, C> {
                let mut out = self.clone();
                core::ops::$assign_trait::$assign_fn(&mut out, rhs);
                out
            }
        }
    };
}

point_elementwise_op!(Add::add, AddAssign::add_assign, add);
point_elementwise_op!(Sub::sub, SubAssign::sub_assign, sub);
point_elementwise_op!(Mul::mul, MulAssign::mul_assign, mul);
point_elementwise_op!(Div::div, DivAssign::div_assign, div);

impl<T: Scalar + fmt::Display, C: Coords<T>> fmt::Display for Point<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dimensions() == 0 {
            return write!(f, "( )");
        }
        write!(f, "({}", self.get(0))?;
        for v in self.iter().skip(1) {
            write!(f, ", {v}")?;
        }
        write!(f, ")")
    }
}

impl<T: Scalar + FromStr, C: Coords<T>> FromStr for Point<T, C> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or(Error::InvalidArgument("point literal must be parenthesised"))?
            .trim();
        let mut values = Vec::new();
        if !inner.is_empty() {
            for part in inner.split(',') {
                let v = part
                    .trim()
                    .parse::<T>()
                    .map_err(|_| Error::InvalidArgument("malformed point coordinate"))?;
                values.push(v);
            }
        }
        if let Some(expected) = C::STATIC_DIMENSIONS {
            if expected != values.len() {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(Self::from_slice(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Distance;
    use alloc::string::ToString;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    #[test]
    fn weak_dominance_under_minimisation() {
        assert!(p2(1.0, 2.0).dominates(&p2(2.0, 3.0), true));
        assert!(p2(1.0, 3.0).dominates(&p2(1.0, 4.0), true));
        assert!(!p2(1.0, 4.0).dominates(&p2(2.0, 3.0), true));
        // a point never dominates itself
        assert!(!p2(1.0, 2.0).dominates(&p2(1.0, 2.0), true));
    }

    #[test]
    fn dominance_respects_mixed_directions() {
        // minimise axis 0, maximise axis 1
        let dir = [true, false];
        assert!(p2(1.0, 5.0).dominates(&p2(2.0, 4.0), &dir[..]));
        assert!(!p2(1.0, 3.0).dominates(&p2(2.0, 4.0), &dir[..]));
    }

    #[test]
    fn strong_implies_weak() {
        let a = p2(1.0, 1.0);
        let b = p2(2.0, 2.0);
        assert!(a.strongly_dominates(&b, true));
        assert!(a.dominates(&b, true));
        // better on one axis only: weak but not strong
        let c = p2(1.0, 2.0);
        assert!(c.dominates(&b, true));
        assert!(!c.strongly_dominates(&b, true));
    }

    #[test]
    fn trichotomy_is_exclusive() {
        let pairs = [
            (p2(1.0, 5.0), p2(2.0, 3.0)),
            (p2(1.0, 2.0), p2(3.0, 4.0)),
            (p2(2.0, 2.0), p2(2.0, 2.0)),
        ];
        for (a, b) in &pairs {
            let outcomes = [
                a.dominates(b, true),
                b.dominates(a, true),
                a.non_dominates(b, true),
            ];
            assert_eq!(outcomes.iter().filter(|&&o| o).count(), 1, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_dimensional_points_compare_equal_and_dominate_nothing() {
        let a: DynPoint<f64> = DynPoint::from_slice(&[]);
        let b: DynPoint<f64> = DynPoint::from_slice(&[]);
        assert_eq!(a, b);
        assert!(!a.dominates(&b, true));
        assert!(!a.strongly_dominates(&b, true));
        assert!(a.non_dominates(&b, true));
    }

    #[test]
    fn euclidean_distance() {
        assert_eq!(p2(0.0, 0.0).distance(&p2(3.0, 4.0)), 5.0);
        let a: DynPoint<i64> = DynPoint::from_slice(&[0, 0]);
        let b: DynPoint<i64> = DynPoint::from_slice(&[3, 4]);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn distance_to_dominated_box_clamps_improving_axes() {
        let a = p2(2.0, 3.0);
        // (3, 4) is inside the box a dominates: distance zero
        assert_eq!(a.distance_to_dominated_box(&p2(3.0, 4.0), true), 0.0);
        // (1, 3) is better on axis 0 by 1
        assert_eq!(a.distance_to_dominated_box(&p2(1.0, 3.0), true), 1.0);
        // better on both axes by 1: sqrt(2)
        let d = a.distance_to_dominated_box(&p2(1.0, 2.0), true);
        assert!(Distance::abs(d - core::f64::consts::SQRT_2) < 1e-12);
    }

    #[test]
    fn quadrant_bitmask() {
        let pivot = p2(2.0, 2.0);
        assert_eq!(pivot.quadrant(&p2(1.0, 1.0)), 0b11);
        assert_eq!(pivot.quadrant(&p2(3.0, 1.0)), 0b10);
        assert_eq!(pivot.quadrant(&p2(1.0, 3.0)), 0b01);
        assert_eq!(pivot.quadrant(&p2(3.0, 3.0)), 0b00);
        // ties count as "below"
        assert_eq!(pivot.quadrant(&p2(2.0, 2.0)), 0b11);
    }

    #[test]
    fn elementwise_and_broadcast_arithmetic() {
        let a = p2(1.0, 2.0);
        let b = p2(3.0, 5.0);
        assert_eq!(&a + &b, p2(4.0, 7.0));
        assert_eq!(&b - &a, p2(2.0, 3.0));
        assert_eq!(&a * &b, p2(3.0, 10.0));
        assert_eq!(&b / &a, p2(3.0, 2.5));
        assert_eq!(&a + 1.0, p2(2.0, 3.0));
        assert_eq!(&b * 2.0, p2(6.0, 10.0));
        let mut c = a.clone();
        c += &b;
        assert_eq!(c, p2(4.0, 7.0));
        c /= 2.0;
        assert_eq!(c, p2(2.0, 3.5));
    }

    #[test]
    fn fixed_and_dynamic_storage_agree() {
        let fixed: FixedPoint<f64, 2> = FixedPoint::from_slice(&[1.0, 5.0]);
        let dynamic = fixed.with_storage::<Vec<f64>>();
        assert_eq!(dynamic, p2(1.0, 5.0));
        assert!(fixed.dominates(&FixedPoint::from_slice(&[2.0, 6.0]), true));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let a = p2(1.0, 2.5);
        assert_eq!(a.to_string(), "(1, 2.5)");
        let back: DynPoint<f64> = a.to_string().parse().unwrap();
        assert_eq!(back, a);

        let empty: DynPoint<f64> = DynPoint::from_slice(&[]);
        assert_eq!(empty.to_string(), "( )");
        let back: DynPoint<f64> = "( )".parse().unwrap();
        assert_eq!(back, empty);

        assert!("1, 2".parse::<DynPoint<f64>>().is_err());
        let wrong: Result<FixedPoint<f64, 3>, _> = "(1, 2)".parse();
        assert!(wrong.is_err());
    }
}
