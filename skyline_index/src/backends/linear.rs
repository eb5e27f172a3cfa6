// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. The reference oracle for the tree
//! backends and a sensible choice for very small fronts.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::backend::SpatialBackend;
use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::{OrdDist, Scalar};

/// Flat vector backend with linear scans.
#[derive(Clone)]
pub struct Linear<T: Scalar, C: Coords<T> = Vec<T>> {
    slots: Vec<Option<Point<T, C>>>,
}

impl<T: Scalar, C: Coords<T>> Default for Linear<T, C> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Scalar, C: Coords<T>> core::fmt::Debug for Linear<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.slots.len();
        let alive = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Linear")
            .field("total_slots", &total)
            .field("alive", &alive)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, C: Coords<T>> SpatialBackend<T, C> for Linear<T, C> {
    fn insert(&mut self, slot: usize, point: &Point<T, C>) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(point.clone());
    }

    fn remove(&mut self, slot: usize, _point: &Point<T, C>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = None;
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn query_box<'a>(&'a self, query: HyperBox<T, C>) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(self.slots.iter().enumerate().filter_map(move |(i, s)| {
            let p = s.as_ref()?;
            query.contains(p).then_some(i)
        }))
    }

    fn nearest<'a>(
        &'a self,
        query: Point<T, C>,
    ) -> Box<dyn Iterator<Item = (usize, T::Dist)> + 'a> {
        let mut out: Vec<(usize, T::Dist)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|p| (i, p.distance(&query))))
            .collect();
        out.sort_by_key(|&(slot, d)| (OrdDist(d), slot));
        Box::new(out.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::DynPoint;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    #[test]
    fn box_query_scans_alive_slots() {
        let mut b: Linear<f64> = Linear::default();
        b.insert(0, &p2(1.0, 5.0));
        b.insert(1, &p2(2.0, 3.0));
        b.insert(2, &p2(3.0, 1.0));
        b.remove(1, &p2(2.0, 3.0));

        let hits: Vec<usize> = b
            .query_box(HyperBox::new(p2(0.0, 0.0), p2(3.0, 3.0)))
            .collect();
        assert_eq!(hits, alloc::vec![2]);
    }

    #[test]
    fn nearest_yields_increasing_distance() {
        let mut b: Linear<f64> = Linear::default();
        b.insert(0, &p2(1.0, 5.0));
        b.insert(1, &p2(2.0, 3.0));
        b.insert(2, &p2(3.0, 1.0));

        let order: Vec<usize> = b.nearest(p2(0.0, 0.0)).map(|(slot, _)| slot).collect();
        assert_eq!(order, alloc::vec![2, 1, 0]);
    }
}
