// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.

use alloc::boxed::Box;

use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::Scalar;

/// Spatial backend abstraction used by
/// [`IndexGeneric`](crate::index::IndexGeneric).
///
/// Backends store slot numbers handed out by the index wrapper next to a copy
/// of each slot's point and answer the two geometric queries everything else
/// is built from. Both query iterators are lazy: they expand tree nodes on
/// demand as the caller advances them.
pub trait SpatialBackend<T: Scalar, C: Coords<T>> {
    /// Insert a slot at `point`.
    fn insert(&mut self, slot: usize, point: &Point<T, C>);

    /// Remove a slot previously inserted at `point`.
    fn remove(&mut self, slot: usize, point: &Point<T, C>);

    /// Drop all slots.
    fn clear(&mut self);

    /// Rebuild from a batch of `(slot, point)` pairs. The default clears and
    /// re-inserts; tree backends override with a packed build.
    fn bulk_load(&mut self, items: &[(usize, Point<T, C>)]) {
        self.clear();
        for (slot, point) in items {
            self.insert(*slot, point);
        }
    }

    /// Slots whose point lies inside the closed `query` box.
    fn query_box<'a>(&'a self, query: HyperBox<T, C>) -> Box<dyn Iterator<Item = usize> + 'a>;

    /// Every slot paired with its L2 distance to `query`, in nondecreasing
    /// distance order. Equal-distance ordering is unspecified here; the index
    /// wrapper re-ranks ties by insertion sequence.
    fn nearest<'a>(&'a self, query: Point<T, C>)
        -> Box<dyn Iterator<Item = (usize, T::Dist)> + 'a>;
}
