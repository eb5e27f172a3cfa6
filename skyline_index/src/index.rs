// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public point-container API, generic over a pluggable spatial backend.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::SpatialBackend;
use crate::backends::{KdTree, Linear, QuadTree, RStarTree, RTree};
use crate::error::{Error, Result};
use crate::point::{Coords, Point};
use crate::query::{Filter, HyperBox};
use crate::types::Scalar;

/// Generational handle for stored elements. Stays invalid after its element
/// is erased, even if the slot is reused. Keys order by insertion sequence,
/// so sorting keys replays insertion order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u64);

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.1, self.0).cmp(&(other.1, other.0))
    }
}

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "slot numbers are intentionally 32-bit; higher bits are truncated by design"
    )]
    const fn new(slot: usize, seq: u64) -> Self {
        Self(slot as u32, seq)
    }

    const fn slot(self) -> usize {
        self.0 as usize
    }

    const fn seq(self) -> u64 {
        self.1
    }
}

#[derive(Clone)]
struct Entry<T: Scalar, C: Coords<T>, V> {
    seq: u64,
    point: Point<T, C>,
    value: V,
}

/// A multiset of `(point, value)` elements with spatial queries, generic over
/// the backend that indexes the points.
///
/// Duplicate points are allowed. Every mutation bumps a generation counter;
/// indicator caches in higher layers key off it. Cloning is deep: the copy
/// owns fresh points, values, and tree nodes.
#[derive(Clone)]
pub struct IndexGeneric<T: Scalar, C: Coords<T>, V, B: SpatialBackend<T, C>> {
    entries: Vec<Option<Entry<T, C, V>>>,
    free_list: Vec<usize>,
    backend: B,
    dims: Option<usize>,
    len: usize,
    next_seq: u64,
    generation: u64,
}

/// Index backed by a linear scan.
pub type LinearIndex<T, V> = IndexGeneric<T, Vec<T>, V, Linear<T, Vec<T>>>;

/// Index backed by an R-tree.
pub type RTreeIndex<T, V> = IndexGeneric<T, Vec<T>, V, RTree<T, Vec<T>>>;

/// Index backed by an R*-tree.
pub type RStarIndex<T, V> = IndexGeneric<T, Vec<T>, V, RStarTree<T, Vec<T>>>;

/// Index backed by a kd-tree.
pub type KdTreeIndex<T, V> = IndexGeneric<T, Vec<T>, V, KdTree<T, Vec<T>>>;

/// Index backed by a quadtree.
pub type QuadTreeIndex<T, V> = IndexGeneric<T, Vec<T>, V, QuadTree<T, Vec<T>>>;

impl<T, C, V, B> Default for IndexGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, V, B> IndexGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C> + Default,
{
    /// Empty index using the backend's default configuration. The dimension
    /// is pinned by the storage type or adopted from the first insert.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }

    /// Empty index with the dimension pinned up front.
    pub fn with_dimensions(dimensions: usize) -> Self {
        let mut index = Self::new();
        index.dims = Some(dimensions);
        index
    }

    /// Build an index from a batch of elements in one packed pass.
    pub fn bulk_load<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Point<T, C>, V)>,
    {
        let mut index = Self::new();
        let mut pairs: Vec<(usize, Point<T, C>)> = Vec::new();
        for (slot, (point, value)) in items.into_iter().enumerate() {
            match index.dims {
                Some(d) if d != point.dimensions() => {
                    return Err(Error::DimensionMismatch {
                        expected: d,
                        actual: point.dimensions(),
                    });
                }
                None => index.dims = Some(point.dimensions()),
                _ => {}
            }
            index.entries.push(Some(Entry {
                seq: slot as u64,
                point: point.clone(),
                value,
            }));
            pairs.push((slot, point));
        }
        index.backend.bulk_load(&pairs);
        index.len = pairs.len();
        index.next_seq = pairs.len() as u64;
        index.generation = 1;
        Ok(index)
    }
}

impl<T, C, V, B> IndexGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    /// Empty index around a pre-configured backend (custom branching, leaf
    /// capacity, and so on).
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            backend,
            dims: C::STATIC_DIMENSIONS,
            len: 0,
            next_seq: 0,
            generation: 0,
        }
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index stores nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension of the stored points, once known.
    #[inline]
    pub fn dimensions(&self) -> Option<usize> {
        self.dims
    }

    /// Mutation counter. Bumped by every successful insert, erase, and
    /// clear; cached derived values key off it.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check_query_dims(&self, actual: usize) -> Result<()> {
        match self.dims {
            Some(d) if d != actual => Err(Error::DimensionMismatch {
                expected: d,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Insert an element; duplicates of an existing point are fine.
    pub fn insert(&mut self, point: Point<T, C>, value: V) -> Result<Key> {
        match self.dims {
            Some(d) if d != point.dimensions() => {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    actual: point.dimensions(),
                });
            }
            None => self.dims = Some(point.dimensions()),
            _ => {}
        }
        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None => {
                self.entries.push(None);
                self.entries.len() - 1
            }
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.backend.insert(slot, &point);
        self.entries[slot] = Some(Entry { seq, point, value });
        self.len += 1;
        self.generation += 1;
        Ok(Key::new(slot, seq))
    }

    /// Erase one element by key. Returns false for stale keys.
    pub fn erase(&mut self, key: Key) -> bool {
        self.take(key).is_some()
    }

    /// Erase one element by key and hand it back. None for stale keys.
    pub fn take(&mut self, key: Key) -> Option<(Point<T, C>, V)> {
        let slot = key.slot();
        let matches = self
            .entries
            .get(slot)
            .and_then(|e| e.as_ref())
            .map(|e| e.seq == key.seq())
            .unwrap_or(false);
        if !matches {
            return None;
        }
        let entry = self.entries[slot]
            .take()
            .expect("entry checked just above");
        self.backend.remove(slot, &entry.point);
        self.free_list.push(slot);
        self.len -= 1;
        self.generation += 1;
        Some((entry.point, entry.value))
    }

    /// Erase every element stored at exactly `point`; returns how many went.
    pub fn erase_point(&mut self, point: &Point<T, C>) -> Result<usize> {
        self.check_query_dims(point.dimensions())?;
        let slots: Vec<usize> = self
            .backend
            .query_box(HyperBox::from_point(point))
            .collect();
        let mut count = 0;
        for slot in slots {
            if let Some(entry) = self.entries.get_mut(slot).and_then(|e| e.take()) {
                self.backend.remove(slot, &entry.point);
                self.free_list.push(slot);
                self.len -= 1;
                count += 1;
            }
        }
        if count > 0 {
            self.generation += 1;
        }
        Ok(count)
    }

    /// Element behind a key, unless the key went stale.
    pub fn get(&self, key: Key) -> Option<(&Point<T, C>, &V)> {
        let entry = self.entries.get(key.slot())?.as_ref()?;
        (entry.seq == key.seq()).then_some((&entry.point, &entry.value))
    }

    /// All elements stored at exactly `point`.
    pub fn find<'a>(
        &'a self,
        point: &Point<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.check_query_dims(point.dimensions())?;
        let entries = &self.entries;
        Ok(self
            .backend
            .query_box(HyperBox::from_point(point))
            .filter_map(move |slot| {
                let entry = entries.get(slot)?.as_ref()?;
                Some((Key::new(slot, entry.seq), &entry.point, &entry.value))
            }))
    }

    /// Whether any element sits at exactly `point`.
    pub fn contains(&self, point: &Point<T, C>) -> bool {
        self.find(point)
            .map(|mut found| found.next().is_some())
            .unwrap_or(false)
    }

    /// The `k` nearest elements to `point` by L2 distance, nearest first,
    /// equal distances in insertion order.
    pub fn nearest<'a>(
        &'a self,
        point: &Point<T, C>,
        k: usize,
    ) -> Result<Nearest<'a, T, C, V, B>> {
        if k == 0 {
            return Err(Error::InvalidArgument("nearest requires k >= 1"));
        }
        if self.is_empty() {
            return Err(Error::EmptyContainer);
        }
        self.check_query_dims(point.dimensions())?;
        Ok(Nearest {
            index: self,
            inner: self.backend.nearest(point.clone()),
            pending: VecDeque::new(),
            lookahead: None,
            remaining: k,
        })
    }

    /// Elements inside the closed `query` box.
    pub fn range<'a>(
        &'a self,
        query: &HyperBox<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.check_query_dims(query.dimensions())?;
        let entries = &self.entries;
        Ok(self
            .backend
            .query_box(query.clone())
            .filter_map(move |slot| {
                let entry = entries.get(slot)?.as_ref()?;
                Some((Key::new(slot, entry.seq), &entry.point, &entry.value))
            }))
    }

    /// Elements strictly outside the closed `query` box.
    pub fn disjoint<'a>(
        &'a self,
        query: &HyperBox<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        self.check_query_dims(query.dimensions())?;
        let query = query.clone();
        Ok(self.iter().filter(move |(_, p, _)| !query.contains(p)))
    }

    /// Elements passing a conjunction of predicates. Tree backends prune
    /// with the filter's bounding box first.
    pub fn satisfies<'a>(
        &'a self,
        filter: &Filter<T, C>,
    ) -> Result<impl Iterator<Item = (Key, &'a Point<T, C>, &'a V)> + 'a> {
        let filter = filter.clone();
        let search: Box<dyn Iterator<Item = usize> + 'a> = match self.dims {
            Some(d) => self.backend.query_box(filter.bounding_box(d)),
            None => Box::new(core::iter::empty()),
        };
        let entries = &self.entries;
        Ok(search.filter_map(move |slot| {
            let entry = entries.get(slot)?.as_ref()?;
            filter
                .matches(&entry.point)
                .then_some((Key::new(slot, entry.seq), &entry.point, &entry.value))
        }))
    }

    /// All elements, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Point<T, C>, &V)> + '_ {
        self.entries.iter().enumerate().filter_map(|(slot, e)| {
            let entry = e.as_ref()?;
            Some((Key::new(slot, entry.seq), &entry.point, &entry.value))
        })
    }

    /// Drop every element. The dimension stays pinned.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free_list.clear();
        self.backend.clear();
        self.len = 0;
        self.generation += 1;
    }
}

impl<T, C, V, B> Debug for IndexGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C> + Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexGeneric")
            .field("len", &self.len)
            .field("dims", &self.dims)
            .field("generation", &self.generation)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Iterator over the `k` nearest elements. Drains the backend's lazy
/// distance-ordered stream one tie-group at a time and replays each group in
/// insertion order.
pub struct Nearest<'a, T: Scalar, C: Coords<T>, V, B: SpatialBackend<T, C>> {
    index: &'a IndexGeneric<T, C, V, B>,
    inner: Box<dyn Iterator<Item = (usize, T::Dist)> + 'a>,
    pending: VecDeque<(usize, T::Dist)>,
    lookahead: Option<(usize, T::Dist)>,
    remaining: usize,
}

impl<'a, T, C, V, B> Iterator for Nearest<'a, T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    type Item = (Key, &'a Point<T, C>, &'a V, T::Dist);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.pending.is_empty() {
            let first = self.lookahead.take().or_else(|| self.inner.next())?;
            let mut group = alloc::vec![first];
            loop {
                match self.inner.next() {
                    Some(e) if e.1 == first.1 => group.push(e),
                    Some(e) => {
                        self.lookahead = Some(e);
                        break;
                    }
                    None => break,
                }
            }
            group.sort_by_key(|&(slot, _)| {
                self.index
                    .entries
                    .get(slot)
                    .and_then(|e| e.as_ref())
                    .map(|e| e.seq)
                    .unwrap_or(u64::MAX)
            });
            self.pending.extend(group);
        }
        let (slot, dist) = self.pending.pop_front()?;
        self.remaining -= 1;
        let entry = self.index.entries.get(slot)?.as_ref()?;
        Some((
            Key::new(slot, entry.seq),
            &entry.point,
            &entry.value,
            dist,
        ))
    }
}
