// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! kd-tree backend: binary space partitioning on `depth mod d` axes with
//! median bulk builds and tombstoned erase.

use alloc::boxed::Box;
use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::{NearEntry, NodeIdx};
use crate::backend::SpatialBackend;
use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::{OrdDist, Scalar};

#[derive(Clone)]
struct KdNode<T: Scalar, C: Coords<T>> {
    slot: usize,
    point: Point<T, C>,
    axis: usize,
    left: Option<NodeIdx>,
    right: Option<NodeIdx>,
    dead: bool,
}

/// kd-tree backend. Erased entries are tombstoned and the tree is rebuilt
/// from its live points once half of it is dead.
#[derive(Clone)]
pub struct KdTree<T: Scalar, C: Coords<T> = Vec<T>> {
    root: Option<NodeIdx>,
    arena: Vec<KdNode<T, C>>,
    free_nodes: Vec<usize>,
    dims: usize,
    live: usize,
    dead: usize,
}

impl<T: Scalar, C: Coords<T>> Default for KdTree<T, C> {
    fn default() -> Self {
        Self {
            root: None,
            arena: Vec::new(),
            free_nodes: Vec::new(),
            dims: 0,
            live: 0,
            dead: 0,
        }
    }
}

impl<T: Scalar, C: Coords<T>> KdTree<T, C> {
    fn alloc(&mut self, node: KdNode<T, C>) -> NodeIdx {
        if let Some(i) = self.free_nodes.pop() {
            self.arena[i] = node;
            NodeIdx::new(i)
        } else {
            self.arena.push(node);
            NodeIdx::new(self.arena.len() - 1)
        }
    }

    /// Insertion rule: ties on the split coordinate descend left, so every
    /// duplicate of a node's point lives in its left subtree.
    fn goes_left(&self, idx: NodeIdx, point: &Point<T, C>) -> bool {
        if self.dims == 0 {
            return true;
        }
        let node = &self.arena[idx.get()];
        point.get(node.axis) <= node.point.get(node.axis)
    }

    fn collect_live(&self, idx: NodeIdx, out: &mut Vec<(usize, Point<T, C>)>) {
        let node = &self.arena[idx.get()];
        if !node.dead {
            out.push((node.slot, node.point.clone()));
        }
        if let Some(l) = node.left {
            self.collect_live(l, out);
        }
        if let Some(r) = node.right {
            self.collect_live(r, out);
        }
    }

    /// Median build. The median index is pushed past duplicates so that
    /// everything right of the node is strictly greater on the split axis,
    /// matching the tie-goes-left insertion rule.
    fn build_rec(&mut self, items: &mut [(usize, Point<T, C>)], depth: usize) -> Option<NodeIdx> {
        if items.is_empty() {
            return None;
        }
        let axis = if self.dims == 0 { 0 } else { depth % self.dims };
        if self.dims > 0 {
            items.sort_unstable_by(|a, b| {
                OrdDist(a.1.get(axis).to_dist()).cmp(&OrdDist(b.1.get(axis).to_dist()))
            });
        }
        let mut mid = items.len() / 2;
        while mid + 1 < items.len()
            && self.dims > 0
            && items[mid + 1].1.get(axis) == items[mid].1.get(axis)
        {
            mid += 1;
        }
        let (slot, point) = items[mid].clone();
        let idx = self.alloc(KdNode {
            slot,
            point,
            axis,
            left: None,
            right: None,
            dead: false,
        });
        // split_at_mut keeps the borrows disjoint
        let (left_items, rest) = items.split_at_mut(mid);
        let right_items = &mut rest[1..];
        let left = self.build_rec(left_items, depth + 1);
        let right = self.build_rec(right_items, depth + 1);
        let node = &mut self.arena[idx.get()];
        node.left = left;
        node.right = right;
        Some(idx)
    }

    fn rebuild(&mut self) {
        let mut items = Vec::with_capacity(self.live);
        if let Some(root_idx) = self.root {
            self.collect_live(root_idx, &mut items);
        }
        let live = items.len();
        self.root = None;
        self.arena.clear();
        self.free_nodes.clear();
        self.root = self.build_rec(&mut items, 0);
        self.live = live;
        self.dead = 0;
    }
}

impl<T: Scalar, C: Coords<T>> SpatialBackend<T, C> for KdTree<T, C> {
    fn insert(&mut self, slot: usize, point: &Point<T, C>) {
        self.dims = point.dimensions();
        let Some(root_idx) = self.root else {
            let idx = self.alloc(KdNode {
                slot,
                point: point.clone(),
                axis: 0,
                left: None,
                right: None,
                dead: false,
            });
            self.root = Some(idx);
            self.live += 1;
            return;
        };
        let mut cur = root_idx;
        loop {
            let left = self.goes_left(cur, point);
            let next = if left {
                self.arena[cur.get()].left
            } else {
                self.arena[cur.get()].right
            };
            match next {
                Some(child) => cur = child,
                None => {
                    let axis = if self.dims == 0 {
                        0
                    } else {
                        (self.arena[cur.get()].axis + 1) % self.dims
                    };
                    let idx = self.alloc(KdNode {
                        slot,
                        point: point.clone(),
                        axis,
                        left: None,
                        right: None,
                        dead: false,
                    });
                    let node = &mut self.arena[cur.get()];
                    if left {
                        node.left = Some(idx);
                    } else {
                        node.right = Some(idx);
                    }
                    self.live += 1;
                    return;
                }
            }
        }
    }

    fn remove(&mut self, slot: usize, point: &Point<T, C>) {
        let mut cur = self.root;
        while let Some(idx) = cur {
            let node = &self.arena[idx.get()];
            if node.slot == slot {
                if !node.dead {
                    self.arena[idx.get()].dead = true;
                    self.live -= 1;
                    self.dead += 1;
                    if self.dead >= self.live && self.dead > 0 {
                        self.rebuild();
                    }
                }
                return;
            }
            cur = if self.goes_left(idx, point) {
                node.left
            } else {
                node.right
            };
        }
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.free_nodes.clear();
        self.live = 0;
        self.dead = 0;
    }

    fn bulk_load(&mut self, items: &[(usize, Point<T, C>)]) {
        self.clear();
        if items.is_empty() {
            return;
        }
        self.dims = items[0].1.dimensions();
        let mut items = items.to_vec();
        self.root = self.build_rec(&mut items, 0);
        self.live = items.len();
    }

    fn query_box<'a>(&'a self, query: HyperBox<T, C>) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(RangeIter {
            tree: self,
            stack: self.root.into_iter().collect(),
            query,
        })
    }

    fn nearest<'a>(
        &'a self,
        query: Point<T, C>,
    ) -> Box<dyn Iterator<Item = (usize, T::Dist)> + 'a> {
        let mut heap = BinaryHeap::new();
        if let Some(root_idx) = self.root {
            let region = HyperBox::everything(self.dims);
            heap.push(Reverse(NearEntry {
                dist: OrdDist(region.distance_to_point(&query)),
                target: Target::Region(root_idx, region),
            }));
        }
        Box::new(NearestIter {
            tree: self,
            query,
            heap,
        })
    }
}

struct RangeIter<'a, T: Scalar, C: Coords<T>> {
    tree: &'a KdTree<T, C>,
    stack: Vec<NodeIdx>,
    query: HyperBox<T, C>,
}

impl<T: Scalar, C: Coords<T>> Iterator for RangeIter<'_, T, C> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while let Some(idx) = self.stack.pop() {
            let node = &self.tree.arena[idx.get()];
            if self.tree.dims == 0 {
                if let Some(l) = node.left {
                    self.stack.push(l);
                }
                if let Some(r) = node.right {
                    self.stack.push(r);
                }
            } else {
                let v = node.point.get(node.axis);
                // left holds <= v, right holds > v
                if let Some(l) = node.left {
                    if self.query.min().get(node.axis) <= v {
                        self.stack.push(l);
                    }
                }
                if let Some(r) = node.right {
                    if self.query.max().get(node.axis) >= v {
                        self.stack.push(r);
                    }
                }
            }
            if !node.dead && self.query.contains(&node.point) {
                return Some(node.slot);
            }
        }
        None
    }
}

enum Target<T: Scalar, C: Coords<T>> {
    Region(NodeIdx, HyperBox<T, C>),
    Single(usize),
}

struct NearestIter<'a, T: Scalar, C: Coords<T>> {
    tree: &'a KdTree<T, C>,
    query: Point<T, C>,
    heap: BinaryHeap<Reverse<NearEntry<T::Dist, Target<T, C>>>>,
}

impl<T: Scalar, C: Coords<T>> Iterator for NearestIter<'_, T, C> {
    type Item = (usize, T::Dist);

    fn next(&mut self) -> Option<(usize, T::Dist)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            match entry.target {
                Target::Single(slot) => return Some((slot, entry.dist.0)),
                Target::Region(idx, region) => {
                    let node = &self.tree.arena[idx.get()];
                    if !node.dead {
                        self.heap.push(Reverse(NearEntry {
                            dist: OrdDist(node.point.distance(&self.query)),
                            target: Target::Single(node.slot),
                        }));
                    }
                    let (left_region, right_region) = if self.tree.dims == 0 {
                        (region.clone(), region)
                    } else {
                        let v = node.point.get(node.axis);
                        (
                            region.with_max_axis(node.axis, v),
                            region.with_min_axis(node.axis, v),
                        )
                    };
                    if let Some(l) = node.left {
                        self.heap.push(Reverse(NearEntry {
                            dist: OrdDist(left_region.distance_to_point(&self.query)),
                            target: Target::Region(l, left_region),
                        }));
                    }
                    if let Some(r) = node.right {
                        self.heap.push(Reverse(NearEntry {
                            dist: OrdDist(right_region.distance_to_point(&self.query)),
                            target: Target::Region(r, right_region),
                        }));
                    }
                }
            }
        }
        None
    }
}

impl<T: Scalar, C: Coords<T>> core::fmt::Debug for KdTree<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KdTree")
            .field("dims", &self.dims)
            .field("live", &self.live)
            .field("dead", &self.dead)
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
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
    fn range_query_prunes_but_finds_everything() {
        let mut t: KdTree<f64> = KdTree::default();
        let mut slot = 0;
        for x in 0..10 {
            for y in 0..10 {
                t.insert(slot, &p2(x as f64, y as f64));
                slot += 1;
            }
        }
        let hits: Vec<usize> = t
            .query_box(HyperBox::new(p2(2.0, 2.0), p2(4.0, 4.0)))
            .collect();
        assert_eq!(hits.len(), 9);
    }

    #[test]
    fn tombstoned_entries_disappear_and_tree_rebuilds() {
        let mut t: KdTree<f64> = KdTree::default();
        for i in 0..16usize {
            t.insert(i, &p2(i as f64, (i * 3 % 16) as f64));
        }
        for i in 0..8usize {
            t.remove(i, &p2(i as f64, (i * 3 % 16) as f64));
        }
        // the eighth tombstone tips dead >= live and triggers a rebuild
        assert_eq!(t.dead, 0);
        let rest: Vec<usize> = t.query_box(HyperBox::everything(2)).collect();
        assert_eq!(rest.len(), 8);
        assert!(rest.iter().all(|&s| s >= 8));
    }

    #[test]
    fn duplicate_coordinates_stay_findable() {
        let mut t: KdTree<f64> = KdTree::default();
        t.insert(0, &p2(1.0, 1.0));
        t.insert(1, &p2(1.0, 1.0));
        t.insert(2, &p2(1.0, 1.0));
        t.remove(1, &p2(1.0, 1.0));
        let mut hits: Vec<usize> = t
            .query_box(HyperBox::from_point(&p2(1.0, 1.0)))
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, alloc::vec![0, 2]);
    }

    #[test]
    fn nearest_visits_in_distance_order() {
        let mut t: KdTree<f64> = KdTree::default();
        t.insert(0, &p2(1.0, 5.0));
        t.insert(1, &p2(2.0, 3.0));
        t.insert(2, &p2(3.0, 1.0));
        let order: Vec<usize> = t.nearest(p2(0.0, 0.0)).map(|(s, _)| s).collect();
        assert_eq!(order, alloc::vec![2, 1, 0]);
    }

    #[test]
    fn median_bulk_build_is_queryable() {
        let items: Vec<(usize, DynPoint<f64>)> = (0..31)
            .map(|i| (i, p2((i % 5) as f64, (i / 5) as f64)))
            .collect();
        let mut t: KdTree<f64> = KdTree::default();
        t.bulk_load(&items);
        let all: Vec<usize> = t.query_box(HyperBox::everything(2)).collect();
        assert_eq!(all.len(), 31);
    }
}
