// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R*-tree backend: overlap-minimal subtree choice, forced reinsertion on
//! the first leaf overflow of an insertion, and margin-driven splits.

use alloc::boxed::Box;
use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::rtree::{DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN};
use super::{NearEntry, NodeIdx};
use crate::backend::SpatialBackend;
use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::{Distance, OrdDist, Scalar};

/// Share of an overflowing leaf evicted for reinsertion.
const REINSERT_SHARE_PERCENT: usize = 30;

#[derive(Clone)]
enum Child<T: Scalar, C: Coords<T>> {
    Node(NodeIdx),
    Item { slot: usize, point: Point<T, C> },
}

#[derive(Clone)]
struct Node<T: Scalar, C: Coords<T>> {
    bbox: HyperBox<T, C>,
    leaf: bool,
    children: Vec<Child<T, C>>,
}

enum Grow<T: Scalar, C: Coords<T>> {
    None,
    Split(NodeIdx),
    Reinsert(Vec<(usize, Point<T, C>)>),
}

/// R*-tree backend.
#[derive(Clone)]
pub struct RStarTree<T: Scalar, C: Coords<T> = Vec<T>> {
    max_children: usize,
    min_children: usize,
    root: Option<NodeIdx>,
    arena: Vec<Node<T, C>>,
    free_nodes: Vec<usize>,
}

impl<T: Scalar, C: Coords<T>> Default for RStarTree<T, C> {
    fn default() -> Self {
        Self::with_branching(DEFAULT_MIN_CHILDREN, DEFAULT_MAX_CHILDREN)
    }
}

impl<T: Scalar, C: Coords<T>> RStarTree<T, C> {
    /// Tree with explicit fan-out bounds, clamped as for
    /// [`RTree::with_branching`](super::RTree::with_branching).
    pub fn with_branching(min_children: usize, max_children: usize) -> Self {
        let max_children = max_children.max(4);
        let min_children = min_children.clamp(2, max_children.div_ceil(2));
        Self {
            max_children,
            min_children,
            root: None,
            arena: Vec::new(),
            free_nodes: Vec::new(),
        }
    }

    fn alloc(&mut self, node: Node<T, C>) -> NodeIdx {
        if let Some(i) = self.free_nodes.pop() {
            self.arena[i] = node;
            NodeIdx::new(i)
        } else {
            self.arena.push(node);
            NodeIdx::new(self.arena.len() - 1)
        }
    }

    fn free(&mut self, idx: NodeIdx) {
        self.arena[idx.get()].children.clear();
        self.free_nodes.push(idx.get());
    }

    fn child_bbox(&self, child: &Child<T, C>) -> HyperBox<T, C> {
        match child {
            Child::Node(i) => self.arena[i.get()].bbox.clone(),
            Child::Item { point, .. } => HyperBox::from_point(point),
        }
    }

    fn recompute_bbox(&mut self, idx: NodeIdx) {
        let mut bbox: Option<HyperBox<T, C>> = None;
        for k in 0..self.arena[idx.get()].children.len() {
            let cb = self.child_bbox(&self.arena[idx.get()].children[k]);
            bbox = Some(match bbox {
                Some(b) => b.union(&cb),
                None => cb,
            });
        }
        if let Some(b) = bbox {
            self.arena[idx.get()].bbox = b;
        }
    }

    /// Choose-subtree. When the children are leaves, minimise overlap
    /// enlargement against the siblings; above that level, volume
    /// enlargement.
    fn choose_child(&self, idx: NodeIdx, point: &Point<T, C>) -> usize {
        let node = &self.arena[idx.get()];
        let pb = HyperBox::from_point(point);
        let child_is_leaf = node.children.iter().any(|c| match c {
            Child::Node(i) => self.arena[i.get()].leaf,
            Child::Item { .. } => false,
        });

        let mut best = 0usize;
        let mut best_cost: Option<(OrdDist<T::Dist>, OrdDist<T::Dist>, OrdDist<T::Dist>)> = None;
        for (k, child) in node.children.iter().enumerate() {
            let cb = self.child_bbox(child);
            let grown = cb.union(&pb);
            let volume = cb.volume();
            let enlargement = grown.volume() - volume;
            let overlap_growth = if child_is_leaf {
                let mut before = T::Dist::zero();
                let mut after = T::Dist::zero();
                for (j, sibling) in node.children.iter().enumerate() {
                    if j == k {
                        continue;
                    }
                    let sb = self.child_bbox(sibling);
                    before = before + cb.overlap(&sb);
                    after = after + grown.overlap(&sb);
                }
                after - before
            } else {
                T::Dist::zero()
            };
            let cost = (
                OrdDist(overlap_growth),
                OrdDist(enlargement),
                OrdDist(volume),
            );
            if best_cost.map(|bc| cost < bc).unwrap_or(true) {
                best_cost = Some(cost);
                best = k;
            }
        }
        best
    }

    fn insert_rec(
        &mut self,
        idx: NodeIdx,
        slot: usize,
        point: &Point<T, C>,
        allow_reinsert: bool,
    ) -> Grow<T, C> {
        if self.arena[idx.get()].leaf {
            let node = &mut self.arena[idx.get()];
            node.children.push(Child::Item {
                slot,
                point: point.clone(),
            });
            node.bbox.extend(point);
            if node.children.len() <= self.max_children {
                return Grow::None;
            }
            if allow_reinsert {
                return Grow::Reinsert(self.evict_farthest(idx));
            }
            return Grow::Split(self.split(idx));
        }

        let chosen = self.choose_child(idx, point);
        let child_idx = match self.arena[idx.get()].children[chosen] {
            Child::Node(i) => i,
            Child::Item { .. } => unreachable!("item child in internal node"),
        };
        let grow = self.insert_rec(child_idx, slot, point, allow_reinsert);
        self.recompute_bbox(idx);
        match grow {
            Grow::None => Grow::None,
            Grow::Reinsert(entries) => Grow::Reinsert(entries),
            Grow::Split(right) => {
                self.arena[idx.get()]
                    .children
                    .insert(chosen + 1, Child::Node(right));
                if self.arena[idx.get()].children.len() > self.max_children {
                    Grow::Split(self.split(idx))
                } else {
                    Grow::None
                }
            }
        }
    }

    /// Remove the 30% of a leaf's items farthest from its centroid, farthest
    /// first, and shrink the leaf's box.
    fn evict_farthest(&mut self, idx: NodeIdx) -> Vec<(usize, Point<T, C>)> {
        let center = self.arena[idx.get()].bbox.center();
        let node = &mut self.arena[idx.get()];
        let mut ranked: Vec<(OrdDist<T::Dist>, usize)> = node
            .children
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let d = match c {
                    Child::Item { point, .. } => {
                        let mut acc = T::Dist::zero();
                        for (axis, &c0) in center.iter().enumerate() {
                            let d = point.get(axis).to_dist() - c0;
                            acc = acc + d * d;
                        }
                        acc
                    }
                    Child::Node(_) => T::Dist::zero(),
                };
                (OrdDist(d), k)
            })
            .collect();
        ranked.sort();
        let count = (node.children.len() * REINSERT_SHARE_PERCENT / 100).max(1);
        let evicted_positions: Vec<usize> =
            ranked.iter().rev().take(count).map(|&(_, k)| k).collect();

        let children = core::mem::take(&mut node.children);
        let mut evicted = Vec::with_capacity(count);
        let mut kept = Vec::with_capacity(children.len() - count);
        for (k, child) in children.into_iter().enumerate() {
            if evicted_positions.contains(&k) {
                if let Child::Item { slot, point } = child {
                    evicted.push((slot, point));
                }
            } else {
                kept.push(child);
            }
        }
        self.arena[idx.get()].children = kept;
        self.recompute_bbox(idx);
        evicted
    }

    /// R* split: the axis minimising the summed margins of all candidate
    /// distributions, then the distribution minimising overlap.
    fn split(&mut self, idx: NodeIdx) -> NodeIdx {
        let leaf = self.arena[idx.get()].leaf;
        let children = core::mem::take(&mut self.arena[idx.get()].children);
        let boxes: Vec<HyperBox<T, C>> = children.iter().map(|c| self.child_bbox(c)).collect();
        let n = children.len();
        let m = self.min_children;
        let dims = boxes[0].dimensions();

        let mut best_axis = 0usize;
        let mut best_axis_margin: Option<OrdDist<T::Dist>> = None;
        for axis in 0..dims.max(1) {
            let mut margin_sum = T::Dist::zero();
            for lower_sort in [true, false] {
                let order = Self::sorted_order(&boxes, axis.min(dims.saturating_sub(1)), lower_sort);
                let (prefix, suffix) = Self::sweep_bounds(&boxes, &order);
                for k in m..=(n - m) {
                    margin_sum = margin_sum + prefix[k - 1].margin() + suffix[k].margin();
                }
            }
            if best_axis_margin
                .map(|bm| OrdDist(margin_sum) < bm)
                .unwrap_or(true)
            {
                best_axis_margin = Some(OrdDist(margin_sum));
                best_axis = axis;
            }
        }

        let mut best_split: Option<(OrdDist<T::Dist>, OrdDist<T::Dist>, Vec<usize>, usize)> = None;
        for lower_sort in [true, false] {
            let order = Self::sorted_order(
                &boxes,
                best_axis.min(dims.saturating_sub(1)),
                lower_sort,
            );
            let (prefix, suffix) = Self::sweep_bounds(&boxes, &order);
            for k in m..=(n - m) {
                let overlap = prefix[k - 1].overlap(&suffix[k]);
                let volume = prefix[k - 1].volume() + suffix[k].volume();
                let cost = (OrdDist(overlap), OrdDist(volume));
                if best_split
                    .as_ref()
                    .map(|(o, v, _, _)| cost < (*o, *v))
                    .unwrap_or(true)
                {
                    best_split = Some((cost.0, cost.1, order.clone(), k));
                }
            }
        }
        let (_, _, order, k) = best_split.expect("split requires overflow");

        let mut slots: Vec<Option<Child<T, C>>> = children.into_iter().map(Some).collect();
        let mut left = Vec::with_capacity(k);
        let mut right = Vec::with_capacity(n - k);
        for (pos, &ci) in order.iter().enumerate() {
            let child = slots[ci].take().expect("distribution order is a permutation");
            if pos < k {
                left.push(child);
            } else {
                right.push(child);
            }
        }

        let left_bbox = Self::bbox_of(&boxes, &order[..k]);
        let right_bbox = Self::bbox_of(&boxes, &order[k..]);
        let node = &mut self.arena[idx.get()];
        node.children = left;
        node.bbox = left_bbox;
        node.leaf = leaf;
        self.alloc(Node {
            bbox: right_bbox,
            leaf,
            children: right,
        })
    }

    fn sorted_order(boxes: &[HyperBox<T, C>], axis: usize, lower: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..boxes.len()).collect();
        order.sort_by_key(|&i| {
            let b = &boxes[i];
            if b.dimensions() == 0 {
                return OrdDist(T::Dist::zero());
            }
            let v = if lower {
                b.min().get(axis)
            } else {
                b.max().get(axis)
            };
            OrdDist(v.to_dist())
        });
        order
    }

    fn sweep_bounds(
        boxes: &[HyperBox<T, C>],
        order: &[usize],
    ) -> (Vec<HyperBox<T, C>>, Vec<HyperBox<T, C>>) {
        let n = order.len();
        let mut prefix: Vec<HyperBox<T, C>> = Vec::with_capacity(n);
        for (pos, &i) in order.iter().enumerate() {
            let bb = boxes[i].clone();
            prefix.push(match pos {
                0 => bb,
                _ => prefix[pos - 1].union(&bb),
            });
        }
        let mut suffix: Vec<HyperBox<T, C>> = Vec::with_capacity(n);
        for (rev, &i) in order.iter().rev().enumerate() {
            let bb = boxes[i].clone();
            suffix.push(match rev {
                0 => bb,
                _ => suffix[rev - 1].union(&bb),
            });
        }
        suffix.reverse();
        (prefix, suffix)
    }

    fn bbox_of(boxes: &[HyperBox<T, C>], members: &[usize]) -> HyperBox<T, C> {
        let mut it = members.iter();
        let first = it
            .next()
            .map(|&i| boxes[i].clone())
            .expect("split groups are non-empty");
        it.fold(first, |acc, &i| acc.union(&boxes[i]))
    }

    fn remove_rec(
        &mut self,
        idx: NodeIdx,
        slot: usize,
        point: &Point<T, C>,
        orphans: &mut Vec<(usize, Point<T, C>)>,
    ) -> bool {
        if !self.arena[idx.get()].bbox.contains(point) {
            return false;
        }
        if self.arena[idx.get()].leaf {
            let node = &mut self.arena[idx.get()];
            let before = node.children.len();
            node.children.retain(|c| match c {
                Child::Item { slot: s, .. } => *s != slot,
                Child::Node(_) => true,
            });
            if node.children.len() != before {
                self.recompute_bbox(idx);
                return true;
            }
            false
        } else {
            let child_nodes: Vec<(usize, NodeIdx)> = self.arena[idx.get()]
                .children
                .iter()
                .enumerate()
                .filter_map(|(pos, c)| match c {
                    Child::Node(i) => Some((pos, *i)),
                    Child::Item { .. } => None,
                })
                .collect();
            for (pos, ci) in child_nodes {
                if self.remove_rec(ci, slot, point, orphans) {
                    if self.arena[ci.get()].children.len() < self.min_children {
                        self.collect_items(ci, orphans);
                        self.arena[idx.get()].children.remove(pos);
                    }
                    if !self.arena[idx.get()].children.is_empty() {
                        self.recompute_bbox(idx);
                    }
                    return true;
                }
            }
            false
        }
    }

    fn collect_items(&mut self, idx: NodeIdx, orphans: &mut Vec<(usize, Point<T, C>)>) {
        let children = core::mem::take(&mut self.arena[idx.get()].children);
        for child in children {
            match child {
                Child::Node(ci) => self.collect_items(ci, orphans),
                Child::Item { slot, point } => orphans.push((slot, point)),
            }
        }
        self.free(idx);
    }

    fn insert_once(&mut self, slot: usize, point: &Point<T, C>, allow_reinsert: bool) {
        match self.root {
            None => {
                let bbox = HyperBox::from_point(point);
                let idx = self.alloc(Node {
                    bbox,
                    leaf: true,
                    children: alloc::vec![Child::Item {
                        slot,
                        point: point.clone(),
                    }],
                });
                self.root = Some(idx);
            }
            Some(root_idx) => match self.insert_rec(root_idx, slot, point, allow_reinsert) {
                Grow::None => {}
                Grow::Split(right) => {
                    let bbox = self.arena[root_idx.get()]
                        .bbox
                        .union(&self.arena[right.get()].bbox);
                    let new_root = self.alloc(Node {
                        bbox,
                        leaf: false,
                        children: alloc::vec![Child::Node(root_idx), Child::Node(right)],
                    });
                    self.root = Some(new_root);
                }
                Grow::Reinsert(entries) => {
                    for (s, p) in entries {
                        self.insert_once(s, &p, false);
                    }
                }
            },
        }
    }
}

impl<T: Scalar, C: Coords<T>> SpatialBackend<T, C> for RStarTree<T, C> {
    fn insert(&mut self, slot: usize, point: &Point<T, C>) {
        self.insert_once(slot, point, true);
    }

    fn remove(&mut self, slot: usize, point: &Point<T, C>) {
        let Some(root_idx) = self.root else {
            return;
        };
        let mut orphans = Vec::new();
        let removed = self.remove_rec(root_idx, slot, point, &mut orphans);
        if removed {
            if self.arena[root_idx.get()].children.is_empty() {
                self.free(root_idx);
                self.root = None;
            } else if !self.arena[root_idx.get()].leaf
                && self.arena[root_idx.get()].children.len() == 1
            {
                if let Child::Node(only) = self.arena[root_idx.get()].children[0] {
                    self.free(root_idx);
                    self.root = Some(only);
                }
            }
        }
        for (s, p) in orphans {
            self.insert(s, &p);
        }
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.free_nodes.clear();
    }

    fn bulk_load(&mut self, items: &[(usize, Point<T, C>)]) {
        self.clear();
        if items.is_empty() {
            return;
        }
        let dims = items[0].1.dimensions();
        let mut sorted: Vec<(usize, Point<T, C>)> = items.to_vec();
        if dims > 0 {
            sorted.sort_by_key(|(_, p)| OrdDist(p.get(0).to_dist()));
        }

        let mut level: Vec<NodeIdx> = Vec::new();
        for chunk in sorted.chunks(self.max_children) {
            let mut bbox = HyperBox::from_point(&chunk[0].1);
            for (_, p) in &chunk[1..] {
                bbox.extend(p);
            }
            let children = chunk
                .iter()
                .map(|(slot, point)| Child::Item {
                    slot: *slot,
                    point: point.clone(),
                })
                .collect();
            let idx = self.alloc(Node {
                bbox,
                leaf: true,
                children,
            });
            level.push(idx);
        }

        let mut axis = 1usize;
        while level.len() > 1 {
            if dims > 0 {
                let key_axis = axis % dims;
                level.sort_by_key(|&i| OrdDist(self.arena[i.get()].bbox.center()[key_axis]));
            }
            let mut next: Vec<NodeIdx> = Vec::new();
            let groups: Vec<Vec<NodeIdx>> = level
                .chunks(self.max_children)
                .map(|c| c.to_vec())
                .collect();
            for group in groups {
                let mut bbox = self.arena[group[0].get()].bbox.clone();
                for i in &group[1..] {
                    bbox = bbox.union(&self.arena[i.get()].bbox);
                }
                let children = group.into_iter().map(Child::Node).collect();
                let idx = self.alloc(Node {
                    bbox,
                    leaf: false,
                    children,
                });
                next.push(idx);
            }
            level = next;
            axis += 1;
        }
        self.root = Some(level[0]);
    }

    fn query_box<'a>(&'a self, query: HyperBox<T, C>) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(RangeIter {
            tree: self,
            stack: self.root.into_iter().map(Frame::Node).collect(),
            query,
        })
    }

    fn nearest<'a>(
        &'a self,
        query: Point<T, C>,
    ) -> Box<dyn Iterator<Item = (usize, T::Dist)> + 'a> {
        let mut heap = BinaryHeap::new();
        if let Some(root_idx) = self.root {
            heap.push(Reverse(NearEntry {
                dist: OrdDist(self.arena[root_idx.get()].bbox.distance_to_point(&query)),
                target: Target::Node(root_idx),
            }));
        }
        Box::new(NearestIter {
            tree: self,
            query,
            heap,
        })
    }
}

enum Frame {
    Node(NodeIdx),
    Hit(usize),
}

struct RangeIter<'a, T: Scalar, C: Coords<T>> {
    tree: &'a RStarTree<T, C>,
    stack: Vec<Frame>,
    query: HyperBox<T, C>,
}

impl<T: Scalar, C: Coords<T>> Iterator for RangeIter<'_, T, C> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Hit(slot) => return Some(slot),
                Frame::Node(i) => {
                    let node = &self.tree.arena[i.get()];
                    if !node.bbox.intersects(&self.query) {
                        continue;
                    }
                    for child in &node.children {
                        match child {
                            Child::Node(ci) => self.stack.push(Frame::Node(*ci)),
                            Child::Item { slot, point } => {
                                if self.query.contains(point) {
                                    self.stack.push(Frame::Hit(*slot));
                                }
                            }
                        }
                    }
                }
            }
        }
        None
    }
}

enum Target {
    Item(usize),
    Node(NodeIdx),
}

struct NearestIter<'a, T: Scalar, C: Coords<T>> {
    tree: &'a RStarTree<T, C>,
    query: Point<T, C>,
    heap: BinaryHeap<Reverse<NearEntry<T::Dist, Target>>>,
}

impl<T: Scalar, C: Coords<T>> Iterator for NearestIter<'_, T, C> {
    type Item = (usize, T::Dist);

    fn next(&mut self) -> Option<(usize, T::Dist)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            match entry.target {
                Target::Item(slot) => return Some((slot, entry.dist.0)),
                Target::Node(i) => {
                    let node = &self.tree.arena[i.get()];
                    for child in &node.children {
                        let e = match child {
                            Child::Node(ci) => NearEntry {
                                dist: OrdDist(
                                    self.tree.arena[ci.get()].bbox.distance_to_point(&self.query),
                                ),
                                target: Target::Node(*ci),
                            },
                            Child::Item { slot, point } => NearEntry {
                                dist: OrdDist(point.distance(&self.query)),
                                target: Target::Item(*slot),
                            },
                        };
                        self.heap.push(Reverse(e));
                    }
                }
            }
        }
        None
    }
}

impl<T: Scalar, C: Coords<T>> core::fmt::Debug for RStarTree<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RStarTree")
            .field("max_children", &self.max_children)
            .field("min_children", &self.min_children)
            .field("arena_nodes", &(self.arena.len() - self.free_nodes.len()))
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
    fn overflow_reinserts_then_splits() {
        let mut t: RStarTree<f64> = RStarTree::default();
        for i in 0..200usize {
            let x = (i % 20) as f64;
            let y = (i / 20) as f64;
            t.insert(i, &p2(x, y));
        }
        let all: Vec<usize> = t.query_box(HyperBox::everything(2)).collect();
        assert_eq!(all.len(), 200);
        let hits: Vec<usize> = t
            .query_box(HyperBox::new(p2(0.0, 0.0), p2(3.0, 0.0)))
            .collect();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn remove_keeps_structure_queryable() {
        let mut t: RStarTree<f64> = RStarTree::default();
        for i in 0..100usize {
            t.insert(i, &p2((i % 10) as f64, (i / 10) as f64));
        }
        for i in 0..50usize {
            t.remove(i, &p2((i % 10) as f64, (i / 10) as f64));
        }
        let rest: Vec<usize> = t.query_box(HyperBox::everything(2)).collect();
        assert_eq!(rest.len(), 50);
        assert!(rest.iter().all(|&s| s >= 50));
    }

    #[test]
    fn nearest_is_nondecreasing() {
        let mut t: RStarTree<f64> = RStarTree::default();
        for i in 0..64usize {
            t.insert(i, &p2((i % 8) as f64, (i / 8) as f64));
        }
        let dists: Vec<f64> = t.nearest(p2(3.4, 3.4)).map(|(_, d)| d).collect();
        assert_eq!(dists.len(), 64);
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
    }
}
