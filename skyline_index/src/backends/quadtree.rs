// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadtree backend: 2^d-way recursive subdivision keyed by the quadrant
//! bitmask of a point relative to each node's pivot.

use alloc::boxed::Box;
use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::{NearEntry, NodeIdx};
use crate::backend::SpatialBackend;
use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::{Distance, OrdDist, Scalar};

/// Items a leaf may hold before it splits.
const DEFAULT_LEAF_CAPACITY: usize = 8;

#[derive(Clone)]
enum Kind<T: Scalar, C: Coords<T>> {
    Leaf(Vec<(usize, Point<T, C>)>),
    Internal {
        pivot: Point<T, C>,
        children: Vec<Option<NodeIdx>>,
    },
}

#[derive(Clone)]
struct QNode<T: Scalar, C: Coords<T>> {
    bbox: HyperBox<T, C>,
    kind: Kind<T, C>,
}

/// Quadtree backend. The pivot of a node is the first point inserted into
/// it, or the centroid of its items on a bulk build.
#[derive(Clone)]
pub struct QuadTree<T: Scalar, C: Coords<T> = Vec<T>> {
    leaf_capacity: usize,
    root: Option<NodeIdx>,
    arena: Vec<QNode<T, C>>,
    free_nodes: Vec<usize>,
}

impl<T: Scalar, C: Coords<T>> Default for QuadTree<T, C> {
    fn default() -> Self {
        Self::with_leaf_capacity(DEFAULT_LEAF_CAPACITY)
    }
}

impl<T: Scalar, C: Coords<T>> QuadTree<T, C> {
    /// Tree with an explicit leaf capacity (at least 1).
    pub fn with_leaf_capacity(leaf_capacity: usize) -> Self {
        Self {
            leaf_capacity: leaf_capacity.max(1),
            root: None,
            arena: Vec::new(),
            free_nodes: Vec::new(),
        }
    }

    fn alloc(&mut self, node: QNode<T, C>) -> NodeIdx {
        if let Some(i) = self.free_nodes.pop() {
            self.arena[i] = node;
            NodeIdx::new(i)
        } else {
            self.arena.push(node);
            NodeIdx::new(self.arena.len() - 1)
        }
    }

    fn free(&mut self, idx: NodeIdx) {
        self.arena[idx.get()].kind = Kind::Leaf(Vec::new());
        self.free_nodes.push(idx.get());
    }

    fn leaf(&mut self, slot: usize, point: &Point<T, C>) -> NodeIdx {
        self.alloc(QNode {
            bbox: HyperBox::from_point(point),
            kind: Kind::Leaf(alloc::vec![(slot, point.clone())]),
        })
    }

    fn insert_rec(&mut self, idx: NodeIdx, slot: usize, point: &Point<T, C>) {
        self.arena[idx.get()].bbox.extend(point);
        match &mut self.arena[idx.get()].kind {
            Kind::Internal { pivot, children } => {
                let quadrant = pivot.quadrant(point);
                match children[quadrant] {
                    Some(child) => self.insert_rec(child, slot, point),
                    None => {
                        let child = self.leaf(slot, point);
                        if let Kind::Internal { children, .. } = &mut self.arena[idx.get()].kind {
                            children[quadrant] = Some(child);
                        }
                    }
                }
            }
            Kind::Leaf(items) => {
                items.push((slot, point.clone()));
                let all_same = items.iter().all(|(_, p)| *p == items[0].1);
                if items.len() > self.leaf_capacity && !all_same {
                    self.split(idx);
                }
            }
        }
    }

    /// Turn an over-full leaf into an internal node pivoted on its first
    /// inserted point. Leaves of identical points are never split.
    fn split(&mut self, idx: NodeIdx) {
        let items = match &mut self.arena[idx.get()].kind {
            Kind::Leaf(items) => core::mem::take(items),
            Kind::Internal { .. } => return,
        };
        let pivot = items[0].1.clone();
        let dims = pivot.dimensions();
        let children: Vec<Option<NodeIdx>> = alloc::vec![None; 1usize << dims];
        self.arena[idx.get()].kind = Kind::Internal {
            pivot: pivot.clone(),
            children,
        };
        for (slot, point) in items {
            let quadrant = pivot.quadrant(&point);
            let target = match &self.arena[idx.get()].kind {
                Kind::Internal { children, .. } => children[quadrant],
                Kind::Leaf(_) => None,
            };
            match target {
                Some(child) => {
                    // bypass the capacity check while redistributing
                    self.arena[child.get()].bbox.extend(&point);
                    if let Kind::Leaf(items) = &mut self.arena[child.get()].kind {
                        items.push((slot, point));
                    }
                }
                None => {
                    let child = self.leaf(slot, &point);
                    if let Kind::Internal { children, .. } = &mut self.arena[idx.get()].kind {
                        children[quadrant] = Some(child);
                    }
                }
            }
        }
    }

    fn is_empty_node(&self, idx: NodeIdx) -> bool {
        match &self.arena[idx.get()].kind {
            Kind::Leaf(items) => items.is_empty(),
            Kind::Internal { children, .. } => children.iter().all(|c| c.is_none()),
        }
    }

    fn recompute_bbox(&mut self, idx: NodeIdx) {
        let bbox = match &self.arena[idx.get()].kind {
            Kind::Leaf(items) => {
                let mut it = items.iter();
                let Some((_, first)) = it.next() else {
                    return;
                };
                let mut bbox = HyperBox::from_point(first);
                for (_, p) in it {
                    bbox.extend(p);
                }
                bbox
            }
            Kind::Internal { children, .. } => {
                let mut bbox: Option<HyperBox<T, C>> = None;
                for child in children.iter().flatten() {
                    let cb = self.arena[child.get()].bbox.clone();
                    bbox = Some(match bbox {
                        Some(b) => b.union(&cb),
                        None => cb,
                    });
                }
                let Some(bbox) = bbox else {
                    return;
                };
                bbox
            }
        };
        self.arena[idx.get()].bbox = bbox;
    }

    fn remove_rec(&mut self, idx: NodeIdx, slot: usize, point: &Point<T, C>) -> bool {
        let removed = match &mut self.arena[idx.get()].kind {
            Kind::Leaf(items) => {
                let before = items.len();
                items.retain(|(s, _)| *s != slot);
                items.len() != before
            }
            Kind::Internal { pivot, children } => {
                let quadrant = pivot.quadrant(point);
                let Some(child) = children[quadrant] else {
                    return false;
                };
                let removed = self.remove_rec(child, slot, point);
                if removed && self.is_empty_node(child) {
                    self.free(child);
                    if let Kind::Internal { children, .. } = &mut self.arena[idx.get()].kind {
                        children[quadrant] = None;
                    }
                }
                removed
            }
        };
        if removed {
            self.recompute_bbox(idx);
        }
        removed
    }

    fn build_rec(&mut self, items: Vec<(usize, Point<T, C>)>) -> Option<NodeIdx> {
        if items.is_empty() {
            return None;
        }
        let dims = items[0].1.dimensions();
        let mut bbox = HyperBox::from_point(&items[0].1);
        for (_, p) in &items[1..] {
            bbox.extend(p);
        }
        let all_same = items.iter().all(|(_, p)| *p == items[0].1);
        if items.len() <= self.leaf_capacity || all_same || dims == 0 {
            return Some(self.alloc(QNode {
                bbox,
                kind: Kind::Leaf(items),
            }));
        }

        // centroid pivot
        let inv_n = T::Dist::one() / T::Dist::from_usize(items.len());
        let mut pivot = Point::zeros(dims);
        for axis in 0..dims {
            let mut acc = T::Dist::zero();
            for (_, p) in &items {
                acc = acc + p.get(axis).to_dist();
            }
            pivot.set(axis, T::from_dist(acc * inv_n));
        }

        let mut buckets: Vec<Vec<(usize, Point<T, C>)>> = Vec::new();
        buckets.resize_with(1usize << dims, Vec::new);
        let total = items.len();
        for (slot, point) in items {
            let quadrant = pivot.quadrant(&point);
            buckets[quadrant].push((slot, point));
        }
        if buckets.iter().any(|b| b.len() == total) {
            // degenerate pivot; fall back to one big leaf
            let items = buckets.into_iter().flatten().collect();
            return Some(self.alloc(QNode {
                bbox,
                kind: Kind::Leaf(items),
            }));
        }

        let idx = self.alloc(QNode {
            bbox,
            kind: Kind::Internal {
                pivot,
                children: alloc::vec![None; 1usize << dims],
            },
        });
        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            let child = self.build_rec(bucket);
            if let Kind::Internal { children, .. } = &mut self.arena[idx.get()].kind {
                children[quadrant] = child;
            }
        }
        Some(idx)
    }
}

impl<T: Scalar, C: Coords<T>> SpatialBackend<T, C> for QuadTree<T, C> {
    fn insert(&mut self, slot: usize, point: &Point<T, C>) {
        match self.root {
            None => self.root = Some(self.leaf(slot, point)),
            Some(root_idx) => self.insert_rec(root_idx, slot, point),
        }
    }

    fn remove(&mut self, slot: usize, point: &Point<T, C>) {
        let Some(root_idx) = self.root else {
            return;
        };
        if self.remove_rec(root_idx, slot, point) && self.is_empty_node(root_idx) {
            self.free(root_idx);
            self.root = None;
        }
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.free_nodes.clear();
    }

    fn bulk_load(&mut self, items: &[(usize, Point<T, C>)]) {
        self.clear();
        self.root = self.build_rec(items.to_vec());
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
    tree: &'a QuadTree<T, C>,
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
                    match &node.kind {
                        Kind::Leaf(items) => {
                            for (slot, point) in items {
                                if self.query.contains(point) {
                                    self.stack.push(Frame::Hit(*slot));
                                }
                            }
                        }
                        Kind::Internal { children, .. } => {
                            for child in children.iter().flatten() {
                                self.stack.push(Frame::Node(*child));
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
    tree: &'a QuadTree<T, C>,
    query: Point<T, C>,
    heap: BinaryHeap<Reverse<NearEntry<T::Dist, Target>>>,
}

impl<T: Scalar, C: Coords<T>> Iterator for NearestIter<'_, T, C> {
    type Item = (usize, T::Dist);

    fn next(&mut self) -> Option<(usize, T::Dist)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            match entry.target {
                Target::Item(slot) => return Some((slot, entry.dist.0)),
                Target::Node(i) => match &self.tree.arena[i.get()].kind {
                    Kind::Leaf(items) => {
                        for (slot, point) in items {
                            self.heap.push(Reverse(NearEntry {
                                dist: OrdDist(point.distance(&self.query)),
                                target: Target::Item(*slot),
                            }));
                        }
                    }
                    Kind::Internal { children, .. } => {
                        for child in children.iter().flatten() {
                            self.heap.push(Reverse(NearEntry {
                                dist: OrdDist(
                                    self.tree.arena[child.get()]
                                        .bbox
                                        .distance_to_point(&self.query),
                                ),
                                target: Target::Node(*child),
                            }));
                        }
                    }
                },
            }
        }
        None
    }
}

impl<T: Scalar, C: Coords<T>> core::fmt::Debug for QuadTree<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuadTree")
            .field("leaf_capacity", &self.leaf_capacity)
            .field("arena_nodes", &(self.arena.len() - self.free_nodes.len()))
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}
