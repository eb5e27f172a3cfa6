// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree backend: bounding-box tree with least-enlargement descent and
//! Guttman's quadratic split.

use alloc::boxed::Box;
use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::{NearEntry, NodeIdx};
use crate::backend::SpatialBackend;
use crate::point::{Coords, Point};
use crate::query::HyperBox;
use crate::types::{Distance, OrdDist, Scalar};

/// Default maximum fan-out. 16 child records keep a node within a few cache
/// lines for the common f64 case.
pub(crate) const DEFAULT_MAX_CHILDREN: usize = 16;

/// Default minimum fan-out.
pub(crate) const DEFAULT_MIN_CHILDREN: usize = 6;

#[derive(Clone)]
pub(crate) enum RChild<T: Scalar, C: Coords<T>> {
    Node(NodeIdx),
    Item { slot: usize, point: Point<T, C> },
}

#[derive(Clone)]
pub(crate) struct RNode<T: Scalar, C: Coords<T>> {
    pub(crate) bbox: HyperBox<T, C>,
    pub(crate) leaf: bool,
    pub(crate) children: Vec<RChild<T, C>>,
}

/// R-tree backend with quadratic splits.
#[derive(Clone)]
pub struct RTree<T: Scalar, C: Coords<T> = Vec<T>> {
    max_children: usize,
    min_children: usize,
    root: Option<NodeIdx>,
    arena: Vec<RNode<T, C>>,
    free_nodes: Vec<usize>,
}

impl<T: Scalar, C: Coords<T>> Default for RTree<T, C> {
    fn default() -> Self {
        Self::with_branching(DEFAULT_MIN_CHILDREN, DEFAULT_MAX_CHILDREN)
    }
}

impl<T: Scalar, C: Coords<T>> RTree<T, C> {
    /// Tree with explicit fan-out bounds. `max` is clamped to at least 4 and
    /// `min` to `2 ..= ceil(max / 2)`.
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

    fn alloc(&mut self, node: RNode<T, C>) -> NodeIdx {
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

    fn child_bbox(&self, child: &RChild<T, C>) -> HyperBox<T, C> {
        match child {
            RChild::Node(i) => self.arena[i.get()].bbox.clone(),
            RChild::Item { point, .. } => HyperBox::from_point(point),
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

    /// Least volume enlargement, ties by smaller volume.
    fn choose_child(&self, idx: NodeIdx, point: &Point<T, C>) -> usize {
        let node = &self.arena[idx.get()];
        let pb = HyperBox::from_point(point);
        let mut best = 0usize;
        let mut best_cost: Option<(OrdDist<T::Dist>, OrdDist<T::Dist>)> = None;
        for (k, child) in node.children.iter().enumerate() {
            let cb = self.child_bbox(child);
            let volume = cb.volume();
            let enlargement = cb.union(&pb).volume() - volume;
            let cost = (OrdDist(enlargement), OrdDist(volume));
            if best_cost.map(|bc| cost < bc).unwrap_or(true) {
                best_cost = Some(cost);
                best = k;
            }
        }
        best
    }

    fn insert_rec(&mut self, idx: NodeIdx, slot: usize, point: &Point<T, C>) -> Option<NodeIdx> {
        if self.arena[idx.get()].leaf {
            let node = &mut self.arena[idx.get()];
            node.children.push(RChild::Item {
                slot,
                point: point.clone(),
            });
            node.bbox.extend(point);
            if node.children.len() > self.max_children {
                return Some(self.split(idx));
            }
            None
        } else {
            let chosen = self.choose_child(idx, point);
            let child_idx = match self.arena[idx.get()].children[chosen] {
                RChild::Node(i) => i,
                // internal nodes only hold node children
                RChild::Item { .. } => unreachable!("item child in internal node"),
            };
            let split = self.insert_rec(child_idx, slot, point);
            self.arena[idx.get()].bbox.extend(point);
            if let Some(right) = split {
                self.arena[idx.get()]
                    .children
                    .insert(chosen + 1, RChild::Node(right));
                if self.arena[idx.get()].children.len() > self.max_children {
                    return Some(self.split(idx));
                }
            }
            None
        }
    }

    /// Guttman's quadratic split: seed with the pair wasting the most volume,
    /// then distribute greedily by group enlargement.
    fn split(&mut self, idx: NodeIdx) -> NodeIdx {
        let leaf = self.arena[idx.get()].leaf;
        let children = core::mem::take(&mut self.arena[idx.get()].children);
        let boxes: Vec<HyperBox<T, C>> = children.iter().map(|c| self.child_bbox(c)).collect();
        let n = children.len();

        let mut seed_a = 0usize;
        let mut seed_b = 1usize;
        let mut worst: Option<OrdDist<T::Dist>> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                let waste =
                    boxes[i].union(&boxes[j]).volume() - boxes[i].volume() - boxes[j].volume();
                let waste = OrdDist(waste);
                if worst.map(|w| waste > w).unwrap_or(true) {
                    worst = Some(waste);
                    seed_a = i;
                    seed_b = j;
                }
            }
        }

        let mut group_a: Vec<usize> = alloc::vec![seed_a];
        let mut group_b: Vec<usize> = alloc::vec![seed_b];
        let mut bbox_a = boxes[seed_a].clone();
        let mut bbox_b = boxes[seed_b].clone();
        let mut remaining: Vec<usize> = (0..n).filter(|&k| k != seed_a && k != seed_b).collect();

        while !remaining.is_empty() {
            // force-fill a group that must take everything to reach min fill
            if group_a.len() + remaining.len() == self.min_children {
                for k in remaining.drain(..) {
                    bbox_a = bbox_a.union(&boxes[k]);
                    group_a.push(k);
                }
                break;
            }
            if group_b.len() + remaining.len() == self.min_children {
                for k in remaining.drain(..) {
                    bbox_b = bbox_b.union(&boxes[k]);
                    group_b.push(k);
                }
                break;
            }

            // pick the entry with the strongest preference
            let mut pick_pos = remaining.len() - 1;
            let mut pick_gap: Option<OrdDist<T::Dist>> = None;
            for (pos, &k) in remaining.iter().enumerate() {
                let da = bbox_a.union(&boxes[k]).volume() - bbox_a.volume();
                let db = bbox_b.union(&boxes[k]).volume() - bbox_b.volume();
                let gap = OrdDist((da - db).abs());
                if pick_gap.map(|g| gap > g).unwrap_or(true) {
                    pick_gap = Some(gap);
                    pick_pos = pos;
                }
            }
            let k = remaining.swap_remove(pick_pos);
            let da = bbox_a.union(&boxes[k]).volume() - bbox_a.volume();
            let db = bbox_b.union(&boxes[k]).volume() - bbox_b.volume();
            let to_a = match OrdDist(da).cmp(&OrdDist(db)) {
                core::cmp::Ordering::Less => true,
                core::cmp::Ordering::Greater => false,
                core::cmp::Ordering::Equal => match OrdDist(bbox_a.volume())
                    .cmp(&OrdDist(bbox_b.volume()))
                {
                    core::cmp::Ordering::Less => true,
                    core::cmp::Ordering::Greater => false,
                    core::cmp::Ordering::Equal => group_a.len() <= group_b.len(),
                },
            };
            if to_a {
                bbox_a = bbox_a.union(&boxes[k]);
                group_a.push(k);
            } else {
                bbox_b = bbox_b.union(&boxes[k]);
                group_b.push(k);
            }
        }

        let mut children = children.into_iter().map(Some).collect::<Vec<_>>();
        let take = |children: &mut Vec<Option<RChild<T, C>>>, group: &[usize]| {
            group
                .iter()
                .map(|&k| children[k].take().expect("split group indices are disjoint"))
                .collect::<Vec<_>>()
        };
        let left = take(&mut children, &group_a);
        let right = take(&mut children, &group_b);

        let node = &mut self.arena[idx.get()];
        node.children = left;
        node.bbox = bbox_a;
        node.leaf = leaf;
        self.alloc(RNode {
            bbox: bbox_b,
            leaf,
            children: right,
        })
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
                RChild::Item { slot: s, .. } => *s != slot,
                RChild::Node(_) => true,
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
                    RChild::Node(i) => Some((pos, *i)),
                    RChild::Item { .. } => None,
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

    /// Gather every item under `idx` into `orphans` and free the subtree.
    fn collect_items(&mut self, idx: NodeIdx, orphans: &mut Vec<(usize, Point<T, C>)>) {
        let children = core::mem::take(&mut self.arena[idx.get()].children);
        for child in children {
            match child {
                RChild::Node(ci) => self.collect_items(ci, orphans),
                RChild::Item { slot, point } => orphans.push((slot, point)),
            }
        }
        self.free(idx);
    }
}

impl<T: Scalar, C: Coords<T>> SpatialBackend<T, C> for RTree<T, C> {
    fn insert(&mut self, slot: usize, point: &Point<T, C>) {
        match self.root {
            None => {
                let bbox = HyperBox::from_point(point);
                let idx = self.alloc(RNode {
                    bbox,
                    leaf: true,
                    children: alloc::vec![RChild::Item {
                        slot,
                        point: point.clone(),
                    }],
                });
                self.root = Some(idx);
            }
            Some(root_idx) => {
                if let Some(right) = self.insert_rec(root_idx, slot, point) {
                    let bbox = self.arena[root_idx.get()]
                        .bbox
                        .union(&self.arena[right.get()].bbox);
                    let new_root = self.alloc(RNode {
                        bbox,
                        leaf: false,
                        children: alloc::vec![RChild::Node(root_idx), RChild::Node(right)],
                    });
                    self.root = Some(new_root);
                }
            }
        }
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
                if let RChild::Node(only) = self.arena[root_idx.get()].children[0] {
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

    /// Packed bulk build: sort-and-chunk each level along a rotating axis.
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
                .map(|(slot, point)| RChild::Item {
                    slot: *slot,
                    point: point.clone(),
                })
                .collect();
            let idx = self.alloc(RNode {
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
                let children = group.into_iter().map(RChild::Node).collect();
                let idx = self.alloc(RNode {
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
    tree: &'a RTree<T, C>,
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
                            RChild::Node(ci) => self.stack.push(Frame::Node(*ci)),
                            RChild::Item { slot, point } => {
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
    tree: &'a RTree<T, C>,
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
                            RChild::Node(ci) => NearEntry {
                                dist: OrdDist(
                                    self.tree.arena[ci.get()].bbox.distance_to_point(&self.query),
                                ),
                                target: Target::Node(*ci),
                            },
                            RChild::Item { slot, point } => NearEntry {
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

impl<T: Scalar, C: Coords<T>> core::fmt::Debug for RTree<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("max_children", &self.max_children)
            .field("min_children", &self.min_children)
            .field("arena_nodes", &(self.arena.len() - self.free_nodes.len()))
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}
