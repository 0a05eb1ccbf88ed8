// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree backend generic over scalar `T: Scalar` with SAH-like split and STR bulk loading.

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::{Aabb2D, Scalar, ScalarAcc, area, union_aabb};

const DEFAULT_MAX_CHILDREN: usize = 8;
const DEFAULT_MIN_CHILDREN: usize = 4;

/// R-tree backend using SAH-like splits and widened accumulator metrics.
///
/// Single-item inserts and removals keep the tree valid but degrade its packing over time;
/// [`Backend::bulk_load`] rebuilds a packed tree from every live slot plus the new batch.
pub struct RTree<T: Scalar> {
    max_children: usize,
    min_children: usize,
    root: Option<NodeIdx>,
    arena: Vec<RNode<T>>,
    slots: Vec<Option<Aabb2D<T>>>,
}

#[derive(Clone)]
struct RNode<T: Scalar> {
    bbox: Aabb2D<T>,
    leaf: bool,
    children: Vec<RChild<T>>,
}

#[derive(Clone)]
enum RChild<T: Scalar> {
    Node(NodeIdx),
    Item { slot: usize, bbox: Aabb2D<T> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(usize);

impl NodeIdx {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    const fn get(self) -> usize {
        self.0
    }
}

impl<T: Scalar> Default for RTree<T> {
    fn default() -> Self {
        Self {
            max_children: DEFAULT_MAX_CHILDREN,
            min_children: DEFAULT_MIN_CHILDREN,
            root: None,
            arena: Vec::new(),
            slots: Vec::new(),
        }
    }
}

type RChildren<T> = Vec<RChild<T>>;
type RBestSplit<T> = Option<(ScalarAcc<T>, RChildren<T>, RChildren<T>)>;

fn cmp_partial<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

impl<T: Scalar> RTree<T> {
    /// Number of nodes currently held by the arena, including nodes orphaned by removals.
    ///
    /// Grows with single-item mutation and shrinks back on a packed rebuild.
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    fn ensure_slot(&mut self, slot: usize, bbox: Aabb2D<T>) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(bbox);
    }

    fn centroid_x_of_aabb(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_x, a.max_x)
    }

    fn centroid_y_of_aabb(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_y, a.max_y)
    }

    /// Smallest `g` with `g * g >= n`: the number of vertical slices for an STR pass.
    fn slice_count(n: usize) -> usize {
        let mut g = 1_usize;
        while g * g < n {
            g += 1;
        }
        g
    }

    /// STR-like bulk builder: creates a packed tree from items in one pass into `arena`.
    fn bulk_build_nodes(
        arena: &mut Vec<RNode<T>>,
        items: &mut [(usize, Aabb2D<T>)],
        max_children: usize,
    ) -> Option<NodeIdx> {
        if items.is_empty() {
            return None;
        }

        // Leaf level.
        let n = items.len();
        let gx = Self::slice_count(n.div_ceil(max_children));
        items.sort_by(|a, b| {
            cmp_partial(
                &Self::centroid_x_of_aabb(&a.1),
                &Self::centroid_x_of_aabb(&b.1),
            )
        });
        let slice_size = n.div_ceil(gx);
        let mut level: Vec<usize> = Vec::new();
        for slice in items.chunks_mut(slice_size) {
            slice.sort_by(|a, b| {
                cmp_partial(
                    &Self::centroid_y_of_aabb(&a.1),
                    &Self::centroid_y_of_aabb(&b.1),
                )
            });
            for chunk in slice.chunks(max_children) {
                let children: RChildren<T> = chunk
                    .iter()
                    .map(|&(slot, bbox)| RChild::Item { slot, bbox })
                    .collect();
                let bbox = Self::node_bbox(arena, &children);
                level.push(arena.len());
                arena.push(RNode {
                    bbox,
                    leaf: true,
                    children,
                });
            }
        }

        // Promote until at most `max_children` nodes remain.
        while level.len() > max_children {
            let n_nodes = level.len();
            let gx = Self::slice_count(n_nodes.div_ceil(max_children));
            level.sort_by(|&a, &b| {
                cmp_partial(
                    &Self::centroid_x_of_aabb(&arena[a].bbox),
                    &Self::centroid_x_of_aabb(&arena[b].bbox),
                )
            });
            let slice_size = n_nodes.div_ceil(gx);
            let mut next: Vec<usize> = Vec::new();
            for slice in level.chunks_mut(slice_size) {
                slice.sort_by(|&a, &b| {
                    cmp_partial(
                        &Self::centroid_y_of_aabb(&arena[a].bbox),
                        &Self::centroid_y_of_aabb(&arena[b].bbox),
                    )
                });
                for chunk in slice.chunks(max_children) {
                    let children: RChildren<T> = chunk
                        .iter()
                        .map(|&i| RChild::Node(NodeIdx::new(i)))
                        .collect();
                    let bbox = Self::node_bbox(arena, &children);
                    next.push(arena.len());
                    arena.push(RNode {
                        bbox,
                        leaf: false,
                        children,
                    });
                }
            }
            level = next;
        }

        if level.len() == 1 {
            return Some(NodeIdx::new(level[0]));
        }
        let children: RChildren<T> = level
            .into_iter()
            .map(|i| RChild::Node(NodeIdx::new(i)))
            .collect();
        let bbox = Self::node_bbox(arena, &children);
        let root_idx = arena.len();
        arena.push(RNode {
            bbox,
            leaf: false,
            children,
        });
        Some(NodeIdx::new(root_idx))
    }

    fn child_bbox(arena: &[RNode<T>], child: &RChild<T>) -> Aabb2D<T> {
        match child {
            RChild::Node(i) => arena[i.get()].bbox,
            RChild::Item { bbox, .. } => *bbox,
        }
    }

    fn node_bbox(arena: &[RNode<T>], children: &[RChild<T>]) -> Aabb2D<T> {
        let mut it = children.iter();
        let first = match it.next() {
            Some(c) => Self::child_bbox(arena, c),
            None => Aabb2D::point(T::zero(), T::zero()),
        };
        it.fold(first, |acc, c| union_aabb(acc, Self::child_bbox(arena, c)))
    }

    fn enlarge_cost(a: &Aabb2D<T>, b: &Aabb2D<T>) -> T::Acc {
        let u = union_aabb(*a, *b);
        area(&u) - area(a)
    }

    fn choose_child(arena: &[RNode<T>], children: &[RChild<T>], bbox: &Aabb2D<T>) -> usize {
        let mut best_idx = 0_usize;
        let mut best_cost: Option<T::Acc> = None;
        for (i, c) in children.iter().enumerate() {
            let cost = Self::enlarge_cost(&Self::child_bbox(arena, c), bbox);
            if best_cost.is_none_or(|bc| cost < bc) {
                best_cost = Some(cost);
                best_idx = i;
            }
        }
        best_idx
    }

    /// SAH-like split: sort along an axis, precompute prefix/suffix AABBs, and
    /// choose `k` that minimizes `area(LB_k) * k + area(RB_k) * (n - k)`.
    fn split_children_with<F>(
        children: &[RChild<T>],
        min_children: usize,
        mut bbox_of: F,
    ) -> (RChildren<T>, RChildren<T>)
    where
        F: FnMut(&RChild<T>) -> Aabb2D<T>,
    {
        let n = children.len();
        let mut best: RBestSplit<T> = None;
        for axis in 0..2 {
            let mut v = children.to_vec();
            if axis == 0 {
                v.sort_by(|a, b| {
                    cmp_partial(
                        &Self::centroid_x_of_aabb(&bbox_of(a)),
                        &Self::centroid_x_of_aabb(&bbox_of(b)),
                    )
                });
            } else {
                v.sort_by(|a, b| {
                    cmp_partial(
                        &Self::centroid_y_of_aabb(&bbox_of(a)),
                        &Self::centroid_y_of_aabb(&bbox_of(b)),
                    )
                });
            }

            let mut prefix: Vec<Aabb2D<T>> = Vec::with_capacity(n);
            for c in &v {
                let bb = bbox_of(c);
                let next = match prefix.last() {
                    Some(prev) => union_aabb(*prev, bb),
                    None => bb,
                };
                prefix.push(next);
            }
            let mut suffix: Vec<Aabb2D<T>> = Vec::with_capacity(n);
            for c in v.iter().rev() {
                let bb = bbox_of(c);
                let next = match suffix.last() {
                    Some(prev) => union_aabb(bb, *prev),
                    None => bb,
                };
                suffix.push(next);
            }
            suffix.reverse();

            for k in min_children..=(n - min_children) {
                let lb = prefix[k - 1];
                let rb = suffix[k];
                let c = area(&lb) * T::acc_from_usize(k) + area(&rb) * T::acc_from_usize(n - k);
                if best.as_ref().is_none_or(|(bc, _, _)| c < *bc) {
                    best = Some((c, v[..k].to_vec(), v[k..].to_vec()));
                }
            }
        }
        match best {
            Some((_, l, r)) => (l, r),
            None => {
                let mut l = children.to_vec();
                let r = l.split_off(n / 2);
                (l, r)
            }
        }
    }

    /// Split an overflowing node in place, returning the arena index of the new right sibling.
    fn split_node(arena: &mut Vec<RNode<T>>, node_idx: usize, min_children: usize) -> usize {
        let leaf = arena[node_idx].leaf;
        let children = core::mem::take(&mut arena[node_idx].children);
        let (left, right, l_bbox, r_bbox) = {
            let view: &[RNode<T>] = arena;
            let (left, right) = Self::split_children_with(&children, min_children, |c| {
                Self::child_bbox(view, c)
            });
            let l_bbox = Self::node_bbox(view, &left);
            let r_bbox = Self::node_bbox(view, &right);
            (left, right, l_bbox, r_bbox)
        };
        let node = &mut arena[node_idx];
        node.children = left;
        node.bbox = l_bbox;
        let r_idx = arena.len();
        arena.push(RNode {
            bbox: r_bbox,
            leaf,
            children: right,
        });
        r_idx
    }

    fn insert_node(
        arena: &mut Vec<RNode<T>>,
        node_idx: usize,
        slot: usize,
        bbox: Aabb2D<T>,
        max_children: usize,
        min_children: usize,
    ) -> Option<usize> {
        if arena[node_idx].leaf {
            let node = &mut arena[node_idx];
            node.bbox = if node.children.is_empty() {
                bbox
            } else {
                union_aabb(node.bbox, bbox)
            };
            node.children.push(RChild::Item { slot, bbox });
            if node.children.len() <= max_children {
                return None;
            }
            return Some(Self::split_node(arena, node_idx, min_children));
        }

        let idx = Self::choose_child(arena, &arena[node_idx].children, &bbox);
        let split = match arena[node_idx].children[idx] {
            RChild::Node(child_idx) => Self::insert_node(
                arena,
                child_idx.get(),
                slot,
                bbox,
                max_children,
                min_children,
            ),
            RChild::Item { .. } => None,
        };
        arena[node_idx].bbox = union_aabb(arena[node_idx].bbox, bbox);
        if let Some(new_right_idx) = split {
            arena[node_idx]
                .children
                .insert(idx + 1, RChild::Node(NodeIdx::new(new_right_idx)));
            if arena[node_idx].children.len() > max_children {
                return Some(Self::split_node(arena, node_idx, min_children));
            }
        }
        None
    }

    fn search_remove(arena: &mut [RNode<T>], node_idx: usize, slot: usize, old: &Aabb2D<T>) -> bool {
        if !arena[node_idx].bbox.overlaps(old) {
            return false;
        }
        if arena[node_idx].leaf {
            let before = arena[node_idx].children.len();
            arena[node_idx]
                .children
                .retain(|c| !matches!(c, RChild::Item { slot: s, .. } if *s == slot));
            if arena[node_idx].children.len() == before {
                return false;
            }
            if !arena[node_idx].children.is_empty() {
                let bb = Self::node_bbox(arena, &arena[node_idx].children);
                arena[node_idx].bbox = bb;
            }
            return true;
        }

        let child_indices: Vec<NodeIdx> = arena[node_idx]
            .children
            .iter()
            .filter_map(|c| match c {
                RChild::Node(i) => Some(*i),
                RChild::Item { .. } => None,
            })
            .collect();
        let mut removed = false;
        for ci in child_indices {
            if Self::search_remove(arena, ci.get(), slot, old) {
                removed = true;
                break;
            }
        }
        if removed {
            let old_children = core::mem::take(&mut arena[node_idx].children);
            let kept: RChildren<T> = old_children
                .into_iter()
                .filter(|c| match c {
                    RChild::Node(i) => !arena[i.get()].children.is_empty(),
                    RChild::Item { .. } => true,
                })
                .collect();
            arena[node_idx].children = kept;
            if !arena[node_idx].children.is_empty() {
                let bb = Self::node_bbox(arena, &arena[node_idx].children);
                arena[node_idx].bbox = bb;
            }
        }
        removed
    }

    fn visit_overlapping<F: FnMut(usize)>(&self, query: Aabb2D<T>, mut f: F) {
        let Some(root_idx) = self.root else {
            return;
        };
        let mut stack = vec![root_idx];
        while let Some(i) = stack.pop() {
            let n = &self.arena[i.get()];
            if !n.bbox.overlaps(&query) {
                continue;
            }
            for c in &n.children {
                match c {
                    RChild::Item { slot, bbox } if bbox.overlaps(&query) => f(*slot),
                    RChild::Item { .. } => {}
                    RChild::Node(ci) => stack.push(*ci),
                }
            }
        }
    }
}

impl<T: Scalar> Backend<T> for RTree<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        self.ensure_slot(slot, aabb);
        let Some(root_idx) = self.root else {
            let idx = self.arena.len();
            self.arena.push(RNode {
                bbox: aabb,
                leaf: true,
                children: vec![RChild::Item { slot, bbox: aabb }],
            });
            self.root = Some(NodeIdx::new(idx));
            return;
        };
        let split = Self::insert_node(
            &mut self.arena,
            root_idx.get(),
            slot,
            aabb,
            self.max_children,
            self.min_children,
        );
        if let Some(right_idx) = split {
            // Grow a level: the old root and its new sibling become children of a fresh root.
            let new_bb = union_aabb(self.arena[root_idx.get()].bbox, self.arena[right_idx].bbox);
            let idx = self.arena.len();
            self.arena.push(RNode {
                bbox: new_bb,
                leaf: false,
                children: vec![
                    RChild::Node(root_idx),
                    RChild::Node(NodeIdx::new(right_idx)),
                ],
            });
            self.root = Some(NodeIdx::new(idx));
        }
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        self.remove(slot);
        self.insert(slot, aabb);
    }

    fn remove(&mut self, slot: usize) {
        let Some(old) = self.slots.get_mut(slot).and_then(Option::take) else {
            return;
        };
        if let Some(root_idx) = self.root {
            let _ = Self::search_remove(&mut self.arena, root_idx.get(), slot, &old);
            if self.arena[root_idx.get()].children.is_empty() {
                self.root = None;
                self.arena.clear();
            }
        }
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.slots.clear();
    }

    fn bulk_load(&mut self, items: &[(usize, Aabb2D<T>)]) {
        if items.is_empty() {
            return;
        }
        // A handful of items into a populated tree is cheaper to insert than to repack.
        if self.root.is_some() && items.len() < self.min_children {
            for &(slot, aabb) in items {
                self.insert(slot, aabb);
            }
            return;
        }
        for &(slot, aabb) in items {
            self.ensure_slot(slot, aabb);
        }
        let mut all: Vec<(usize, Aabb2D<T>)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|bbox| (i, bbox)))
            .collect();
        self.arena.clear();
        self.root = Self::bulk_build_nodes(&mut self.arena, &mut all, self.max_children);
    }

    fn visit_point<F: FnMut(usize)>(&self, x: T, y: T, f: F) {
        self.visit_overlapping(Aabb2D::point(x, y), f);
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Aabb2D<T>, f: F) {
        self.visit_overlapping(rect, f);
    }
}

impl<T: Scalar> Debug for RTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.slots.len();
        let alive = self.slots.iter().filter(|e| e.is_some()).count();
        f.debug_struct("RTree")
            .field("max_children", &self.max_children)
            .field("min_children", &self.min_children)
            .field("arena_nodes", &self.arena.len())
            .field("total_slots", &total)
            .field("alive", &alive)
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}

/// R-tree with i64 coordinates and i128 metrics.
pub type RTreeI64 = RTree<i64>;

/// R-tree with f32 coordinates and f64 metrics.
pub type RTreeF32 = RTree<f32>;

/// R-tree with f64 coordinates and f64 metrics.
pub type RTreeF64 = RTree<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn insert_past_overflow_keeps_every_item_reachable() {
        let mut b: RTree<i64> = RTree::default();
        for i in 0..100_i64 {
            b.insert(usize::try_from(i).unwrap(), Aabb2D::from_xywh(i * 10, 0, 5, 5));
        }
        let all = sorted(b.query_rect(Aabb2D::new(-1, -1, 2000, 10)).collect());
        assert_eq!(all, (0..100).collect::<Vec<_>>());
        assert_eq!(b.query_point(502, 2).collect::<Vec<_>>(), vec![50]);
    }

    #[test]
    fn bulk_load_packs_existing_and_new_slots() {
        let mut b: RTree<f64> = RTree::default();
        for i in 0..20 {
            b.insert(i, Aabb2D::point(i as f64, 0.0));
        }
        for i in 0..10 {
            b.remove(i);
        }
        let fragmented = b.arena_len();
        let batch: Vec<_> = (20..40).map(|i| (i, Aabb2D::point(i as f64, 0.0))).collect();
        b.bulk_load(&batch);
        let hits = sorted(b.query_rect(Aabb2D::new(-1.0, -1.0, 100.0, 1.0)).collect());
        assert_eq!(hits, (10..40).collect::<Vec<_>>());
        assert!(b.arena_len() <= fragmented + 8, "packed rebuild should not leak nodes");
    }

    #[test]
    fn removing_last_item_resets_root() {
        let mut b: RTree<f64> = RTree::default();
        b.insert(0, Aabb2D::point(1.0, 1.0));
        b.remove(0);
        assert!(b.root.is_none());
        assert_eq!(b.query_point(1.0, 1.0).count(), 0);
        b.insert(1, Aabb2D::point(5.0, 5.0));
        assert_eq!(b.query_point(5.0, 5.0).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn update_moves_slot() {
        let mut b: RTree<i64> = RTree::default();
        b.insert(0, Aabb2D::new(0, 0, 10, 10));
        b.insert(1, Aabb2D::new(12, 0, 22, 10));
        b.update(0, Aabb2D::new(100, 100, 110, 110));
        assert!(b.query_point(5, 5).next().is_none());
        assert_eq!(b.query_point(105, 105).collect::<Vec<_>>(), vec![0]);
        assert_eq!(b.query_point(15, 5).collect::<Vec<_>>(), vec![1]);
    }
}
