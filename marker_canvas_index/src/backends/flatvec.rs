// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed list of boxes scanned linearly.
//!
//! Live boxes are kept contiguous: removal swaps the last box into the hole, so a scan never
//! walks over dead slots. This makes it the reference answer the R-tree is checked against, and
//! the faster choice for the few dozen boxes of a sparse frame.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::{Aabb2D, Scalar};

/// Linear-scan backend over a packed list of boxes.
pub struct FlatVec<T: Scalar> {
    /// `(slot, box)` for every live slot, in no particular order.
    packed: Vec<(usize, Aabb2D<T>)>,
    /// Position in `packed` for each slot.
    at: Vec<Option<usize>>,
}

impl<T: Scalar> Default for FlatVec<T> {
    fn default() -> Self {
        Self {
            packed: Vec::new(),
            at: Vec::new(),
        }
    }
}

impl<T: Scalar> Debug for FlatVec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatVec")
            .field("live", &self.packed.len())
            .field("slots", &self.at.len())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> FlatVec<T> {
    /// Number of live boxes.
    pub fn len(&self) -> usize {
        self.packed.len()
    }

    /// Returns `true` if no box is stored.
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    fn position(&self, slot: usize) -> Option<usize> {
        self.at.get(slot).copied().flatten()
    }
}

impl<T: Scalar> Backend<T> for FlatVec<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if let Some(pos) = self.position(slot) {
            self.packed[pos].1 = aabb;
            return;
        }
        if self.at.len() <= slot {
            self.at.resize(slot + 1, None);
        }
        self.at[slot] = Some(self.packed.len());
        self.packed.push((slot, aabb));
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if let Some(pos) = self.position(slot) {
            self.packed[pos].1 = aabb;
        }
    }

    fn remove(&mut self, slot: usize) {
        let Some(pos) = self.position(slot) else {
            return;
        };
        self.at[slot] = None;
        self.packed.swap_remove(pos);
        if let Some(&(moved, _)) = self.packed.get(pos) {
            self.at[moved] = Some(pos);
        }
    }

    fn clear(&mut self) {
        self.packed.clear();
        self.at.clear();
    }

    fn bulk_load(&mut self, items: &[(usize, Aabb2D<T>)]) {
        self.packed.reserve(items.len());
        for &(slot, aabb) in items {
            self.insert(slot, aabb);
        }
    }

    fn visit_point<F: FnMut(usize)>(&self, x: T, y: T, mut f: F) {
        self.packed
            .iter()
            .filter(|(_, a)| a.contains_point(x, y))
            .for_each(|&(slot, _)| f(slot));
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Aabb2D<T>, mut f: F) {
        self.packed
            .iter()
            .filter(|(_, a)| a.overlaps(&rect))
            .for_each(|&(slot, _)| f(slot));
    }
}
