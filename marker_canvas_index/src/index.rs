// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The index: slot storage, keys and payloads on top of a spatial [`Backend`].

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::{FlatVec, RTree};
use crate::types::{Aabb2D, Scalar};

/// Handle to an entry in an index.
///
/// Keys are generational: once an entry is removed, its key never matches a later entry that
/// happens to reuse the same slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    idx: u32,
    generation: u32,
}

impl Key {
    const fn new(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    const fn idx(self) -> usize {
        self.idx as usize
    }
}

#[derive(Clone, Debug)]
struct Entry<T, P> {
    generation: u32,
    live: Option<(Aabb2D<T>, P)>,
}

/// Spatial index over boxes carrying a small copyable payload.
///
/// Mutations are applied to the backend immediately. Use [`IndexGeneric::load`] to add many
/// entries at once and [`IndexGeneric::rebuild`] to repack a backend degraded by single-item
/// mutation.
pub struct IndexGeneric<T: Scalar, P: Copy + Debug, B: Backend<T>> {
    entries: Vec<Entry<T, P>>,
    free: Vec<usize>,
    len: usize,
    backend: B,
}

/// Index with the default [`FlatVec`] backend.
pub type Index<T, P> = IndexGeneric<T, P, FlatVec<T>>;

impl<T: Scalar, P: Copy + Debug> Index<T, P> {
    /// Create an empty index backed by a flat vector.
    pub fn new() -> Self {
        Self::with_backend(FlatVec::default())
    }

    /// Create an empty index backed by an R-tree.
    pub fn with_rtree() -> IndexGeneric<T, P, RTree<T>> {
        IndexGeneric::with_backend(RTree::default())
    }
}

impl<T: Scalar, P: Copy + Debug> Default for Index<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, P: Copy + Debug, B: Backend<T>> IndexGeneric<T, P, B> {
    /// Create an empty index over the given backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            backend,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Access the backend, e.g. for diagnostics.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn alloc(&mut self, aabb: Aabb2D<T>, payload: P) -> Key {
        let idx = if let Some(idx) = self.free.pop() {
            let e = &mut self.entries[idx];
            e.generation = e.generation.wrapping_add(1);
            e.live = Some((aabb, payload));
            idx
        } else {
            self.entries.push(Entry {
                generation: 1,
                live: Some((aabb, payload)),
            });
            self.entries.len() - 1
        };
        self.len += 1;
        let idx32 = u32::try_from(idx).unwrap_or(u32::MAX);
        Key::new(idx32, self.entries[idx].generation)
    }

    fn slot_of(&self, key: Key) -> Option<usize> {
        let e = self.entries.get(key.idx())?;
        (e.generation == key.generation && e.live.is_some()).then_some(key.idx())
    }

    /// Insert a single entry.
    pub fn insert(&mut self, aabb: Aabb2D<T>, payload: P) -> Key {
        let key = self.alloc(aabb, payload);
        self.backend.insert(key.idx(), aabb);
        key
    }

    /// Insert a batch of entries with one backend bulk load.
    pub fn load<I>(&mut self, items: I) -> Vec<Key>
    where
        I: IntoIterator<Item = (Aabb2D<T>, P)>,
    {
        let mut keys = Vec::new();
        let mut pairs = Vec::new();
        for (aabb, payload) in items {
            let key = self.alloc(aabb, payload);
            pairs.push((key.idx(), aabb));
            keys.push(key);
        }
        self.backend.bulk_load(&pairs);
        keys
    }

    /// Move an entry to a new box.
    pub fn update(&mut self, key: Key, aabb: Aabb2D<T>) -> bool {
        let Some(slot) = self.slot_of(key) else {
            return false;
        };
        if let Some((bounds, _)) = self.entries[slot].live.as_mut() {
            *bounds = aabb;
        }
        self.backend.update(slot, aabb);
        true
    }

    /// Remove an entry, returning its payload if the key was live.
    pub fn remove(&mut self, key: Key) -> Option<P> {
        let slot = self.slot_of(key)?;
        let (_, payload) = self.entries[slot].live.take()?;
        self.backend.remove(slot);
        self.free.push(slot);
        self.len -= 1;
        Some(payload)
    }

    /// Remove the first entry intersecting `aabb` whose payload satisfies `pred`.
    ///
    /// Entries are matched by predicate rather than by box, so several entries sharing a box can
    /// be told apart by identity.
    pub fn remove_where<F>(&mut self, aabb: Aabb2D<T>, mut pred: F) -> Option<(Key, P)>
    where
        F: FnMut(&P) -> bool,
    {
        let mut found = None;
        self.backend.visit_rect(aabb, |slot| {
            if found.is_none()
                && let Some((_, payload)) = &self.entries[slot].live
                && pred(payload)
            {
                found = Some(slot);
            }
        });
        let slot = found?;
        let key = Key::new(
            u32::try_from(slot).unwrap_or(u32::MAX),
            self.entries[slot].generation,
        );
        self.remove(key).map(|p| (key, p))
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.len = 0;
        self.backend.clear();
    }

    /// Linearize every live entry and bulk load them into a fresh backend structure.
    ///
    /// Keys stay valid.
    pub fn rebuild(&mut self) {
        let pairs: Vec<(usize, Aabb2D<T>)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.live.map(|(aabb, _)| (i, aabb)))
            .collect();
        self.backend.clear();
        self.backend.bulk_load(&pairs);
    }

    /// Box and payload of a live entry.
    pub fn get(&self, key: Key) -> Option<(Aabb2D<T>, P)> {
        let slot = self.slot_of(key)?;
        self.entries[slot].live
    }

    /// Iterate all live entries in slot order.
    pub fn all(&self) -> impl Iterator<Item = (Key, Aabb2D<T>, P)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            let (aabb, payload) = e.live?;
            Some((
                Key::new(u32::try_from(i).unwrap_or(u32::MAX), e.generation),
                aabb,
                payload,
            ))
        })
    }

    fn key_payload(&self, slot: usize) -> Option<(Key, P)> {
        let e = &self.entries[slot];
        let (_, payload) = e.live?;
        Some((
            Key::new(u32::try_from(slot).unwrap_or(u32::MAX), e.generation),
            payload,
        ))
    }

    /// Visit entries whose box contains the point, in backend order.
    pub fn visit_point<F: FnMut(Key, P)>(&self, x: T, y: T, mut f: F) {
        self.backend.visit_point(x, y, |slot| {
            if let Some((k, p)) = self.key_payload(slot) {
                f(k, p);
            }
        });
    }

    /// Like [`IndexGeneric::visit_point`], also passing each entry's box.
    pub fn visit_point_with_bounds<F: FnMut(Key, Aabb2D<T>, P)>(&self, x: T, y: T, mut f: F) {
        self.backend.visit_point(x, y, |slot| {
            let e = &self.entries[slot];
            if let Some((aabb, payload)) = e.live {
                f(
                    Key::new(u32::try_from(slot).unwrap_or(u32::MAX), e.generation),
                    aabb,
                    payload,
                );
            }
        });
    }

    /// Visit entries whose box intersects the rectangle, in backend order.
    pub fn visit_rect<F: FnMut(Key, P)>(&self, rect: Aabb2D<T>, mut f: F) {
        self.backend.visit_rect(rect, |slot| {
            if let Some((k, p)) = self.key_payload(slot) {
                f(k, p);
            }
        });
    }

    /// Entries whose box contains the point, in backend order.
    pub fn query_point(&self, x: T, y: T) -> impl Iterator<Item = (Key, P)> + '_ {
        self.backend
            .query_point(x, y)
            .filter_map(|slot| self.key_payload(slot))
    }

    /// Entries whose box intersects the rectangle, in backend order.
    pub fn query_rect(&self, rect: Aabb2D<T>) -> impl Iterator<Item = (Key, P)> + '_ {
        self.backend
            .query_rect(rect)
            .filter_map(|slot| self.key_payload(slot))
    }
}

impl<T: Scalar, P: Copy + Debug, B: Backend<T> + Debug> Debug for IndexGeneric<T, P, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexGeneric")
            .field("len", &self.len)
            .field("free", &self.free.len())
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn rtree_i64_basic_insert_query() {
        let mut idx = Index::<i64, u32>::with_rtree();
        let _k1 = idx.insert(Aabb2D::new(0, 0, 10, 10), 1);
        let _k2 = idx.insert(Aabb2D::new(5, 5, 15, 15), 2);
        let hits: Vec<_> = idx.query_point(6, 6).map(|(_, p)| p).collect();
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&1) && hits.contains(&2));
        assert_eq!(idx.query_rect(Aabb2D::new(12, 12, 20, 20)).count(), 1);
    }

    #[test]
    fn stale_keys_do_not_alias_reused_slots() {
        let mut idx = Index::<f64, u32>::new();
        let a = idx.insert(Aabb2D::point(0.0, 0.0), 1);
        assert_eq!(idx.remove(a), Some(1));
        let b = idx.insert(Aabb2D::point(0.0, 0.0), 2);
        assert_ne!(a, b);
        assert_eq!(idx.remove(a), None);
        assert_eq!(idx.get(b).map(|(_, p)| p), Some(2));
    }

    #[test]
    fn remove_where_matches_identity_among_tied_boxes() {
        let mut idx = Index::<f64, u32>::with_rtree();
        let at = Aabb2D::point(2.0, 3.0);
        idx.load(vec![(at, 7), (at, 8), (at, 9)]);
        let (_, removed) = idx.remove_where(at, |p| *p == 8).unwrap();
        assert_eq!(removed, 8);
        let mut left: Vec<_> = idx.query_point(2.0, 3.0).map(|(_, p)| p).collect();
        left.sort_unstable();
        assert_eq!(left, vec![7, 9]);
        assert!(idx.remove_where(at, |p| *p == 8).is_none());
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn rebuild_preserves_contents_and_keys() {
        let mut idx = Index::<f64, u32>::with_rtree();
        let keys: Vec<Key> = (0..50)
            .map(|i| idx.insert(Aabb2D::point(f64::from(i), f64::from(i)), i))
            .collect();
        for k in keys.iter().step_by(3) {
            idx.remove(*k);
        }
        let world = Aabb2D::new(-1.0, -1.0, 100.0, 100.0);
        let mut before: Vec<_> = idx.query_rect(world).map(|(_, p)| p).collect();
        idx.rebuild();
        let mut after: Vec<_> = idx.query_rect(world).map(|(_, p)| p).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
        assert_eq!(idx.get(keys[1]).map(|(_, p)| p), Some(1));
    }

    #[test]
    fn visit_point_with_bounds_reports_live_boxes_only() {
        let mut idx = Index::<f64, u32>::with_rtree();
        let gone = idx.insert(Aabb2D::new(0.0, 0.0, 4.0, 4.0), 1);
        idx.insert(Aabb2D::new(1.0, 1.0, 2.0, 3.0), 2);
        idx.remove(gone);
        let mut seen = Vec::new();
        idx.visit_point_with_bounds(1.5, 2.0, |_, aabb, p| seen.push((aabb, p)));
        assert_eq!(seen, vec![(Aabb2D::new(1.0, 1.0, 2.0, 3.0), 2)]);
    }

    /// xorshift, so the workload is the same on every run.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, below: u64) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0 % below
        }
    }

    fn sorted<I: Iterator<Item = (Key, u32)>>(it: I) -> Vec<u32> {
        let mut out: Vec<u32> = it.map(|(_, p)| p).collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn rtree_agrees_with_linear_scan_under_churn() {
        let mut rng = Lcg(0x9E37_79B9_7F4A_7C15);
        let mut tree = Index::<i64, u32>::with_rtree();
        let mut scan = Index::<i64, u32>::new();
        let mut live: Vec<u32> = Vec::new();
        let mut boxes = Vec::new();
        for id in 0..600_u32 {
            let x = i64::try_from(rng.next(1000)).unwrap();
            let y = i64::try_from(rng.next(1000)).unwrap();
            let w = i64::try_from(rng.next(40)).unwrap();
            boxes.push(Aabb2D::new(x, y, x + w, y + w));
            if id % 100 == 99 {
                let batch: Vec<_> = (id - 99..=id).map(|i| (boxes[i as usize], i)).collect();
                tree.load(batch.iter().copied());
                scan.load(batch);
                live.extend(id - 99..=id);
            }
            if id % 7 == 0 && !live.is_empty() {
                let victim = live.swap_remove(usize::try_from(rng.next(live.len() as u64)).unwrap());
                let at = boxes[victim as usize];
                assert!(tree.remove_where(at, |p| *p == victim).is_some());
                assert!(scan.remove_where(at, |p| *p == victim).is_some());
            }
            if id == 400 {
                tree.rebuild();
            }
        }
        assert_eq!(tree.len(), scan.len());
        for _ in 0..200 {
            let x = i64::try_from(rng.next(1000)).unwrap();
            let y = i64::try_from(rng.next(1000)).unwrap();
            let r = Aabb2D::new(x, y, x + 80, y + 60);
            assert_eq!(sorted(tree.query_rect(r)), sorted(scan.query_rect(r)));
            assert_eq!(sorted(tree.query_point(x, y)), sorted(scan.query_point(x, y)));
        }
    }
}
