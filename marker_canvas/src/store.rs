// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Every marker in the layer, indexed by geographic position.

use std::num::NonZeroU64;

use hashbrown::HashMap;
use marker_canvas_index::{Aabb2D, Index, IndexGeneric, RTree};

use crate::error::LayerError;
use crate::geo::{LatLng, LatLngBounds};
use crate::marker::{Marker, MarkerId, MarkerRecord};

/// Single-item mutations since the geographic index was last packed.
///
/// `total` counts live markers. `dirty` counts single inserts and removals; bulk loads count
/// each item too, because they are merged into an index that was not repacked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactionCounter {
    /// Live markers.
    pub total: usize,
    /// Mutations since the last repack.
    pub dirty: usize,
}

impl CompactionCounter {
    /// Dirty ratio at or above which the index is repacked.
    pub const THRESHOLD: f64 = 0.1;

    /// Returns `true` if the next redraw should repack the index.
    ///
    /// With no live markers any pending mutation triggers a repack.
    pub fn needs_compaction(&self) -> bool {
        match (self.dirty, self.total) {
            (0, _) => false,
            (_, 0) => true,
            (dirty, total) => dirty as f64 / total as f64 >= Self::THRESHOLD,
        }
    }
}

/// A geographic index entry: the marker's position as a point box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoEntry {
    /// Marker the entry belongs to.
    pub id: MarkerId,
    /// Degenerate box at the marker's position.
    pub bounds: Aabb2D<f64>,
}

type GeoIndex = IndexGeneric<f64, MarkerId, RTree<f64>>;

/// Markers owned by a layer.
pub struct MarkerStore {
    records: HashMap<MarkerId, MarkerRecord>,
    geo: GeoIndex,
    counter: CompactionCounter,
    next_id: NonZeroU64,
}

impl Default for MarkerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            geo: Index::<f64, MarkerId>::with_rtree(),
            counter: CompactionCounter::default(),
            next_id: NonZeroU64::MIN,
        }
    }

    /// Accept `marker` and assign it an id.
    ///
    /// The record is stored and counted, but its [`GeoEntry`] must still be handed to
    /// [`MarkerStore::insert_geo`] or [`MarkerStore::load_geo`] before queries can see it.
    pub fn accept(&mut self, marker: Marker) -> Result<(MarkerId, GeoEntry), LayerError> {
        let id = MarkerId::from_raw(self.next_id);
        let record = MarkerRecord::accept(id, marker)?;
        self.next_id = self.next_id.saturating_add(1);
        let entry = GeoEntry {
            id,
            bounds: record.position.to_aabb(),
        };
        self.records.insert(id, record);
        self.counter.total += 1;
        self.counter.dirty += 1;
        Ok((id, entry))
    }

    /// Insert one entry into the geographic index.
    pub fn insert_geo(&mut self, entry: GeoEntry) {
        self.geo.insert(entry.bounds, entry.id);
    }

    /// Merge a batch of entries into the geographic index.
    pub fn load_geo(&mut self, entries: Vec<GeoEntry>) {
        self.geo.load(entries.into_iter().map(|e| (e.bounds, e.id)));
    }

    /// Remove a marker, returning it.
    ///
    /// The index entry is found by querying the marker's point and matching on id, so markers
    /// sharing a position are told apart.
    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        let record = self.records.remove(&id)?;
        if self
            .geo
            .remove_where(record.position.to_aabb(), |p| *p == id)
            .is_none()
        {
            log::warn!("{id} was missing from the geographic index");
        }
        self.counter.total -= 1;
        self.counter.dirty += 1;
        Some(record.into_marker())
    }

    /// Repack the geographic index if enough single mutations piled up.
    ///
    /// Returns `true` if it was repacked.
    pub fn compact_if_dirty(&mut self) -> bool {
        if !self.counter.needs_compaction() {
            return false;
        }
        log::debug!(
            "repacking geographic index: {} dirty of {} markers",
            self.counter.dirty,
            self.counter.total
        );
        self.geo.rebuild();
        self.counter.dirty = 0;
        true
    }

    /// Ids of markers within `bounds`, edges included.
    pub fn query(&self, bounds: &LatLngBounds) -> Vec<MarkerId> {
        let mut out = Vec::new();
        self.geo.visit_rect(bounds.to_aabb(), |_, id| out.push(id));
        out
    }

    /// Ids of markers at exactly `at`.
    pub fn query_point(&self, at: LatLng) -> Vec<MarkerId> {
        self.geo
            .query_point(at.lng, at.lat)
            .map(|(_, id)| id)
            .collect()
    }

    /// Record for `id`.
    pub fn get(&self, id: MarkerId) -> Option<&MarkerRecord> {
        self.records.get(&id)
    }

    /// Iterate every record in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerRecord> + '_ {
        self.records.values()
    }

    /// Number of live markers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current mutation counters.
    pub fn counter(&self) -> CompactionCounter {
        self.counter
    }

    /// Number of entries in the geographic index.
    pub fn indexed(&self) -> usize {
        self.geo.len()
    }

    /// Drop every marker and reset the counters. Ids keep counting up.
    pub fn clear(&mut self) {
        self.records.clear();
        self.geo.clear();
        self.counter = CompactionCounter::default();
    }
}

impl std::fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStore")
            .field("len", &self.records.len())
            .field("counter", &self.counter)
            .field("geo", &self.geo)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::Icon;
    use kurbo::Size;

    fn marker(lat: f64, lng: f64) -> Marker {
        Marker::new(LatLng::new(lat, lng), Icon::new("pin.png", Size::new(10.0, 10.0)))
    }

    fn add(store: &mut MarkerStore, lat: f64, lng: f64) -> MarkerId {
        let (id, entry) = store.accept(marker(lat, lng)).unwrap();
        store.insert_geo(entry);
        id
    }

    #[test]
    fn threshold_is_ten_percent() {
        let c = |total, dirty| CompactionCounter { total, dirty };
        assert!(!c(100, 9).needs_compaction());
        assert!(c(100, 10).needs_compaction());
        assert!(!c(0, 0).needs_compaction());
        assert!(c(0, 3).needs_compaction());
    }

    #[test]
    fn rejected_markers_take_no_id_and_no_count() {
        let mut store = MarkerStore::new();
        let err = store.accept(marker(0.0, 0.0).with_pane("shadowPane"));
        assert!(err.is_err());
        assert_eq!(store.counter(), CompactionCounter::default());
        let a = add(&mut store, 0.0, 0.0);
        assert_eq!(a.get(), 1);
    }

    #[test]
    fn remove_picks_the_right_marker_among_colocated() {
        let mut store = MarkerStore::new();
        let ids: Vec<_> = (0..3).map(|_| add(&mut store, 5.0, 5.0)).collect();
        assert!(store.remove(ids[1]).is_some());
        let mut left = store.query_point(LatLng::new(5.0, 5.0));
        left.sort();
        assert_eq!(left, [ids[0], ids[2]]);
        assert_eq!(store.counter(), CompactionCounter { total: 2, dirty: 4 });
    }

    #[test]
    fn removing_twice_only_counts_once() {
        let mut store = MarkerStore::new();
        let id = add(&mut store, 1.0, 1.0);
        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert_eq!(store.counter(), CompactionCounter { total: 0, dirty: 2 });
    }

    #[test]
    fn compaction_resets_dirty_and_keeps_results() {
        let mut store = MarkerStore::new();
        for i in 0..40 {
            add(&mut store, f64::from(i), f64::from(i));
        }
        let bounds = LatLngBounds::new(LatLng::new(9.5, 9.5), LatLng::new(20.5, 20.5));
        let mut before = store.query(&bounds);
        assert!(store.compact_if_dirty());
        assert_eq!(store.counter().dirty, 0);
        assert!(!store.compact_if_dirty());
        let mut after = store.query(&bounds);
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert_eq!(after.len(), 11);
    }
}
