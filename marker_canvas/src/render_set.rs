// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen boxes of the markers drawn in the current frame.

use kurbo::{Point, Rect};
use marker_canvas_index::{Aabb2D, Index, IndexGeneric, RTree};
use smallvec::SmallVec;

use crate::host::MapHost;
use crate::marker::{MarkerId, MarkerRecord};
use crate::render::hit_box;

/// A marker's hit box in container pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenEntry {
    /// Marker the box belongs to.
    pub id: MarkerId,
    /// Icon-sized box centered on the projected position.
    pub bounds: Rect,
}

impl ScreenEntry {
    /// Project `record` through `map`, returning its container point and hit box.
    pub fn project<M: MapHost + ?Sized>(map: &M, record: &MarkerRecord) -> (Point, Self) {
        let at = map.lat_lng_to_container_point(record.position);
        let entry = Self {
            id: record.id,
            bounds: hit_box(record.icon.size, at),
        };
        (at, entry)
    }
}

fn to_aabb(rect: Rect) -> Aabb2D<f64> {
    Aabb2D::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

fn to_rect(aabb: Aabb2D<f64>) -> Rect {
    Rect::new(aabb.min_x, aabb.min_y, aabb.max_x, aabb.max_y)
}

/// Screen-space index over what is on the canvas.
///
/// Rebuilt from scratch on every redraw; single entries are added when a marker is drawn in
/// between.
#[derive(Debug)]
pub struct RenderSet {
    index: IndexGeneric<f64, MarkerId, RTree<f64>>,
}

impl Default for RenderSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            index: Index::<f64, MarkerId>::with_rtree(),
        }
    }

    /// Add one drawn marker.
    pub fn insert(&mut self, entry: ScreenEntry) {
        self.index.insert(to_aabb(entry.bounds), entry.id);
    }

    /// Add a batch of drawn markers.
    pub fn load(&mut self, entries: Vec<ScreenEntry>) {
        self.index
            .load(entries.into_iter().map(|e| (to_aabb(e.bounds), e.id)));
    }

    /// Replace the contents with `entries`.
    pub fn replace(&mut self, entries: Vec<ScreenEntry>) {
        self.index.clear();
        self.load(entries);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if nothing is on screen.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Boxes containing `point`, edges included, in index order.
    pub fn hit_test(&self, point: Point) -> SmallVec<[ScreenEntry; 4]> {
        let mut hits = SmallVec::new();
        self.index
            .visit_point_with_bounds(point.x, point.y, |_, aabb, id| {
                hits.push(ScreenEntry {
                    id,
                    bounds: to_rect(aabb),
                });
            });
        hits
    }

    /// Every id on screen.
    pub fn ids(&self) -> Vec<MarkerId> {
        self.index.all().map(|(_, _, id)| id).collect()
    }
}
