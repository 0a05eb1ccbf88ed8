// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The map the layer is attached to.
//!
//! The layer never owns projection or interaction state of its own. Everything it needs to know
//! about the viewport, and every visible effect outside its canvas, goes through [`MapHost`].

use kurbo::{Point, Size};

use crate::geo::{LatLng, LatLngBounds};
use crate::marker::{MarkerId, MarkerRecord, Popup, Tooltip};

/// Pointer cursor shown over the map container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// The host's normal cursor.
    #[default]
    Default,
    /// A hand, shown while hovering a marker.
    Pointer,
}

/// Pane the canvas is placed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pane<'a> {
    /// The host's overlay pane.
    Overlay,
    /// A pane chosen by name.
    Named(&'a str),
}

/// Start of an animated zoom.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ZoomAnimEvent {
    /// Zoom level being animated to.
    pub zoom: f64,
    /// Map center at the end of the animation.
    pub center: LatLng,
}

/// Services the map provides to the layer.
///
/// Coordinates come in three spaces:
/// - geographic ([`LatLng`]),
/// - container pixels, relative to the top-left of the map's visible area,
/// - layer pixels, relative to the map's pixel origin, used to place the canvas.
pub trait MapHost {
    /// Geographic bounds of the visible area.
    fn bounds(&self) -> LatLngBounds;

    /// Project a position to container pixels.
    fn lat_lng_to_container_point(&self, at: LatLng) -> Point;

    /// Convert container pixels to layer pixels.
    fn container_point_to_layer_point(&self, point: Point) -> Point;

    /// Pixel size of the visible area.
    fn size(&self) -> Size;

    /// Returns `true` if the host animates zoom changes.
    fn zoom_animated(&self) -> bool {
        false
    }

    /// Scale from the current zoom to `zoom`.
    fn zoom_scale(&self, zoom: f64) -> f64 {
        let _ = zoom;
        1.0
    }

    /// Layer-pixel position of the current top-left corner once the map is at `zoom` around
    /// `center`.
    fn zoom_anim_origin(&self, zoom: f64, center: LatLng) -> Point {
        let _ = (zoom, center);
        Point::ZERO
    }

    /// Change the cursor over the map container.
    fn set_cursor(&mut self, cursor: Cursor);

    /// Open the popup of a clicked marker.
    fn open_popup(&mut self, marker: &MarkerRecord, popup: &Popup);

    /// Open the hover tooltip of a marker.
    fn open_tooltip(&mut self, marker: &MarkerRecord, tooltip: &Tooltip);

    /// Close a tooltip opened with [`MapHost::open_tooltip`].
    ///
    /// The marker may have been removed from the layer since.
    fn close_tooltip(&mut self, id: MarkerId);
}
