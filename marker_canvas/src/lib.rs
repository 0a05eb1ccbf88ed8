// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker Canvas: draw tens of thousands of icon markers on one canvas over a slippy map.
//!
//! A DOM element per marker stops scaling long before a map runs out of markers. This crate
//! paints every marker onto a single canvas instead, and keeps two spatial indexes so that a
//! redraw only touches what is in view and a click only looks at what is under the pointer.
//!
//! - [`CanvasIconLayer`]: the layer. Add and remove [`Marker`]s, register click and hover
//!   listeners, and forward the host map's lifecycle, viewport and pointer events to it.
//! - [`MapHost`]: what the layer needs from the map (bounds, projection, cursor, popups,
//!   tooltips).
//! - [`Surface`]: the 2D canvas the layer paints on.
//! - [`ImageLoader`] and [`ImageCache`]: icon images, loaded once per URL, with a
//!   [`ReadySignal`] that paints wait on.
//! - [`MarkerStore`]: every marker, in a geographic R-tree that is repacked once single
//!   insertions and removals reach ten percent of its size ([`CompactionCounter`]).
//! - [`RenderSet`]: screen boxes of the markers drawn in the current frame.
//!
//! Paints are asynchronous: a marker is drawn once its images have loaded, on whatever local
//! executor the host provides. Everything else happens synchronously inside the call that
//! triggered it.
//!
//! ## Example
//!
//! ```rust
//! use futures::executor::LocalPool;
//! use kurbo::{Point, Rect, Size};
//! use marker_canvas::{
//!     CanvasIconLayer, Cursor, Icon, ImageLoader, LatLng, LatLngBounds, LayerOptions, MapHost,
//!     Marker, MarkerId, MarkerRecord, Pane, Popup, ReadySender, Surface, Tooltip,
//! };
//!
//! // One degree is one pixel, north up, origin at (lat 0, lng 0).
//! struct Plate;
//!
//! impl MapHost for Plate {
//!     fn bounds(&self) -> LatLngBounds {
//!         LatLngBounds::new(LatLng::new(-100.0, 0.0), LatLng::new(0.0, 100.0))
//!     }
//!     fn lat_lng_to_container_point(&self, at: LatLng) -> Point {
//!         Point::new(at.lng, -at.lat)
//!     }
//!     fn container_point_to_layer_point(&self, point: Point) -> Point {
//!         point
//!     }
//!     fn size(&self) -> Size {
//!         Size::new(100.0, 100.0)
//!     }
//!     fn set_cursor(&mut self, _: Cursor) {}
//!     fn open_popup(&mut self, _: &MarkerRecord, _: &Popup) {}
//!     fn open_tooltip(&mut self, _: &MarkerRecord, _: &Tooltip) {}
//!     fn close_tooltip(&mut self, _: MarkerId) {}
//! }
//!
//! // Counts image draws.
//! #[derive(Default)]
//! struct Tally(usize);
//!
//! impl Surface for Tally {
//!     type Image = ();
//!     fn attach(&mut self, _: Pane<'_>) {}
//!     fn detach(&mut self) {}
//!     fn set_position(&mut self, _: Point) {}
//!     fn resize(&mut self, _: Size) {}
//!     fn size(&self) -> Size {
//!         Size::new(100.0, 100.0)
//!     }
//!     fn set_transform(&mut self, _: Point, _: f64) {}
//!     fn clear(&mut self) {}
//!     fn fill_rect(&mut self, _: Rect) {}
//!     fn draw_image(&mut self, _: &(), _: Rect) {
//!         self.0 += 1;
//!     }
//!     fn fill_text(&mut self, _: &str, _: Point) {}
//! }
//!
//! // Every image is available immediately.
//! struct Instant;
//!
//! impl ImageLoader<()> for Instant {
//!     fn load(&mut self, _: &str, ready: ReadySender) {
//!         ready.ready();
//!     }
//! }
//!
//! let mut pool = LocalPool::new();
//! let mut layer = CanvasIconLayer::new(LayerOptions::default());
//! layer.on_add(Plate, Tally::default(), Instant, pool.spawner());
//!
//! let pin = Icon::new("pin.png", Size::new(10.0, 10.0));
//! layer.add_markers([
//!     Marker::new(LatLng::new(-50.0, 50.0), pin.clone()),
//!     Marker::new(LatLng::new(-20.0, 300.0), pin),
//! ]);
//! pool.run_until_stalled();
//!
//! // Only the marker in view was painted, and only it can be hit.
//! let painted = layer.renderer().map(|r| r.surface().borrow().0);
//! assert_eq!(painted, Some(1));
//! assert_eq!(layer.on_click(Point::new(52.0, 48.0)), 1);
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade. Items rejected by the layer are reported at
//! `error`, index repacking and attach/detach at `debug`, and per-redraw counts at `trace`.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`LayerOptions`] and the marker description types.

mod error;
mod geo;
mod hit;
mod host;
mod image_cache;
mod layer;
mod marker;
mod options;
mod render;
mod render_set;
mod store;

pub use error::LayerError;
pub use geo::{LatLng, LatLngBounds};
pub use hit::{Hit, Listener, PointerEvent, PointerKind, hits_at};
pub use host::{Cursor, MapHost, Pane, ZoomAnimEvent};
pub use image_cache::{ImageCache, ImageLoader, ReadySender, ReadySignal};
pub use layer::CanvasIconLayer;
pub use marker::{
    Icon, MARKER_PANE, Marker, MarkerId, MarkerRecord, Popup, Shadow, Tooltip, TooltipDirection,
};
pub use options::LayerOptions;
pub use render::{DrawPlan, Label, Renderer, Surface, hit_box};
pub use render_set::{RenderSet, ScreenEntry};
pub use store::{CompactionCounter, GeoEntry, MarkerStore};
