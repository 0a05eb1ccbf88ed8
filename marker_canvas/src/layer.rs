// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer controller.

use std::fmt;

use futures::task::LocalSpawn;
use kurbo::Point;
use smallvec::SmallVec;

use crate::geo::LatLng;
use crate::hit::{Dispatcher, Hit, PointerEvent, hits_at};
use crate::host::{MapHost, ZoomAnimEvent};
use crate::image_cache::ImageLoader;
use crate::marker::{Marker, MarkerId, MarkerRecord};
use crate::options::LayerOptions;
use crate::render::{Renderer, Surface};
use crate::render_set::{RenderSet, ScreenEntry};
use crate::store::{CompactionCounter, GeoEntry, MarkerStore};

struct Attached<M, S: Surface, L> {
    map: M,
    renderer: Renderer<S, L>,
}

/// Draws many icon markers onto a single canvas.
///
/// The layer keeps every marker in a geographic index and the markers drawn in the current frame
/// in a screen index. A redraw queries the first with the map bounds, schedules a paint per
/// marker, and rebuilds the second for hit testing.
///
/// The host drives the layer: [`CanvasIconLayer::on_add`] and [`CanvasIconLayer::on_remove`]
/// when it enters or leaves a map, [`CanvasIconLayer::on_move_end`],
/// [`CanvasIconLayer::on_resize`] and [`CanvasIconLayer::on_zoom_anim`] for viewport changes,
/// and [`CanvasIconLayer::on_pointer_event`] for clicks and pointer moves.
///
/// Markers may be added before the layer is attached. They are indexed right away and drawn by
/// the redraw that follows attaching.
pub struct CanvasIconLayer<M, S: Surface, L> {
    options: LayerOptions,
    store: MarkerStore,
    render_set: RenderSet,
    dispatcher: Dispatcher,
    attached: Option<Attached<M, S, L>>,
}

impl<M, S, L> CanvasIconLayer<M, S, L>
where
    M: MapHost,
    S: Surface + 'static,
    L: ImageLoader<S::Image>,
{
    /// Create a detached layer.
    pub fn new(options: LayerOptions) -> Self {
        Self {
            options,
            store: MarkerStore::new(),
            render_set: RenderSet::new(),
            dispatcher: Dispatcher::default(),
            attached: None,
        }
    }

    /// Current options.
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Replace the options and redraw.
    ///
    /// A new pane takes effect the next time the layer is attached.
    pub fn set_options(&mut self, options: LayerOptions) {
        if let Some(attached) = self.attached.as_mut() {
            attached.renderer.set_debug(options.debug);
        }
        self.options = options;
        self.redraw();
    }

    /// Clear the canvas and redraw every marker in view.
    pub fn redraw(&mut self) {
        self.redraw_with(true);
    }

    /// Add one marker.
    ///
    /// Items that are not markers are logged and dropped, returning `None`.
    pub fn add_marker(&mut self, marker: Marker) -> Option<MarkerId> {
        let (id, geo, screen) = self.accept(marker)?;
        if let Some(entry) = screen {
            self.render_set.insert(entry);
        }
        self.store.insert_geo(geo);
        Some(id)
    }

    /// Add many markers, bulk loading both indexes.
    ///
    /// Items that are not markers are logged and skipped. Returns the ids of the accepted ones,
    /// in input order.
    pub fn add_markers<I>(&mut self, markers: I) -> Vec<MarkerId>
    where
        I: IntoIterator<Item = Marker>,
    {
        let mut ids = Vec::new();
        let mut geo = Vec::new();
        let mut screen = Vec::new();
        for marker in markers {
            let Some((id, g, s)) = self.accept(marker) else {
                continue;
            };
            ids.push(id);
            geo.push(g);
            screen.extend(s);
        }
        self.render_set.load(screen);
        self.store.load_geo(geo);
        ids
    }

    /// Same as [`CanvasIconLayer::add_marker`].
    pub fn add_layer(&mut self, marker: Marker) -> Option<MarkerId> {
        self.add_marker(marker)
    }

    /// Same as [`CanvasIconLayer::add_markers`].
    pub fn add_layers<I>(&mut self, markers: I) -> Vec<MarkerId>
    where
        I: IntoIterator<Item = Marker>,
    {
        self.add_markers(markers)
    }

    /// Record, draw if in view, and produce index entries for one marker.
    fn accept(&mut self, marker: Marker) -> Option<(MarkerId, GeoEntry, Option<ScreenEntry>)> {
        let (id, geo) = match self.store.accept(marker) {
            Ok(accepted) => accepted,
            Err(err) => {
                log::error!("{err}");
                return None;
            }
        };
        let mut screen = None;
        if let Some(attached) = self.attached.as_mut()
            && let Some(record) = self.store.get(id)
            && attached.map.bounds().contains(record.position)
        {
            let (at, entry) = ScreenEntry::project(&attached.map, record);
            attached.renderer.draw_marker(record, at);
            screen = Some(entry);
        }
        Some((id, geo, screen))
    }

    /// Remove a marker, returning it.
    ///
    /// If `redraw` is set and the marker was in view, the canvas is redrawn. Otherwise its pixels
    /// stay on the canvas until the next redraw, but it no longer reacts to the pointer.
    pub fn remove_marker(&mut self, id: MarkerId, redraw: bool) -> Option<Marker> {
        let displayed = self
            .store
            .get(id)
            .is_some_and(|r| self.is_displaying(r.position));
        let marker = self.store.remove(id)?;
        if displayed && redraw {
            self.redraw_with(true);
        }
        Some(marker)
    }

    /// Remove a marker and redraw if it was in view.
    pub fn remove_layer(&mut self, id: MarkerId) -> Option<Marker> {
        self.remove_marker(id, true)
    }

    /// Remove every marker and clear the canvas.
    pub fn clear_layers(&mut self) {
        self.store.clear();
        self.render_set.clear();
        self.redraw_with(true);
    }

    /// Call `listener` on every click that hits at least one marker.
    pub fn add_on_click_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&PointerEvent, &[Hit<'_>]) + 'static,
    {
        self.dispatcher.on_click(Box::new(listener));
    }

    /// Call `listener` on every pointer move that opens a hover tooltip.
    ///
    /// Moves over markers with no tooltip, or only a permanent one, do not reach hover listeners.
    pub fn add_on_hover_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&PointerEvent, &[Hit<'_>]) + 'static,
    {
        self.dispatcher.on_hover(Box::new(listener));
    }

    /// Attach to `map`, drawing onto `surface`.
    ///
    /// Images come from `loader`; paints that wait on them are spawned on `spawner`. The surface
    /// is placed in the configured pane, positioned, and every marker in view is drawn.
    pub fn on_add(
        &mut self,
        map: M,
        mut surface: S,
        loader: L,
        spawner: impl LocalSpawn + 'static,
    ) {
        if self.attached.is_some() {
            log::warn!("layer attached again without being removed first");
            self.on_remove();
        }
        surface.resize(map.size());
        surface.attach(self.options.target_pane());
        let renderer = Renderer::new(surface, loader, Box::new(spawner), self.options.debug);
        self.attached = Some(Attached { map, renderer });
        log::debug!("attached with {} markers", self.store.len());
        self.reset();
    }

    /// Detach from the map, returning it.
    ///
    /// Markers stay in the layer. Paints still waiting on images land on the detached surface.
    pub fn on_remove(&mut self) -> Option<M> {
        let Attached { mut map, renderer } = self.attached.take()?;
        if let Some(id) = self.dispatcher.take_open_tooltip() {
            map.close_tooltip(id);
        }
        renderer.with_surface(|s| s.detach());
        self.render_set.clear();
        log::debug!("detached");
        Some(map)
    }

    /// The map finished panning or zooming.
    pub fn on_move_end(&mut self) {
        self.reset();
    }

    /// The map container changed size.
    pub fn on_resize(&mut self) {
        self.reset();
    }

    /// The map started an animated zoom.
    ///
    /// Scales and translates the canvas to follow the animation. The next
    /// [`CanvasIconLayer::on_move_end`] puts it back in place and redraws.
    pub fn on_zoom_anim(&mut self, event: ZoomAnimEvent) {
        let Some(attached) = self.attached.as_ref() else {
            return;
        };
        if !attached.map.zoom_animated() {
            return;
        }
        let scale = attached.map.zoom_scale(event.zoom);
        let origin = attached.map.zoom_anim_origin(event.zoom, event.center);
        attached
            .renderer
            .with_surface(|s| s.set_transform(origin, scale));
    }

    /// Route a pointer event. Returns the number of markers under the pointer.
    pub fn on_pointer_event(&mut self, event: &PointerEvent) -> usize {
        let Some(attached) = self.attached.as_mut() else {
            return 0;
        };
        self.dispatcher
            .dispatch(&mut attached.map, &self.store, &self.render_set, event)
    }

    /// Shorthand for a click at `at`.
    pub fn on_click(&mut self, at: Point) -> usize {
        self.on_pointer_event(&PointerEvent::click(at))
    }

    /// Shorthand for a pointer move to `at`.
    pub fn on_mouse_move(&mut self, at: Point) -> usize {
        self.on_pointer_event(&PointerEvent::moved(at))
    }

    /// Move and size the canvas to the viewport and redraw without clearing first.
    fn reset(&mut self) {
        let Some(attached) = self.attached.as_mut() else {
            return;
        };
        let top_left = attached.map.container_point_to_layer_point(Point::ZERO);
        let size = attached.map.size();
        attached.renderer.with_surface(|s| {
            s.set_position(top_left);
            s.resize(size);
        });
        self.redraw_with(false);
    }

    fn redraw_with(&mut self, clear: bool) {
        let Some(attached) = self.attached.as_mut() else {
            return;
        };
        self.store.compact_if_dirty();
        if clear {
            attached.renderer.clear();
        }
        let ids = self.store.query(&attached.map.bounds());
        let mut screen = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.store.get(id) else {
                continue;
            };
            let (at, entry) = ScreenEntry::project(&attached.map, record);
            attached.renderer.draw_marker(record, at);
            screen.push(entry);
        }
        log::trace!("redrew {} of {} markers", screen.len(), self.store.len());
        self.render_set.replace(screen);
    }

    fn is_displaying(&self, at: LatLng) -> bool {
        self.attached
            .as_ref()
            .is_some_and(|a| a.map.bounds().contains(at))
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the layer holds no markers.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// A marker by id.
    pub fn marker(&self, id: MarkerId) -> Option<&MarkerRecord> {
        self.store.get(id)
    }

    /// Geographic index bookkeeping.
    pub fn compaction(&self) -> CompactionCounter {
        self.store.counter()
    }

    /// Every marker.
    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    /// Markers drawn in the current frame.
    pub fn render_set(&self) -> &RenderSet {
        &self.render_set
    }

    /// Ids of markers drawn in the current frame.
    pub fn visible_ids(&self) -> Vec<MarkerId> {
        self.render_set.ids()
    }

    /// Markers under a container point, without notifying anyone.
    pub fn hit_test(&self, at: Point) -> SmallVec<[Hit<'_>; 4]> {
        hits_at(&self.render_set, &self.store, at)
    }

    /// Marker whose hover tooltip is open.
    pub fn open_tooltip(&self) -> Option<MarkerId> {
        self.dispatcher.open_tooltip()
    }

    /// Returns `true` between [`CanvasIconLayer::on_add`] and [`CanvasIconLayer::on_remove`].
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// The map, while attached.
    pub fn map(&self) -> Option<&M> {
        self.attached.as_ref().map(|a| &a.map)
    }

    /// The map, while attached.
    ///
    /// Changing the viewport through this does not redraw; the host reports it with
    /// [`CanvasIconLayer::on_move_end`].
    pub fn map_mut(&mut self) -> Option<&mut M> {
        self.attached.as_mut().map(|a| &mut a.map)
    }

    /// The renderer, while attached.
    pub fn renderer(&self) -> Option<&Renderer<S, L>> {
        self.attached.as_ref().map(|a| &a.renderer)
    }

    /// The renderer, while attached.
    pub fn renderer_mut(&mut self) -> Option<&mut Renderer<S, L>> {
        self.attached.as_mut().map(|a| &mut a.renderer)
    }
}

impl<M, S: Surface, L> fmt::Debug for CanvasIconLayer<M, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasIconLayer")
            .field("options", &self.options)
            .field("store", &self.store)
            .field("render_set", &self.render_set)
            .field("dispatcher", &self.dispatcher)
            .field("attached", &self.attached.is_some())
            .finish()
    }
}
