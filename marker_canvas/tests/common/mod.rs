// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use futures::executor::LocalPool;
use kurbo::{Point, Rect, Size, Vec2};
use marker_canvas::{
    CanvasIconLayer, Cursor, Icon, ImageLoader, LatLng, LatLngBounds, LayerOptions, MapHost,
    Marker, MarkerId, MarkerRecord, Pane, Popup, ReadySender, Surface, Tooltip,
};

/// Pixels per degree in [`FakeMap`].
pub const SCALE: f64 = 10.0;

/// Effects the layer asked the map for.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Cursor(Cursor),
    Popup(MarkerId, String),
    OpenTooltip(MarkerId, String),
    CloseTooltip(MarkerId),
}

/// Plate carrée map: the container's top-left is the north-west corner of `view`.
#[derive(Debug)]
pub struct FakeMap {
    pub view: LatLngBounds,
    pub pixel_origin: Point,
    pub animated: bool,
    pub events: Vec<HostEvent>,
}

impl FakeMap {
    pub fn new(view: LatLngBounds) -> Self {
        Self {
            view,
            pixel_origin: Point::ZERO,
            animated: false,
            events: Vec::new(),
        }
    }

    /// Shift the view by whole degrees, keeping the pixel origin in step.
    pub fn pan(&mut self, d_lat: f64, d_lng: f64) {
        let shift = |p: LatLng| LatLng::new(p.lat + d_lat, p.lng + d_lng);
        self.view = LatLngBounds::new(shift(self.view.south_west), shift(self.view.north_east));
        self.pixel_origin += Vec2::new(d_lng * SCALE, -d_lat * SCALE);
    }

    pub fn cursors(&self) -> Vec<Cursor> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Cursor(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

impl MapHost for FakeMap {
    fn bounds(&self) -> LatLngBounds {
        self.view
    }

    fn lat_lng_to_container_point(&self, at: LatLng) -> Point {
        Point::new(
            (at.lng - self.view.west()) * SCALE,
            (self.view.north() - at.lat) * SCALE,
        )
    }

    fn container_point_to_layer_point(&self, point: Point) -> Point {
        point + self.pixel_origin.to_vec2()
    }

    fn size(&self) -> Size {
        Size::new(
            (self.view.east() - self.view.west()) * SCALE,
            (self.view.north() - self.view.south()) * SCALE,
        )
    }

    fn zoom_animated(&self) -> bool {
        self.animated
    }

    fn zoom_scale(&self, zoom: f64) -> f64 {
        2_f64.powf(zoom - 4.0)
    }

    fn zoom_anim_origin(&self, zoom: f64, _center: LatLng) -> Point {
        Point::new(-zoom, -zoom)
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.events.push(HostEvent::Cursor(cursor));
    }

    fn open_popup(&mut self, marker: &MarkerRecord, popup: &Popup) {
        self.events
            .push(HostEvent::Popup(marker.id, popup.content.clone()));
    }

    fn open_tooltip(&mut self, marker: &MarkerRecord, tooltip: &Tooltip) {
        self.events
            .push(HostEvent::OpenTooltip(marker.id, tooltip.content.clone()));
    }

    fn close_tooltip(&mut self, id: MarkerId) {
        self.events.push(HostEvent::CloseTooltip(id));
    }
}

/// A call made on [`RecordingSurface`]. Images are identified by URL.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Attach(Option<String>),
    Detach,
    Position(Point),
    Resize(Size),
    Transform(Point, f64),
    Clear,
    Fill(Rect),
    Image(String, Rect),
    Text(String, Point),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub size: Size,
    pub ops: Vec<Op>,
}

impl RecordingSurface {
    /// URLs drawn, in order.
    pub fn images(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Image(url, _) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Destinations of images drawn from `url`.
    pub fn rects_of(&self, url: &str) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Image(u, r) if u == url => Some(*r),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    type Image = String;

    fn attach(&mut self, pane: Pane<'_>) {
        let name = match pane {
            Pane::Overlay => None,
            Pane::Named(name) => Some(name.to_owned()),
        };
        self.ops.push(Op::Attach(name));
    }

    fn detach(&mut self) {
        self.ops.push(Op::Detach);
    }

    fn set_position(&mut self, top_left: Point) {
        self.ops.push(Op::Position(top_left));
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.ops.push(Op::Resize(size));
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_transform(&mut self, origin: Point, scale: f64) {
        self.ops.push(Op::Transform(origin, scale));
    }

    fn clear(&mut self) {
        self.ops.push(Op::Clear);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ops.push(Op::Fill(rect));
    }

    fn draw_image(&mut self, image: &String, rect: Rect) {
        self.ops.push(Op::Image(image.clone(), rect));
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        self.ops.push(Op::Text(text.to_owned(), at));
    }
}

/// Loader whose loads complete only when the test says so, unless `instant` is set.
#[derive(Debug, Default)]
pub struct ManualLoader {
    pub instant: bool,
    pub requested: Vec<String>,
    pending: Vec<(String, ReadySender)>,
}

impl ManualLoader {
    pub fn instant() -> Self {
        Self {
            instant: true,
            ..Self::default()
        }
    }

    /// Complete every pending load of `url`.
    pub fn finish(&mut self, url: &str) {
        let (done, rest) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition::<Vec<_>, _>(|(u, _)| u == url);
        self.pending = rest;
        for (_, ready) in done {
            ready.ready();
        }
    }

    /// Fail every pending load of `url`.
    pub fn fail(&mut self, url: &str) {
        self.pending.retain(|(u, _)| u != url);
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requested.iter().filter(|u| *u == url).count()
    }
}

impl ImageLoader<String> for ManualLoader {
    fn load(&mut self, url: &str, ready: ReadySender) -> String {
        self.requested.push(url.to_owned());
        if self.instant {
            ready.ready();
        } else {
            self.pending.push((url.to_owned(), ready));
        }
        url.to_owned()
    }
}

pub type TestLayer = CanvasIconLayer<FakeMap, RecordingSurface, ManualLoader>;

/// Ten degrees of latitude by twenty of longitude, 200 by 100 pixels.
pub fn view() -> LatLngBounds {
    LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(10.0, 20.0))
}

pub fn pin() -> Icon {
    Icon::new("pin.png", Size::new(10.0, 10.0)).with_anchor(Vec2::new(5.0, 5.0))
}

pub fn marker(lat: f64, lng: f64) -> Marker {
    Marker::new(LatLng::new(lat, lng), pin())
}

/// Container pixel of a position in the unpanned [`view`].
pub fn pixel(lat: f64, lng: f64) -> Point {
    Point::new(lng * SCALE, (10.0 - lat) * SCALE)
}

pub fn attached(options: LayerOptions, loader: ManualLoader) -> (TestLayer, LocalPool) {
    let pool = LocalPool::new();
    let mut layer = TestLayer::new(options);
    layer.on_add(
        FakeMap::new(view()),
        RecordingSurface::default(),
        loader,
        pool.spawner(),
    );
    (layer, pool)
}

pub fn map(layer: &TestLayer) -> &FakeMap {
    layer.map().expect("layer is attached")
}

pub fn map_mut(layer: &mut TestLayer) -> &mut FakeMap {
    layer.map_mut().expect("layer is attached")
}

pub fn loader(layer: &mut TestLayer) -> &mut ManualLoader {
    layer
        .renderer_mut()
        .expect("layer is attached")
        .loader_mut()
}

pub fn ops(layer: &TestLayer) -> Vec<Op> {
    surface_do(layer, |s| s.ops.clone())
}

pub fn surface_do<R>(layer: &TestLayer, f: impl FnOnce(&RecordingSurface) -> R) -> R {
    let renderer = layer.renderer().expect("layer is attached");
    f(&renderer.surface().borrow())
}

pub fn clear_ops(layer: &TestLayer) {
    let renderer = layer.renderer().expect("layer is attached");
    renderer.surface().borrow_mut().ops.clear();
}
