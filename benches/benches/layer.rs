// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use futures::executor::LocalPool;
use kurbo::{Point, Rect, Size, Vec2};
use marker_canvas::{
    CanvasIconLayer, Cursor, Icon, ImageLoader, LatLng, LatLngBounds, LayerOptions, MapHost,
    Marker, MarkerId, MarkerRecord, Pane, Popup, ReadySender, Surface, Tooltip,
};

/// Europe-sized viewport, 1600 by 800 pixels.
struct Viewport;

impl MapHost for Viewport {
    fn bounds(&self) -> LatLngBounds {
        LatLngBounds::new(LatLng::new(35.0, -10.0), LatLng::new(55.0, 30.0))
    }
    fn lat_lng_to_container_point(&self, at: LatLng) -> Point {
        Point::new((at.lng + 10.0) * 40.0, (55.0 - at.lat) * 40.0)
    }
    fn container_point_to_layer_point(&self, point: Point) -> Point {
        point
    }
    fn size(&self) -> Size {
        Size::new(1600.0, 800.0)
    }
    fn set_cursor(&mut self, _: Cursor) {}
    fn open_popup(&mut self, _: &MarkerRecord, _: &Popup) {}
    fn open_tooltip(&mut self, _: &MarkerRecord, _: &Tooltip) {}
    fn close_tooltip(&mut self, _: MarkerId) {}
}

/// Counts draw calls instead of rasterizing.
#[derive(Default)]
struct Counting {
    size: Size,
    draws: usize,
}

impl Surface for Counting {
    type Image = ();

    fn attach(&mut self, _: Pane<'_>) {}
    fn detach(&mut self) {}
    fn set_position(&mut self, _: Point) {}
    fn resize(&mut self, size: Size) {
        self.size = size;
    }
    fn size(&self) -> Size {
        self.size
    }
    fn set_transform(&mut self, _: Point, _: f64) {}
    fn clear(&mut self) {}
    fn fill_rect(&mut self, _: Rect) {}
    fn draw_image(&mut self, _: &(), _: Rect) {
        self.draws += 1;
    }
    fn fill_text(&mut self, _: &str, _: Point) {}
}

struct Instant;

impl ImageLoader<()> for Instant {
    fn load(&mut self, _: &str, ready: ReadySender) {
        ready.ready();
    }
}

type BenchLayer = CanvasIconLayer<Viewport, Counting, Instant>;

fn markers(count: usize) -> Vec<Marker> {
    let icon = Icon::new("pin.png", Size::new(16.0, 16.0)).with_anchor(Vec2::new(8.0, 8.0));
    // Deterministic scatter over the whole globe, about 1% of it in view.
    (0..count)
        .map(|i| {
            let t = i as f64;
            let lat = (t * 0.618_033_988_75).fract() * 180.0 - 90.0;
            let lng = (t * 0.754_877_666_25).fract() * 360.0 - 180.0;
            Marker::new(LatLng::new(lat, lng), icon.clone())
        })
        .collect()
}

fn attached(count: usize) -> (BenchLayer, LocalPool) {
    let pool = LocalPool::new();
    let mut layer = BenchLayer::new(LayerOptions::default());
    layer.add_markers(markers(count));
    layer.on_add(Viewport, Counting::default(), Instant, pool.spawner());
    (layer, pool)
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("layer_add");
    group.sample_size(20);
    let batch = markers(20_000);
    group.bench_function("add_markers_20k", |b| {
        b.iter_batched(
            || batch.clone(),
            |batch| {
                let mut layer = BenchLayer::new(LayerOptions::default());
                black_box(layer.add_markers(batch));
                black_box(layer)
            },
            BatchSize::LargeInput,
        );
    });
    group.bench_function("add_marker_each_20k", |b| {
        b.iter_batched(
            || batch.clone(),
            |batch| {
                let mut layer = BenchLayer::new(LayerOptions::default());
                for m in batch {
                    black_box(layer.add_marker(m));
                }
                black_box(layer)
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_redraw(c: &mut Criterion) {
    let mut group = c.benchmark_group("layer_redraw");
    let (mut layer, mut pool) = attached(100_000);
    group.bench_function("redraw_100k", |b| {
        b.iter(|| {
            layer.redraw();
            pool.run_until_stalled();
        });
    });
    group.bench_function("hit_test", |b| {
        b.iter(|| black_box(layer.hit_test(black_box(Point::new(800.0, 400.0))).len()));
    });
    group.finish();
}

criterion_group!(benches, bench_add, bench_redraw);
criterion_main!(benches);
