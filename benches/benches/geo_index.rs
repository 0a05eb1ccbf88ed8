// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use marker_canvas_index::{Aabb2D, Backend, Index, IndexGeneric, RTreeF64};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// Degenerate boxes for random positions on the globe, as `(lng, lat)` points.
fn gen_positions(count: usize) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng::new(0x5EED_0F6E_01DA_B001);
    (0..count)
        .map(|_| {
            let lng = rng.next_f64() * 360.0 - 180.0;
            let lat = rng.next_f64() * 180.0 - 90.0;
            Aabb2D::point(lng, lat)
        })
        .collect()
}

type Geo = IndexGeneric<f64, u32, RTreeF64>;

fn filled(points: &[Aabb2D<f64>]) -> Geo {
    let mut idx = Index::<f64, u32>::with_rtree();
    idx.load(points.iter().enumerate().map(|(i, b)| (*b, i as u32)));
    idx
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("geo_fill");
    for &n in &[1_000_usize, 10_000, 100_000] {
        let points = gen_positions(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("bulk_load", n), &points, |b, pts| {
            b.iter(|| black_box(filled(pts)));
        });
        group.bench_with_input(BenchmarkId::new("insert_each", n), &points, |b, pts| {
            b.iter(|| {
                let mut idx = Index::<f64, u32>::with_rtree();
                for (i, p) in pts.iter().enumerate() {
                    idx.insert(*p, i as u32);
                }
                black_box(idx)
            });
        });
    }
    group.finish();
}

fn count_in<B: Backend<f64>>(idx: &IndexGeneric<f64, u32, B>, view: Aabb2D<f64>) -> usize {
    let mut hits = 0_usize;
    idx.visit_rect(view, |_, _| hits += 1);
    hits
}

fn bench_viewport_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("geo_viewport_query");
    let points = gen_positions(100_000);
    let tree = filled(&points);
    let mut scan = Index::<f64, u32>::new();
    scan.load(points.iter().enumerate().map(|(i, b)| (*b, i as u32)));
    for &(name, half) in &[("city", 0.5_f64), ("country", 5.0), ("continent", 40.0)] {
        let view = Aabb2D::new(10.0 - half * 2.0, 45.0 - half, 10.0 + half * 2.0, 45.0 + half);
        group.bench_function(BenchmarkId::new("rtree", name), |b| {
            b.iter(|| black_box(count_in(&tree, black_box(view))));
        });
        group.bench_function(BenchmarkId::new("flatvec", name), |b| {
            b.iter(|| black_box(count_in(&scan, black_box(view))));
        });
    }
    group.finish();
}

fn bench_remove_then_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("geo_churn");
    let points = gen_positions(20_000);
    // One tenth removed, the point where the layer repacks.
    let removed = points.len() / 10;
    group.bench_function("remove_10pct_then_rebuild", |b| {
        b.iter_batched(
            || filled(&points),
            |mut idx| {
                for (i, p) in points.iter().take(removed).enumerate() {
                    let id = i as u32;
                    black_box(idx.remove_where(*p, |q| *q == id));
                }
                idx.rebuild();
                black_box(idx)
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_fill,
    bench_viewport_query,
    bench_remove_then_rebuild
);
criterion_main!(benches);
