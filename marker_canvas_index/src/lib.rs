// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker Canvas Index: a generic 2D AABB index with bulk loading and pluggable backends.
//!
//! This is the spatial building block of the marker canvas layer. The layer keeps two of these:
//! one keyed by longitude/latitude holding every marker, and one keyed by pixel boxes holding the
//! markers drawn in the current frame.
//!
//! - [`Aabb2D`]: inclusive axis-aligned box. Degenerate (point) boxes are first-class.
//! - [`Index`] / [`IndexGeneric`]: keyed entries with a copyable payload.
//!   - [`IndexGeneric::insert`] for single items, [`IndexGeneric::load`] for batches.
//!   - [`IndexGeneric::remove`] by key and [`IndexGeneric::remove_where`] by payload predicate.
//!   - [`IndexGeneric::rebuild`] linearizes and bulk loads all live entries.
//!   - [`IndexGeneric::query_point`] / [`IndexGeneric::query_rect`] and their `visit_*` forms.
//! - [`Backend`]: the spatial strategy. [`FlatVec`] scans linearly; [`RTree`] packs with STR on
//!   bulk load and splits with an SAH-like heuristic on overflow.
//!
//! ```
//! use marker_canvas_index::{Aabb2D, Index};
//!
//! let mut idx = Index::<f64, u32>::with_rtree();
//! idx.load([(Aabb2D::point(1.0, 1.0), 1), (Aabb2D::point(4.0, 4.0), 2)]);
//! let hits: Vec<u32> = idx.query_rect(Aabb2D::new(0.0, 0.0, 2.0, 2.0)).map(|(_, p)| p).collect();
//! assert_eq!(hits, [1]);
//! ```
//!
//! Float inputs are assumed to be finite (no NaNs).
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod backend;
mod backends;
mod index;
mod types;

pub use backend::Backend;
pub use backends::{FlatVec, RTree, RTreeF32, RTreeF64, RTreeI64};
pub use index::{Index, IndexGeneric, Key};
pub use types::{Aabb2D, Scalar, ScalarAcc};
