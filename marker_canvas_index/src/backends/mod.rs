// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple).
//! - `rtree`: generic R-tree (`T: Scalar`) with SAH-like split (aliases: `RTreeI64`, `RTreeF32`, `RTreeF64`).
//!
//! SAH note
//! --------
//! The R-tree splits overflowing nodes with an SAH-like heuristic.
//! For a split point `k` along a sorted axis we minimize:
//!
//! `cost(k) = area(LB_k) * k + area(RB_k) * (n - k)`
//!
//! where `LB_k` and `RB_k` are the bounding boxes of the first `k` and remaining `n - k` items.
//! Bulk loading uses an STR-like pass to seed packed leaves and parents.

pub(crate) mod flatvec;
pub(crate) mod rtree;

pub use flatvec::FlatVec;
pub use rtree::{RTree, RTreeF32, RTreeF64, RTreeI64};
