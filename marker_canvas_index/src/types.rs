// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core geometry types: the axis-aligned box and the scalar abstraction backends are generic over.

use core::fmt::Debug;
use core::ops::{Add, Mul, Sub};

/// Coordinate scalar usable by the index.
///
/// Area metrics are computed in a widened accumulator (`f32`→`f64`, `f64`→`f64`, `i64`→`i128`)
/// so that split heuristics compare robustly and integer extents never overflow.
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type for area and cost metrics.
    type Acc: Copy
        + PartialOrd
        + Debug
        + Add<Output = Self::Acc>
        + Sub<Output = Self::Acc>
        + Mul<Output = Self::Acc>;

    /// Additive identity.
    fn zero() -> Self;

    /// Midpoint of `a` and `b`, used for centroid ordering.
    fn mid(a: Self, b: Self) -> Self;

    /// Widen a coordinate into the accumulator type.
    fn widen(self) -> Self::Acc;

    /// Convert an item count into the accumulator type.
    fn acc_from_usize(n: usize) -> Self::Acc;
}

/// Accumulator type of a scalar.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

impl Scalar for f32 {
    type Acc = f64;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        a * 0.5 + b * 0.5
    }

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Counts only weight split costs; precision loss past 2^52 items is irrelevant."
    )]
    fn acc_from_usize(n: usize) -> f64 {
        n as f64
    }
}

impl Scalar for f64 {
    type Acc = f64;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        a * 0.5 + b * 0.5
    }

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Counts only weight split costs; precision loss past 2^52 items is irrelevant."
    )]
    fn acc_from_usize(n: usize) -> f64 {
        n as f64
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        a / 2 + b / 2 + (a % 2 + b % 2) / 2
    }

    #[inline]
    fn widen(self) -> i128 {
        i128::from(self)
    }

    #[inline]
    fn acc_from_usize(n: usize) -> i128 {
        i128::try_from(n).unwrap_or(i128::MAX)
    }
}

/// Axis-aligned bounding box with inclusive edges.
///
/// A box whose min equals its max on both axes is a valid *degenerate* box (a point); it is not
/// empty and it intersects any box that contains that point. A box is empty only when a min
/// exceeds its max (or a coordinate is NaN).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2D<T> {
    /// Minimum x (left).
    pub min_x: T,
    /// Minimum y (top for screen space, south for geographic space).
    pub min_y: T,
    /// Maximum x (right).
    pub max_x: T,
    /// Maximum y.
    pub max_y: T,
}

#[inline]
fn pmin<T: PartialOrd>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

#[inline]
fn pmax<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

impl<T: Copy + PartialOrd> Aabb2D<T> {
    /// Create a box from its corners.
    #[inline]
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box covering exactly one point.
    #[inline]
    pub const fn point(x: T, y: T) -> Self {
        Self::new(x, y, x, y)
    }

    /// Returns `true` if a min exceeds the corresponding max.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    /// Returns `true` if `(x, y)` lies inside the box or on its edge.
    #[inline]
    pub fn contains_point(&self, x: T, y: T) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// Intersection of two boxes; empty (see [`Aabb2D::is_empty`]) when they are disjoint.
    #[inline]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(
            pmax(self.min_x, other.min_x),
            pmax(self.min_y, other.min_y),
            pmin(self.max_x, other.max_x),
            pmin(self.max_y, other.max_y),
        )
    }

    /// Returns `true` if the boxes share at least one point.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Smallest box containing both.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            pmin(self.min_x, other.min_x),
            pmin(self.min_y, other.min_y),
            pmax(self.max_x, other.max_x),
            pmax(self.max_y, other.max_y),
        )
    }
}

impl<T: Copy + PartialOrd + Add<Output = T>> Aabb2D<T> {
    /// Create a box from an origin and a size.
    #[inline]
    pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
        Self::new(x, y, x + w, y + h)
    }
}

/// Union of two boxes.
#[inline]
pub(crate) fn union_aabb<T: Scalar>(a: Aabb2D<T>, b: Aabb2D<T>) -> Aabb2D<T> {
    a.union(&b)
}

/// Area of a box in the widened accumulator.
#[inline]
pub(crate) fn area<T: Scalar>(a: &Aabb2D<T>) -> T::Acc {
    (a.max_x.widen() - a.min_x.widen()) * (a.max_y.widen() - a.min_y.widen())
}
