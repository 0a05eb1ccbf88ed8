// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geographic coordinates and bounds.

use marker_canvas_index::Aabb2D;

/// A geographic position in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLng {
    /// Latitude, positive north.
    pub lat: f64,
    /// Longitude, positive east.
    pub lng: f64,
}

impl LatLng {
    /// Create a position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Degenerate box at this position, with longitude on x and latitude on y.
    #[must_use]
    pub fn to_aabb(self) -> Aabb2D<f64> {
        Aabb2D::point(self.lng, self.lat)
    }
}

/// A geographic rectangle given by its south-west and north-east corners.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLngBounds {
    /// South-west corner.
    pub south_west: LatLng,
    /// North-east corner.
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Every valid latitude and longitude.
    pub const WORLD: Self = Self::new(LatLng::new(-90.0, -180.0), LatLng::new(90.0, 180.0));

    /// Create bounds from two corners.
    #[must_use]
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Western edge (minimum longitude).
    #[must_use]
    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    /// Southern edge (minimum latitude).
    #[must_use]
    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    /// Eastern edge (maximum longitude).
    #[must_use]
    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    /// Northern edge (maximum latitude).
    #[must_use]
    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    /// Returns `true` if `at` lies inside the bounds or on an edge.
    #[must_use]
    pub fn contains(&self, at: LatLng) -> bool {
        at.lat >= self.south()
            && at.lat <= self.north()
            && at.lng >= self.west()
            && at.lng <= self.east()
    }

    /// Query box for the geographic index: `{west, south, east, north}`.
    #[must_use]
    pub fn to_aabb(&self) -> Aabb2D<f64> {
        Aabb2D::new(self.west(), self.south(), self.east(), self.north())
    }
}
