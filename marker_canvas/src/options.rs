// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::host::Pane;

/// Construction-time configuration of a [`CanvasIconLayer`](crate::CanvasIconLayer).
///
/// With the `serde` feature enabled this round-trips through any serde format; missing fields
/// take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LayerOptions {
    /// Named map pane to place the canvas in. `None` uses the overlay pane.
    pub pane: Option<String>,
    /// Fill each icon's box with a solid rectangle before drawing it.
    pub debug: bool,
}

impl LayerOptions {
    /// Default options: overlay pane, no debug fill.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the canvas in a named pane.
    #[must_use]
    pub fn with_pane(mut self, pane: impl Into<String>) -> Self {
        self.pane = Some(pane.into());
        self
    }

    /// Enable or disable the debug fill.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn target_pane(&self) -> Pane<'_> {
        match &self.pane {
            Some(name) => Pane::Named(name),
            None => Pane::Overlay,
        }
    }
}
