// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markers and the records the layer keeps for them.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroU64;

use kurbo::{Size, Vec2};

use crate::error::LayerError;
use crate::geo::LatLng;

/// Name of the pane markers live in.
pub const MARKER_PANE: &str = "markerPane";

/// Bitmap drawn for a marker, plus an optional shadow drawn after it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Icon {
    /// Image source.
    pub url: String,
    /// Drawn size in pixels.
    pub size: Size,
    /// Pixel offset from the top-left of the image to the marker position.
    ///
    /// `None` places the image's top-left on the marker position.
    pub anchor: Option<Vec2>,
    /// Shadow image source.
    pub shadow_url: Option<String>,
    /// Shadow size in pixels.
    pub shadow_size: Option<Size>,
    /// Shadow anchor in pixels.
    pub shadow_anchor: Option<Vec2>,
}

/// A fully specified shadow, borrowed from an [`Icon`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Shadow<'a> {
    /// Image source.
    pub url: &'a str,
    /// Drawn size in pixels.
    pub size: Size,
    /// Pixel offset from the shadow's top-left to the marker position.
    pub anchor: Vec2,
}

impl Icon {
    /// Create an icon with no anchor and no shadow.
    pub fn new(url: impl Into<String>, size: Size) -> Self {
        Self {
            url: url.into(),
            size,
            anchor: None,
            shadow_url: None,
            shadow_size: None,
            shadow_anchor: None,
        }
    }

    /// Set the anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Set all shadow fields at once.
    #[must_use]
    pub fn with_shadow(mut self, url: impl Into<String>, size: Size, anchor: Vec2) -> Self {
        self.shadow_url = Some(url.into());
        self.shadow_size = Some(size);
        self.shadow_anchor = Some(anchor);
        self
    }

    /// The shadow, if url, size and anchor are all present.
    ///
    /// A partially specified shadow is ignored.
    pub fn shadow(&self) -> Option<Shadow<'_>> {
        Some(Shadow {
            url: self.shadow_url.as_deref()?,
            size: self.shadow_size?,
            anchor: self.shadow_anchor?,
        })
    }
}

/// Where a tooltip sits relative to its marker's icon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TooltipDirection {
    /// Let the host decide.
    #[default]
    Auto,
    /// Above the icon.
    Top,
    /// Right of the icon.
    Right,
    /// Below the icon.
    Bottom,
    /// Left of the icon.
    Left,
    /// On the icon.
    Center,
}

/// Text attached to a marker.
///
/// Permanent tooltips are painted onto the canvas as labels. Others are opened through the host
/// while the pointer hovers the marker.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tooltip {
    /// Text content.
    pub content: String,
    /// Paint as a label instead of opening on hover.
    pub permanent: bool,
    /// Placement relative to the icon.
    pub direction: TooltipDirection,
    /// Extra pixel offset.
    pub offset: Vec2,
}

impl Tooltip {
    /// A hover tooltip with automatic placement.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            permanent: false,
            direction: TooltipDirection::Auto,
            offset: Vec2::ZERO,
        }
    }

    /// A permanent label.
    pub fn permanent(content: impl Into<String>) -> Self {
        Self {
            permanent: true,
            ..Self::new(content)
        }
    }

    /// Set the placement.
    #[must_use]
    pub fn with_direction(mut self, direction: TooltipDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the extra offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

/// Content opened by the host when the marker is clicked.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Popup {
    /// Content handed to the host.
    pub content: String,
}

impl Popup {
    /// Create a popup.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// An item offered to the layer.
///
/// Only items in [`MARKER_PANE`] that carry an [`Icon`] are accepted.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    /// Geographic position.
    pub position: LatLng,
    /// Pane the item belongs to.
    pub pane: Cow<'static, str>,
    /// Icon to draw.
    pub icon: Option<Icon>,
    /// Optional tooltip.
    pub tooltip: Option<Tooltip>,
    /// Optional popup.
    pub popup: Option<Popup>,
}

impl Marker {
    /// A marker in the marker pane.
    pub fn new(position: LatLng, icon: Icon) -> Self {
        Self {
            position,
            pane: Cow::Borrowed(MARKER_PANE),
            icon: Some(icon),
            tooltip: None,
            popup: None,
        }
    }

    /// Attach a tooltip.
    #[must_use]
    pub fn with_tooltip(mut self, tooltip: Tooltip) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    /// Attach a popup.
    #[must_use]
    pub fn with_popup(mut self, popup: Popup) -> Self {
        self.popup = Some(popup);
        self
    }

    /// Move the item to another pane.
    #[must_use]
    pub fn with_pane(mut self, pane: impl Into<Cow<'static, str>>) -> Self {
        self.pane = pane.into();
        self
    }

    /// Check that the layer would accept this item.
    pub fn validate(&self) -> Result<&Icon, LayerError> {
        if self.pane != MARKER_PANE {
            return Err(LayerError::WrongPane {
                pane: self.pane.clone().into_owned(),
            });
        }
        self.icon.as_ref().ok_or(LayerError::MissingIcon)
    }
}

/// Identity of a marker within one layer.
///
/// Ids are never reused by the layer that issued them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(NonZeroU64);

impl MarkerId {
    pub(crate) const fn from_raw(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Numeric value of the id.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// A marker the layer has accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerRecord {
    /// Identity of the marker.
    pub id: MarkerId,
    /// Geographic position.
    pub position: LatLng,
    /// Icon to draw.
    pub icon: Icon,
    /// Optional tooltip.
    pub tooltip: Option<Tooltip>,
    /// Optional popup.
    pub popup: Option<Popup>,
}

impl MarkerRecord {
    pub(crate) fn accept(id: MarkerId, marker: Marker) -> Result<Self, LayerError> {
        marker.validate()?;
        let Marker {
            position,
            icon,
            tooltip,
            popup,
            ..
        } = marker;
        let icon = icon.ok_or(LayerError::MissingIcon)?;
        Ok(Self {
            id,
            position,
            icon,
            tooltip,
            popup,
        })
    }

    /// Returns `true` if a fully specified shadow is drawn with the icon.
    pub fn has_shadow(&self) -> bool {
        self.icon.shadow().is_some()
    }

    /// The tooltip, if it is painted as a label.
    pub fn label(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref().filter(|t| t.permanent)
    }

    /// Rebuild the item that was offered to the layer.
    pub fn into_marker(self) -> Marker {
        Marker {
            position: self.position,
            pane: Cow::Borrowed(MARKER_PANE),
            icon: Some(self.icon),
            tooltip: self.tooltip,
            popup: self.popup,
        }
    }
}
