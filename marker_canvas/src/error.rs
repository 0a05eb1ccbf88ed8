// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

/// Reasons a layer refuses an item.
///
/// These never escape the public mutation API: the layer logs them and drops the item. They are
/// returned from [`Marker::validate`](crate::Marker::validate) for callers that want to check
/// ahead of time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerError {
    /// The item does not live in the marker pane.
    WrongPane {
        /// Pane the item asked for.
        pane: String,
    },
    /// The item has no icon to draw.
    MissingIcon,
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPane { pane } => {
                write!(f, "layer isn't a marker: pane `{pane}` is not the marker pane")
            }
            Self::MissingIcon => f.write_str("layer isn't a marker: no icon"),
        }
    }
}

impl std::error::Error for LayerError {}
