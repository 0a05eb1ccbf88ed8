// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer hit testing and listener dispatch.

use std::fmt;

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::host::{Cursor, MapHost};
use crate::marker::{MarkerId, MarkerRecord};
use crate::render_set::RenderSet;
use crate::store::MarkerStore;

/// Kind of pointer event delivered by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// A click.
    Click,
    /// Pointer movement.
    Move,
}

/// A pointer event in container pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// What happened.
    pub kind: PointerKind,
    /// Where, relative to the map's visible area.
    pub container_point: Point,
}

impl PointerEvent {
    /// A click at `at`.
    pub fn click(at: Point) -> Self {
        Self {
            kind: PointerKind::Click,
            container_point: at,
        }
    }

    /// A pointer move to `at`.
    pub fn moved(at: Point) -> Self {
        Self {
            kind: PointerKind::Move,
            container_point: at,
        }
    }
}

/// A marker under the pointer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit<'a> {
    /// Marker id.
    pub id: MarkerId,
    /// Screen box that was hit.
    pub bounds: Rect,
    /// The marker.
    pub marker: &'a MarkerRecord,
}

/// Callback invoked with the event and every marker under the pointer.
pub type Listener = Box<dyn FnMut(&PointerEvent, &[Hit<'_>])>;

/// Markers under `point`, resolved against the store.
///
/// Boxes left behind by a removal without redraw are skipped.
pub fn hits_at<'a>(
    render_set: &RenderSet,
    store: &'a MarkerStore,
    point: Point,
) -> SmallVec<[Hit<'a>; 4]> {
    render_set
        .hit_test(point)
        .into_iter()
        .filter_map(|entry| {
            Some(Hit {
                id: entry.id,
                bounds: entry.bounds,
                marker: store.get(entry.id)?,
            })
        })
        .collect()
}

/// Routes pointer events to the host and registered listeners.
#[derive(Default)]
pub(crate) struct Dispatcher {
    click: Vec<Listener>,
    hover: Vec<Listener>,
    open_tooltip: Option<MarkerId>,
}

impl Dispatcher {
    pub(crate) fn on_click(&mut self, listener: Listener) {
        self.click.push(listener);
    }

    pub(crate) fn on_hover(&mut self, listener: Listener) {
        self.hover.push(listener);
    }

    pub(crate) fn open_tooltip(&self) -> Option<MarkerId> {
        self.open_tooltip
    }

    pub(crate) fn take_open_tooltip(&mut self) -> Option<MarkerId> {
        self.open_tooltip.take()
    }

    /// Handle one event; returns the number of markers hit.
    pub(crate) fn dispatch<M: MapHost + ?Sized>(
        &mut self,
        map: &mut M,
        store: &MarkerStore,
        render_set: &RenderSet,
        event: &PointerEvent,
    ) -> usize {
        // The hover tooltip only lives until the next pointer event.
        if let Some(id) = self.take_open_tooltip() {
            map.close_tooltip(id);
        }

        let hits = hits_at(render_set, store, event.container_point);
        let Some(first) = hits.first() else {
            map.set_cursor(Cursor::Default);
            return 0;
        };
        map.set_cursor(Cursor::Pointer);

        match event.kind {
            PointerKind::Click => {
                if let Some(popup) = &first.marker.popup {
                    map.open_popup(first.marker, popup);
                }
                for listener in &mut self.click {
                    listener(event, hits.as_slice());
                }
            }
            PointerKind::Move => {
                if let Some(tooltip) = &first.marker.tooltip
                    && !tooltip.permanent
                {
                    self.open_tooltip = Some(first.id);
                    map.open_tooltip(first.marker, tooltip);
                    for listener in &mut self.hover {
                        listener(event, hits.as_slice());
                    }
                }
            }
        }
        hits.len()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("click", &self.click.len())
            .field("hover", &self.hover.len())
            .field("open_tooltip", &self.open_tooltip)
            .finish()
    }
}
