// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing markers onto a canvas surface.
//!
//! Geometry is computed synchronously into a [`DrawPlan`]. Painting the plan waits for the icon
//! (and shadow) images, so it runs as a local task on the host's executor. Tasks finish in image
//! completion order; within one marker the debug fill, icon, shadow and label always paint in
//! that order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::future;
use futures::task::{LocalSpawn, LocalSpawnExt};
use kurbo::{Point, Rect, Size, Vec2};

use crate::host::Pane;
use crate::image_cache::{ImageCache, ImageLoader};
use crate::marker::{MarkerRecord, TooltipDirection};

/// A 2D drawing target sized to the map's visible area.
///
/// All coordinates are container pixels.
pub trait Surface {
    /// Image handle drawable on this surface.
    type Image: Clone + 'static;

    /// Place the surface in a map pane.
    fn attach(&mut self, pane: Pane<'_>);

    /// Take the surface out of its pane.
    fn detach(&mut self);

    /// Move the surface to a layer-pixel position, dropping any zoom transform.
    fn set_position(&mut self, top_left: Point);

    /// Change the pixel size. Resizing discards the current contents.
    fn resize(&mut self, size: Size);

    /// Current pixel size.
    fn size(&self) -> Size;

    /// Translate and scale the surface for an animated zoom.
    fn set_transform(&mut self, origin: Point, scale: f64);

    /// Clear the rectangle from the origin to [`Surface::size`].
    fn clear(&mut self);

    /// Fill a rectangle with the current fill style.
    fn fill_rect(&mut self, rect: Rect);

    /// Draw an image scaled into `rect`.
    fn draw_image(&mut self, image: &Self::Image, rect: Rect);

    /// Draw text with its baseline starting at `at`.
    fn fill_text(&mut self, text: &str, at: Point);
}

/// Text painted next to a marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    /// Text content.
    pub text: String,
    /// Baseline start.
    pub at: Point,
}

/// Where one marker's parts land on the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawPlan {
    /// Debug fill, centered on the marker with the icon's size.
    pub debug: Option<Rect>,
    /// Icon destination.
    pub icon: Rect,
    /// Shadow destination.
    pub shadow: Option<Rect>,
    /// Permanent tooltip text.
    pub label: Option<Label>,
}

impl DrawPlan {
    /// Lay out `record` with its position projected to `at`.
    pub fn new(record: &MarkerRecord, at: Point, debug: bool) -> Self {
        let icon = &record.icon;
        let anchor = icon.anchor.unwrap_or(Vec2::ZERO);
        let origin = at - anchor;
        let shadow = icon
            .shadow()
            .map(|s| Rect::from_origin_size(at - s.anchor, s.size));
        let label = record.label().map(|tooltip| {
            let shift = match tooltip.direction {
                TooltipDirection::Top => Vec2::new(0.0, -icon.size.height),
                TooltipDirection::Right => Vec2::new(icon.size.width, 0.0),
                TooltipDirection::Bottom => Vec2::new(0.0, icon.size.height),
                TooltipDirection::Left => Vec2::new(-icon.size.width, 0.0),
                TooltipDirection::Auto | TooltipDirection::Center => Vec2::ZERO,
            };
            // Horizontal placement starts from the image edge, vertical from the marker itself.
            Label {
                text: tooltip.content.clone(),
                at: Point::new(origin.x, at.y) + shift + tooltip.offset,
            }
        });
        Self {
            debug: debug.then(|| hit_box(icon.size, at)),
            icon: Rect::from_origin_size(origin, icon.size),
            shadow,
            label,
        }
    }

    /// Paint the plan with already loaded images.
    pub fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        icon: &S::Image,
        shadow: Option<&S::Image>,
    ) {
        if let Some(rect) = self.debug {
            surface.fill_rect(rect);
        }
        surface.draw_image(icon, self.icon);
        if let (Some(rect), Some(image)) = (self.shadow, shadow) {
            surface.draw_image(image, rect);
        }
        if let Some(label) = &self.label {
            surface.fill_text(&label.text, label.at);
        }
    }
}

/// Screen box used for hit testing: the icon size centered on the marker.
pub fn hit_box(icon_size: Size, at: Point) -> Rect {
    Rect::from_center_size(at, icon_size)
}

/// Draws markers onto a shared surface once their images are loaded.
pub struct Renderer<S: Surface, L> {
    surface: Rc<RefCell<S>>,
    loader: L,
    spawner: Box<dyn LocalSpawn>,
    images: ImageCache<S::Image>,
    debug: bool,
    refused: usize,
}

impl<S, L> Renderer<S, L>
where
    S: Surface + 'static,
    L: ImageLoader<S::Image>,
{
    /// Create a renderer drawing onto `surface`, spawning paint tasks on `spawner`.
    pub fn new(surface: S, loader: L, spawner: Box<dyn LocalSpawn>, debug: bool) -> Self {
        Self {
            surface: Rc::new(RefCell::new(surface)),
            loader,
            spawner,
            images: ImageCache::new(),
            debug,
            refused: 0,
        }
    }

    /// Shared handle to the surface.
    pub fn surface(&self) -> &Rc<RefCell<S>> {
        &self.surface
    }

    /// Images requested so far.
    pub fn images(&self) -> &ImageCache<S::Image> {
        &self.images
    }

    /// Number of draws dropped because the spawner refused them.
    pub fn refused_draws(&self) -> usize {
        self.refused
    }

    /// The image loader.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub(crate) fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub(crate) fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.surface.borrow_mut())
    }

    /// Clear the whole surface.
    pub fn clear(&self) {
        self.with_surface(|s| s.clear());
    }

    /// Schedule `record` to be painted at container point `at`.
    ///
    /// Returns immediately. The paint happens once the icon, and the shadow if the marker has
    /// one, have loaded. If any of them fails to load, nothing is painted.
    pub fn draw_marker(&mut self, record: &MarkerRecord, at: Point) {
        let plan = DrawPlan::new(record, at, self.debug);
        let (icon, icon_ready) = self.images.load_image(&record.icon.url, &mut self.loader);
        let shadow = record
            .icon
            .shadow()
            .map(|s| self.images.load_image(s.url, &mut self.loader));
        let surface = Rc::clone(&self.surface);
        let task = async move {
            let shadow = match shadow {
                Some((image, shadow_ready)) => {
                    let (icon_ok, shadow_ok) = future::join(icon_ready, shadow_ready).await;
                    if !(icon_ok && shadow_ok) {
                        return;
                    }
                    Some(image)
                }
                None => {
                    if !icon_ready.await {
                        return;
                    }
                    None
                }
            };
            plan.paint(&mut *surface.borrow_mut(), &icon, shadow.as_ref());
        };
        if let Err(err) = self.spawner.spawn_local(task) {
            self.refused += 1;
            if self.refused == 1 {
                log::warn!(
                    "spawner refused to draw {}: {err}; further refusals are not logged",
                    record.id
                );
            }
        }
    }
}

impl<S: Surface, L> fmt::Debug for Renderer<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("images", &self.images.len())
            .field("debug", &self.debug)
            .field("refused", &self.refused)
            .finish_non_exhaustive()
    }
}
