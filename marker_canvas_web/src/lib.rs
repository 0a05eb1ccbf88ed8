// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for [`marker_canvas`].
//!
//! When targeting `wasm32` this crate provides:
//! - [`CanvasSurface`]: a [`Surface`] over an `HtmlCanvasElement` and its 2D context, placed in
//!   a map pane and positioned with CSS transforms.
//! - [`HtmlImageLoader`]: an [`ImageLoader`] creating one `<img>` per URL and signalling
//!   readiness from its `load` event.
//! - [`BrowserSpawner`]: a [`LocalSpawn`] running paint tasks on the browser's microtask queue.
//!
//! ```no_run
//! #[cfg(target_arch = "wasm32")]
//! fn make_surface(
//!     document: &web_sys::Document,
//!     overlay: web_sys::Element,
//! ) -> Result<marker_canvas_web::CanvasSurface, wasm_bindgen::JsValue> {
//!     marker_canvas_web::CanvasSurface::new(document, overlay, true)
//! }
//! ```
//!
//! On other targets the same types exist as inert stand-ins so the crate can be part of the
//! workspace: the surface draws nothing, every image load fails, and spawning is refused.

use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use kurbo::{Point, Rect, Size};
use marker_canvas::{CanvasIconLayer, ImageLoader, MapHost, Pane, ReadySender, Surface};

#[cfg(target_arch = "wasm32")]
use std::{cell::Cell, fmt, rc::Rc};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
#[cfg(target_arch = "wasm32")]
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlImageElement};

/// A canvas layer drawing through this crate's browser types.
pub type WebCanvasIconLayer<M> = CanvasIconLayer<M, CanvasSurface, HtmlImageLoader>;

/// Attach `layer` to `map`, drawing onto `surface` with the default loader and spawner.
pub fn attach<M: MapHost>(layer: &mut WebCanvasIconLayer<M>, map: M, surface: CanvasSurface) {
    layer.on_add(map, surface, HtmlImageLoader::default(), BrowserSpawner);
}

/// CSS `transform` value placing an element at `origin`, optionally scaled.
pub fn transform_css(origin: Point, scale: Option<f64>) -> String {
    let translate = format!("translate3d({}px,{}px,0)", origin.x, origin.y);
    match scale {
        Some(s) => format!("{translate} scale({s})"),
        None => translate,
    }
}

/// Canvas backing-store dimensions for a pixel size.
#[allow(
    clippy::cast_possible_truncation,
    reason = "map containers are far smaller than u32::MAX pixels"
)]
pub fn canvas_extent(size: Size) -> (u32, u32) {
    let side = |v: f64| v.max(0.0).round() as u32;
    (side(size.width), side(size.height))
}

/// Runs paint tasks on the browser's event loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    #[cfg(target_arch = "wasm32")]
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_local_obj(&self, _future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        Err(SpawnError::shutdown())
    }
}

/// Image handle drawn by [`CanvasSurface`].
///
/// Empty if the `<img>` element could not be created.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug, Default)]
pub struct CanvasImage(Option<HtmlImageElement>);

#[cfg(target_arch = "wasm32")]
impl CanvasImage {
    /// The underlying element.
    pub fn element(&self) -> Option<&HtmlImageElement> {
        self.0.as_ref()
    }
}

/// Loads icons through `<img>` elements.
#[derive(Clone, Debug, Default)]
pub struct HtmlImageLoader {
    cross_origin: Option<String>,
}

impl HtmlImageLoader {
    /// A loader with no CORS mode set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `crossOrigin` attribute on every image, e.g. `"anonymous"`.
    #[must_use]
    pub fn with_cross_origin(mut self, mode: impl Into<String>) -> Self {
        self.cross_origin = Some(mode.into());
        self
    }
}

#[cfg(target_arch = "wasm32")]
impl ImageLoader<CanvasImage> for HtmlImageLoader {
    fn load(&mut self, url: &str, ready: ReadySender) -> CanvasImage {
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(err) => {
                log::error!("cannot create image element for {url}: {err:?}");
                return CanvasImage(None);
            }
        };
        // Whichever of `load` and `error` fires first settles the signal.
        let slot = Rc::new(Cell::new(Some(ready)));
        let on_load = {
            let slot = Rc::clone(&slot);
            Closure::once_into_js(move || {
                if let Some(ready) = slot.take() {
                    ready.ready();
                }
            })
        };
        let on_error = {
            let url = url.to_owned();
            Closure::once_into_js(move || {
                if slot.take().is_some() {
                    log::warn!("failed to load {url}");
                }
            })
        };
        image.set_onload(Some(on_load.unchecked_ref::<js_sys::Function>()));
        image.set_onerror(Some(on_error.unchecked_ref::<js_sys::Function>()));
        if let Some(mode) = &self.cross_origin {
            image.set_cross_origin(Some(mode.as_str()));
        }
        image.set_src(url);
        CanvasImage(Some(image))
    }
}

/// A `<canvas>` sized to the map container.
#[cfg(target_arch = "wasm32")]
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    overlay: Element,
    panes: Vec<(String, Element)>,
}

#[cfg(target_arch = "wasm32")]
impl fmt::Debug for CanvasSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CanvasSurface { .. }")
    }
}

#[cfg(target_arch = "wasm32")]
impl CanvasSurface {
    /// Create a detached canvas that attaches to `overlay` unless a named pane is configured.
    ///
    /// `zoom_animated` selects the class the map uses to animate or hide the canvas during a
    /// zoom.
    pub fn new(document: &Document, overlay: Element, zoom_animated: bool) -> Result<Self, JsValue> {
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        let zoom = if zoom_animated { "animated" } else { "hide" };
        canvas.set_class_name(&format!(
            "leaflet-canvas-icon-layer leaflet-layer leaflet-zoom-{zoom}"
        ));
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("missing 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            ctx,
            overlay,
            panes: Vec::new(),
        })
    }

    /// Register a pane the layer may be configured to use.
    #[must_use]
    pub fn with_pane(mut self, name: impl Into<String>, element: Element) -> Self {
        self.panes.push((name.into(), element));
        self
    }

    /// The canvas element.
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn set_css_transform(&self, css: &str) {
        if let Err(err) = self.canvas.style().set_property("transform", css) {
            log::warn!("cannot set canvas transform: {err:?}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Surface for CanvasSurface {
    type Image = CanvasImage;

    fn attach(&mut self, pane: Pane<'_>) {
        let target = match pane {
            Pane::Overlay => &self.overlay,
            Pane::Named(name) => match self.panes.iter().find(|(n, _)| n == name) {
                Some((_, element)) => element,
                None => {
                    log::warn!("unknown pane `{name}`, using the overlay pane");
                    &self.overlay
                }
            },
        };
        if let Err(err) = target.append_child(&self.canvas) {
            log::error!("cannot attach canvas: {err:?}");
        }
    }

    fn detach(&mut self) {
        self.canvas.remove();
    }

    fn set_position(&mut self, top_left: Point) {
        self.set_css_transform(&transform_css(top_left, None));
    }

    fn resize(&mut self, size: Size) {
        let (w, h) = canvas_extent(size);
        self.canvas.set_width(w);
        self.canvas.set_height(h);
    }

    fn size(&self) -> Size {
        Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn set_transform(&mut self, origin: Point, scale: f64) {
        self.set_css_transform(&transform_css(origin, Some(scale)));
    }

    fn clear(&mut self) {
        let size = self.size();
        self.ctx.clear_rect(0.0, 0.0, size.width, size.height);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ctx
            .fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
    }

    fn draw_image(&mut self, image: &CanvasImage, rect: Rect) {
        let Some(element) = image.element() else {
            return;
        };
        if let Err(err) = self.ctx.draw_image_with_html_image_element_and_dw_and_dh(
            element,
            rect.x0,
            rect.y0,
            rect.width(),
            rect.height(),
        ) {
            log::warn!("cannot draw {}: {err:?}", element.src());
        }
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        if let Err(err) = self.ctx.fill_text(text, at.x, at.y) {
            log::warn!("cannot draw label: {err:?}");
        }
    }
}

/// Stand-in image handle for non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug, Default)]
pub struct CanvasImage;

#[cfg(not(target_arch = "wasm32"))]
impl ImageLoader<CanvasImage> for HtmlImageLoader {
    fn load(&mut self, url: &str, ready: ReadySender) -> CanvasImage {
        log::warn!("images are only loaded on wasm32; {url} will not be drawn");
        drop(ready);
        CanvasImage
    }
}

/// Stand-in surface for non-wasm targets. Keeps its size and draws nothing.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct CanvasSurface {
    size: Size,
}

#[cfg(not(target_arch = "wasm32"))]
impl Surface for CanvasSurface {
    type Image = CanvasImage;

    fn attach(&mut self, _pane: Pane<'_>) {}
    fn detach(&mut self) {}
    fn set_position(&mut self, _top_left: Point) {}
    fn resize(&mut self, size: Size) {
        self.size = size;
    }
    fn size(&self) -> Size {
        self.size
    }
    fn set_transform(&mut self, _origin: Point, _scale: f64) {}
    fn clear(&mut self) {}
    fn fill_rect(&mut self, _rect: Rect) {}
    fn draw_image(&mut self, _image: &CanvasImage, _rect: Rect) {}
    fn fill_text(&mut self, _text: &str, _at: Point) {}
}
