// Copyright 2025 the Marker Canvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image loading with one shared readiness signal per URL.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use hashbrown::HashMap;

/// Starts loading images for a surface.
///
/// The image handle is returned immediately and may not be drawable yet. The loader keeps the
/// [`ReadySender`] and calls [`ReadySender::ready`] once the pixels are available. Dropping the
/// sender without calling it marks the load as failed, and nothing waiting on it is drawn.
pub trait ImageLoader<I> {
    /// Begin loading `url`.
    fn load(&mut self, url: &str, ready: ReadySender) -> I;
}

/// Completion half of an image load.
#[derive(Debug)]
pub struct ReadySender(oneshot::Sender<()>);

impl ReadySender {
    /// Mark the image as loaded.
    pub fn ready(self) {
        // The receiving side lives in the cache; if the layer was detached there is no one left
        // to tell.
        let _ = self.0.send(());
    }
}

/// Resolves once an image is loaded.
///
/// Clones observe the same load. Resolves to `false` if the load failed.
#[derive(Clone)]
pub struct ReadySignal(Shared<oneshot::Receiver<()>>);

impl ReadySignal {
    fn pair() -> (ReadySender, Self) {
        let (tx, rx) = oneshot::channel();
        (ReadySender(tx), Self(rx.shared()))
    }

    /// Returns `true` if the image finished loading successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.0.peek(), Some(Ok(())))
    }
}

impl Future for ReadySignal {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        self.0.poll_unpin(cx).map(|r| r.is_ok())
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Entry<I> {
    image: I,
    ready: ReadySignal,
}

/// Image handles by URL.
///
/// Each URL is requested from the loader at most once for the lifetime of the cache. Entries are
/// never evicted.
#[derive(Debug)]
pub struct ImageCache<I> {
    entries: HashMap<String, Entry<I>>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<I: Clone> ImageCache<I> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Image and readiness signal for `url`, starting a load on first request.
    pub fn load_image<L>(&mut self, url: &str, loader: &mut L) -> (I, ReadySignal)
    where
        L: ImageLoader<I> + ?Sized,
    {
        if let Some(entry) = self.entries.get(url) {
            return (entry.image.clone(), entry.ready.clone());
        }
        let (tx, ready) = ReadySignal::pair();
        let image = loader.load(url, tx);
        self.entries.insert(
            url.to_owned(),
            Entry {
                image: image.clone(),
                ready: ready.clone(),
            },
        );
        (image, ready)
    }

    /// Cached image for `url`, loaded or not.
    pub fn get(&self, url: &str) -> Option<&I> {
        self.entries.get(url).map(|e| &e.image)
    }

    /// Returns `true` if `url` has finished loading.
    pub fn is_ready(&self, url: &str) -> bool {
        self.entries.get(url).is_some_and(|e| e.ready.is_ready())
    }

    /// Number of distinct URLs requested.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was requested yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
