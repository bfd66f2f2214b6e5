//! Narrow contract the viewer needs from a PDF rendering library
//!
//! The viewer never parses or rasterizes PDF content itself. It only asks a
//! backend to load a document, resolve pages, report viewport sizes and draw
//! into a surface.

use crate::error::Result;
use crate::pdf::Surface;
use crate::source::SourceLocator;
use serde::Serialize;
use std::future::Future;

/// Pixel dimensions a page is rasterized at, derived from the page's base size and a scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    /// Viewport of a page whose natural (scale 1.0) size is `width` x `height`
    pub fn from_natural(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width: width * scale,
            height: height * scale,
            scale,
        }
    }
}

/// Progress callback handed to the backend while a document loads: `(loaded, total)`
pub type LoadProgressFn = Box<dyn FnMut(u64, u64) + Send>;

/// Entry point of a rendering library
pub trait RenderBackend: Send + Sync + 'static {
    type Document: DocumentHandle;

    /// Load a document, calling `progress` as bytes arrive.
    fn get_document(
        &self,
        locator: &SourceLocator,
        progress: LoadProgressFn,
    ) -> impl Future<Output = Result<Self::Document>> + Send;
}

/// A loaded document. Handles are immutable once loaded.
pub trait DocumentHandle: Send + Sync + 'static {
    type Page: PageHandle;

    fn page_count(&self) -> u32;

    /// Resolve a 1-based page number.
    fn get_page(&self, page: u32) -> impl Future<Output = Result<Self::Page>> + Send;
}

/// A single page of a loaded document
pub trait PageHandle: Send + Sync + 'static {
    fn viewport(&self, scale: f32) -> Viewport;

    /// Rasterize the page into `surface`, which is already sized to `viewport`.
    fn render(
        &self,
        surface: &mut Surface,
        viewport: Viewport,
    ) -> impl Future<Output = Result<()>> + Send;
}
