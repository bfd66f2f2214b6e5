//! In-memory rendering backend for viewer tests

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use pdf_viewer_mcp::error::{Error, Result};
use pdf_viewer_mcp::pdf::{
    DocumentHandle, LoadProgressFn, PageHandle, RenderBackend, Surface, Viewport,
};
use pdf_viewer_mcp::source::SourceLocator;
use pdf_viewer_mcp::viewer::{ViewerEvent, ViewerInstance, ViewerOptions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// US Letter in points
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// One completed call to [`PageHandle::render`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCall {
    pub page: u32,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

#[derive(Default)]
struct Shared {
    documents: Mutex<HashMap<String, Vec<(f32, f32)>>>,
    load_delays: Mutex<HashMap<String, Duration>>,
    render_delays: Mutex<HashMap<u32, Duration>>,
    renders: Mutex<Vec<RenderCall>>,
    fail_renders: AtomicBool,
}

/// Backend serving documents registered by name. Unknown names fail to load.
#[derive(Clone, Default)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pages` pages of `size` under `name`
    pub fn with_document(self, name: &str, pages: u32, size: (f32, f32)) -> Self {
        self.add_document(name, vec![size; pages as usize]);
        self
    }

    pub fn add_document(&self, name: &str, page_sizes: Vec<(f32, f32)>) {
        self.shared
            .documents
            .lock()
            .insert(name.to_string(), page_sizes);
    }

    pub fn delay_load(&self, name: &str, delay: Duration) {
        self.shared
            .load_delays
            .lock()
            .insert(name.to_string(), delay);
    }

    pub fn delay_render(&self, page: u32, delay: Duration) {
        self.shared.render_delays.lock().insert(page, delay);
    }

    pub fn fail_renders(&self, fail: bool) {
        self.shared.fail_renders.store(fail, Ordering::SeqCst);
    }

    pub fn renders(&self) -> Vec<RenderCall> {
        self.shared.renders.lock().clone()
    }

    pub fn clear_renders(&self) {
        self.shared.renders.lock().clear();
    }
}

pub struct FakeDocument {
    shared: Arc<Shared>,
    page_sizes: Vec<(f32, f32)>,
}

pub struct FakePage {
    shared: Arc<Shared>,
    number: u32,
    width: f32,
    height: f32,
}

impl RenderBackend for FakeBackend {
    type Document = FakeDocument;

    async fn get_document(
        &self,
        locator: &SourceLocator,
        mut progress: LoadProgressFn,
    ) -> Result<FakeDocument> {
        let name = locator.to_string();
        let delay = self.shared.load_delays.lock().get(&name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let page_sizes = self
            .shared
            .documents
            .lock()
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::PdfNotFound { path: name.clone() })?;

        progress(512, 1024);
        progress(1024, 1024);

        Ok(FakeDocument {
            shared: Arc::clone(&self.shared),
            page_sizes,
        })
    }
}

impl DocumentHandle for FakeDocument {
    type Page = FakePage;

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    async fn get_page(&self, page: u32) -> Result<FakePage> {
        let (width, height) = page
            .checked_sub(1)
            .and_then(|index| self.page_sizes.get(index as usize))
            .copied()
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count(),
            })?;

        Ok(FakePage {
            shared: Arc::clone(&self.shared),
            number: page,
            width,
            height,
        })
    }
}

impl PageHandle for FakePage {
    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::from_natural(self.width, self.height, scale)
    }

    async fn render(&self, surface: &mut Surface, viewport: Viewport) -> Result<()> {
        let delay = self.shared.render_delays.lock().get(&self.number).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.shared.fail_renders.load(Ordering::SeqCst) {
            return Err(Error::Render {
                reason: format!("page {} could not be rasterized", self.number),
            });
        }

        surface.draw(&RgbaImage::from_pixel(
            surface.width(),
            surface.height(),
            Rgba([20, 20, 20, 255]),
        ));
        self.shared.renders.lock().push(RenderCall {
            page: self.number,
            scale: viewport.scale,
            width: surface.width(),
            height: surface.height(),
        });
        Ok(())
    }
}

pub fn viewer(id: Option<&str>, backend: &FakeBackend) -> ViewerInstance<FakeBackend> {
    viewer_with(id, backend, ViewerOptions::default())
}

pub fn viewer_with(
    id: Option<&str>,
    backend: &FakeBackend,
    options: ViewerOptions,
) -> ViewerInstance<FakeBackend> {
    ViewerInstance::new(
        id.map(str::to_string),
        Arc::new(backend.clone()),
        options,
    )
}

/// Everything currently buffered on `events`
pub fn drain(events: &mut broadcast::Receiver<ViewerEvent>) -> Vec<ViewerEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
