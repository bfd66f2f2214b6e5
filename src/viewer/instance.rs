//! A single embedded viewer
//!
//! All mutable state (page cursor, zoom, document, container size, surface)
//! lives in the instance. Nothing is shared between viewers.
//!
//! Loads and renders are not cancelled when superseded. Instead every render
//! and every load takes a generation number when it starts. A render is only
//! committed if no newer render has started in the meantime. A load is only
//! committed if no newer load has already been committed, so a newer load
//! that fails does not discard an older one that succeeds.

use crate::error::{Error, Result};
use crate::pdf::{DocumentHandle, LoadProgressFn, PageHandle, RenderBackend, Surface};
use crate::source::SourceLocator;
use crate::viewer::debounce::{ResizeDebouncer, DEFAULT_QUIET_INTERVAL};
use crate::viewer::{
    compute_scale, Command, ContainerSize, HostGeometry, LoadProgressEvent, ViewerEvent,
    ZoomLevel, DEFAULT_MAX_SCALE,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;

/// Construction options for a viewer
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub zoom: ZoomLevel,
    pub geometry: HostGeometry,
    pub resize_quiet_interval: Duration,
    /// Renders whose computed scale exceeds this fail with `ScaleOutOfRange`
    pub max_scale: f32,
    /// Capacity of the event channel; slow subscribers lose the oldest events
    pub event_capacity: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            zoom: ZoomLevel::default(),
            geometry: HostGeometry::default(),
            resize_quiet_interval: DEFAULT_QUIET_INTERVAL,
            max_scale: DEFAULT_MAX_SCALE,
            event_capacity: 64,
        }
    }
}

/// Point-in-time view of a viewer's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub id: Option<String>,
    pub current_page: u32,
    pub page_count: Option<u32>,
    pub zoom_level: ZoomLevel,
    pub container: ContainerSize,
    /// Page currently drawn on the surface
    pub rendered_page: Option<u32>,
    pub surface_width: u32,
    pub surface_height: u32,
}

struct ViewerState<D> {
    current_page: u32,
    zoom: ZoomLevel,
    document: Option<Arc<D>>,
    /// Generation of the load that produced `document`
    committed_load: u64,
    geometry: HostGeometry,
    container: ContainerSize,
}

struct Inner<B: RenderBackend> {
    id: Option<String>,
    backend: Arc<B>,
    max_scale: f32,
    state: Mutex<ViewerState<B::Document>>,
    surface: Mutex<Surface>,
    events: broadcast::Sender<ViewerEvent>,
    render_generation: AtomicU64,
    load_generation: AtomicU64,
    resize: ResizeDebouncer,
}

/// Viewer component bound to a rendering backend. Clones share the same viewer.
pub struct ViewerInstance<B: RenderBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: RenderBackend> Clone for ViewerInstance<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: RenderBackend> ViewerInstance<B> {
    /// Create a viewer with no document. `id` is `None` for the anonymous viewer.
    pub fn new(id: Option<String>, backend: Arc<B>, options: ViewerOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let container = ContainerSize::from_geometry(&options.geometry);

        Self {
            inner: Arc::new(Inner {
                id,
                backend,
                max_scale: options.max_scale,
                state: Mutex::new(ViewerState {
                    current_page: 1,
                    zoom: options.zoom,
                    document: None,
                    committed_load: 0,
                    geometry: options.geometry,
                    container,
                }),
                surface: Mutex::new(Surface::new()),
                events,
                render_generation: AtomicU64::new(0),
                load_generation: AtomicU64::new(0),
                resize: ResizeDebouncer::new(options.resize_quiet_interval),
            }),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    fn label(&self) -> &str {
        self.id().unwrap_or("<unaddressed>")
    }

    /// Receive page-loaded and load-progress notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: ViewerEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn current_page(&self) -> u32 {
        self.inner.state.lock().current_page
    }

    pub fn page_count(&self) -> Option<u32> {
        self.inner
            .state
            .lock()
            .document
            .as_ref()
            .map(|document| document.page_count())
    }

    pub fn zoom_level(&self) -> ZoomLevel {
        self.inner.state.lock().zoom.clone()
    }

    pub fn container(&self) -> ContainerSize {
        self.inner.state.lock().container
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        let (current_page, page_count, zoom_level, container) = {
            let state = self.inner.state.lock();
            (
                state.current_page,
                state.document.as_ref().map(|document| document.page_count()),
                state.zoom.clone(),
                state.container,
            )
        };
        let surface = self.inner.surface.lock();

        ViewerSnapshot {
            id: self.inner.id.clone(),
            current_page,
            page_count,
            zoom_level,
            container,
            rendered_page: surface.page(),
            surface_width: surface.width(),
            surface_height: surface.height(),
        }
    }

    /// PNG of whatever the surface currently shows
    pub fn surface_png(&self) -> Result<Vec<u8>> {
        self.inner.surface.lock().to_png()
    }

    /// Apply a new source attribute value. Empty values are ignored.
    pub async fn set_source(&self, src: &str) -> Result<()> {
        if src.trim().is_empty() {
            tracing::debug!(viewer = %self.label(), "empty source ignored");
            return Ok(());
        }

        let locator = match SourceLocator::parse(src) {
            Ok(locator) => locator,
            Err(e) => {
                tracing::warn!(viewer = %self.label(), error = %e, "PDF load error");
                self.emit(ViewerEvent::LoadProgress(LoadProgressEvent::Error));
                return Err(e);
            }
        };

        self.load_document(&locator).await
    }

    /// Load a document and show its first page.
    ///
    /// On failure an error progress event is emitted and the previous
    /// document, page and surface are kept.
    pub async fn load_document(&self, locator: &SourceLocator) -> Result<()> {
        let generation = self.inner.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(viewer = %self.label(), source = %locator, "loading document");

        let events = self.inner.events.clone();
        let progress: LoadProgressFn = Box::new(move |loaded, total| {
            let _ = events.send(ViewerEvent::LoadProgress(LoadProgressEvent::Loading {
                loaded,
                total,
            }));
        });

        let document = match self.inner.backend.get_document(locator, progress).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(viewer = %self.label(), source = %locator, error = %e, "PDF load error");
                self.emit(ViewerEvent::LoadProgress(LoadProgressEvent::Error));
                return Err(e);
            }
        };

        let page_count = document.page_count();
        {
            let mut state = self.inner.state.lock();
            if state.committed_load > generation {
                drop(state);
                tracing::debug!(viewer = %self.label(), source = %locator, "superseded load dropped");
                return Ok(());
            }
            state.document = Some(Arc::new(document));
            state.committed_load = generation;
            state.current_page = 1;
        }
        tracing::info!(viewer = %self.label(), pages = page_count, "document loaded");

        let _ = self.render_current_page().await;
        self.emit(ViewerEvent::LoadProgress(LoadProgressEvent::Finished));
        Ok(())
    }

    /// Rasterize the current page into the surface at the current zoom.
    ///
    /// Failures are logged and returned; no page-loaded event is emitted and
    /// the surface keeps its previous content.
    pub async fn render_current_page(&self) -> Result<()> {
        let generation = self.inner.render_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (document, page_number, zoom, container) = {
            let state = self.inner.state.lock();
            let document = state.document.clone().ok_or(Error::NoDocument)?;
            (document, state.current_page, state.zoom.clone(), state.container)
        };

        let result = self
            .render_page(generation, &document, page_number, &zoom, container)
            .await;
        if let Err(e) = &result {
            tracing::warn!(
                viewer = %self.label(),
                page = page_number,
                zoom = %zoom,
                error = %e,
                "page render failed"
            );
        }
        result
    }

    async fn render_page(
        &self,
        generation: u64,
        document: &B::Document,
        page_number: u32,
        zoom: &ZoomLevel,
        container: ContainerSize,
    ) -> Result<()> {
        let page = document.get_page(page_number).await?;
        let scale = compute_scale(zoom, page.viewport(1.0), container)?;
        if !scale.is_finite() || scale > self.inner.max_scale {
            return Err(Error::ScaleOutOfRange {
                scale,
                max: self.inner.max_scale,
            });
        }
        let viewport = page.viewport(scale);

        let mut surface = Surface::for_viewport(&viewport)?;
        page.render(&mut surface, viewport).await?;

        if self.inner.render_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(viewer = %self.label(), page = page_number, "stale render discarded");
            return Ok(());
        }

        surface.set_page(page_number);
        *self.inner.surface.lock() = surface;

        let total = document.page_count();
        tracing::debug!(viewer = %self.label(), page = page_number, total, scale, "page rendered");
        self.emit(ViewerEvent::PageLoaded {
            page: page_number,
            total,
        });
        Ok(())
    }

    /// Move the page cursor if `step` yields a page. Returns whether it moved.
    fn move_cursor(&self, step: impl FnOnce(u32, u32) -> Option<u32>) -> bool {
        let mut state = self.inner.state.lock();
        let Some(total) = state.document.as_ref().map(|document| document.page_count()) else {
            return false;
        };

        match step(state.current_page, total) {
            Some(page) => {
                state.current_page = page;
                true
            }
            None => false,
        }
    }

    async fn rerender_if(&self, changed: bool) -> bool {
        if changed {
            let _ = self.render_current_page().await;
        }
        changed
    }

    /// Advance one page; no-op on the last page.
    pub async fn next_page(&self) -> bool {
        let changed = self.move_cursor(|current, total| (current < total).then(|| current + 1));
        self.rerender_if(changed).await
    }

    /// Go back one page; no-op on the first page.
    pub async fn prev_page(&self) -> bool {
        let changed = self.move_cursor(|current, _| (current > 1).then(|| current - 1));
        self.rerender_if(changed).await
    }

    /// Jump to `page` if it is within `1..=page_count`; otherwise no-op.
    pub async fn goto_page(&self, page: u32) -> bool {
        let changed = self.move_cursor(|_, total| (1..=total).contains(&page).then_some(page));
        self.rerender_if(changed).await
    }

    /// Replace the zoom level and re-render. The value is not validated here.
    pub async fn change_zoom(&self, zoom: ZoomLevel) {
        self.inner.state.lock().zoom = zoom;
        if self.page_count().is_some() {
            let _ = self.render_current_page().await;
        }
    }

    /// Apply a navigation command. Returns whether the page cursor moved
    /// (zoom changes always count as a change).
    pub async fn apply(&self, command: Command) -> bool {
        tracing::debug!(viewer = %self.label(), ?command, "applying command");
        match command {
            Command::NextPage => self.next_page().await,
            Command::PrevPage => self.prev_page().await,
            Command::GotoPage(page) => self.goto_page(page).await,
            Command::ChangeZoom(zoom) => {
                self.change_zoom(zoom).await;
                true
            }
        }
    }

    /// Recompute the container size from the last reported host geometry.
    pub fn relayout(&self) -> ContainerSize {
        let mut state = self.inner.state.lock();
        state.container = ContainerSize::from_geometry(&state.geometry);
        state.container
    }

    /// Record new host geometry and schedule a debounced re-layout and re-render.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_resize(&self, geometry: HostGeometry) {
        self.inner.state.lock().geometry = geometry;

        let weak: Weak<Inner<B>> = Arc::downgrade(&self.inner);
        self.inner.resize.schedule(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let viewer = ViewerInstance { inner };
            let container = viewer.relayout();
            tracing::debug!(
                viewer = %viewer.label(),
                width = container.width,
                height = container.height,
                "container resized"
            );
            if viewer.page_count().is_some() {
                let _ = viewer.render_current_page().await;
            }
        });
    }

    /// Drop any pending resize work. Called when the viewer is detached.
    pub fn release(&self) {
        self.inner.resize.cancel();
    }
}
