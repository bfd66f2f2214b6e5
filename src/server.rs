//! MCP Server hosting PDF viewer instances

use crate::pdf::PdfiumBackend;
use crate::source::SourcePolicy;
use crate::viewer::{
    Command, CommandBus, HostGeometry, NavigationCommand, Target, ViewerEvent, ViewerInstance,
    ViewerOptions, ViewerSnapshot, ZoomLevel, DEFAULT_MAX_SCALE, DEFAULT_QUIET_INTERVAL,
};
use anyhow::Result;
use base64::Engine;
use parking_lot::Mutex;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

type Viewer = ViewerInstance<PdfiumBackend>;

/// Host and resource configuration for the viewer server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories local documents may be loaded from (empty allows all)
    pub resource_dirs: Vec<String>,
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
    /// Quiet interval before a resize burst triggers a re-render (default: 100ms)
    pub resize_quiet_interval: Duration,
    /// Zoom for viewers attached without one (default: "100")
    pub default_zoom: String,
    /// Maximum render scale for any zoom level (default: 10.0)
    pub max_image_scale: f32,
    /// Per-viewer event channel capacity (default: 64)
    pub event_capacity: usize,
    /// Events retained per viewer between polls (default: 256)
    pub event_log_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            resize_quiet_interval: DEFAULT_QUIET_INTERVAL,
            default_zoom: "100".to_string(),
            max_image_scale: DEFAULT_MAX_SCALE,
            event_capacity: 64,
            event_log_limit: 256,
        }
    }
}

impl ServerConfig {
    fn source_policy(&self) -> SourcePolicy {
        SourcePolicy {
            resource_dirs: self.resource_dirs.clone(),
            allow_private_urls: self.allow_private_urls,
            max_download_bytes: self.max_download_bytes,
        }
    }
}

/// Events a viewer emitted since the last poll, oldest first
struct EventLog {
    events: Arc<Mutex<VecDeque<ViewerEvent>>>,
    collector: JoinHandle<()>,
}

impl EventLog {
    fn start(viewer: &Viewer, limit: usize) -> Self {
        let mut receiver = viewer.subscribe();
        let events = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&events);
        let limit = limit.max(1);

        let collector = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let mut events = sink.lock();
                        if events.len() == limit {
                            events.pop_front();
                        }
                        events.push_back(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event log fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { events, collector }
    }

    fn drain(&self) -> Vec<ViewerEvent> {
        self.events.lock().drain(..).collect()
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        self.collector.abort();
    }
}

/// PDF viewer MCP server
#[derive(Clone)]
pub struct ViewerServer {
    backend: Arc<PdfiumBackend>,
    bus: Arc<CommandBus<PdfiumBackend>>,
    logs: Arc<Mutex<HashMap<Target, EventLog>>>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AttachViewerParams {
    /// Viewer identifier. Omit for the single anonymous viewer.
    #[serde(default)]
    pub id: Option<String>,
    /// Document source: file path, file:// or http(s):// URL, or data:application/pdf;base64 URI
    #[serde(default)]
    pub src: Option<String>,
    /// Zoom: a percentage ("150") or one of actual-size, fit-width, fit-height, fit-page
    #[serde(default)]
    pub zoom_level: Option<String>,
    /// Initial host geometry
    #[serde(default)]
    pub geometry: Option<HostGeometry>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ViewerParams {
    /// Viewer identifier. Omit to address the anonymous viewer.
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetSourceParams {
    #[serde(default)]
    pub id: Option<String>,
    /// New document source. Empty values are ignored.
    pub src: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GotoPageParams {
    #[serde(default)]
    pub id: Option<String>,
    /// 1-based page number
    pub page: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChangeZoomParams {
    #[serde(default)]
    pub id: Option<String>,
    /// A percentage ("150") or one of actual-size, fit-width, fit-height, fit-page
    pub zoom_level: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResizeParams {
    #[serde(default)]
    pub id: Option<String>,
    /// Height of the host's visible viewport in pixels
    pub viewport_height: u32,
    /// Rendered width of the viewer element in pixels
    pub element_width: u32,
    /// Offset of the viewer element from the top of the page in pixels
    #[serde(default)]
    pub element_top: u32,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ViewerResult {
    /// Viewer the request addressed
    pub viewer: String,
    /// Whether the command moved the page cursor or changed the zoom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ViewerSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ViewerResult {
    fn ok(target: &Target, viewer: &Viewer) -> Self {
        Self {
            viewer: target.to_string(),
            changed: None,
            state: Some(viewer.snapshot()),
            error: None,
        }
    }

    fn failed(target: &Target, error: &crate::error::Error) -> Self {
        Self {
            viewer: target.to_string(),
            changed: None,
            state: None,
            error: Some(error.client_message()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResult {
    pub viewer: String,
    pub events: Vec<ViewerEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResult {
    pub viewer: String,
    /// Page shown on the surface
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    /// Base64 encoded PNG
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn respond<T: Serialize>(result: T) -> String {
    let response = serde_json::json!({ "results": [result] });
    serde_json::to_string_pretty(&response).unwrap_or_default()
}

fn target_of(id: &Option<String>) -> Target {
    Target::from_id(id.as_deref())
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl ViewerServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new ViewerServer with specified resource directories
    pub fn with_resource_dirs(dirs: Vec<String>) -> Self {
        Self::with_config(ServerConfig {
            resource_dirs: dirs,
            ..ServerConfig::default()
        })
    }

    /// Create a new ViewerServer with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            backend: Arc::new(PdfiumBackend::new(config.source_policy())),
            bus: Arc::new(CommandBus::new()),
            logs: Arc::new(Mutex::new(HashMap::new())),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Attach a new viewer
    #[tool(
        description = "Attach a PDF viewer instance. Optionally loads a document right away.

Viewers are addressed by `id` in every other tool. Omitting `id` attaches the single anonymous viewer."
    )]
    async fn attach_viewer(&self, Parameters(params): Parameters<AttachViewerParams>) -> String {
        let target = target_of(&params.id);
        let result = self.process_attach(params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "attach_viewer failed");
            ViewerResult::failed(&target, &e)
        });
        respond(result)
    }

    /// Detach a viewer
    #[tool(description = "Detach a PDF viewer instance and release its resources.")]
    async fn detach_viewer(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        let result = self.process_detach(&target).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "detach_viewer failed");
            ViewerResult::failed(&target, &e)
        });
        respond(result)
    }

    /// Load a new document into a viewer
    #[tool(
        description = "Set a viewer's document source. Loading resets the viewer to page 1. Empty sources are ignored."
    )]
    async fn set_source(&self, Parameters(params): Parameters<SetSourceParams>) -> String {
        let target = target_of(&params.id);
        let result = self
            .process_set_source(&target, &params.src)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "set_source failed");
                ViewerResult::failed(&target, &e)
            });
        respond(result)
    }

    /// Advance one page
    #[tool(description = "Show the next page. Does nothing on the last page.")]
    async fn next_page(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        self.navigate(target, Command::NextPage, "next_page").await
    }

    /// Go back one page
    #[tool(description = "Show the previous page. Does nothing on the first page.")]
    async fn prev_page(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        self.navigate(target, Command::PrevPage, "prev_page").await
    }

    /// Jump to a page
    #[tool(description = "Show a specific 1-based page. Out-of-range pages are ignored.")]
    async fn goto_page(&self, Parameters(params): Parameters<GotoPageParams>) -> String {
        let target = target_of(&params.id);
        self.navigate(target, Command::GotoPage(params.page), "goto_page")
            .await
    }

    /// Change the zoom level
    #[tool(
        description = "Change a viewer's zoom: a percentage such as \"150\", or one of actual-size, fit-width, fit-height, fit-page."
    )]
    async fn change_zoom(&self, Parameters(params): Parameters<ChangeZoomParams>) -> String {
        let target = target_of(&params.id);
        let zoom = ZoomLevel::parse(&params.zoom_level);
        self.navigate(target, Command::ChangeZoom(zoom), "change_zoom")
            .await
    }

    /// Report new host geometry
    #[tool(
        description = "Report new host geometry for a viewer. Re-layout and re-render happen once resizes stop arriving for the quiet interval."
    )]
    async fn resize(&self, Parameters(params): Parameters<ResizeParams>) -> String {
        let target = target_of(&params.id);
        let geometry = HostGeometry {
            viewport_height: params.viewport_height,
            element_width: params.element_width,
            element_top: params.element_top,
        };
        let result = self
            .viewer(&target)
            .map(|viewer| {
                viewer.on_resize(geometry);
                ViewerResult::ok(&target, &viewer)
            })
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "resize failed");
                ViewerResult::failed(&target, &e)
            });
        respond(result)
    }

    /// Read viewer state
    #[tool(
        description = "Get a viewer's current page, page count, zoom level, container size and the page shown on its surface."
    )]
    async fn viewer_state(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        let result = self
            .viewer(&target)
            .map(|viewer| ViewerResult::ok(&target, &viewer))
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "viewer_state failed");
                ViewerResult::failed(&target, &e)
            });
        respond(result)
    }

    /// Drain emitted events
    #[tool(
        description = "Return and clear the page_loaded and load_progress events a viewer emitted since the last poll."
    )]
    async fn poll_events(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        let result = self.process_poll_events(&target).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "poll_events failed");
            EventsResult {
                viewer: target.to_string(),
                events: vec![],
                error: Some(e.client_message()),
            }
        });
        respond(result)
    }

    /// Fetch the rendered surface
    #[tool(description = "Get a viewer's rendered surface as a base64 encoded PNG.")]
    async fn snapshot(&self, Parameters(params): Parameters<ViewerParams>) -> String {
        let target = target_of(&params.id);
        let result = self.process_snapshot(&target).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "snapshot failed");
            SnapshotResult {
                viewer: target.to_string(),
                page: None,
                width: 0,
                height: 0,
                mime_type: "image/png".to_string(),
                data_base64: None,
                error: Some(e.client_message()),
            }
        });
        respond(result)
    }
}

impl ViewerServer {
    fn viewer(&self, target: &Target) -> crate::error::Result<Viewer> {
        self.bus
            .get(target)
            .ok_or_else(|| crate::error::Error::ViewerNotFound {
                id: target.to_string(),
            })
    }

    async fn navigate(&self, target: Target, command: Command, operation: &str) -> String {
        let result = self
            .process_command(NavigationCommand::new(target.clone(), command))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation, "navigation failed");
                ViewerResult::failed(&target, &e)
            });
        respond(result)
    }

    pub async fn process_attach(
        &self,
        params: AttachViewerParams,
    ) -> crate::error::Result<ViewerResult> {
        let target = target_of(&params.id);
        let zoom = ZoomLevel::parse(
            params
                .zoom_level
                .as_deref()
                .unwrap_or(&self.config.default_zoom),
        );
        let options = ViewerOptions {
            zoom,
            geometry: params.geometry.unwrap_or_default(),
            resize_quiet_interval: self.config.resize_quiet_interval,
            max_scale: self.config.max_image_scale,
            event_capacity: self.config.event_capacity,
        };

        let viewer = ViewerInstance::new(params.id.clone(), Arc::clone(&self.backend), options);
        self.bus.attach(viewer.clone())?;
        self.logs.lock().insert(
            target.clone(),
            EventLog::start(&viewer, self.config.event_log_limit),
        );

        let mut result = ViewerResult::ok(&target, &viewer);
        if let Some(src) = params.src {
            if let Err(e) = viewer.set_source(&src).await {
                tracing::warn!(error = %e, viewer = %target, "initial load failed");
                result.error = Some(e.client_message());
            }
            result.state = Some(viewer.snapshot());
        }
        Ok(result)
    }

    pub fn process_detach(&self, target: &Target) -> crate::error::Result<ViewerResult> {
        let viewer = self
            .bus
            .detach(target)
            .ok_or_else(|| crate::error::Error::ViewerNotFound {
                id: target.to_string(),
            })?;
        self.logs.lock().remove(target);
        Ok(ViewerResult::ok(target, &viewer))
    }

    pub async fn process_set_source(
        &self,
        target: &Target,
        src: &str,
    ) -> crate::error::Result<ViewerResult> {
        let viewer = self.viewer(target)?;
        viewer.set_source(src).await?;
        Ok(ViewerResult::ok(target, &viewer))
    }

    pub async fn process_command(
        &self,
        message: NavigationCommand,
    ) -> crate::error::Result<ViewerResult> {
        let target = message.target.clone();
        let changed = self.bus.dispatch(message).await?;
        let viewer = self.viewer(&target)?;
        Ok(ViewerResult {
            changed: Some(changed),
            ..ViewerResult::ok(&target, &viewer)
        })
    }

    pub fn process_poll_events(&self, target: &Target) -> crate::error::Result<EventsResult> {
        let logs = self.logs.lock();
        let log = logs
            .get(target)
            .ok_or_else(|| crate::error::Error::ViewerNotFound {
                id: target.to_string(),
            })?;
        Ok(EventsResult {
            viewer: target.to_string(),
            events: log.drain(),
            error: None,
        })
    }

    pub fn process_snapshot(&self, target: &Target) -> crate::error::Result<SnapshotResult> {
        let viewer = self.viewer(target)?;
        let png = viewer.surface_png()?;
        let state = viewer.snapshot();

        Ok(SnapshotResult {
            viewer: target.to_string(),
            page: state.rendered_page,
            width: state.surface_width,
            height: state.surface_height,
            mime_type: "image/png".to_string(),
            data_base64: Some(base64::engine::general_purpose::STANDARD.encode(&png)),
            error: None,
        })
    }
}

impl Default for ViewerServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for ViewerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF Viewer MCP hosts PDF viewer instances. Attach a viewer, load a document, \
                 navigate and zoom by viewer id, report resizes, and poll for page_loaded and \
                 load_progress events."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with default configuration
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with specified resource directories
pub async fn run_server_with_dirs(resource_dirs: Vec<String>) -> Result<()> {
    run_server_with_config(ServerConfig {
        resource_dirs,
        ..ServerConfig::default()
    })
    .await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = ViewerServer::with_config(config);

    tracing::info!("PDF Viewer MCP ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
