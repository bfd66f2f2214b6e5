//! Error types for the PDF viewer

use thiserror::Error;

/// Result type alias for the PDF viewer
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF viewer
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Empty or malformed source locator
    #[error("Invalid source locator: {locator}")]
    InvalidLocator { locator: String },

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// Operation needs a loaded document
    #[error("No document loaded")]
    NoDocument,

    /// Unrecognized symbolic zoom value
    #[error("{value} is not a valid zoom level")]
    InvalidZoomMode { value: String },

    /// Computed viewport has no drawable area
    #[error("Degenerate viewport: {width}x{height}")]
    DegenerateViewport { width: f32, height: f32 },

    /// Computed scale is not finite or exceeds the configured maximum
    #[error("Scale {scale} out of range (max: {max})")]
    ScaleOutOfRange { scale: f32, max: f32 },

    /// Surface would exceed the pixel budget
    #[error("Surface too large: {width}x{height} pixels (max: {max_pixels})")]
    SurfaceTooLarge {
        width: f32,
        height: f32,
        max_pixels: u64,
    },

    /// Document load failed inside the rendering library
    #[error("PDF load error: {reason}")]
    Load { reason: String },

    /// Page rasterization failed
    #[error("Page render failed: {reason}")]
    Render { reason: String },

    /// No viewer attached under the given identifier
    #[error("Viewer not found: {id}")]
    ViewerNotFound { id: String },

    /// A viewer is already attached under the given identifier
    #[error("Viewer already attached: {id}")]
    ViewerAlreadyAttached { id: String },

    /// Viewer was detached while the operation was in flight
    #[error("Viewer detached")]
    ViewerDetached,

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Image encoding error
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::InvalidLocator { .. } => "Invalid source locator".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve PDF source".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::NoDocument => "No document loaded".to_string(),
            Error::InvalidZoomMode { value } => format!("{} is not a valid zoom level", value),
            Error::DegenerateViewport { .. } => "Viewer has no drawable area".to_string(),
            Error::ScaleOutOfRange { max, .. } => {
                format!("Zoom exceeds maximum scale of {}", max)
            }
            Error::SurfaceTooLarge { .. } => "Rendered page would be too large".to_string(),
            Error::Load { .. } => "PDF load error".to_string(),
            Error::Render { .. } => "Page render failed".to_string(),
            Error::ViewerNotFound { id } => format!("Viewer not found: {}", id),
            Error::ViewerAlreadyAttached { id } => format!("Viewer already attached: {}", id),
            Error::ViewerDetached => "Viewer detached".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::Image(_) => "Image encoding failed".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
        }
    }
}
