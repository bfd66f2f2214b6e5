//! Rendering library layer
//!
//! The viewer talks to PDF rendering only through the traits in [`backend`].
//! [`PdfiumBackend`] is the production implementation.

mod backend;
mod pdfium;
mod surface;

pub use backend::{DocumentHandle, LoadProgressFn, PageHandle, RenderBackend, Viewport};
pub use pdfium::{PdfiumBackend, PdfiumDocument, PdfiumPage};
pub use surface::{Surface, MAX_SURFACE_PIXELS};
