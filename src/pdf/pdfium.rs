//! PDFium-backed rendering library
//!
//! PDFium is not thread-safe, so no `Pdfium` instance outlives a single
//! operation. Documents keep their bytes and re-open them on a blocking
//! thread whenever a page is rasterized.

use crate::error::{Error, Result};
use crate::pdf::{DocumentHandle, LoadProgressFn, PageHandle, RenderBackend, Surface, Viewport};
use crate::source::{resolve, SourceLocator, SourcePolicy};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::sync::Arc;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Natural size in points of every page, in order
fn read_page_sizes(data: &[u8]) -> Result<Vec<(f32, f32)>> {
    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(map_pdfium_error)?;

    Ok(document
        .pages()
        .iter()
        .map(|page| (page.width().value, page.height().value))
        .collect())
}

fn rasterize(data: &[u8], page_index: u32, width: u32, height: u32) -> Result<RgbaImage> {
    let index = pdfium_page_index(page_index)?;
    let (target_width, target_height) = match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(Error::Render {
                reason: format!("Target size {}x{} out of range", width, height),
            })
        }
    };

    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(map_pdfium_error)?;

    let page = document
        .pages()
        .get(index)
        .map_err(|e| Error::Render {
            reason: format!("Failed to get page {}: {}", page_index + 1, e),
        })?;

    let config = PdfRenderConfig::new()
        .set_target_size(target_width, target_height)
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page.render_with_config(&config).map_err(|e| Error::Render {
        reason: format!("Failed to render page {}: {}", page_index + 1, e),
    })?;

    Ok(bitmap.as_image().into_rgba8())
}

/// PDFium addresses pages with a 16-bit index
fn pdfium_page_index(page_index: u32) -> Result<u16> {
    u16::try_from(page_index).map_err(|_| Error::Render {
        reason: format!(
            "Page {} is beyond what PDFium can address",
            u64::from(page_index) + 1
        ),
    })
}

/// Rendering backend using PDFium
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    policy: SourcePolicy,
}

impl PdfiumBackend {
    pub fn new(policy: SourcePolicy) -> Self {
        Self { policy }
    }
}

impl RenderBackend for PdfiumBackend {
    type Document = PdfiumDocument;

    async fn get_document(
        &self,
        locator: &SourceLocator,
        progress: LoadProgressFn,
    ) -> Result<PdfiumDocument> {
        let resolved = resolve(locator, &self.policy, progress).await?;
        let data: Arc<[u8]> = resolved.data.into();

        let bytes = Arc::clone(&data);
        let page_sizes = tokio::task::spawn_blocking(move || read_page_sizes(&bytes))
            .await
            .map_err(|e| Error::Load {
                reason: format!("PDFium task failed: {}", e),
            })??;

        tracing::debug!(
            source = %resolved.source_name,
            pages = page_sizes.len(),
            "document opened"
        );

        Ok(PdfiumDocument { data, page_sizes })
    }
}

/// Loaded document bytes plus the natural size of each page
pub struct PdfiumDocument {
    data: Arc<[u8]>,
    page_sizes: Vec<(f32, f32)>,
}

impl DocumentHandle for PdfiumDocument {
    type Page = PdfiumPage;

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    async fn get_page(&self, page: u32) -> Result<PdfiumPage> {
        let total = self.page_count();
        if page < 1 || page > total {
            return Err(Error::PageOutOfBounds { page, total });
        }

        let (width, height) = self.page_sizes[(page - 1) as usize];
        Ok(PdfiumPage {
            data: Arc::clone(&self.data),
            index: page - 1,
            width,
            height,
        })
    }
}

/// One page of a [`PdfiumDocument`]
pub struct PdfiumPage {
    data: Arc<[u8]>,
    index: u32,
    width: f32,
    height: f32,
}

impl PageHandle for PdfiumPage {
    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::from_natural(self.width, self.height, scale)
    }

    async fn render(&self, surface: &mut Surface, viewport: Viewport) -> Result<()> {
        let data = Arc::clone(&self.data);
        let index = self.index;
        let (width, height) = (viewport.width as u32, viewport.height as u32);

        let bitmap = tokio::task::spawn_blocking(move || rasterize(&data, index, width, height))
            .await
            .map_err(|e| Error::Render {
                reason: format!("PDFium task failed: {}", e),
            })??;

        surface.draw(&bitmap);
        Ok(())
    }
}
