//! Raster surface owned by a single viewer

use crate::error::{Error, Result};
use crate::pdf::Viewport;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Largest surface a viewer will allocate, in pixels (256 MiB of RGBA)
pub const MAX_SURFACE_PIXELS: u64 = 64 * 1024 * 1024;

/// Drawing target for one viewer. Resizing a surface clears it.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    page: Option<u32>,
}

impl Surface {
    /// Empty 0x0 surface
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
            page: None,
        }
    }

    /// Blank white surface sized to a viewport (fractional pixels are truncated)
    pub fn for_viewport(viewport: &Viewport) -> Result<Self> {
        let area = f64::from(viewport.width) * f64::from(viewport.height);
        if !area.is_finite() || area > MAX_SURFACE_PIXELS as f64 {
            return Err(Error::SurfaceTooLarge {
                width: viewport.width,
                height: viewport.height,
                max_pixels: MAX_SURFACE_PIXELS,
            });
        }

        let width = viewport.width as u32;
        let height = viewport.height as u32;
        if width == 0 || height == 0 {
            return Err(Error::DegenerateViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }

        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            page: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Page currently shown, if any
    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = Some(page);
    }

    pub fn is_blank(&self) -> bool {
        self.page.is_none()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Draw a bitmap at the origin, clipped to the surface bounds
    pub fn draw(&mut self, bitmap: &RgbaImage) {
        image::imageops::replace(&mut self.pixels, bitmap, 0, 0);
    }

    /// Encode the surface as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        if self.width() == 0 || self.height() == 0 {
            return Err(Error::NoDocument);
        }

        let mut png_bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
        Ok(png_bytes)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}
