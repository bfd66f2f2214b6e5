//! Container sizing from host geometry

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Space kept free below the viewer, in pixels
pub const VERTICAL_PADDING: u32 = 5;

/// Geometry the host reports for the element embedding a viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HostGeometry {
    /// Height of the host's visible viewport
    pub viewport_height: u32,
    /// Rendered width of the viewer element
    pub element_width: u32,
    /// Offset of the viewer element from the top of the page
    pub element_top: u32,
}

/// Pixel area available to a viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The viewer spans the element's width and the rest of the viewport below its top edge.
    pub fn from_geometry(geometry: &HostGeometry) -> Self {
        Self {
            width: geometry.element_width,
            height: geometry
                .viewport_height
                .saturating_sub(geometry.element_top)
                .saturating_sub(VERTICAL_PADDING),
        }
    }
}
