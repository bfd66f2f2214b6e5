//! Zoom levels and scale computation

use crate::error::{Error, Result};
use crate::pdf::Viewport;
use crate::viewer::ContainerSize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Zoom used when the host does not set one
pub const DEFAULT_ZOOM_PERCENT: f32 = 100.0;

/// Largest scale a page is rendered at unless configured otherwise (1000%)
pub const DEFAULT_MAX_SCALE: f32 = 10.0;

/// Zoom computed relative to the container rather than a fixed percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomMode {
    ActualSize,
    FitWidth,
    FitHeight,
    FitPage,
}

impl ZoomMode {
    /// Look up a symbolic name. Both the `fit-*` names and the older
    /// `page-*` names are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "actual-size" | "page-actual" => Some(ZoomMode::ActualSize),
            "fit-width" | "page-width" => Some(ZoomMode::FitWidth),
            "fit-height" | "page-height" => Some(ZoomMode::FitHeight),
            "fit-page" | "page-fit" => Some(ZoomMode::FitPage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomMode::ActualSize => "actual-size",
            ZoomMode::FitWidth => "fit-width",
            ZoomMode::FitHeight => "fit-height",
            ZoomMode::FitPage => "fit-page",
        }
    }
}

/// A viewer's zoom setting.
///
/// Any string is accepted: values that are neither a positive number nor a
/// known mode are kept as [`ZoomLevel::Unrecognized`] and only rejected when
/// a scale is computed from them.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoomLevel {
    /// Percentage of the page's natural size
    Percent(f32),
    Mode(ZoomMode),
    Unrecognized(String),
}

impl ZoomLevel {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f32>() {
            Ok(percent) if percent.is_finite() && percent > 0.0 => ZoomLevel::Percent(percent),
            _ => match ZoomMode::from_name(trimmed) {
                Some(mode) => ZoomLevel::Mode(mode),
                None => ZoomLevel::Unrecognized(raw.to_string()),
            },
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        ZoomLevel::Percent(DEFAULT_ZOOM_PERCENT)
    }
}

impl From<&str> for ZoomLevel {
    fn from(raw: &str) -> Self {
        ZoomLevel::parse(raw)
    }
}

impl From<f32> for ZoomLevel {
    fn from(percent: f32) -> Self {
        ZoomLevel::Percent(percent)
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomLevel::Percent(percent) => write!(f, "{}", percent),
            ZoomLevel::Mode(mode) => f.write_str(mode.as_str()),
            ZoomLevel::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for ZoomLevel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoomLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(ZoomLevel::parse(&s)),
            serde_json::Value::Number(n) => Ok(n
                .as_f64()
                .map(|v| ZoomLevel::parse(&v.to_string()))
                .unwrap_or_else(|| ZoomLevel::Unrecognized(n.to_string()))),
            other => Err(serde::de::Error::custom(format!(
                "zoom level must be a number or a string, got {}",
                other
            ))),
        }
    }
}

/// Scale factor to rasterize a page at.
///
/// Percentages ignore the container. Symbolic modes compare the page's
/// natural viewport against the container size.
pub fn compute_scale(zoom: &ZoomLevel, natural: Viewport, container: ContainerSize) -> Result<f32> {
    let mode = match zoom {
        ZoomLevel::Percent(percent) => return Ok(percent / 100.0),
        ZoomLevel::Mode(mode) => *mode,
        ZoomLevel::Unrecognized(raw) => {
            return Err(Error::InvalidZoomMode { value: raw.clone() });
        }
    };

    if natural.width <= 0.0 || natural.height <= 0.0 {
        return Err(Error::DegenerateViewport {
            width: natural.width,
            height: natural.height,
        });
    }

    let width_scale = container.width as f32 / natural.width;
    let height_scale = container.height as f32 / natural.height;

    Ok(match mode {
        ZoomMode::ActualSize => 1.0,
        ZoomMode::FitWidth => width_scale,
        ZoomMode::FitHeight => height_scale,
        ZoomMode::FitPage => width_scale.min(height_scale),
    })
}
