//! Screencast, inspection and device types
//!
//! Field names follow CDP's camelCase so values can be deserialized straight out
//! of event params.

use serde::{Deserialize, Serialize};

/// Screencast image encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }
}

/// Metadata attached to every `Page.screencastFrame`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreencastFrameMetadata {
    #[serde(default)]
    pub offset_top: f64,
    #[serde(default = "one")]
    pub page_scale_factor: f64,
    pub device_width: f64,
    pub device_height: f64,
    #[serde(default)]
    pub scroll_offset_x: f64,
    #[serde(default)]
    pub scroll_offset_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

fn one() -> f64 {
    1.0
}

impl ScreencastFrameMetadata {
    /// deviceHeight / deviceWidth, 0 for a degenerate device
    pub fn aspect_ratio(&self) -> f64 {
        if self.device_width > 0.0 {
            self.device_height / self.device_width
        } else {
            0.0
        }
    }
}

/// One compressed frame. `session_id` must be echoed back in the ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreencastFrame {
    pub data: String,
    pub metadata: ScreencastFrameMetadata,
    pub session_id: i64,
}

/// Quadrilateral as CDP sends it: x1,y1 .. x4,y4 clockwise
pub type Quad = [f64; 8];

/// Result of `DOM.getBoxModel`, outermost last
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxModel {
    pub content: Quad,
    pub padding: Quad,
    pub border: Quad,
    pub margin: Quad,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Scale every coordinate by `zoom`, then shift vertically by `dy`
pub fn transform_quad(quad: &Quad, zoom: f64, dy: f64) -> Quad {
    let mut out = [0.0; 8];
    for (i, v) in quad.iter().enumerate() {
        out[i] = if i % 2 == 0 { v * zoom } else { v * zoom + dy };
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Source location a framework recorded for an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file_name: String,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: Option<u32>,
}

/// An emulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub device_scale_factor: f64,
    pub mobile: bool,
    #[serde(default)]
    pub user_agent: String,
}

impl DeviceDescriptor {
    fn new(name: &str, width: f64, height: f64, scale: f64, mobile: bool, ua: &str) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            device_scale_factor: scale,
            mobile,
            user_agent: ua.to_string(),
        }
    }

    /// "Responsive" follows the panel size instead of a fixed one
    pub fn is_responsive(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

pub const RESPONSIVE_DEVICE: &str = "Responsive";

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1";
const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 11_0 like Mac OS X) AppleWebKit/604.1.34 (KHTML, like Gecko) Version/11.0 Mobile/15A5341f Safari/604.1";
const PIXEL_UA: &str = "Mozilla/5.0 (Linux; Android 8.0; Pixel 2 Build/OPD3.170816.012) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3765.0 Mobile Safari/537.36";
const GALAXY_UA: &str = "Mozilla/5.0 (Linux; Android 5.0; SM-G900P Build/LRX21T) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3765.0 Mobile Safari/537.36";

/// Built-in device list, portrait only
pub fn builtin_devices() -> Vec<DeviceDescriptor> {
    vec![
        DeviceDescriptor::new(RESPONSIVE_DEVICE, 0.0, 0.0, 1.0, false, ""),
        DeviceDescriptor::new("Macbook 15", 1440.0, 900.0, 1.0, false, ""),
        DeviceDescriptor::new("Macbook 13", 1280.0, 800.0, 1.0, false, ""),
        DeviceDescriptor::new("iPhone X", 375.0, 812.0, 3.0, true, IPHONE_UA),
        DeviceDescriptor::new("iPad", 768.0, 1024.0, 2.0, true, IPAD_UA),
        DeviceDescriptor::new("Pixel 2", 411.0, 731.0, 2.625, true, PIXEL_UA),
        DeviceDescriptor::new("Galaxy S5", 360.0, 640.0, 3.0, true, GALAXY_UA),
    ]
}

pub fn find_device(name: &str) -> Option<DeviceDescriptor> {
    builtin_devices().into_iter().find(|d| d.name == name)
}
