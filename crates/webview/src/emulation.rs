//! Device emulation
//!
//! A device either pins the page to its own size and scale factor, or, for
//! "Responsive", follows the canvas.

use protocol::DeviceDescriptor;
use serde_json::{json, Value};

use crate::canvas::CanvasSize;

/// What the browser is told to pretend
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedViewport {
    pub width: f64,
    pub height: f64,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

impl EmulatedViewport {
    pub fn for_device(device: &DeviceDescriptor, canvas: CanvasSize) -> Self {
        if device.is_responsive() {
            Self {
                width: canvas.width,
                height: canvas.height,
                device_scale_factor: canvas.dpr,
                mobile: false,
            }
        } else {
            Self {
                width: device.width,
                height: device.height,
                device_scale_factor: device.device_scale_factor,
                mobile: device.mobile,
            }
        }
    }

    /// `Page.setDeviceMetricsOverride` params
    pub fn metrics_params(&self) -> Value {
        json!({
            "width": self.width.floor() as i64,
            "height": self.height.floor() as i64,
            "deviceScaleFactor": self.device_scale_factor,
            "mobile": self.mobile,
        })
    }
}
