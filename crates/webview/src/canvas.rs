//! Display-list compositing
//!
//! Painting is expressed as a list of `DrawOp`s in CSS pixels and handed to a
//! `Surface`. The real canvas replays them; tests read them.
//!
//! Paint order, back to front:
//!
//! 1. checkerboard over the whole canvas
//! 2. the frame image at `offset_top * screen_zoom`
//! 3. highlight layers, outermost first

use protocol::{BoxModel, Quad};
use std::sync::Arc;

use crate::decode::DecodedFrame;
use crate::highlight::highlight_layers;
use crate::screencast::ScreenGeometry;

/// Checkerboard tile edge in CSS pixels
pub const CHECKER_SIZE: f64 = 32.0;
pub const CHECKER_DARK: Rgba = Rgba::rgb(195, 195, 195);
pub const CHECKER_LIGHT: Rgba = Rgba::rgb(225, 225, 225);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Canvas size in CSS pixels plus the display's device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        Self { width, height, dpr }
    }

    /// Backing store in device pixels
    pub fn backing_store(&self) -> (u32, u32) {
        (
            (self.width * self.dpr).round().max(0.0) as u32,
            (self.height * self.dpr).round().max(0.0) as u32,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgba),
    /// Two-tone tiles: `light` on the diagonal, `dark` elsewhere
    Checkerboard { size: f64, dark: Rgba, light: Rgba },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Resize the backing store, which also clears it
    SetBackingStore { width: u32, height: u32 },
    Scale(f64),
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Fill,
    },
    DrawImage {
        image: Arc<DecodedFrame>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Fill `outer` with `inner` cut out
    FillQuadExcluding {
        outer: Quad,
        inner: Option<Quad>,
        color: Rgba,
    },
}

/// Where a display list ends up
pub trait Surface: Send + Sync {
    fn present(&self, ops: Vec<DrawOp>);
}

/// Build the display list for one paint
pub fn compose(
    canvas: CanvasSize,
    geometry: &ScreenGeometry,
    frame: Option<&Arc<DecodedFrame>>,
    highlight: Option<&BoxModel>,
) -> Vec<DrawOp> {
    let (width, height) = canvas.backing_store();
    let mut ops = vec![
        DrawOp::SetBackingStore { width, height },
        DrawOp::Scale(canvas.dpr),
        DrawOp::FillRect {
            x: 0.0,
            y: 0.0,
            width: canvas.width,
            height: canvas.height,
            fill: Fill::Checkerboard {
                size: CHECKER_SIZE,
                dark: CHECKER_DARK,
                light: CHECKER_LIGHT,
            },
        },
    ];

    if let Some(frame) = frame {
        ops.push(DrawOp::DrawImage {
            image: frame.clone(),
            x: 0.0,
            y: geometry.image_top(),
            width: f64::from(frame.width) * geometry.image_zoom,
            height: f64::from(frame.height) * geometry.image_zoom,
        });
    }

    if let Some(model) = highlight {
        for layer in highlight_layers(model, geometry.screen_zoom, geometry.offset_top) {
            ops.push(DrawOp::FillQuadExcluding {
                outer: layer.outer,
                inner: layer.inner,
                color: layer.color,
            });
        }
    }

    ops
}
