//! Inspected-element overlay
//!
//! Four nested boxes painted as rings: each layer covers its own quad minus the
//! next layer in, so translucent colours never stack.

use protocol::{transform_quad, BoxModel, Quad};
use smallvec::SmallVec;

use crate::canvas::Rgba;

pub const CONTENT_COLOR: Rgba = Rgba::rgba(111, 168, 220, 0.66);
pub const PADDING_COLOR: Rgba = Rgba::rgba(147, 196, 125, 0.55);
pub const BORDER_COLOR: Rgba = Rgba::rgba(255, 229, 153, 0.66);
pub const MARGIN_COLOR: Rgba = Rgba::rgba(246, 178, 107, 0.66);

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightLayer {
    pub outer: Quad,
    pub inner: Option<Quad>,
    pub color: Rgba,
}

/// Layers in paint order, margin first. Quads are in canvas pixels.
pub fn highlight_layers(
    model: &BoxModel,
    zoom: f64,
    offset_top: f64,
) -> SmallVec<[HighlightLayer; 4]> {
    let dy = offset_top * zoom;
    let margin = transform_quad(&model.margin, zoom, dy);
    let border = transform_quad(&model.border, zoom, dy);
    let padding = transform_quad(&model.padding, zoom, dy);
    let content = transform_quad(&model.content, zoom, dy);

    smallvec::smallvec![
        HighlightLayer {
            outer: margin,
            inner: Some(border),
            color: MARGIN_COLOR,
        },
        HighlightLayer {
            outer: border,
            inner: Some(padding),
            color: BORDER_COLOR,
        },
        HighlightLayer {
            outer: padding,
            inner: Some(content),
            color: PADDING_COLOR,
        },
        HighlightLayer {
            outer: content,
            inner: None,
            color: CONTENT_COLOR,
        },
    ]
}
