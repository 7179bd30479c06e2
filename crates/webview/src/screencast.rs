//! Screencast geometry and frame lifecycle
//!
//! ```text
//! Page.screencastFrame ──► ack (now) ──► decode (spawned) ──► paint
//! ```
//!
//! The ack goes out before anything else happens to the frame. The browser stops
//! sending frames while one is unacknowledged, so deferring it behind the decode
//! would throttle the cast to decode speed.

use protocol::{methods, ImageFormat, ScreencastFrame, ScreencastFrameMetadata};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::canvas::CanvasSize;
use crate::connection::{Call, Connection};
use crate::decode::{DecodedFrame, FrameDecoder};

/// Relative distance from `1/dpr` inside which the image zoom snaps to it
pub const ZOOM_SNAP_TOLERANCE: f64 = 0.01;

/// How frames map onto the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    /// Canvas pixels per image pixel
    pub image_zoom: f64,
    /// Canvas pixels per page pixel
    pub screen_zoom: f64,
    /// Page pixels above the content area, from frame metadata
    pub offset_top: f64,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            image_zoom: 1.0,
            screen_zoom: 1.0,
            offset_top: 0.0,
        }
    }
}

impl ScreenGeometry {
    /// Fit an image `natural_width` wide into `canvas`. Degenerate input yields the
    /// identity geometry.
    pub fn compute(
        canvas: CanvasSize,
        natural_width: f64,
        metadata: &ScreencastFrameMetadata,
    ) -> Self {
        let aspect = metadata.aspect_ratio();
        if natural_width <= 0.0 || aspect <= 0.0 || metadata.device_width <= 0.0 {
            return Self::default();
        }

        let fit = f64::min(
            canvas.width / natural_width,
            canvas.height / (natural_width * aspect),
        );
        let image_zoom = snap_zoom(fit, canvas.dpr);

        Self {
            image_zoom,
            screen_zoom: natural_width * image_zoom / metadata.device_width,
            offset_top: metadata.offset_top,
        }
    }

    /// Vertical canvas offset of the frame image
    pub fn image_top(&self) -> f64 {
        self.offset_top * self.screen_zoom
    }
}

/// Snap to `1/dpr` when within `ZOOM_SNAP_TOLERANCE` of it, so 1:1 frames stay sharp
pub fn snap_zoom(zoom: f64, dpr: f64) -> f64 {
    if dpr <= 0.0 {
        return zoom;
    }
    let target = 1.0 / dpr;
    if ((zoom - target) / target).abs() <= ZOOM_SNAP_TOLERANCE {
        target
    } else {
        zoom
    }
}

/// `Page.startScreencast` params for a viewport of `width`×`height` CSS pixels
pub fn start_params(format: ImageFormat, width: f64, height: f64, dpr: f64) -> Value {
    json!({
        "format": format.as_str(),
        "maxWidth": (width * dpr).floor() as i64,
        "maxHeight": (height * dpr).floor() as i64,
    })
}

/// Acks, decodes and orders incoming frames
pub struct Screencast {
    conn: Arc<Connection>,
    decoder: Arc<dyn FrameDecoder>,
    received: AtomicU64,
    shown: Arc<AtomicU64>,
}

impl Screencast {
    pub fn new(conn: Arc<Connection>, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self {
            conn,
            decoder,
            received: AtomicU64::new(0),
            shown: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn start(&self, format: ImageFormat, width: f64, height: f64, dpr: f64) -> Call {
        self.conn.send(
            methods::PAGE_START_SCREENCAST,
            Some(start_params(format, width, height, dpr)),
        )
    }

    pub fn stop(&self) -> Call {
        self.conn.send(methods::PAGE_STOP_SCREENCAST, None)
    }

    /// Acknowledge `frame`, then decode it in the background. `on_decoded` runs
    /// unless a newer frame finished decoding first.
    pub fn receive<F>(&self, frame: ScreencastFrame, on_decoded: F)
    where
        F: FnOnce(DecodedFrame, ScreencastFrameMetadata) + Send + 'static,
    {
        self.conn.notify(
            methods::PAGE_SCREENCAST_FRAME_ACK,
            Some(json!({ "sessionId": frame.session_id })),
        );

        let seq = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        let decoder = self.decoder.clone();
        let shown = self.shown.clone();

        tokio::spawn(async move {
            let decoded = match decoder.decode(&frame.data).await {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(session = frame.session_id, "Dropping frame: {}", e);
                    return;
                }
            };
            if shown.fetch_max(seq, Ordering::SeqCst) >= seq {
                tracing::trace!(session = frame.session_id, "Dropping stale frame");
                return;
            }
            on_decoded(decoded, frame.metadata);
        });
    }

    /// Frames received so far
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}
