//! The preview UI model
//!
//! Owns the connection to the host and everything drawn in the panel: toolbar
//! state, the screencast canvas, the inspect overlay and device emulation.
//! Rendering goes to a `Surface`; DOM input comes in through `mouse` and `key`.
//!
//! Must be created inside a tokio runtime. Event handlers are synchronous and
//! spawn whatever has to wait on the host.

use parking_lot::Mutex;
use protocol::{
    find_device, methods, normalize_url, DeviceDescriptor, NavigationHistory, PreviewConfig,
    ScreencastFrame, ScreencastFrameMetadata, SourceLocation, ViewState, ViewportMetadata,
    state::LOAD_SETTLE_DELAY, RESPONSIVE_DEVICE,
};
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

use crate::canvas::{compose, CanvasSize, Surface};
use crate::connection::{Connection, Outbound};
use crate::decode::{DecodedFrame, FrameDecoder};
use crate::emulation::EmulatedViewport;
use crate::error::{Result, ViewError};
use crate::input::{key_event_params, mouse_event_params, KeyInput, MouseInput, MouseKind};
use crate::inspect::{page_point, Inspector};
use crate::screencast::{ScreenGeometry, Screencast};

const TITLE_PREFIX: &str = "BrowserView";

/// URL as the toolbar shows it: plain `http://` is implied
pub fn display_url(url: &str) -> &str {
    url.strip_prefix("http://").unwrap_or(url)
}

pub struct ViewerOptions {
    pub canvas: CanvasSize,
    pub decoder: Arc<dyn FrameDecoder>,
    pub surface: Arc<dyn Surface>,
}

struct ViewerState {
    view: ViewState,
    canvas: CanvasSize,
    /// Canvas top edge in document coordinates
    canvas_top: f64,
    geometry: ScreenGeometry,
    frame: Option<Arc<DecodedFrame>>,
    device: DeviceDescriptor,
    /// Last state sent with `extension.appStateChanged`
    reported: Option<ViewState>,
}

pub struct Viewer {
    me: Weak<Viewer>,
    conn: Arc<Connection>,
    screencast: Screencast,
    inspector: Inspector,
    surface: Arc<dyn Surface>,
    state: Mutex<ViewerState>,
    settle: Mutex<Option<JoinHandle<()>>>,
}

impl Viewer {
    pub fn new(outbound: Arc<dyn Outbound>, options: ViewerOptions) -> Arc<Self> {
        let conn = Arc::new(Connection::new(outbound));
        let device = find_device(RESPONSIVE_DEVICE).unwrap_or_else(|| DeviceDescriptor {
            name: RESPONSIVE_DEVICE.to_string(),
            width: 0.0,
            height: 0.0,
            device_scale_factor: 1.0,
            mobile: false,
            user_agent: String::new(),
        });

        let mut view = ViewState::default();
        view.viewport_metadata.device_pixel_ratio = options.canvas.dpr;

        let viewer = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            screencast: Screencast::new(conn.clone(), options.decoder),
            inspector: Inspector::new(conn.clone()),
            conn,
            surface: options.surface,
            state: Mutex::new(ViewerState {
                view,
                canvas: options.canvas,
                canvas_top: 0.0,
                geometry: ScreenGeometry::default(),
                frame: None,
                device,
                reported: None,
            }),
            settle: Mutex::new(None),
        });

        viewer.listen(methods::FRAME_NAVIGATED, Viewer::on_frame_navigated);
        viewer.listen(
            methods::NAVIGATED_WITHIN_DOCUMENT,
            Viewer::on_navigated_within_document,
        );
        viewer.listen(methods::LOAD_EVENT_FIRED, Viewer::on_load_event_fired);
        viewer.listen(methods::SCREENCAST_FRAME, Viewer::on_screencast_frame);
        viewer.listen(methods::JAVASCRIPT_DIALOG_OPENING, Viewer::on_dialog_opening);
        viewer.listen(methods::WINDOW_OPEN, Viewer::on_window_open);
        viewer.listen(methods::APP_CONFIGURATION, Viewer::on_app_configuration);
        viewer.listen(methods::VIEWPORT, Viewer::on_viewport);

        viewer.conn.notify(methods::PAGE_ENABLE, None);
        viewer.spawn_history_refresh();
        viewer
    }

    fn listen(&self, method: &str, handler: fn(&Viewer, &Value)) {
        let me = self.me.clone();
        self.conn.on(
            method,
            Arc::new(move |payload| {
                if let Some(viewer) = me.upgrade() {
                    handler(&viewer, payload);
                }
            }),
        );
    }

    /// Feed one raw message from the host
    pub fn on_message(&self, raw: Value) {
        self.conn.on_message(raw);
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn state(&self) -> ViewState {
        self.state.lock().view.clone()
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.state.lock().geometry
    }

    pub fn device(&self) -> DeviceDescriptor {
        self.state.lock().device.clone()
    }

    // Host events

    fn on_frame_navigated(&self, payload: &Value) {
        self.apply_navigation(methods::FRAME_NAVIGATED, payload);
    }

    fn on_navigated_within_document(&self, payload: &Value) {
        self.apply_navigation(methods::NAVIGATED_WITHIN_DOCUMENT, payload);
    }

    /// Child frames leave the state alone and trigger nothing
    fn apply_navigation(&self, method: &str, payload: &Value) {
        let changed = self.state.lock().view.apply_event(method, payload);
        if changed {
            self.spawn_history_refresh();
            self.report_state();
        }
    }

    fn on_load_event_fired(&self, payload: &Value) {
        self.state
            .lock()
            .view
            .apply_event(methods::LOAD_EVENT_FIRED, payload);
        self.report_state();
        self.schedule_settle();
    }

    fn schedule_settle(&self) {
        let me = self.me.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(LOAD_SETTLE_DELAY).await;
            if let Some(viewer) = me.upgrade() {
                viewer.state.lock().view.settle_loading();
                viewer.report_state();
            }
        });
        if let Some(previous) = self.settle.lock().replace(task) {
            previous.abort();
        }
    }

    fn on_screencast_frame(&self, payload: &Value) {
        let frame: ScreencastFrame = match serde_json::from_value(payload.clone()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Malformed screencast frame: {}", e);
                return;
            }
        };

        let scrolled = self
            .state
            .lock()
            .view
            .apply_frame_metadata(&frame.metadata);
        if scrolled {
            self.report_state();
        }

        let me = self.me.clone();
        self.screencast.receive(frame, move |decoded, metadata| {
            if let Some(viewer) = me.upgrade() {
                viewer.on_frame_decoded(decoded, &metadata);
            }
        });
    }

    fn on_frame_decoded(&self, decoded: DecodedFrame, metadata: &ScreencastFrameMetadata) {
        {
            let mut state = self.state.lock();
            let geometry =
                ScreenGeometry::compute(state.canvas, f64::from(decoded.width), metadata);
            state.geometry = geometry;
            state.view.viewport_metadata.screen_zoom = geometry.screen_zoom;
            state.frame = Some(Arc::new(decoded));
        }
        self.paint();
        self.report_state();
    }

    fn on_dialog_opening(&self, payload: &Value) {
        self.conn.notify(
            methods::WINDOW_DIALOG_REQUESTED,
            Some(json!({
                "type": payload["type"],
                "message": payload["message"],
                "defaultPrompt": payload["defaultPrompt"],
            })),
        );
    }

    fn on_window_open(&self, payload: &Value) {
        if let Some(url) = payload["url"].as_str() {
            self.conn
                .notify(methods::WINDOW_OPEN_REQUESTED, Some(json!({ "url": url })));
        }
    }

    fn on_app_configuration(&self, payload: &Value) {
        let config: PreviewConfig = match serde_json::from_value(payload.clone()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Malformed app configuration: {}", e);
                return;
            }
        };

        self.conn.set_verbose(config.is_verbose_mode);
        self.state.lock().view.format = config.format;
        if let Some(viewport) = payload.get("viewportMetadata") {
            self.on_viewport(viewport);
        }
        if let Some(url) = config.start_url {
            self.navigate(&url);
        }
    }

    fn on_viewport(&self, payload: &Value) {
        let metadata: ViewportMetadata = match serde_json::from_value(payload.clone()) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Malformed viewport: {}", e);
                return;
            }
        };

        let device = metadata.emulated_device_id.as_deref().and_then(find_device);
        {
            let mut state = self.state.lock();
            if let Some(device) = device {
                state.device = device;
                state.view.viewport_metadata.emulated_device_id =
                    metadata.emulated_device_id.clone();
            }
        }

        if metadata.width > 0.0 && metadata.height > 0.0 {
            let me = self.me.clone();
            tokio::spawn(async move {
                if let Some(viewer) = me.upgrade() {
                    if let Err(e) = viewer.resize(metadata.width, metadata.height).await {
                        tracing::debug!("Viewport resize failed: {}", e);
                    }
                }
            });
        }
    }

    // Toolbar

    pub fn navigate(&self, url: &str) {
        let url = normalize_url(url);
        self.state.lock().view.url = url.clone();
        self.conn
            .notify(methods::PAGE_NAVIGATE, Some(json!({ "url": url })));
        self.report_state();
    }

    pub fn go_back(&self) {
        self.conn.notify(methods::PAGE_GO_BACKWARD, None);
    }

    pub fn go_forward(&self) {
        self.conn.notify(methods::PAGE_GO_FORWARD, None);
    }

    pub fn reload(&self) {
        self.conn.notify(methods::PAGE_RELOAD, None);
    }

    fn spawn_history_refresh(&self) {
        let me = self.me.clone();
        tokio::spawn(async move {
            if let Some(viewer) = me.upgrade() {
                if let Err(e) = viewer.request_history().await {
                    tracing::debug!("History refresh failed: {}", e);
                }
            }
        });
    }

    /// Refresh back/forward flags, the URL and the panel title
    pub async fn request_history(&self) -> Result<()> {
        let history = self
            .conn
            .send(methods::PAGE_GET_NAVIGATION_HISTORY, None)
            .await?;

        let entries = history["entries"].as_array().map(Vec::as_slice).unwrap_or_default();
        let index = history["currentIndex"].as_u64().unwrap_or(0) as usize;
        let Some(entry) = entries.get(index) else {
            return Ok(());
        };
        let url = entry["url"].as_str().unwrap_or_default();
        let title = match entry["title"].as_str() {
            Some(title) if !title.is_empty() => title,
            _ => url,
        };

        {
            let mut state = self.state.lock();
            state.view.history = NavigationHistory::at(index, entries.len());
            if !url.is_empty() {
                state.view.url = url.to_string();
            }
        }
        self.conn.notify(
            methods::UPDATE_TITLE,
            Some(json!({ "title": format!("{} ({})", TITLE_PREFIX, title) })),
        );
        self.report_state();
        Ok(())
    }

    // Viewport

    /// Canvas resized or moved. A responsive device follows it.
    pub async fn set_canvas(&self, canvas: CanvasSize, top: f64) -> Result<()> {
        let responsive = {
            let mut state = self.state.lock();
            state.canvas = canvas;
            state.canvas_top = top;
            state.view.viewport_metadata.device_pixel_ratio = canvas.dpr;
            state.device.is_responsive()
        };
        self.paint();

        if responsive {
            self.resize(canvas.width, canvas.height).await?;
        }
        Ok(())
    }

    /// Stop casting, override device metrics, restart casting at the new size.
    /// The encoder cannot change size while running.
    pub async fn resize(&self, width: f64, height: f64) -> Result<()> {
        let (emulated, format, dpr) = {
            let state = self.state.lock();
            let canvas = CanvasSize::new(width, height, state.canvas.dpr);
            (
                EmulatedViewport::for_device(&state.device, canvas),
                state.view.format,
                state.canvas.dpr,
            )
        };

        if let Err(e) = self.screencast.stop().await {
            tracing::debug!("Stopping screencast: {}", e);
        }
        self.conn
            .send(
                methods::PAGE_SET_DEVICE_METRICS_OVERRIDE,
                Some(emulated.metrics_params()),
            )
            .await?;

        {
            let mut state = self.state.lock();
            state.view.viewport_metadata.width = emulated.width;
            state.view.viewport_metadata.height = emulated.height;
        }
        self.report_state();

        self.screencast
            .start(format, emulated.width, emulated.height, dpr)
            .await?;
        Ok(())
    }

    /// Switch to one of the built-in devices
    pub async fn emulate_device(&self, name: &str) -> Result<()> {
        let device = find_device(name).ok_or_else(|| ViewError::UnknownDevice(name.to_string()))?;

        let (width, height) = {
            let mut state = self.state.lock();
            state.view.viewport_metadata.emulated_device_id = Some(device.name.clone());
            state.device = device.clone();
            if device.is_responsive() {
                (state.canvas.width, state.canvas.height)
            } else {
                (device.width, device.height)
            }
        };

        self.conn
            .send(
                methods::NETWORK_SET_USER_AGENT_OVERRIDE,
                Some(json!({ "userAgent": device.user_agent })),
            )
            .await?;
        self.resize(width, height).await
    }

    fn paint(&self) {
        let ops = {
            let state = self.state.lock();
            compose(
                state.canvas,
                &state.geometry,
                state.frame.as_ref(),
                state.view.viewport_metadata.highlight_node.as_ref(),
            )
        };
        self.surface.present(ops);
    }

    // Input

    pub async fn mouse(&self, input: MouseInput) {
        let (inspecting, zoom) = {
            let state = self.state.lock();
            (
                state.view.viewport_metadata.is_inspect_enabled,
                state.geometry.screen_zoom,
            )
        };

        if inspecting {
            match input.kind {
                MouseKind::Move => self.highlight_at(&input).await,
                MouseKind::Click => {
                    self.pick_at(&input).await;
                }
                _ => {}
            }
            return;
        }

        if let Some(params) = mouse_event_params(&input, zoom) {
            self.conn
                .notify(methods::INPUT_DISPATCH_MOUSE_EVENT, Some(params));
        }
    }

    pub fn key(&self, input: &KeyInput) {
        self.conn
            .notify(methods::INPUT_DISPATCH_KEY_EVENT, Some(key_event_params(input)));
    }

    pub fn set_inspect(&self, enabled: bool) {
        {
            let mut state = self.state.lock();
            let vm = &mut state.view.viewport_metadata;
            vm.is_inspect_enabled = enabled;
            if !enabled {
                vm.highlight_node = None;
            }
        }
        self.paint();
        self.report_state();
    }

    fn point_for(&self, input: &MouseInput) -> (i64, i64) {
        let state = self.state.lock();
        let vm = &state.view.viewport_metadata;
        page_point(
            input.client_x,
            input.client_y,
            state.canvas_top,
            state.geometry.screen_zoom,
            vm.scroll_offset_x,
            vm.scroll_offset_y,
        )
    }

    async fn highlight_at(&self, input: &MouseInput) {
        let (x, y) = self.point_for(input);
        let model = match self.inspector.box_model_at(x, y).await {
            Ok(model) => model,
            Err(e) => {
                tracing::debug!("Highlight at ({}, {}) failed: {}", x, y, e);
                None
            }
        };

        {
            let mut state = self.state.lock();
            // Inspection may have been switched off while the request was out
            if !state.view.viewport_metadata.is_inspect_enabled {
                return;
            }
            state.view.viewport_metadata.highlight_node = model;
        }
        self.paint();
        self.report_state();
    }

    /// Open the source of the element under the pointer and leave inspect mode
    async fn pick_at(&self, input: &MouseInput) -> Option<SourceLocation> {
        let (x, y) = self.point_for(input);
        let location = match self.inspector.source_location_at(x, y).await {
            Ok(Some(location)) => location,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Inspect at ({}, {}) failed: {}", x, y, e);
                return None;
            }
        };

        self.conn.notify(
            methods::OPEN_FILE,
            Some(json!({
                "fileName": location.file_name,
                "lineNumber": location.line_number,
                "columnNumber": location.column_number,
            })),
        );
        self.set_inspect(false);
        Some(location)
    }

    // Clipboard

    pub async fn copy(&self, text: &str) -> Result<()> {
        self.conn
            .send(methods::CLIPBOARD_WRITE_TEXT, Some(json!({ "value": text })))
            .await?;
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<String> {
        let text = self.conn.send(methods::CLIPBOARD_READ_TEXT, None).await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    /// Type the clipboard into the focused element
    pub async fn paste(&self) -> Result<String> {
        let text = self.read_clipboard().await?;
        if !text.is_empty() {
            self.conn
                .notify(methods::INPUT_INSERT_TEXT, Some(json!({ "text": text })));
        }
        Ok(text)
    }

    /// Navigate to whatever the clipboard holds
    pub async fn paste_and_go(&self) -> Result<()> {
        let text = self.read_clipboard().await?;
        let text = text.trim();
        if !text.is_empty() {
            self.navigate(text);
        }
        Ok(())
    }

    fn report_state(&self) {
        let view = {
            let mut state = self.state.lock();
            if state.reported.as_ref() == Some(&state.view) {
                return;
            }
            let view = state.view.clone();
            state.reported = Some(view.clone());
            view
        };
        self.conn
            .notify(methods::APP_STATE_CHANGED, Some(json!({ "state": view })));
    }

    /// Reject pending calls and stop timers. Idempotent.
    pub fn dispose(&self) {
        if let Some(task) = self.settle.lock().take() {
            task.abort();
        }
        self.conn.dispose();
    }
}
