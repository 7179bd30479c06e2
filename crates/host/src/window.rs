//! Window Controller
//!
//! One per preview panel. Owns a page session and sits between the panel
//! transport and the browser tab:
//!
//! ```text
//! Created ──launch──► Launching ──page ready──► Active ──dispose──► Disposed
//!                         └────────launch failed───────────────────────┘
//! ```
//!
//! In `Active` every UI request is either a host command (handled here, never
//! forwarded) or a page command (relayed with its callback id intact).

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use protocol::{
    methods, normalize_url, state::LOAD_SETTLE_DELAY, CallbackId, EventEnvelope, HostMessage,
    PreviewConfig, ReplyEnvelope, RequestEnvelope, ViewState, ViewportMetadata, WindowId,
    WindowState,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

use crate::cdp::CDPEvent;
use crate::editor::{HostEditor, Panel, PanelFactory, PANEL_TITLE};
use crate::error::{HostError, Result};
use crate::manager::BrowserProcessManager;
use crate::page::PageSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Created,
    Launching,
    Active,
    Disposed,
}

/// What a window tells its owner
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// The page asked for a new window
    OpenRequested { url: String },
    /// A UI command was relayed to the page
    Interaction { method: String, params: Option<Value> },
    /// The tracked `ViewState` changed
    StateChanged,
}

#[async_trait]
pub trait WindowListener: Send + Sync {
    fn on_window_event(&self, id: WindowId, event: WindowEvent);

    /// Called exactly once, after the window released its page
    async fn on_window_disposed(&self, id: WindowId);
}

/// UI messages the host answers itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    UpdateTitle,
    WindowOpenRequested,
    OpenFile,
    WindowDialogRequested,
    AppStateChanged,
    /// Host → UI only; tolerated from the UI and dropped
    AppConfiguration,
    /// Host → UI only; tolerated from the UI and dropped
    Viewport,
}

impl HostCommand {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            methods::UPDATE_TITLE => Some(HostCommand::UpdateTitle),
            methods::WINDOW_OPEN_REQUESTED => Some(HostCommand::WindowOpenRequested),
            methods::OPEN_FILE => Some(HostCommand::OpenFile),
            methods::WINDOW_DIALOG_REQUESTED => Some(HostCommand::WindowDialogRequested),
            methods::APP_STATE_CHANGED => Some(HostCommand::AppStateChanged),
            methods::APP_CONFIGURATION => Some(HostCommand::AppConfiguration),
            methods::VIEWPORT => Some(HostCommand::Viewport),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

/// Payload of `extension.windowDialogRequested`, mirrored from
/// `Page.javascriptDialogOpening`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogRequest {
    #[serde(rename = "type")]
    pub kind: DialogKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub default_prompt: Option<String>,
}

const DIALOG_OK: &str = "Ok";
const DIALOG_CANCEL: &str = "Cancel";

/// Payload of `extension.openFile`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenFileRequest {
    #[serde(alias = "fileName")]
    uri: String,
    #[serde(default)]
    line_number: Option<u32>,
    #[serde(default)]
    column_number: Option<u32>,
}

impl OpenFileRequest {
    fn path(&self) -> PathBuf {
        url::Url::parse(&self.uri)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(&self.uri))
    }
}

pub struct WindowOptions {
    pub id: WindowId,
    pub config: PreviewConfig,
    pub column: u32,
    pub manager: Arc<BrowserProcessManager>,
    pub editor: Arc<dyn HostEditor>,
    pub panels: Arc<dyn PanelFactory>,
    pub listener: Weak<dyn WindowListener>,
}

pub struct WindowController {
    id: WindowId,
    config: RwLock<PreviewConfig>,
    column: u32,
    manager: Arc<BrowserProcessManager>,
    editor: Arc<dyn HostEditor>,
    panels: Arc<dyn PanelFactory>,
    listener: Weak<dyn WindowListener>,
    me: Weak<WindowController>,

    phase: Mutex<WindowPhase>,
    panel: RwLock<Option<Arc<dyn Panel>>>,
    page: RwLock<Option<Arc<PageSession>>>,
    state: Mutex<ViewState>,
    settle: Mutex<Option<JoinHandle<()>>>,
}

impl WindowController {
    pub fn new(options: WindowOptions) -> Arc<Self> {
        let mut config = options.config;
        config.start_url = config.start_url.as_deref().map(normalize_url);

        let state = ViewState {
            format: config.format,
            ..ViewState::default()
        };

        Arc::new_cyclic(|me| Self {
            id: options.id,
            config: RwLock::new(config),
            column: options.column,
            manager: options.manager,
            editor: options.editor,
            panels: options.panels,
            listener: options.listener,
            me: me.clone(),
            phase: Mutex::new(WindowPhase::Created),
            panel: RwLock::new(None),
            page: RwLock::new(None),
            state: Mutex::new(state),
            settle: Mutex::new(None),
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn phase(&self) -> WindowPhase {
        *self.phase.lock()
    }

    pub fn is_disposed(&self) -> bool {
        self.phase() == WindowPhase::Disposed
    }

    /// Normalised start URL this window was opened with
    pub fn start_url(&self) -> Option<String> {
        self.config.read().start_url.clone()
    }

    pub fn state(&self) -> WindowState {
        WindowState {
            id: self.id,
            view: self.state.lock().clone(),
        }
    }

    /// Open the tab, create the panel and hand the UI its configuration
    pub async fn launch(&self) -> Result<()> {
        {
            let mut phase = self.phase.lock();
            match *phase {
                WindowPhase::Created => *phase = WindowPhase::Launching,
                WindowPhase::Disposed => return Err(HostError::Disposed),
                WindowPhase::Launching | WindowPhase::Active => return Ok(()),
            }
        }

        let page = match self.manager.new_page(self.editor.clipboard()).await {
            Ok(page) => Arc::new(page),
            Err(HostError::Disposed) => {
                tracing::debug!(window = %self.id, "Browser released while launching");
                *self.phase.lock() = WindowPhase::Disposed;
                return Err(HostError::Disposed);
            }
            Err(e) => {
                tracing::error!(window = %self.id, "Failed to open page: {}", e);
                self.editor.show_error(&e.to_string());
                *self.phase.lock() = WindowPhase::Disposed;
                return Err(e);
            }
        };

        let me = self.me.clone();
        page.subscribe_all(Arc::new(move |event| {
            if let Some(window) = me.upgrade() {
                window.on_page_event(event);
            }
        }));

        let disposed_while_launching = {
            let mut phase = self.phase.lock();
            if *phase == WindowPhase::Disposed {
                true
            } else {
                *phase = WindowPhase::Active;
                false
            }
        };
        if disposed_while_launching {
            page.dispose().await;
            return Err(HostError::Disposed);
        }

        *self.page.write() = Some(page);
        *self.panel.write() = Some(self.panels.create(self.id, PANEL_TITLE, self.column));

        let mut configuration = serde_json::to_value(&*self.config.read())?;
        configuration["viewportMetadata"] =
            serde_json::to_value(&self.state.lock().viewport_metadata)?;
        self.post(EventEnvelope::new(methods::APP_CONFIGURATION, configuration).into());

        tracing::info!(window = %self.id, column = self.column, "Window active");
        Ok(())
    }

    fn post(&self, message: HostMessage) {
        let panel = self.panel.read().clone();
        if let Some(panel) = panel {
            panel.post(message);
        }
    }

    fn notify(&self, event: WindowEvent) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_window_event(self.id, event);
        }
    }

    fn page(&self) -> Option<Arc<PageSession>> {
        self.page.read().clone()
    }

    /// Handle one request from the UI. Awaiting each call before the next keeps
    /// input ordered.
    pub async fn handle_message(&self, message: RequestEnvelope) {
        if self.phase() != WindowPhase::Active {
            tracing::debug!(
                window = %self.id,
                method = %message.method,
                "Dropping message for inactive window"
            );
            return;
        }

        let RequestEnvelope {
            method,
            params,
            callback_id,
        } = message;

        match HostCommand::parse(&method) {
            Some(command) => {
                self.handle_host_command(command, params).await;
                self.reply_empty(callback_id);
            }
            None => {
                self.notify(WindowEvent::Interaction {
                    method: method.clone(),
                    params: params.clone(),
                });
                if let Some(reply) = self.relay(&method, params, callback_id).await {
                    self.post(reply.into());
                }
            }
        }
    }

    /// Decode and handle a raw panel message
    pub async fn handle_raw(&self, raw: Value) {
        match RequestEnvelope::parse(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => tracing::warn!(window = %self.id, "Malformed UI message: {}", e),
        }
    }

    /// Run a page command on behalf of a remote peer. Not reported as an interaction.
    pub async fn replay(&self, method: &str, params: Option<Value>) {
        if self.phase() != WindowPhase::Active {
            return;
        }
        self.relay(method, params, None).await;
    }

    async fn relay(
        &self,
        method: &str,
        params: Option<Value>,
        callback_id: Option<CallbackId>,
    ) -> Option<ReplyEnvelope> {
        match self.page() {
            Some(page) => page.relay(method, params, callback_id).await,
            None => callback_id
                .map(|id| ReplyEnvelope::err(id, HostError::Disposed.reply_message())),
        }
    }

    fn reply_empty(&self, callback_id: Option<CallbackId>) {
        if let Some(id) = callback_id {
            self.post(ReplyEnvelope::ok(id, Value::Null).into());
        }
    }

    async fn handle_host_command(&self, command: HostCommand, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);

        match command {
            HostCommand::UpdateTitle => {
                if let Some(title) = params["title"].as_str() {
                    let panel = self.panel.read().clone();
                    if let Some(panel) = panel {
                        panel.set_title(title);
                    }
                }
            }
            HostCommand::WindowOpenRequested => match params["url"].as_str() {
                Some(url) => self.notify(WindowEvent::OpenRequested {
                    url: url.to_string(),
                }),
                None => tracing::warn!(window = %self.id, "windowOpenRequested without url"),
            },
            HostCommand::OpenFile => self.open_file(params).await,
            HostCommand::WindowDialogRequested => match DialogRequest::deserialize(&params) {
                Ok(dialog) => self.answer_dialog(dialog).await,
                Err(e) => tracing::warn!(window = %self.id, "Bad dialog request: {}", e),
            },
            HostCommand::AppStateChanged => {
                match ViewState::deserialize(&params["state"]) {
                    Ok(state) => {
                        *self.state.lock() = state;
                        self.notify(WindowEvent::StateChanged);
                    }
                    Err(e) => tracing::debug!(window = %self.id, "Ignoring app state: {}", e),
                }
            }
            HostCommand::AppConfiguration | HostCommand::Viewport => {
                tracing::debug!(window = %self.id, ?command, "Ignoring host-bound message");
            }
        }
    }

    async fn open_file(&self, params: Value) {
        let request = match OpenFileRequest::deserialize(&params) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(window = %self.id, "Bad openFile request: {}", e);
                return;
            }
        };

        let path = request.path();
        if let Err(e) = self
            .editor
            .open_file(&path, request.line_number, request.column_number)
            .await
        {
            self.editor.show_error(&e.to_string());
        }
    }

    /// Ask the user, then tell the browser. Dismissing a question denies it.
    async fn answer_dialog(&self, dialog: DialogRequest) {
        let answer = match dialog.kind {
            DialogKind::Alert => {
                self.editor.show_info(&dialog.message);
                json!({ "accept": true })
            }
            DialogKind::Confirm | DialogKind::BeforeUnload => {
                let pick = self.editor.quick_pick(&[DIALOG_OK, DIALOG_CANCEL]).await;
                json!({ "accept": pick.as_deref() == Some(DIALOG_OK) })
            }
            DialogKind::Prompt => {
                let text = self
                    .editor
                    .input_box(&dialog.message, dialog.default_prompt.as_deref())
                    .await;
                match text {
                    Some(text) => json!({ "accept": true, "promptText": text }),
                    None => json!({ "accept": false }),
                }
            }
        };

        if let Some(page) = self.page() {
            if let Err(e) = page
                .send(methods::PAGE_HANDLE_JAVASCRIPT_DIALOG, Some(answer))
                .await
            {
                tracing::warn!(window = %self.id, "Failed to answer dialog: {}", e);
            }
        }
    }

    fn on_page_event(&self, event: CDPEvent) {
        if self.is_disposed() {
            return;
        }

        let params = event.params_or_null();
        let changed = self.state.lock().apply_event(&event.method, &params);

        if event.method == methods::LOAD_EVENT_FIRED {
            self.schedule_settle();
        }

        self.post(EventEnvelope::new(event.method, params).into());

        if changed {
            self.notify(WindowEvent::StateChanged);
        }
    }

    fn schedule_settle(&self) {
        let me = self.me.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(LOAD_SETTLE_DELAY).await;
            if let Some(window) = me.upgrade() {
                window.state.lock().settle_loading();
                window.notify(WindowEvent::StateChanged);
            }
        });

        if let Some(previous) = self.settle.lock().replace(task) {
            previous.abort();
        }
    }

    /// Push a viewport to the UI, as for a window mirrored from a peer
    pub fn set_viewport(&self, metadata: ViewportMetadata) {
        let value = match serde_json::to_value(&metadata) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(window = %self.id, "Unserialisable viewport: {}", e);
                return;
            }
        };
        self.state.lock().viewport_metadata = metadata;
        self.post(EventEnvelope::new(methods::VIEWPORT, value).into());
    }

    pub fn reveal(&self) {
        let panel = self.panel.read().clone();
        if let Some(panel) = panel {
            panel.reveal();
        }
    }

    /// Close panel and page, then tell the listener. Later calls do nothing.
    pub async fn dispose(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase == WindowPhase::Disposed {
                return;
            }
            *phase = WindowPhase::Disposed;
        }

        if let Some(task) = self.settle.lock().take() {
            task.abort();
        }

        let panel = self.panel.write().take();
        if let Some(panel) = panel {
            panel.close();
        }

        let page = self.page.write().take();
        if let Some(page) = page {
            page.dispose().await;
        }

        tracing::info!(window = %self.id, "Window disposed");

        if let Some(listener) = self.listener.upgrade() {
            listener.on_window_disposed(self.id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::LaunchConfig;
    use crate::testing::{
        MockBrowser, MockEditor, MockLauncher, MockPage, MockPanel, MockPanelFactory,
        RecordingListener,
    };
    use std::time::Duration;
    use uuid::Uuid;

    struct Harness {
        window: Arc<WindowController>,
        launcher: Arc<MockLauncher>,
        editor: Arc<MockEditor>,
        panels: Arc<MockPanelFactory>,
        listener: Arc<RecordingListener>,
    }

    impl Harness {
        fn with_launcher(launcher: MockLauncher, start_url: &str) -> Self {
            let launcher = Arc::new(launcher);
            let editor = Arc::new(MockEditor::new());
            let panels = Arc::new(MockPanelFactory::new());
            let listener = Arc::new(RecordingListener::new());
            let manager = Arc::new(BrowserProcessManager::new(
                LaunchConfig::default(),
                launcher.clone(),
            ));
            let weak: Weak<RecordingListener> = Arc::downgrade(&listener);

            let window = WindowController::new(WindowOptions {
                id: Uuid::new_v4(),
                config: PreviewConfig {
                    start_url: Some(start_url.to_string()),
                    ..PreviewConfig::default()
                },
                column: 1,
                manager,
                editor: editor.clone(),
                panels: panels.clone(),
                listener: weak,
            });

            Self {
                window,
                launcher,
                editor,
                panels,
                listener,
            }
        }

        async fn launched() -> Self {
            let harness = Self::with_launcher(MockLauncher::new(), "http://example.com");
            harness.window.launch().await.unwrap();
            harness
        }

        fn browser(&self) -> Arc<MockBrowser> {
            self.launcher.browser()
        }

        fn page(&self) -> Arc<MockPage> {
            self.browser().page(0)
        }

        fn panel(&self) -> Arc<MockPanel> {
            self.panels.panel(0)
        }
    }

    #[tokio::test]
    async fn test_launch_posts_configuration() {
        let h = Harness::launched().await;

        assert_eq!(h.window.phase(), WindowPhase::Active);
        let config = h.panel().events(methods::APP_CONFIGURATION);
        assert_eq!(config.len(), 1);
        assert_eq!(config[0]["startUrl"], "http://example.com/");
        assert_eq!(config[0]["format"], "jpeg");
        assert_eq!(config[0]["viewportMetadata"]["width"], 0.0);
        assert_eq!(config[0]["viewportMetadata"]["screenZoom"], 1.0);
        assert_eq!(config[0]["viewportMetadata"]["devicePixelRatio"], 1.0);
    }

    #[tokio::test]
    async fn test_app_state_changed_is_never_forwarded() {
        let h = Harness::launched().await;

        let message = RequestEnvelope::new(
            methods::APP_STATE_CHANGED,
            Some(json!({ "state": { "url": "http://example.com/about" } })),
        )
        .with_callback(3);
        h.window.handle_message(message).await;

        assert!(h.page().calls().is_empty());
        assert_eq!(h.window.state().view.url, "http://example.com/about");
        assert_eq!(h.panel().replies(), vec![ReplyEnvelope::ok(3, Value::Null)]);
        assert!(h
            .listener
            .events()
            .iter()
            .all(|(_, e)| !matches!(e, WindowEvent::Interaction { .. })));
    }

    #[tokio::test]
    async fn test_page_command_keeps_callback_id() {
        let h = Harness::launched().await;
        h.page()
            .respond(methods::PAGE_NAVIGATE, Ok(json!({ "frameId": "F1" })));

        let message = RequestEnvelope::new(
            methods::PAGE_NAVIGATE,
            Some(json!({ "url": "http://example.com/next" })),
        )
        .with_callback(42);
        h.window.handle_message(message).await;

        assert_eq!(
            h.panel().replies(),
            vec![ReplyEnvelope::ok(42, json!({ "frameId": "F1" }))]
        );
        assert_eq!(
            h.listener.events()[0].1,
            WindowEvent::Interaction {
                method: methods::PAGE_NAVIGATE.to_string(),
                params: Some(json!({ "url": "http://example.com/next" })),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_progress_end_to_end() {
        let h = Harness::launched().await;
        let page = h.page();

        page.emit(
            methods::FRAME_NAVIGATED,
            json!({ "frame": { "id": "F1", "url": "http://example.com/" } }),
        );
        let vm = h.window.state().view.viewport_metadata;
        assert_eq!(vm.loading_percent, 0.1);
        assert!(vm.is_loading);

        page.emit(methods::LOAD_EVENT_FIRED, json!({ "timestamp": 1.0 }));
        assert_eq!(h.window.state().view.viewport_metadata.loading_percent, 1.0);

        tokio::time::sleep(LOAD_SETTLE_DELAY + Duration::from_millis(10)).await;

        let vm = h.window.state().view.viewport_metadata;
        assert_eq!(vm.loading_percent, 0.0);
        assert!(!vm.is_loading);

        // Events reach the UI under their own names
        assert_eq!(h.panel().events(methods::FRAME_NAVIGATED).len(), 1);
        assert_eq!(h.panel().events(methods::LOAD_EVENT_FIRED).len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_dialog() {
        let h = Harness::launched().await;
        h.editor.answer_pick(Some("Ok"));

        h.window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_DIALOG_REQUESTED,
                Some(json!({ "type": "confirm", "message": "Leave?" })),
            ))
            .await;

        assert_eq!(
            h.page().params_of(methods::PAGE_HANDLE_JAVASCRIPT_DIALOG),
            Some(json!({ "accept": true }))
        );
    }

    #[tokio::test]
    async fn test_dismissed_prompt_denies() {
        let h = Harness::launched().await;
        h.editor.answer_input(None);

        h.window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_DIALOG_REQUESTED,
                Some(json!({ "type": "prompt", "message": "Name?", "defaultPrompt": "x" })),
            ))
            .await;

        assert_eq!(
            h.page().params_of(methods::PAGE_HANDLE_JAVASCRIPT_DIALOG),
            Some(json!({ "accept": false }))
        );
    }

    #[tokio::test]
    async fn test_answered_prompt_and_alert() {
        let h = Harness::launched().await;
        h.editor.answer_input(Some("Ferris"));

        h.window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_DIALOG_REQUESTED,
                Some(json!({ "type": "prompt", "message": "Name?" })),
            ))
            .await;
        assert_eq!(
            h.page().params_of(methods::PAGE_HANDLE_JAVASCRIPT_DIALOG),
            Some(json!({ "accept": true, "promptText": "Ferris" }))
        );

        h.window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_DIALOG_REQUESTED,
                Some(json!({ "type": "alert", "message": "Hi" })),
            ))
            .await;
        assert_eq!(h.editor.infos(), vec!["Hi".to_string()]);
    }

    #[tokio::test]
    async fn test_open_file_goes_to_editor() {
        let h = Harness::launched().await;

        h.window
            .handle_message(RequestEnvelope::new(
                methods::OPEN_FILE,
                Some(json!({ "uri": "file:///src/app.js", "lineNumber": 10 })),
            ))
            .await;

        assert_eq!(
            h.editor.opened_files(),
            vec![(PathBuf::from("/src/app.js"), Some(10), None)]
        );
        assert!(h.page().calls().is_empty());
    }

    #[tokio::test]
    async fn test_window_open_and_title() {
        let h = Harness::launched().await;

        h.window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_OPEN_REQUESTED,
                Some(json!({ "url": "http://popup.example.com" })),
            ))
            .await;
        h.window
            .handle_message(RequestEnvelope::new(
                methods::UPDATE_TITLE,
                Some(json!({ "title": "Example Domain" })),
            ))
            .await;

        assert!(h.listener.events().contains(&(
            h.window.id(),
            WindowEvent::OpenRequested {
                url: "http://popup.example.com".to_string()
            }
        )));
        assert_eq!(h.panel().title(), "Example Domain");
        assert!(h.page().calls().is_empty());
    }

    #[tokio::test]
    async fn test_double_dispose() {
        let h = Harness::launched().await;

        h.window.dispose().await;
        h.window.dispose().await;

        assert_eq!(h.listener.disposed(), vec![h.window.id()]);
        assert!(h.panel().is_closed());
        assert!(h.page().is_closed());

        h.window
            .handle_message(RequestEnvelope::new(methods::PAGE_RELOAD, None).with_callback(1))
            .await;
        assert!(h.page().calls().is_empty());
        assert!(h.panel().replies().is_empty());
    }

    #[tokio::test]
    async fn test_events_after_dispose_are_dropped() {
        let h = Harness::launched().await;
        let page = h.page();
        h.window.dispose().await;

        page.emit(methods::LOAD_EVENT_FIRED, json!({}));
        assert!(h.panel().events(methods::LOAD_EVENT_FIRED).is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let h = Harness::with_launcher(MockLauncher::failing(), "http://example.com");

        let result = h.window.launch().await;

        assert!(matches!(result, Err(HostError::BrowserNotFound(_))));
        assert_eq!(h.window.phase(), WindowPhase::Disposed);
        assert_eq!(h.editor.errors().len(), 1);
        assert_eq!(h.panels.count(), 0);
    }

    #[tokio::test]
    async fn test_set_viewport() {
        let h = Harness::launched().await;
        let metadata = ViewportMetadata {
            width: 800.0,
            height: 600.0,
            ..ViewportMetadata::default()
        };

        h.window.set_viewport(metadata.clone());

        assert_eq!(h.window.state().view.viewport_metadata, metadata);
        assert_eq!(h.panel().events(methods::VIEWPORT)[0]["height"], 600.0);
    }
}
