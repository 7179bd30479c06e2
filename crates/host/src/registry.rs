//! Window Registry
//!
//! Owns every open window and the browser they share. The browser manager is
//! created with the first window and disposed with the last one.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use protocol::{config::DEFAULT_START_URL, normalize_url, PreviewConfig, WindowId, WindowState};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::editor::{HostEditor, PanelFactory};
use crate::error::Result;
use crate::events::{EventBus, RegistryEvent};
use crate::launcher::{LaunchConfig, Launcher};
use crate::manager::BrowserProcessManager;
use crate::window::{WindowController, WindowEvent, WindowListener, WindowOptions};

struct RegistryInner {
    me: Weak<RegistryInner>,
    config: RwLock<PreviewConfig>,
    launcher: Arc<dyn Launcher>,
    editor: Arc<dyn HostEditor>,
    panels: Arc<dyn PanelFactory>,
    manager: Mutex<Option<Arc<BrowserProcessManager>>>,
    windows: RwLock<Vec<Arc<WindowController>>>,
    bus: EventBus,
}

/// Cheap to clone; every clone sees the same windows
#[derive(Clone)]
pub struct WindowRegistry {
    inner: Arc<RegistryInner>,
}

impl WindowRegistry {
    pub fn new(
        config: PreviewConfig,
        launcher: Arc<dyn Launcher>,
        editor: Arc<dyn HostEditor>,
        panels: Arc<dyn PanelFactory>,
    ) -> Self {
        let inner = Arc::new_cyclic(|me| RegistryInner {
            me: me.clone(),
            config: RwLock::new(config),
            launcher,
            editor,
            panels,
            manager: Mutex::new(None),
            windows: RwLock::new(Vec::new()),
            bus: EventBus::new(),
        });
        Self { inner }
    }

    /// Open a window at `start_url` (the configured start URL when `None`).
    /// `id` is only supplied when mirroring a collaborator's window.
    pub async fn create(
        &self,
        start_url: Option<&str>,
        id: Option<WindowId>,
    ) -> Result<Arc<WindowController>> {
        self.inner.create(start_url, id).await
    }

    pub fn get_by_id(&self, id: WindowId) -> Option<Arc<WindowController>> {
        self.inner
            .windows
            .read()
            .iter()
            .find(|window| window.id() == id)
            .cloned()
    }

    pub fn get_by_url(&self, url: &str) -> Option<Arc<WindowController>> {
        let url = normalize_url(url);
        self.inner
            .windows
            .read()
            .iter()
            .find(|window| window.start_url().as_deref() == Some(url.as_str()))
            .cloned()
    }

    /// Dispose the window opened at `url`. A miss does nothing.
    pub async fn dispose_by_url(&self, url: &str) {
        if let Some(window) = self.get_by_url(url) {
            window.dispose().await;
        }
    }

    pub fn windows(&self) -> Vec<Arc<WindowController>> {
        self.inner.windows.read().clone()
    }

    pub fn states(&self) -> Vec<WindowState> {
        self.inner
            .windows
            .read()
            .iter()
            .map(|window| window.state())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.windows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Port of the shared browser, for attaching a debugger
    pub fn debug_port(&self) -> Option<u16> {
        let manager = self.inner.manager.lock().clone();
        manager.and_then(|manager| manager.debug_port())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.bus.subscribe()
    }

    /// Apply changed editor settings. Affects windows opened afterwards.
    pub fn update_settings(&self, settings: &Value) {
        self.inner.config.write().merge_settings(settings);
    }

    pub fn config(&self) -> PreviewConfig {
        self.inner.config.read().clone()
    }

    pub async fn dispose_all(&self) {
        for window in self.windows() {
            window.dispose().await;
        }
        self.inner.release_browser().await;
    }
}

impl RegistryInner {
    fn manager(&self) -> Arc<BrowserProcessManager> {
        let mut slot = self.manager.lock();
        match slot.as_ref() {
            Some(manager) if !manager.is_disposed() => manager.clone(),
            _ => {
                let config = LaunchConfig::from(&*self.config.read());
                let manager = Arc::new(BrowserProcessManager::new(config, self.launcher.clone()));
                *slot = Some(manager.clone());
                manager
            }
        }
    }

    fn next_column(&self) -> u32 {
        let last = self.windows.read().last().map(|window| window.column());
        last.map_or_else(|| self.config.read().column_number, |column| column + 1)
    }

    async fn create(
        &self,
        start_url: Option<&str>,
        id: Option<WindowId>,
    ) -> Result<Arc<WindowController>> {
        let mut config = self.config.read().clone();
        let start_url = start_url
            .map(str::to_string)
            .or_else(|| config.start_url.clone())
            .unwrap_or_else(|| DEFAULT_START_URL.to_string());
        config.start_url = Some(start_url);

        let listener: Weak<dyn WindowListener> = self.me.clone();
        let window = WindowController::new(WindowOptions {
            id: id.unwrap_or_else(Uuid::new_v4),
            config,
            column: self.next_column(),
            manager: self.manager(),
            editor: self.editor.clone(),
            panels: self.panels.clone(),
            listener,
        });

        self.windows.write().push(window.clone());

        if let Err(e) = window.launch().await {
            let none_left = {
                let mut windows = self.windows.write();
                windows.retain(|w| w.id() != window.id());
                windows.is_empty()
            };
            if none_left {
                self.release_browser().await;
            }
            return Err(e);
        }

        tracing::info!(window = %window.id(), "Window created");
        self.bus.publish(RegistryEvent::WindowCreated { id: window.id() });
        Ok(window)
    }

    /// Forget the shared manager and dispose it. The next window launches afresh.
    async fn release_browser(&self) {
        let manager = self.manager.lock().take();
        if let Some(manager) = manager {
            manager.dispose().await;
        }
    }
}

#[async_trait]
impl WindowListener for RegistryInner {
    fn on_window_event(&self, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::OpenRequested { url } => {
                self.bus
                    .publish(RegistryEvent::WindowOpenRequested { url: url.clone() });
                if let Some(me) = self.me.upgrade() {
                    tokio::spawn(async move {
                        if let Err(e) = me.create(Some(&url), None).await {
                            tracing::warn!("Failed to open requested window: {}", e);
                        }
                    });
                }
            }
            WindowEvent::Interaction { method, params } => {
                self.bus
                    .publish(RegistryEvent::WindowInteraction { id, method, params });
            }
            WindowEvent::StateChanged => {
                self.bus.publish(RegistryEvent::WindowStateChanged { id });
            }
        }
    }

    async fn on_window_disposed(&self, id: WindowId) {
        let last = {
            let mut windows = self.windows.write();
            let before = windows.len();
            windows.retain(|window| window.id() != id);
            windows.len() < before && windows.is_empty()
        };

        self.bus.publish(RegistryEvent::WindowDisposed { id });

        if last {
            tracing::info!("Last window closed, releasing browser");
            self.release_browser().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::launcher::Browser;
    use crate::testing::{MockEditor, MockLauncher, MockPanelFactory};
    use crate::window::WindowPhase;
    use protocol::{methods, RequestEnvelope};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        registry: WindowRegistry,
        launcher: Arc<MockLauncher>,
        panels: Arc<MockPanelFactory>,
    }

    fn harness_with(launcher: MockLauncher) -> Harness {
        let launcher = Arc::new(launcher);
        let panels = Arc::new(MockPanelFactory::new());
        let registry = WindowRegistry::new(
            PreviewConfig::default(),
            launcher.clone(),
            Arc::new(MockEditor::new()),
            panels.clone(),
        );
        Harness {
            registry,
            launcher,
            panels,
        }
    }

    fn harness() -> Harness {
        harness_with(MockLauncher::new())
    }

    #[tokio::test]
    async fn test_last_window_teardown() {
        let h = harness();
        let a = h.registry.create(Some("http://a.example"), None).await.unwrap();
        let b = h.registry.create(Some("http://b.example"), None).await.unwrap();
        let browser = h.launcher.browser();

        assert_eq!(h.launcher.launches(), 1);
        assert_eq!(browser.pages_opened(), 2);

        a.dispose().await;
        assert_eq!(browser.close_count(), 0);
        assert_eq!(h.registry.debug_port(), Some(9222));

        b.dispose().await;
        assert_eq!(browser.close_count(), 1);
        assert!(h.registry.is_empty());
        assert_eq!(h.registry.debug_port(), None);

        h.registry.dispose_all().await;
        assert_eq!(browser.close_count(), 1);
    }

    #[tokio::test]
    async fn test_dispose_while_launching_terminates_browser() {
        let h = harness();
        let pending = tokio::spawn({
            let registry = h.registry.clone();
            async move { registry.create(Some("http://a.example"), None).await.map(|_| ()) }
        });
        tokio::task::yield_now().await;

        let window = h.registry.windows().pop().unwrap();
        assert_eq!(window.phase(), WindowPhase::Launching);
        window.dispose().await;

        assert!(matches!(pending.await.unwrap(), Err(HostError::Disposed)));
        let browser = h.launcher.browser();
        assert_eq!(h.launcher.launches(), 1);
        assert_eq!(browser.close_count(), 1);
        assert!(!browser.handle().is_alive());
        assert!(h.registry.is_empty());
        assert_eq!(h.registry.debug_port(), None);
    }

    #[tokio::test]
    async fn test_lookups() {
        let h = harness();
        let id = Uuid::new_v4();
        let window = h
            .registry
            .create(Some("example.com"), Some(id))
            .await
            .unwrap();

        assert_eq!(window.id(), id);
        assert!(h.registry.get_by_id(id).is_some());
        assert!(h.registry.get_by_url("http://example.com/").is_some());
        assert!(h.registry.get_by_url("example.com").is_some());
        assert!(h.registry.get_by_id(Uuid::new_v4()).is_none());
        assert!(h.registry.get_by_url("http://other.example").is_none());

        h.registry.dispose_by_url("http://other.example").await;
        assert_eq!(h.registry.len(), 1);

        h.registry.dispose_by_url("example.com").await;
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_columns_increment() {
        let h = harness();
        h.registry.create(None, None).await.unwrap();
        h.registry.create(None, None).await.unwrap();
        h.registry.create(None, None).await.unwrap();

        assert_eq!(h.panels.columns(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_first_launch_forgets_browser() {
        let h = harness_with(MockLauncher::failing());

        assert!(h.registry.create(None, None).await.is_err());
        assert!(h.registry.create(None, None).await.is_err());

        assert_eq!(h.launcher.launches(), 2);
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let h = harness();
        let mut rx = h.registry.subscribe();

        let window = h.registry.create(None, None).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::WindowCreated { id: window.id() }
        );

        window
            .handle_message(RequestEnvelope::new(methods::PAGE_RELOAD, None))
            .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::WindowInteraction {
                id: window.id(),
                method: methods::PAGE_RELOAD.to_string(),
                params: None,
            }
        );

        window.dispose().await;
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::WindowDisposed { id: window.id() }
        );
    }

    #[tokio::test]
    async fn test_window_open_request_creates_window() {
        let h = harness();
        let mut rx = h.registry.subscribe();
        let window = h.registry.create(None, None).await.unwrap();

        window
            .handle_message(RequestEnvelope::new(
                methods::WINDOW_OPEN_REQUESTED,
                Some(json!({ "url": "http://popup.example" })),
            ))
            .await;

        let created = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Ok(RegistryEvent::WindowCreated { id }) = rx.recv().await {
                    if id != window.id() {
                        return id;
                    }
                }
            }
        })
        .await
        .unwrap();

        assert!(h.registry.get_by_url("http://popup.example").is_some());
        assert_eq!(h.registry.get_by_id(created).map(|w| w.column()), Some(2));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let h = harness();
        h.registry
            .update_settings(&json!({ "startUrl": "http://configured.example" }));

        let window = h.registry.create(None, None).await.unwrap();
        assert_eq!(
            window.start_url().as_deref(),
            Some("http://configured.example/")
        );
    }

    #[tokio::test]
    async fn test_states_snapshot() {
        let h = harness();
        let window = h.registry.create(None, None).await.unwrap();

        let states = h.registry.states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].id, window.id());
    }
}
