//! Test doubles for the capability traits

use async_trait::async_trait;
use parking_lot::Mutex;
use protocol::{HostMessage, ReplyEnvelope, WindowId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cdp::{self, CDPError, CDPEvent, EventCallback};
use crate::editor::{Clipboard, HostEditor, Panel, PanelFactory};
use crate::error::{HostError, Result};
use crate::launcher::{Browser, BrowserHandle, LaunchConfig, Launcher};
use crate::page::PageChannel;
use crate::window::{WindowEvent, WindowListener};

#[derive(Clone)]
enum Canned {
    Value(Value),
    Error(i32, String),
    Hang,
}

/// A tab that records every call and lets the test emit events
#[derive(Default)]
pub struct MockPage {
    calls: Mutex<Vec<(String, Option<Value>)>>,
    canned: Mutex<HashMap<String, Canned>>,
    subscribers: Mutex<Vec<EventCallback>>,
    history_moves: Mutex<Vec<i32>>,
    closed: AtomicBool,
}

impl MockPage {
    pub fn respond(&self, method: &str, result: cdp::client::Result<Value>) {
        let canned = match result {
            Ok(value) => Canned::Value(value),
            Err(CDPError::Protocol { code, message }) => Canned::Error(code, message),
            Err(other) => Canned::Error(0, other.to_string()),
        };
        self.canned.lock().insert(method.to_string(), canned);
    }

    /// Calls to `method` never complete
    pub fn hang(&self, method: &str) {
        self.canned.lock().insert(method.to_string(), Canned::Hang);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Params of the last call to `method`
    pub fn params_of(&self, method: &str) -> Option<Value> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .and_then(|(_, p)| p.clone())
    }

    pub fn history_moves(&self) -> Vec<i32> {
        self.history_moves.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn emit(&self, method: &str, params: Value) {
        let subscribers = self.subscribers.lock().clone();
        for callback in subscribers {
            callback(CDPEvent::new(method, params.clone()));
        }
    }
}

#[async_trait]
impl PageChannel for MockPage {
    async fn call(&self, method: &str, params: Option<Value>) -> cdp::client::Result<Value> {
        self.calls.lock().push((method.to_string(), params));

        let canned = self.canned.lock().get(method).cloned();
        match canned {
            Some(Canned::Value(value)) => Ok(value),
            Some(Canned::Error(code, message)) => Err(CDPError::Protocol { code, message }),
            Some(Canned::Hang) => std::future::pending().await,
            None => Ok(json!({})),
        }
    }

    fn subscribe(&self, callback: EventCallback) {
        self.subscribers.lock().push(callback);
    }

    async fn go_back(&self) -> cdp::client::Result<Value> {
        self.history_moves.lock().push(-1);
        Ok(Value::Null)
    }

    async fn go_forward(&self) -> cdp::client::Result<Value> {
        self.history_moves.lock().push(1);
        Ok(Value::Null)
    }

    async fn close(&self) -> cdp::client::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockBrowser {
    handle: Arc<BrowserHandle>,
    pages: Mutex<Vec<Arc<MockPage>>>,
    closes: AtomicUsize,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            handle: Arc::new(BrowserHandle::new(9222, "/usr/bin/chromium")),
            pages: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn page(&self, index: usize) -> Arc<MockPage> {
        self.pages.lock()[index].clone()
    }

    pub fn pages_opened(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for MockBrowser {
    fn handle(&self) -> Arc<BrowserHandle> {
        self.handle.clone()
    }

    async fn open_page(&self) -> Result<Arc<dyn PageChannel>> {
        let page = Arc::new(MockPage::default());
        self.pages.lock().push(page.clone());
        Ok(page)
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.handle.mark_dead();
    }
}

pub struct MockLauncher {
    browser: Arc<MockBrowser>,
    launches: AtomicUsize,
    fail: bool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            browser: Arc::new(MockBrowser::new()),
            launches: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn browser(&self) -> Arc<MockBrowser> {
        self.browser.clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self, _config: &LaunchConfig) -> Result<Arc<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(HostError::BrowserNotFound("no browser in tests".to_string()));
        }
        Ok(self.browser.clone())
    }
}

#[derive(Default)]
pub struct MockClipboard {
    text: Mutex<String>,
}

#[async_trait]
impl Clipboard for MockClipboard {
    async fn read_text(&self) -> Result<String> {
        Ok(self.text.lock().clone())
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        *self.text.lock() = text.to_string();
        Ok(())
    }
}

type OpenedFile = (PathBuf, Option<u32>, Option<u32>);

#[derive(Default)]
pub struct MockEditor {
    clipboard: Arc<MockClipboard>,
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    opened: Mutex<Vec<OpenedFile>>,
    input_answer: Mutex<Option<String>>,
    pick_answer: Mutex<Option<String>>,
}

impl MockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clipboard_text(&self) -> String {
        self.clipboard.text.lock().clone()
    }

    pub fn answer_input(&self, answer: Option<&str>) {
        *self.input_answer.lock() = answer.map(str::to_string);
    }

    pub fn answer_pick(&self, answer: Option<&str>) {
        *self.pick_answer.lock() = answer.map(str::to_string);
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn opened_files(&self) -> Vec<OpenedFile> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl HostEditor for MockEditor {
    fn clipboard(&self) -> Arc<dyn Clipboard> {
        self.clipboard.clone()
    }

    async fn open_file(&self, path: &Path, line: Option<u32>, column: Option<u32>) -> Result<()> {
        self.opened.lock().push((path.to_path_buf(), line, column));
        Ok(())
    }

    fn show_info(&self, message: &str) {
        self.infos.lock().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    async fn input_box(&self, _placeholder: &str, _value: Option<&str>) -> Option<String> {
        self.input_answer.lock().clone()
    }

    async fn quick_pick(&self, _items: &[&str]) -> Option<String> {
        self.pick_answer.lock().clone()
    }
}

#[derive(Default)]
pub struct MockPanel {
    messages: Mutex<Vec<HostMessage>>,
    title: Mutex<String>,
    reveals: AtomicUsize,
    closed: AtomicBool,
}

impl MockPanel {
    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.lock().clone()
    }

    pub fn replies(&self) -> Vec<ReplyEnvelope> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                HostMessage::Reply(reply) => Some(reply.clone()),
                HostMessage::Event(_) => None,
            })
            .collect()
    }

    /// Payloads of every event posted under `method`
    pub fn events(&self, method: &str) -> Vec<Value> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                HostMessage::Event(event) if event.method == method => Some(event.result.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Panel for MockPanel {
    fn post(&self, message: HostMessage) {
        self.messages.lock().push(message);
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    fn reveal(&self) {
        self.reveals.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockPanelFactory {
    panels: Mutex<Vec<(WindowId, u32, Arc<MockPanel>)>>,
}

impl MockPanelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self, index: usize) -> Arc<MockPanel> {
        self.panels.lock()[index].2.clone()
    }

    pub fn panel_for(&self, id: WindowId) -> Option<Arc<MockPanel>> {
        self.panels
            .lock()
            .iter()
            .find(|(window, _, _)| *window == id)
            .map(|(_, _, panel)| panel.clone())
    }

    pub fn columns(&self) -> Vec<u32> {
        self.panels.lock().iter().map(|(_, column, _)| *column).collect()
    }

    pub fn count(&self) -> usize {
        self.panels.lock().len()
    }
}

impl PanelFactory for MockPanelFactory {
    fn create(&self, id: WindowId, title: &str, column: u32) -> Arc<dyn Panel> {
        let panel = Arc::new(MockPanel::default());
        panel.set_title(title);
        self.panels.lock().push((id, column, panel.clone()));
        panel
    }
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(WindowId, WindowEvent)>>,
    disposed: Mutex<Vec<WindowId>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(WindowId, WindowEvent)> {
        self.events.lock().clone()
    }

    pub fn disposed(&self) -> Vec<WindowId> {
        self.disposed.lock().clone()
    }
}

#[async_trait]
impl WindowListener for RecordingListener {
    fn on_window_event(&self, id: WindowId, event: WindowEvent) {
        self.events.lock().push((id, event));
    }

    async fn on_window_disposed(&self, id: WindowId) {
        self.disposed.lock().push(id);
    }
}
