//! Page Session - one tab, one CDP session, one RPC surface
//!
//! `send` forwards CDP commands verbatim. A closed set of pseudo-commands is
//! answered locally instead: history shortcuts go through the tab's native
//! navigation, clipboard commands go to the editor.
//!
//! Inbound events fan out by method name. Subscribers registered with
//! `subscribe_all` act as the fallback arm: they see every event that has no
//! method-specific subscriber.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use protocol::{methods, CallbackId, ReplyEnvelope};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cdp::{self, CDPEvent, EventCallback};
use crate::editor::Clipboard;
use crate::error::{HostError, Result};
use crate::launcher::Browser;

/// A tab with an attached CDP session
#[async_trait]
pub trait PageChannel: Send + Sync {
    async fn call(&self, method: &str, params: Option<Value>) -> cdp::client::Result<Value>;

    /// Receive every event of this tab
    fn subscribe(&self, callback: EventCallback);

    async fn go_back(&self) -> cdp::client::Result<Value>;

    async fn go_forward(&self) -> cdp::client::Result<Value>;

    /// Detach and close the tab
    async fn close(&self) -> cdp::client::Result<()>;
}

/// Commands answered without a raw CDP round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    GoForward,
    GoBackward,
    ClipboardReadText,
    ClipboardWriteText,
}

impl LocalCommand {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            methods::PAGE_GO_FORWARD => Some(LocalCommand::GoForward),
            methods::PAGE_GO_BACKWARD => Some(LocalCommand::GoBackward),
            methods::CLIPBOARD_READ_TEXT => Some(LocalCommand::ClipboardReadText),
            methods::CLIPBOARD_WRITE_TEXT => Some(LocalCommand::ClipboardWriteText),
            _ => None,
        }
    }
}

type Subscribers = DashMap<String, Vec<EventCallback>>;

pub struct PageSession {
    browser: Arc<dyn Browser>,
    clipboard: Arc<dyn Clipboard>,
    channel: RwLock<Option<Arc<dyn PageChannel>>>,
    subscribers: Arc<Subscribers>,
    fallback: Arc<RwLock<Vec<EventCallback>>>,
    cancel: CancellationToken,
}

impl PageSession {
    pub fn new(browser: Arc<dyn Browser>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            browser,
            clipboard,
            channel: RwLock::new(None),
            subscribers: Arc::new(DashMap::new()),
            fallback: Arc::new(RwLock::new(Vec::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Open the tab and start relaying its events
    pub async fn launch(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(HostError::Disposed);
        }

        let channel = self.browser.open_page().await?;

        let subscribers = self.subscribers.clone();
        let fallback = self.fallback.clone();
        let cancel = self.cancel.clone();
        channel.subscribe(Arc::new(move |event| {
            if cancel.is_cancelled() {
                return;
            }
            dispatch(&subscribers, &fallback, event);
        }));

        *self.channel.write() = Some(channel);
        Ok(())
    }

    /// Subscribe to one event method
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        self.subscribers
            .entry(method.into())
            .or_default()
            .push(callback);
    }

    /// Subscribe to every event nobody subscribed to by name
    pub fn subscribe_all(&self, callback: EventCallback) {
        self.fallback.write().push(callback);
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn channel(&self) -> Result<Arc<dyn PageChannel>> {
        self.channel.read().clone().ok_or(HostError::NotLaunched)
    }

    /// Run one command. Resolves to `Disposed` if the session is disposed
    /// before the browser answers.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.cancel.is_cancelled() {
            return Err(HostError::Disposed);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HostError::Disposed),
            result = self.execute(method, params) => result,
        }
    }

    /// `send` wrapped for the UI: a reply envelope when a callback id was given
    pub async fn relay(
        &self,
        method: &str,
        params: Option<Value>,
        callback_id: Option<CallbackId>,
    ) -> Option<ReplyEnvelope> {
        let result = self.send(method, params).await;
        if let Err(e) = &result {
            tracing::debug!(method, error = %e, "Command failed");
        }

        let callback_id = callback_id?;
        Some(match result {
            Ok(value) => ReplyEnvelope::ok(callback_id, value),
            Err(e) => ReplyEnvelope::err(callback_id, e.reply_message()),
        })
    }

    async fn execute(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match LocalCommand::parse(method) {
            Some(command) => self.execute_local(command, params).await,
            None => {
                let channel = self.channel()?;
                Ok(channel.call(method, params).await?)
            }
        }
    }

    async fn execute_local(&self, command: LocalCommand, params: Option<Value>) -> Result<Value> {
        match command {
            LocalCommand::GoForward => Ok(self.channel()?.go_forward().await?),
            LocalCommand::GoBackward => Ok(self.channel()?.go_back().await?),
            LocalCommand::ClipboardReadText => {
                let text = self.clipboard.read_text().await?;
                Ok(Value::String(text))
            }
            LocalCommand::ClipboardWriteText => {
                let text = params
                    .as_ref()
                    .and_then(|p| p.get("value"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                self.clipboard.write_text(text).await?;
                Ok(Value::Null)
            }
        }
    }

    /// Cancel in-flight calls, drop subscribers, close the tab.
    /// Safe to call on a session that never launched, and more than once.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        self.subscribers.clear();
        self.fallback.write().clear();

        let channel = self.channel.write().take();
        if let Some(channel) = channel {
            if let Err(e) = channel.close().await {
                tracing::warn!("Failed to close tab: {}", e);
            }
        }
    }
}

fn dispatch(subscribers: &Subscribers, fallback: &RwLock<Vec<EventCallback>>, event: CDPEvent) {
    let named = subscribers
        .get(&event.method)
        .map(|entry| entry.value().clone());

    let callbacks = match named {
        Some(callbacks) if !callbacks.is_empty() => callbacks,
        _ => fallback.read().clone(),
    };

    for callback in callbacks {
        callback(event.clone());
    }
}
