//! CDP Session - one browser tab on the shared connection
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::client::{CDPClient, CDPError, EventCallback, Result};
use super::protocol::{
    AttachToTargetResult, CreateTargetResult, NavigationHistoryResult, SessionId, TargetId,
};
use crate::page::PageChannel;

/// Domains every preview tab needs
pub const DEFAULT_DOMAINS: &[&str] = &["Page", "DOM", "Runtime", "Network"];

/// CDP Session bound to a specific target
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,

    closed: AtomicBool,
}

impl CDPSession {
    /// Create a new tab at `url` and attach to it
    pub async fn open(client: Arc<CDPClient>, url: &str) -> Result<Self> {
        let result = client
            .send_request("Target.createTarget", Some(json!({ "url": url })), None)
            .await?;
        let created: CreateTargetResult = serde_json::from_value(result)?;

        Self::attach(client, created.target_id, DEFAULT_DOMAINS).await
    }

    /// Attach to a target and enable `domains`
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: &[&str],
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // Wait for all enables (ignore individual failures)
        let results = futures_util::future::join_all(enable_futures).await;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            tracing::warn!("Some domain enables failed: {}/{}", failures, results.len());
        }

        tracing::debug!(target_id = %target_id, session_id = %session_id, "Attached to tab");

        Ok(Self {
            client,
            target_id,
            session_id,
            closed: AtomicBool::new(false),
        })
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CDPError::Disposed);
        }
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<Value> {
        self.send("Page.navigate", Some(json!({ "url": url.into() })))
            .await
    }

    /// Move `offset` entries through session history. No-op past either end.
    pub async fn navigate_history(&self, offset: isize) -> Result<Value> {
        let result = self.send("Page.getNavigationHistory", None).await?;
        let history: NavigationHistoryResult = serde_json::from_value(result)?;

        match history.relative(offset) {
            Some(entry) => {
                self.send(
                    "Page.navigateToHistoryEntry",
                    Some(json!({ "entryId": entry.id })),
                )
                .await
            }
            None => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl PageChannel for CDPSession {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.send(method, params).await
    }

    fn subscribe(&self, callback: EventCallback) {
        self.client.subscribe_session(self.session_id.clone(), callback);
    }

    async fn go_back(&self) -> Result<Value> {
        self.navigate_history(-1).await
    }

    async fn go_forward(&self) -> Result<Value> {
        self.navigate_history(1).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self
            .client
            .send_request(
                "Target.closeTarget",
                Some(json!({ "targetId": &self.target_id })),
                None,
            )
            .await;
        self.client.drain_session(&self.session_id);
        result.map(|_| ())
    }
}
