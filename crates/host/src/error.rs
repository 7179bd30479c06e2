//! Error types for the host half
//!
//! Flat hierarchy. CDP failures keep their own type so the browser's message can
//! be handed back to the UI untouched.

use thiserror::Error;

use crate::cdp::CDPError;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("No Chrome installation found - {0}")]
    BrowserNotFound(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error(transparent)]
    Cdp(#[from] CDPError),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("Window disposed")]
    Disposed,

    #[error("Page session not launched")]
    NotLaunched,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    /// Text for a reply envelope's `error` field
    pub fn reply_message(&self) -> String {
        match self {
            HostError::Cdp(CDPError::Protocol { message, .. }) => message.clone(),
            HostError::Clipboard(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
