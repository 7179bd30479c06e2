//! Error types for the webview half
//!
//! Two layers: `CallError` is what a single RPC settles with, `ViewError` is what
//! the rendering and inspection code returns.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewError>;

/// Why a `Connection::send` did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The host answered with an error string
    #[error("{method} failed: {message}")]
    Remote { method: String, message: String },

    /// The connection was disposed before a reply arrived
    #[error("Connection disposed")]
    Disposed,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("Invalid frame data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported image: {0}")]
    Decode(String),

    #[error("Unreadable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unexpected reply shape: {0}")]
    Json(#[from] serde_json::Error),
}
