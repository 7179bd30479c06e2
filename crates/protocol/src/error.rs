//! Error types for envelope decoding

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Envelope has neither callbackId nor method")]
    Unroutable,

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}
