use thiserror::Error;

use crate::operation::Operation;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Backend not enabled")]
    BackendDisabled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Translator for '{operation}' returned {found} instead of the expected shape")]
    UnexpectedShape {
        operation: Operation,
        found: &'static str,
    },

    /// Carries the message extracted from the backend's error body as-is.
    #[error("{0}")]
    SaveFailed(String),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
