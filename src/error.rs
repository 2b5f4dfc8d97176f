//! Error types for the AR placement core.
//!
//! Every fallible operation in the crate reports an [`ArError`]. Errors coming from the
//! browser (rejected promises, thrown exceptions) are converted at the `web` boundary, so the
//! rest of the crate never sees a raw `JsValue`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArError {
    #[error("Immersive AR is not supported: {0}")]
    Unsupported(String),

    #[error("Session request failed: {0}")]
    SessionRequest(String),

    #[error("Reference space request failed: {0}")]
    ReferenceSpace(String),

    #[error("Hit-test source request failed: {0}")]
    HitTestSource(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, ArError>;
