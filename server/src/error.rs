//! Error type for the dispatcher surface
//!
//! Handler failures are absorbed by the pipeline's error handler; an
//! `EdgeError` is what escapes to the host when that is not possible.

use edgehub_core::{HandlerError, RequestError};
use std::io;
use thiserror::Error;

/// EdgeHub error type covering failures that reach the host
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Request facts could not be built from the inbound request
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Error handler failed while handling a fault
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Response could not be converted for the host
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// Invalid virtual host pattern
    #[error("Host pattern error: {0}")]
    HostPattern(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Config document is not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient Result type for EdgeHub operations
pub type EdgeResult<T> = Result<T, EdgeError>;
