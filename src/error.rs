//! Error types for the upstream API client

use thiserror::Error;

/// Failure of a single request against the log API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, timeout, reset, ...
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP error! status: {status}")]
    Request { status: u16 },

    /// The body was not the JSON shape we expect
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status carried by a `Request` error
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status } => Some(*status),
            _ => None,
        }
    }
}
