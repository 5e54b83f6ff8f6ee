//! Error types for the eventwire client

use eventwire_core::TransportError;
use thiserror::Error;

/// Errors that stop the client before or outside its main loop
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("dial: {0}")]
    Connect(#[source] TransportError),

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Line reader could not start: {0}")]
    LineReader(#[from] std::io::Error),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
