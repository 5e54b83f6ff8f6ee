//! Error types for the eventwire client
//!
//! Transport failures and observability failures are kept apart: the former are
//! logged by whichever task hit them, the latter are always swallowed.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Errors raised by a [`crate::transport::Connector`] or its connection halves
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Send failed: {reason}")]
    SendFailed { reason: String },

    #[error("Receive failed: {reason}")]
    ReceiveFailed { reason: String },

    #[error("Connection closed by peer (code {code}): {reason}")]
    ClosedByPeer { code: u16, reason: String },

    #[error("Connection closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ----------------------------------------------------------------------------
// Telemetry Errors
// ----------------------------------------------------------------------------

/// Errors raised by a [`crate::telemetry::Telemetry`] sink
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Span {name} could not be started: {reason}")]
    SpanStart { name: String, reason: String },

    #[error("Span {name} could not be finished: {reason}")]
    SpanFinish { name: String, reason: String },

    #[error("Error report dropped: {reason}")]
    ReportDropped { reason: String },
}

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type for telemetry operations
pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;
